use serde::{Deserialize, Serialize};

/// Clinical weight of a single drug-drug interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSeverity {
    Low,
    Moderate,
    High,
}

impl InteractionSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for InteractionSeverity {
    type Err = String;

    /// Case-insensitive; models are inconsistent about capitalisation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            _ => Err(s.to_string()),
        }
    }
}

/// An interaction between two or more medications on the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugInteraction {
    pub medications: Vec<String>,
    pub interaction: String,
    pub severity: InteractionSeverity,
}

/// Result of checking a medication list for interactions.
///
/// `safe == true` implies `interactions` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionAnalysis {
    pub safe: bool,
    pub interactions: Vec<DrugInteraction>,
    pub recommendations: String,
}

impl InteractionAnalysis {
    /// Result shown when no model could verify the list.
    pub fn degraded(last_reason: &str) -> Self {
        Self {
            safe: false,
            interactions: vec![],
            recommendations: format!(
                "All models failed. Last error: {last_reason}. Please try again later."
            ),
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.safe {
            "No significant interactions detected"
        } else {
            "Potential interactions detected"
        }
    }
}
