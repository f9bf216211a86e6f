use serde::{Deserialize, Serialize};

/// Lowest severity a condition record may carry (mild, self-care).
pub const MIN_SEVERITY: u8 = 1;
/// Highest severity a condition record may carry (see a professional soon).
pub const MAX_SEVERITY: u8 = 3;

/// One plausible condition in a symptom analysis result.
///
/// Field names serialise in camelCase to match the JSON the generative
/// service is asked to produce and the embedded predictor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRecord {
    pub disease: String,
    /// Likelihood score in `[0, 100]`.
    pub confidence: f64,
    pub description: String,
    /// Ordered self-care / recovery steps.
    pub recovery: Vec<String>,
    pub matched_symptoms: Vec<String>,
    /// 1 = mild, 2 = moderate, 3 = severe.
    pub severity: u8,
    pub specialist: String,
}

impl ConditionRecord {
    pub fn severity_label(&self) -> &'static str {
        match self.severity {
            1 => "mild",
            2 => "moderate",
            _ => "severe",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_matched_symptoms_in_camel_case() {
        let record = ConditionRecord {
            disease: "Migraine".into(),
            confidence: 85.0,
            description: "Headache disorder".into(),
            recovery: vec!["Rest".into()],
            matched_symptoms: vec!["headache".into()],
            severity: 2,
            specialist: "Neurologist".into(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"matchedSymptoms\":[\"headache\"]"));
        assert!(!json.contains("matched_symptoms"));
    }

    #[test]
    fn severity_labels() {
        let mut record = ConditionRecord {
            disease: "x".into(),
            confidence: 1.0,
            description: String::new(),
            recovery: vec![],
            matched_symptoms: vec![],
            severity: 1,
            specialist: String::new(),
        };
        assert_eq!(record.severity_label(), "mild");
        record.severity = 2;
        assert_eq!(record.severity_label(), "moderate");
        record.severity = 3;
        assert_eq!(record.severity_label(), "severe");
    }
}
