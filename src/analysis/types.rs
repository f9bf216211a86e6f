use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use super::prompt::{build_interaction_prompt, build_plan_prompt, build_symptom_prompt};
use super::BackendError;
use crate::models::{ConditionRecord, InteractionAnalysis, MedicationEntry, MedicationPlan};

/// What a request asks the backend for. Also selects the reply schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    SymptomAnalysis,
    InteractionCheck,
    MedicationPlan,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SymptomAnalysis => "symptom_analysis",
            Self::InteractionCheck => "interaction_check",
            Self::MedicationPlan => "medication_plan",
        }
    }
}

/// One user action's request to the backend. Immutable once built.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    id: Uuid,
    kind: AnalysisKind,
    subject_text: String,
    prompt: String,
}

impl PromptRequest {
    pub fn symptom_analysis(symptoms: &str) -> Self {
        Self::new(AnalysisKind::SymptomAnalysis, symptoms.to_string(), build_symptom_prompt(symptoms))
    }

    /// The subject text is the medication list serialized as
    /// `Name (dosage); Name (dose unknown)`.
    pub fn interaction_check(medications: &[MedicationEntry]) -> Self {
        let subject = serialize_medications(medications);
        let prompt = build_interaction_prompt(&subject);
        Self::new(AnalysisKind::InteractionCheck, subject, prompt)
    }

    pub fn medication_plan(disease: &str) -> Self {
        Self::new(AnalysisKind::MedicationPlan, disease.to_string(), build_plan_prompt(disease))
    }

    fn new(kind: AnalysisKind, subject_text: String, prompt: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            subject_text,
            prompt,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }

    pub fn subject_text(&self) -> &str {
        &self.subject_text
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Join medications into the `; `-separated form sent to the backend.
pub fn serialize_medications(medications: &[MedicationEntry]) -> String {
    medications
        .iter()
        .map(MedicationEntry::prompt_label)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A validated reply, in the schema matching the request kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPayload {
    Predictions(Vec<ConditionRecord>),
    Interactions(InteractionAnalysis),
    Plan(MedicationPlan),
}

impl AnalysisPayload {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            Self::Predictions(_) => AnalysisKind::SymptomAnalysis,
            Self::Interactions(_) => AnalysisKind::InteractionCheck,
            Self::Plan(_) => AnalysisKind::MedicationPlan,
        }
    }
}

/// Classified result of a single backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelAttemptOutcome {
    Success(AnalysisPayload),
    /// The backend reported a fault (bad request, quota, auth).
    ApiError(String),
    /// The prompt was refused by the backend's content policy.
    ContentBlocked(String),
    /// The reply text was not valid structured output.
    ParseFailure(String),
    /// Well-formed reply with nothing in it.
    NoCandidates,
    /// Network failure, timeout, or an error status with no readable body.
    TransportError(String),
}

impl ModelAttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::ApiError(_) => "api_error",
            Self::ContentBlocked(_) => "content_blocked",
            Self::ParseFailure(_) => "parse_failure",
            Self::NoCandidates => "no_candidates",
            Self::TransportError(_) => "transport_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Human-readable reason carried into the exhaustion message.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::ApiError(message) => Some(message.clone()),
            Self::ContentBlocked(reason) => Some(format!("Content blocked: {reason}")),
            Self::ParseFailure(detail) => Some(format!("Could not parse AI response: {detail}")),
            Self::NoCandidates => Some("No response from analysis service".to_string()),
            Self::TransportError(message) => Some(message.clone()),
        }
    }

    pub fn into_result(self) -> Result<AnalysisPayload, String> {
        match self {
            Self::Success(payload) => Ok(payload),
            other => Err(other
                .failure_reason()
                .unwrap_or_else(|| "Unknown error".to_string())),
        }
    }
}

/// Generative text service abstraction (allows mocking).
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Issue one generation call against `model`, asking for JSON output.
    ///
    /// Returns the raw JSON reply document, including error replies the
    /// service delivered with a readable body.
    async fn generate(&self, model: &str, prompt: &str) -> Result<serde_json::Value, BackendError>;

    /// Model identifiers the service currently offers.
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;
}
