use serde_json::Value;

use super::types::{AnalysisKind, AnalysisPayload, ModelAttemptOutcome};
use super::validation::{parse_interactions, parse_plan, parse_predictions, ValidationError};

const UNKNOWN_ERROR: &str = "Unknown error";

/// Classify one raw backend reply.
///
/// Checked in order: an `error` object, a `promptFeedback.blockReason`,
/// the first candidate's text, then the schema for `kind`. The first
/// match decides the outcome. Never panics on arbitrary input.
pub fn normalize(raw: &Value, kind: AnalysisKind) -> ModelAttemptOutcome {
    if let Some(error) = raw.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(UNKNOWN_ERROR);
        return ModelAttemptOutcome::ApiError(message.to_string());
    }

    if let Some(reason) = raw.pointer("/promptFeedback/blockReason") {
        let reason = match reason {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        if !reason.is_empty() {
            return ModelAttemptOutcome::ContentBlocked(reason);
        }
    }

    let text = raw
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty());
    let Some(text) = text else {
        return ModelAttemptOutcome::NoCandidates;
    };

    match parse_payload(text, kind) {
        Ok(payload) => ModelAttemptOutcome::Success(payload),
        Err(e) => ModelAttemptOutcome::ParseFailure(e.to_string()),
    }
}

fn parse_payload(text: &str, kind: AnalysisKind) -> Result<AnalysisPayload, ValidationError> {
    Ok(match kind {
        AnalysisKind::SymptomAnalysis => AnalysisPayload::Predictions(parse_predictions(text)?),
        AnalysisKind::InteractionCheck => AnalysisPayload::Interactions(parse_interactions(text)?),
        AnalysisKind::MedicationPlan => AnalysisPayload::Plan(parse_plan(text)?),
    })
}
