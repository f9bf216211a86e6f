// Schema validation for reply text extracted from a backend candidate.
// Two stages: JSON syntax, then field-level shape. Either failure becomes a
// ParseFailure outcome whose reason is this module's error text.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    ConditionRecord, DrugInteraction, InteractionAnalysis, InteractionSeverity, MedicationEntry,
    MedicationPlan, MAX_SEVERITY, MIN_SEVERITY,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid JSON: {0}")]
    Syntax(String),

    #[error("unexpected shape: {0}")]
    Shape(String),

    #[error("{field}: {problem}")]
    Field { field: String, problem: String },
}

fn field_error(field: impl Into<String>, problem: impl Into<String>) -> ValidationError {
    ValidationError::Field {
        field: field.into(),
        problem: problem.into(),
    }
}

/// Strip an optional Markdown code fence (```json ... ```) around a reply.
pub fn extract_json_text(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the end of the opening line.
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open.trim_start_matches("json"),
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn parse_json(text: &str) -> Result<Value, ValidationError> {
    serde_json::from_str(extract_json_text(text)).map_err(|e| ValidationError::Syntax(e.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(value: &Value, field: &str) -> Result<T, ValidationError> {
    T::deserialize(value).map_err(|e| field_error(field, e.to_string()))
}

fn require_text(value: String, field: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(field_error(field, "must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

// ──────────────────────────────────────────────
// Predictions
// ──────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCondition {
    disease: String,
    confidence: f64,
    description: String,
    recovery: Vec<String>,
    #[serde(alias = "matched_symptoms")]
    matched_symptoms: Vec<String>,
    severity: i64,
    specialist: String,
}

/// Parse a prediction list. Accepts a bare array or an object with a
/// `predictions` (or `conditions`) array. The list must be non-empty.
pub fn parse_predictions(text: &str) -> Result<Vec<ConditionRecord>, ValidationError> {
    let value = parse_json(text)?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("predictions").or_else(|| map.get("conditions")) {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(field_error("predictions", "must be an array")),
            None => {
                return Err(ValidationError::Shape(
                    "expected an array or an object with \"predictions\"".into(),
                ))
            }
        },
        _ => {
            return Err(ValidationError::Shape(
                "expected an array or an object with \"predictions\"".into(),
            ))
        }
    };

    if items.is_empty() {
        return Err(field_error("predictions", "must not be empty"));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| validate_condition(item, &format!("predictions[{i}]")))
        .collect()
}

fn validate_condition(item: &Value, path: &str) -> Result<ConditionRecord, ValidationError> {
    let raw: RawCondition = decode(item, path)?;

    if !raw.confidence.is_finite() || !(0.0..=100.0).contains(&raw.confidence) {
        return Err(field_error(
            format!("{path}.confidence"),
            format!("{} is outside 0-100", raw.confidence),
        ));
    }
    if raw.severity < i64::from(MIN_SEVERITY) || raw.severity > i64::from(MAX_SEVERITY) {
        return Err(field_error(
            format!("{path}.severity"),
            format!("{} is outside {MIN_SEVERITY}-{MAX_SEVERITY}", raw.severity),
        ));
    }

    Ok(ConditionRecord {
        disease: require_text(raw.disease, &format!("{path}.disease"))?,
        confidence: raw.confidence,
        description: raw.description,
        recovery: raw.recovery,
        matched_symptoms: raw.matched_symptoms,
        severity: raw.severity as u8,
        specialist: raw.specialist,
    })
}

// ──────────────────────────────────────────────
// Interactions
// ──────────────────────────────────────────────

#[derive(Deserialize)]
struct RawAnalysis {
    safe: bool,
    #[serde(default)]
    interactions: Vec<Value>,
    recommendations: String,
}

#[derive(Deserialize)]
struct RawInteraction {
    medications: Vec<String>,
    interaction: String,
    severity: String,
}

/// Parse an interaction analysis.
///
/// Rejects `safe: true` alongside a non-empty interaction list: a reply
/// contradicting itself is treated as unparseable rather than shown.
pub fn parse_interactions(text: &str) -> Result<InteractionAnalysis, ValidationError> {
    let value = parse_json(text)?;
    if !value.is_object() {
        return Err(ValidationError::Shape("expected an object".into()));
    }
    let raw: RawAnalysis = decode(&value, "analysis")?;

    let interactions = raw
        .interactions
        .iter()
        .enumerate()
        .map(|(i, item)| validate_interaction(item, &format!("interactions[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    if raw.safe && !interactions.is_empty() {
        return Err(field_error(
            "safe",
            format!("true but {} interaction(s) listed", interactions.len()),
        ));
    }

    Ok(InteractionAnalysis {
        safe: raw.safe,
        interactions,
        recommendations: raw.recommendations.trim().to_string(),
    })
}

fn validate_interaction(item: &Value, path: &str) -> Result<DrugInteraction, ValidationError> {
    let raw: RawInteraction = decode(item, path)?;

    let medications: Vec<String> = raw
        .medications
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if medications.len() < 2 {
        return Err(field_error(
            format!("{path}.medications"),
            format!("needs at least 2 entries, got {}", medications.len()),
        ));
    }

    let severity: InteractionSeverity = raw.severity.parse().map_err(|bad| {
        field_error(
            format!("{path}.severity"),
            format!("unknown severity '{bad}'"),
        )
    })?;

    Ok(DrugInteraction {
        medications,
        interaction: require_text(raw.interaction, &format!("{path}.interaction"))?,
        severity,
    })
}

// ──────────────────────────────────────────────
// Medication plan
// ──────────────────────────────────────────────

#[derive(Deserialize)]
struct RawPlanEntry {
    name: String,
    #[serde(default)]
    dosage: Option<String>,
    #[serde(default)]
    time: Option<String>,
}

/// Parse a suggested plan: an object with a `medications` array.
pub fn parse_plan(text: &str) -> Result<MedicationPlan, ValidationError> {
    let value = parse_json(text)?;
    let items = match value.get("medications") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(field_error("medications", "must be an array")),
        None => {
            return Err(ValidationError::Shape(
                "expected an object with \"medications\"".into(),
            ))
        }
    };

    let medications = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("medications[{i}]");
            let raw: RawPlanEntry = decode(item, &path)?;
            MedicationEntry::new(&raw.name, raw.dosage.as_deref(), raw.time.as_deref())
                .map_err(|e| field_error(format!("{path}.name"), e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MedicationPlan { medications })
}
