//! Offline keyword predictor used when no generative model can answer.
//!
//! The topic table is a static asset (`conditions.json`) compiled into the
//! binary. Topics are checked in table order and the first topic with any
//! keyword contained in the lower-cased input wins; its records are returned
//! unmodified. Inputs matching no topic get the default records, each tagged
//! with a short excerpt of the input. Topics are never combined.

use std::sync::LazyLock;

use serde::Deserialize;

use crate::models::ConditionRecord;

/// Characters of user input kept in the default records' matched symptoms.
pub const EXCERPT_CHARS: usize = 15;

static CONDITIONS_TABLE: &str = include_str!("conditions.json");

static PREDICTOR_TABLE: LazyLock<PredictorTable> = LazyLock::new(|| {
    serde_json::from_str(CONDITIONS_TABLE).expect("embedded predictor table is valid JSON")
});

#[derive(Debug, Deserialize)]
struct PredictorTable {
    topics: Vec<Topic>,
    default: Vec<ConditionRecord>,
}

#[derive(Debug, Deserialize)]
struct Topic {
    key: String,
    keywords: Vec<String>,
    conditions: Vec<ConditionRecord>,
}

impl Topic {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Deterministic keyword-to-condition mapper. Pure and total.
#[derive(Debug, Clone, Copy)]
pub struct LocalPredictor {
    table: &'static PredictorTable,
}

impl Default for LocalPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPredictor {
    pub fn new() -> Self {
        Self {
            table: LazyLock::force(&PREDICTOR_TABLE),
        }
    }

    /// Predict conditions for free-text symptoms. Always returns records.
    pub fn predict(&self, text: &str) -> Vec<ConditionRecord> {
        let lowered = text.to_lowercase();

        if let Some(topic) = self.table.topics.iter().find(|t| t.matches(&lowered)) {
            tracing::debug!(topic = %topic.key, "Local predictor matched topic");
            return topic.conditions.clone();
        }

        tracing::debug!(input_len = text.len(), "Local predictor using default records");
        let excerpt = input_excerpt(text);
        self.table
            .default
            .iter()
            .cloned()
            .map(|mut record| {
                record.matched_symptoms = vec![excerpt.clone()];
                record
            })
            .collect()
    }

    /// Key of the topic `text` would resolve to, or `None` for the default set.
    pub(crate) fn topic_for(&self, text: &str) -> Option<&'static str> {
        let lowered = text.to_lowercase();
        self.table
            .topics
            .iter()
            .find(|t| t.matches(&lowered))
            .map(|t| t.key.as_str())
    }

    /// Topic keys in match priority order.
    pub fn topic_keys(&self) -> Vec<&'static str> {
        self.table.topics.iter().map(|t| t.key.as_str()).collect()
    }
}

/// First `EXCERPT_CHARS` characters of `text`, with `...` when truncated.
pub fn input_excerpt(text: &str) -> String {
    if text.chars().count() > EXCERPT_CHARS {
        let head: String = text.chars().take(EXCERPT_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
