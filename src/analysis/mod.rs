//! Analysis engine: prompt construction, backend transport, reply
//! normalization, model fallback, and the public orchestrator.

pub mod types;
pub mod prompt;
pub mod gemini_types;
pub mod gemini;
pub mod validation;
pub mod normalizer;
pub mod fallback;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use gemini::*;
pub use validation::*;
pub use normalizer::*;
pub use fallback::*;
pub use orchestrator::*;

use std::time::Duration;

use thiserror::Error;

/// Transport-level failure from a `GenerativeBackend` call.
///
/// Never surfaces to callers of the orchestrator: the fallback driver turns
/// it into a failed attempt and moves on to the next model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API request failed: {status}")]
    Http { status: u16 },

    #[error("Invalid model name: '{0}'")]
    InvalidModelName(String),

    #[error("Invalid URL format: '{0}'")]
    InvalidUrl(String),

    #[error("Response body is not JSON: {0}")]
    MalformedBody(String),
}

impl BackendError {
    /// Classify this failure as the outcome of one model attempt.
    pub fn into_outcome(self) -> ModelAttemptOutcome {
        match self {
            BackendError::MalformedBody(detail) => ModelAttemptOutcome::ParseFailure(detail),
            BackendError::Network(msg) if msg.trim().is_empty() => {
                ModelAttemptOutcome::TransportError("Network error".to_string())
            }
            other => ModelAttemptOutcome::TransportError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_become_transport_errors() {
        let outcome = BackendError::Http { status: 503 }.into_outcome();
        assert_eq!(
            outcome,
            ModelAttemptOutcome::TransportError("API request failed: 503".into())
        );
        let outcome = BackendError::Timeout(Duration::from_secs(30)).into_outcome();
        assert_eq!(
            outcome,
            ModelAttemptOutcome::TransportError("Request timed out after 30s".into())
        );
    }

    #[test]
    fn empty_network_message_gets_generic_text() {
        let outcome = BackendError::Network(String::new()).into_outcome();
        assert_eq!(outcome, ModelAttemptOutcome::TransportError("Network error".into()));
    }

    #[test]
    fn malformed_body_is_a_parse_failure() {
        let outcome = BackendError::MalformedBody("expected value".into()).into_outcome();
        assert!(matches!(outcome, ModelAttemptOutcome::ParseFailure(_)));
    }
}
