use std::ops::ControlFlow;
use std::time::Duration;

use serde::Serialize;
use tracing::Instrument;

use super::normalizer::normalize;
use super::types::{AnalysisPayload, GenerativeBackend, ModelAttemptOutcome, PromptRequest};
use super::BackendError;

/// Reason reported when a request is run against an empty model list.
pub const NO_MODELS_REASON: &str = "No models configured";

/// Terminal result of running one request across a model list.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackResult {
    Success(AnalysisPayload),
    /// Every model failed; carries the most recent failure reason.
    Exhausted(String),
}

impl FallbackResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// First-success-wins policy over a sequence of attempt outcomes.
///
/// Keeps only the most recent failure reason; earlier ones are superseded.
#[derive(Debug, Default)]
pub struct FallbackPolicy {
    last_reason: Option<String>,
}

impl FallbackPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one outcome. `Break` carries the winning payload and means no
    /// further models may be tried.
    pub fn observe(&mut self, outcome: ModelAttemptOutcome) -> ControlFlow<AnalysisPayload> {
        match outcome {
            ModelAttemptOutcome::Success(payload) => ControlFlow::Break(payload),
            failed => {
                self.last_reason = failed.failure_reason();
                ControlFlow::Continue(())
            }
        }
    }

    /// Result once the model list ran out without a success.
    pub fn finish(self) -> FallbackResult {
        match self.last_reason {
            Some(reason) => FallbackResult::Exhausted(reason),
            None => FallbackResult::Exhausted(NO_MODELS_REASON.to_string()),
        }
    }
}

/// Apply the fallback policy to already-known outcomes, in order.
pub fn resolve_outcomes<I>(outcomes: I) -> FallbackResult
where
    I: IntoIterator<Item = ModelAttemptOutcome>,
{
    let mut policy = FallbackPolicy::new();
    for outcome in outcomes {
        if let ControlFlow::Break(payload) = policy.observe(outcome) {
            return FallbackResult::Success(payload);
        }
    }
    policy.finish()
}

/// What happened on one model attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub model: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result plus the per-attempt trail, in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackRun {
    pub result: FallbackResult,
    pub attempts: Vec<AttemptRecord>,
}

impl FallbackRun {
    /// Attempt trail as a compact JSON array, for logs.
    pub fn trail_json(&self) -> String {
        serde_json::to_string(&self.attempts).unwrap_or_default()
    }
}

/// Sequential model fallback over a `GenerativeBackend`.
///
/// Models are tried strictly one after another. Each attempt is bounded by
/// `attempt_timeout`; an expired attempt counts as a transport failure.
pub struct FallbackDriver<'a, B: GenerativeBackend + ?Sized> {
    backend: &'a B,
    attempt_timeout: Duration,
}

impl<'a, B: GenerativeBackend + ?Sized> FallbackDriver<'a, B> {
    pub fn new(backend: &'a B, attempt_timeout: Duration) -> Self {
        Self {
            backend,
            attempt_timeout,
        }
    }

    pub async fn run_with_fallback(
        &self,
        request: &PromptRequest,
        model_ids: &[String],
    ) -> FallbackRun {
        let span = tracing::info_span!(
            "run_with_fallback",
            request_id = %request.id(),
            kind = request.kind().as_str(),
            models = model_ids.len(),
        );
        self.run_inner(request, model_ids).instrument(span).await
    }

    async fn run_inner(&self, request: &PromptRequest, model_ids: &[String]) -> FallbackRun {
        let mut policy = FallbackPolicy::new();
        let mut attempts = Vec::with_capacity(model_ids.len());

        for (index, model) in model_ids.iter().enumerate() {
            let outcome = self.attempt(model, request).await;
            attempts.push(AttemptRecord {
                model: model.clone(),
                outcome: outcome.label(),
                reason: outcome.failure_reason(),
            });

            if !outcome.is_success() {
                tracing::warn!(
                    model = %model,
                    attempt = index + 1,
                    outcome = outcome.label(),
                    reason = %outcome.failure_reason().unwrap_or_default(),
                    "Model attempt failed, trying next model"
                );
            }

            if let ControlFlow::Break(payload) = policy.observe(outcome) {
                tracing::info!(model = %model, attempt = index + 1, "Model attempt succeeded");
                return FallbackRun {
                    result: FallbackResult::Success(payload),
                    attempts,
                };
            }
        }

        let run = FallbackRun {
            result: policy.finish(),
            attempts,
        };
        if let FallbackResult::Exhausted(last_reason) = &run.result {
            tracing::warn!(
                attempts = run.attempts.len(),
                %last_reason,
                trail = %run.trail_json(),
                "All models exhausted"
            );
        }
        run
    }

    async fn attempt(&self, model: &str, request: &PromptRequest) -> ModelAttemptOutcome {
        let call = self.backend.generate(model, request.prompt());
        match tokio::time::timeout(self.attempt_timeout, call).await {
            Ok(Ok(raw)) => normalize(&raw, request.kind()),
            Ok(Err(e)) => e.into_outcome(),
            Err(_) => BackendError::Timeout(self.attempt_timeout).into_outcome(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::analysis::gemini::MockBackend;
    use crate::models::MedicationPlan;

    const PLAN: &str = r#"{"medications": [{"name": "Ibuprofen", "dosage": "400mg", "time": "8:00 AM"}]}"#;

    fn models(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn plan_request() -> PromptRequest {
        PromptRequest::medication_plan("Migraine")
    }

    fn empty_plan() -> AnalysisPayload {
        AnalysisPayload::Plan(MedicationPlan::default())
    }

    #[test]
    fn policy_stops_at_first_success() {
        let result = resolve_outcomes(vec![
            ModelAttemptOutcome::NoCandidates,
            ModelAttemptOutcome::Success(empty_plan()),
            ModelAttemptOutcome::ApiError("never reached".into()),
        ]);
        assert_eq!(result, FallbackResult::Success(empty_plan()));
    }

    #[test]
    fn policy_reports_last_failure_only() {
        let result = resolve_outcomes(vec![
            ModelAttemptOutcome::ApiError("Quota exceeded".into()),
            ModelAttemptOutcome::ContentBlocked("SAFETY".into()),
        ]);
        assert_eq!(result, FallbackResult::Exhausted("Content blocked: SAFETY".into()));
    }

    #[test]
    fn policy_with_no_outcomes() {
        assert_eq!(
            resolve_outcomes(Vec::new()),
            FallbackResult::Exhausted("No models configured".into())
        );
    }

    #[tokio::test]
    async fn third_model_wins_after_two_failures() {
        let backend = MockBackend::new()
            .then_reply(json!({ "error": { "message": "Model overloaded" } }))
            .then_reply(json!({ "candidates": [] }))
            .then_text(PLAN)
            .then_text(PLAN);
        let driver = FallbackDriver::new(&backend, Duration::from_secs(5));

        let run = driver
            .run_with_fallback(&plan_request(), &models(&["m1", "m2", "m3"]))
            .await;

        assert!(run.result.is_success());
        assert_eq!(backend.calls(), vec!["m1", "m2", "m3"]);
        let labels: Vec<_> = run.attempts.iter().map(|a| a.outcome).collect();
        assert_eq!(labels, vec!["api_error", "no_candidates", "success"]);
        assert_eq!(run.attempts[0].reason.as_deref(), Some("Model overloaded"));
    }

    #[tokio::test]
    async fn success_on_first_model_makes_one_call() {
        let backend = MockBackend::new().then_text(PLAN);
        let driver = FallbackDriver::new(&backend, Duration::from_secs(5));
        let run = driver
            .run_with_fallback(&plan_request(), &models(&["m1", "m2"]))
            .await;
        assert!(run.result.is_success());
        assert_eq!(backend.calls(), vec!["m1"]);
    }

    #[tokio::test]
    async fn transport_errors_do_not_abort_the_loop() {
        let backend = MockBackend::new()
            .then_fail(BackendError::Network("connection reset".into()))
            .then_fail(BackendError::Http { status: 503 })
            .then_text(PLAN);
        let driver = FallbackDriver::new(&backend, Duration::from_secs(5));
        let run = driver
            .run_with_fallback(&plan_request(), &models(&["m1", "m2", "m3"]))
            .await;
        assert!(run.result.is_success());
        assert_eq!(run.attempts[1].reason.as_deref(), Some("API request failed: 503"));
    }

    #[tokio::test]
    async fn timed_out_attempt_moves_to_next_model() {
        let backend = MockBackend::new()
            .then_reply_after(Duration::from_secs(60), json!({}))
            .then_text(PLAN);
        let driver = FallbackDriver::new(&backend, Duration::from_millis(20));
        let run = driver
            .run_with_fallback(&plan_request(), &models(&["slow", "fast"]))
            .await;
        assert!(run.result.is_success());
        assert_eq!(backend.calls(), vec!["slow", "fast"]);
        assert_eq!(run.attempts[0].outcome, "transport_error");
        assert!(run.attempts[0]
            .reason
            .as_deref()
            .unwrap()
            .starts_with("Request timed out"));
    }

    #[tokio::test]
    async fn exhaustion_carries_last_reason() {
        let backend = MockBackend::new()
            .then_text("garbage")
            .then_reply(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        let driver = FallbackDriver::new(&backend, Duration::from_secs(5));
        let run = driver
            .run_with_fallback(&plan_request(), &models(&["m1", "m2"]))
            .await;
        assert_eq!(run.result, FallbackResult::Exhausted("Content blocked: SAFETY".into()));
        assert_eq!(run.attempts.len(), 2);
    }

    #[tokio::test]
    async fn trail_lists_each_attempt_in_order() {
        let backend = MockBackend::new()
            .then_reply(json!({ "error": { "message": "Quota exceeded" } }))
            .then_text(PLAN);
        let driver = FallbackDriver::new(&backend, Duration::from_secs(5));
        let run = driver
            .run_with_fallback(&plan_request(), &models(&["m1", "m2"]))
            .await;

        let trail: serde_json::Value = serde_json::from_str(&run.trail_json()).unwrap();
        assert_eq!(
            trail,
            json!([
                { "model": "m1", "outcome": "api_error", "reason": "Quota exceeded" },
                { "model": "m2", "outcome": "success" }
            ])
        );
    }

    #[tokio::test]
    async fn empty_model_list_makes_no_calls() {
        let backend = MockBackend::new().then_text(PLAN);
        let driver = FallbackDriver::new(&backend, Duration::from_secs(5));
        let run = driver.run_with_fallback(&plan_request(), &[]).await;
        assert_eq!(run.result, FallbackResult::Exhausted("No models configured".into()));
        assert!(backend.calls().is_empty());
        assert!(run.attempts.is_empty());
    }
}
