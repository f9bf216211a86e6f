use std::sync::Arc;

use super::fallback::{FallbackDriver, FallbackResult, FallbackRun};
use super::gemini::GeminiClient;
use super::types::{AnalysisPayload, GenerativeBackend, PromptRequest};
use super::BackendError;
use crate::config::AnalysisConfig;
use crate::models::{ConditionRecord, InteractionAnalysis, MedicationEntry};
use crate::predictor::LocalPredictor;

/// Public entry point for every analysis.
///
/// All three analyses are total: backend failures end in a fallback value
/// (local predictions, a degraded interaction result, or an empty plan),
/// never in an error. Holds no mutable state; share it behind an `Arc`.
pub struct AnalysisOrchestrator<B: GenerativeBackend> {
    backend: Arc<B>,
    config: AnalysisConfig,
    predictor: LocalPredictor,
}

impl AnalysisOrchestrator<GeminiClient> {
    /// Build an orchestrator talking to the live service described by `config`.
    pub fn from_config(config: AnalysisConfig) -> Result<Self, BackendError> {
        let client = GeminiClient::new(&config.api_base, config.api_key())?;
        Ok(Self::new(Arc::new(client), config))
    }
}

impl<B: GenerativeBackend> AnalysisOrchestrator<B> {
    pub fn new(backend: Arc<B>, config: AnalysisConfig) -> Self {
        Self {
            backend,
            config,
            predictor: LocalPredictor::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    async fn run(&self, request: &PromptRequest, models: &[String]) -> FallbackRun {
        FallbackDriver::new(self.backend.as_ref(), self.config.attempt_timeout)
            .run_with_fallback(request, models)
            .await
    }

    /// Rank plausible conditions for free-text symptoms.
    ///
    /// Falls back to the local keyword table when every model fails.
    pub async fn analyze_symptoms(&self, symptoms: &str) -> Vec<ConditionRecord> {
        let request = PromptRequest::symptom_analysis(symptoms);
        let run = self.run(&request, &self.config.symptom_models).await;

        match run.result {
            FallbackResult::Success(AnalysisPayload::Predictions(records)) => records,
            FallbackResult::Success(other) => {
                tracing::error!(kind = other.kind().as_str(), "Unexpected payload for symptom analysis");
                self.predictor.predict(symptoms)
            }
            FallbackResult::Exhausted(_) => {
                tracing::info!(
                    text_len = symptoms.chars().count(),
                    topic = self.predictor.topic_for(symptoms).unwrap_or("default"),
                    "No model answered, using local predictions"
                );
                self.predictor.predict(symptoms)
            }
        }
    }

    /// Check a medication list for drug-drug interactions.
    ///
    /// Callers must pass at least two medications. On exhaustion the result is
    /// `safe: false` with the failure reason in `recommendations`.
    pub async fn analyze_interactions(&self, medications: &[MedicationEntry]) -> InteractionAnalysis {
        debug_assert!(
            medications.len() >= 2,
            "interaction analysis needs at least two medications"
        );

        let request = PromptRequest::interaction_check(medications);
        let run = self.run(&request, &self.config.interaction_models).await;

        match run.result {
            FallbackResult::Success(AnalysisPayload::Interactions(analysis)) => analysis,
            FallbackResult::Success(other) => {
                tracing::error!(kind = other.kind().as_str(), "Unexpected payload for interaction check");
                InteractionAnalysis::degraded("Unexpected response type")
            }
            FallbackResult::Exhausted(last_reason) => InteractionAnalysis::degraded(&last_reason),
        }
    }

    /// Suggest a sample starting plan for `disease`. Empty when no model
    /// produced one.
    pub async fn suggest_medication_plan(&self, disease: &str) -> Vec<MedicationEntry> {
        let request = PromptRequest::medication_plan(disease);
        let run = self.run(&request, &self.config.plan_models).await;

        match run.result {
            FallbackResult::Success(AnalysisPayload::Plan(plan)) => plan.medications,
            FallbackResult::Success(other) => {
                tracing::error!(kind = other.kind().as_str(), "Unexpected payload for medication plan");
                vec![]
            }
            FallbackResult::Exhausted(_) => vec![],
        }
    }

    /// Models the backend currently offers.
    pub async fn list_backend_models(&self) -> Result<Vec<String>, BackendError> {
        self.backend.list_models().await
    }
}
