//! Medication Session: the in-memory medication list, quick-add presets,
//! plan suggestions, and the interaction result slot.
//!
//! Every change to the list advances a request generation and clears the
//! stored interaction result. An interaction
//! analysis remembers the generation it started under and its result is
//! applied only if no newer change or analysis happened meanwhile, so a slow
//! reply for an old list never overwrites a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;

use crate::analysis::{AnalysisOrchestrator, GenerativeBackend};
use crate::models::{InteractionAnalysis, MedicationEntry};

/// Fewest medications an interaction check is run for.
pub const MIN_MEDICATIONS_FOR_ANALYSIS: usize = 2;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MedicationError {
    #[error("Medication name must not be empty")]
    EmptyName,

    #[error("No entry at index {index} (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Session state lock poisoned")]
    LockPoisoned,
}

// ═══════════════════════════════════════════
// Quick-add presets
// ═══════════════════════════════════════════

/// One-tap common medications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAddPreset {
    Paracetamol,
    Ibuprofen,
    Amoxicillin,
}

impl QuickAddPreset {
    pub const ALL: [QuickAddPreset; 3] = [Self::Paracetamol, Self::Ibuprofen, Self::Amoxicillin];

    pub fn entry(&self) -> MedicationEntry {
        let (name, dosage, time) = match self {
            Self::Paracetamol => ("Paracetamol", "500mg", "8:00 AM"),
            Self::Ibuprofen => ("Ibuprofen", "200mg", "8:00 PM"),
            Self::Amoxicillin => ("Amoxicillin", "500mg", "12:00 PM"),
        };
        MedicationEntry {
            name: name.to_string(),
            dosage: Some(dosage.to_string()),
            time: Some(time.to_string()),
        }
    }

    /// Case-insensitive lookup by medication name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.entry().name.eq_ignore_ascii_case(name.trim()))
    }
}

// ═══════════════════════════════════════════
// Request generation
// ═══════════════════════════════════════════

/// Monotonic counter identifying the latest list state / analysis request.
#[derive(Debug, Default)]
pub struct RequestGeneration(AtomicU64);

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Move to a new generation and return it.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.current() == ticket
    }
}

// ═══════════════════════════════════════════
// Session
// ═══════════════════════════════════════════

#[derive(Debug, Default)]
struct SessionState {
    medications: Vec<MedicationEntry>,
    suggestions: Vec<MedicationEntry>,
    analysis: Option<InteractionAnalysis>,
}

/// One user's working medication list.
///
/// The state lock is never held across an await point.
pub struct MedicationSession<B: GenerativeBackend> {
    orchestrator: Arc<AnalysisOrchestrator<B>>,
    generation: RequestGeneration,
    state: Mutex<SessionState>,
}

impl<B: GenerativeBackend> MedicationSession<B> {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator<B>>) -> Self {
        Self {
            orchestrator,
            generation: RequestGeneration::new(),
            state: Mutex::new(SessionState::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, SessionState>, MedicationError> {
        self.state.lock().map_err(|_| MedicationError::LockPoisoned)
    }

    /// Apply a list change under the lock and advance the generation.
    ///
    /// The stored analysis describes the previous list, so any successful
    /// change clears it until the next refresh.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut SessionState) -> Result<T, MedicationError>,
    ) -> Result<T, MedicationError> {
        let mut state = self.state()?;
        let out = change(&mut state)?;
        self.generation.advance();
        state.analysis = None;
        Ok(out)
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    pub fn add_medication(&self, entry: MedicationEntry) -> Result<(), MedicationError> {
        self.mutate(|state| {
            state.medications.push(entry);
            Ok(())
        })
    }

    /// Add from raw form fields. A blank name is rejected and leaves the
    /// list untouched.
    pub fn add_from_form(
        &self,
        name: &str,
        dosage: Option<&str>,
        time: Option<&str>,
    ) -> Result<(), MedicationError> {
        let entry = MedicationEntry::new(name, dosage, time)?;
        self.add_medication(entry)
    }

    pub fn quick_add(&self, preset: QuickAddPreset) -> Result<(), MedicationError> {
        self.add_medication(preset.entry())
    }

    pub fn remove_medication(&self, index: usize) -> Result<MedicationEntry, MedicationError> {
        self.mutate(|state| {
            let len = state.medications.len();
            if index >= len {
                return Err(MedicationError::IndexOutOfRange { index, len });
            }
            Ok(state.medications.remove(index))
        })
    }

    /// Copy suggestion `index` onto the medication list.
    pub fn accept_suggestion(&self, index: usize) -> Result<(), MedicationError> {
        self.mutate(|state| {
            let len = state.suggestions.len();
            let entry = state
                .suggestions
                .get(index)
                .cloned()
                .ok_or(MedicationError::IndexOutOfRange { index, len })?;
            state.medications.push(entry);
            Ok(())
        })
    }

    /// Ask for a sample plan for `disease`. The suggestions replace both the
    /// suggestion list and the medication list. An empty reply leaves the
    /// medication list as it was.
    pub async fn load_suggested_plan(
        &self,
        disease: &str,
    ) -> Result<Vec<MedicationEntry>, MedicationError> {
        let suggestions = self.orchestrator.suggest_medication_plan(disease).await;

        if suggestions.is_empty() {
            tracing::info!("No medication plan suggestions available");
            self.state()?.suggestions.clear();
            return Ok(suggestions);
        }

        self.mutate(|state| {
            state.suggestions = suggestions.clone();
            state.medications = suggestions.clone();
            Ok(())
        })?;
        tracing::info!(count = suggestions.len(), "Medication plan pre-filled");
        Ok(suggestions)
    }

    /// Re-run the interaction check for the current list.
    ///
    /// Returns the stored result, or `None` when the list is too short or a
    /// newer change superseded this run before it finished.
    pub async fn refresh_analysis(&self) -> Result<Option<InteractionAnalysis>, MedicationError> {
        let (ticket, medications) = {
            let mut state = self.state()?;
            if state.medications.len() < MIN_MEDICATIONS_FOR_ANALYSIS {
                state.analysis = None;
                return Ok(None);
            }
            (self.generation.advance(), state.medications.clone())
        };

        let analysis = self.orchestrator.analyze_interactions(&medications).await;

        let mut state = self.state()?;
        if !self.generation.is_current(ticket) {
            tracing::debug!(
                ticket,
                current = self.generation.current(),
                "Discarding stale interaction result"
            );
            return Ok(None);
        }
        state.analysis = Some(analysis.clone());
        Ok(Some(analysis))
    }

    pub fn medications(&self) -> Vec<MedicationEntry> {
        self.state
            .lock()
            .map(|s| s.medications.clone())
            .unwrap_or_default()
    }

    pub fn suggestions(&self) -> Vec<MedicationEntry> {
        self.state
            .lock()
            .map(|s| s.suggestions.clone())
            .unwrap_or_default()
    }

    pub fn analysis(&self) -> Option<InteractionAnalysis> {
        self.state.lock().ok().and_then(|s| s.analysis.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::analysis::{candidate_reply, MockBackend};
    use crate::config::AnalysisConfig;

    const SAFE: &str = r#"{"safe": true, "interactions": [], "recommendations": "No changes needed"}"#;
    const UNSAFE: &str = r#"{"safe": false, "interactions": [{"medications": ["Ibuprofen", "Paracetamol"], "interaction": "Stomach upset", "severity": "low"}], "recommendations": "Take with food"}"#;

    fn session(backend: MockBackend) -> MedicationSession<MockBackend> {
        let config = AnalysisConfig::default()
            .with_api_key("test")
            .with_attempt_timeout(Duration::from_secs(5));
        MedicationSession::new(Arc::new(AnalysisOrchestrator::new(Arc::new(backend), config)))
    }

    fn calls(session: &MedicationSession<MockBackend>) -> Vec<String> {
        session.orchestrator.backend().calls()
    }

    #[test]
    fn presets_match_quick_add_buttons() {
        assert_eq!(
            QuickAddPreset::Paracetamol.entry(),
            MedicationEntry::new("Paracetamol", Some("500mg"), Some("8:00 AM")).unwrap()
        );
        assert_eq!(QuickAddPreset::Ibuprofen.entry().time.as_deref(), Some("8:00 PM"));
        assert_eq!(QuickAddPreset::Amoxicillin.entry().time.as_deref(), Some("12:00 PM"));
        assert_eq!(QuickAddPreset::from_name(" amoxicillin"), Some(QuickAddPreset::Amoxicillin));
        assert_eq!(QuickAddPreset::from_name("aspirin"), None);
    }

    #[test]
    fn generation_advances_monotonically() {
        let generation = RequestGeneration::new();
        assert_eq!(generation.current(), 0);
        let first = generation.advance();
        let second = generation.advance();
        assert!(second > first);
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }

    #[test]
    fn form_input_is_validated() {
        let session = session(MockBackend::new());
        assert_eq!(session.add_from_form("  ", Some("5mg"), None), Err(MedicationError::EmptyName));
        assert!(session.medications().is_empty());
        assert_eq!(session.generation(), 0);

        session.add_from_form("Warfarin", Some(" 5mg "), Some("")).unwrap();
        assert_eq!(session.medications()[0].dosage.as_deref(), Some("5mg"));
        assert_eq!(session.medications()[0].time, None);
    }

    #[test]
    fn remove_out_of_range_is_an_error() {
        let session = session(MockBackend::new());
        session.quick_add(QuickAddPreset::Ibuprofen).unwrap();
        assert_eq!(
            session.remove_medication(3),
            Err(MedicationError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(session.remove_medication(0).unwrap().name, "Ibuprofen");
        assert!(session.medications().is_empty());
    }

    #[tokio::test]
    async fn short_list_never_reaches_backend() {
        let session = session(MockBackend::new().then_text(SAFE));
        assert_eq!(session.refresh_analysis().await.unwrap(), None);
        session.quick_add(QuickAddPreset::Paracetamol).unwrap();
        assert_eq!(session.refresh_analysis().await.unwrap(), None);
        assert!(calls(&session).is_empty());
    }

    #[tokio::test]
    async fn refresh_stores_result_and_removal_clears_it() {
        let session = session(MockBackend::new().then_text(UNSAFE));
        session.quick_add(QuickAddPreset::Paracetamol).unwrap();
        session.quick_add(QuickAddPreset::Ibuprofen).unwrap();

        let analysis = session.refresh_analysis().await.unwrap().unwrap();
        assert!(!analysis.safe);
        assert_eq!(session.analysis(), Some(analysis));

        session.remove_medication(1).unwrap();
        assert_eq!(session.analysis(), None);
    }

    #[tokio::test]
    async fn any_list_change_clears_previous_analysis() {
        let session = session(MockBackend::new().then_text(
            r#"{"safe": false, "interactions": [{"medications": ["Warfarin", "Aspirin"], "interaction": "Bleeding risk", "severity": "high"}], "recommendations": "Avoid combining"}"#,
        ));
        session.add_from_form("Warfarin", Some("5mg"), None).unwrap();
        session.add_from_form("Aspirin", Some("81mg"), None).unwrap();
        session.quick_add(QuickAddPreset::Paracetamol).unwrap();
        assert!(session.refresh_analysis().await.unwrap().is_some());

        session.remove_medication(1).unwrap();
        let names: Vec<_> = session.medications().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Warfarin", "Paracetamol"]);
        assert_eq!(session.analysis(), None);
    }

    #[tokio::test]
    async fn adding_to_analysed_list_clears_result() {
        let session = session(MockBackend::new().then_text(SAFE));
        session.quick_add(QuickAddPreset::Paracetamol).unwrap();
        session.quick_add(QuickAddPreset::Ibuprofen).unwrap();
        session.refresh_analysis().await.unwrap();
        assert!(session.analysis().is_some());

        session.quick_add(QuickAddPreset::Amoxicillin).unwrap();
        assert_eq!(session.analysis(), None);
    }

    #[tokio::test]
    async fn stale_result_is_not_applied() {
        let backend = MockBackend::new()
            .then_reply_after(Duration::from_millis(200), candidate_reply(UNSAFE))
            .then_text(SAFE);
        let session = session(backend);
        session.quick_add(QuickAddPreset::Paracetamol).unwrap();
        session.quick_add(QuickAddPreset::Ibuprofen).unwrap();

        let slow = session.refresh_analysis();
        let fast = async {
            session.quick_add(QuickAddPreset::Amoxicillin).unwrap();
            session.refresh_analysis().await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), None);
        let fast = fast.unwrap().unwrap();
        assert!(fast.safe);
        // The slow reply for the two-item list arrived last but was dropped.
        assert_eq!(session.analysis(), Some(fast));
    }

    #[tokio::test]
    async fn plan_prefills_list_and_suggestions() {
        let session = session(MockBackend::new().then_text(
            r#"{"medications": [
                {"name": "Sumatriptan", "dosage": "50mg", "time": "At onset"},
                {"name": "Naproxen", "dosage": "250mg", "time": "8:00 AM"}
            ]}"#,
        ));
        session.quick_add(QuickAddPreset::Paracetamol).unwrap();

        let plan = session.load_suggested_plan("Migraine").await.unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(session.suggestions(), plan);
        assert_eq!(session.medications(), plan);

        session.accept_suggestion(0).unwrap();
        assert_eq!(session.medications().len(), 3);
        assert_eq!(
            session.accept_suggestion(5),
            Err(MedicationError::IndexOutOfRange { index: 5, len: 2 })
        );
    }

    #[tokio::test]
    async fn plan_prefill_clears_previous_analysis() {
        let session = session(
            MockBackend::new()
                .then_text(UNSAFE)
                .then_text(r#"{"medications": [{"name": "Oseltamivir", "dosage": "75mg", "time": "8:00 AM"}]}"#),
        );
        session.quick_add(QuickAddPreset::Paracetamol).unwrap();
        session.quick_add(QuickAddPreset::Ibuprofen).unwrap();
        assert!(session.refresh_analysis().await.unwrap().is_some());

        session.load_suggested_plan("Flu").await.unwrap();
        assert_eq!(session.medications()[0].name, "Oseltamivir");
        assert_eq!(session.analysis(), None);
    }

    #[tokio::test]
    async fn failed_plan_keeps_existing_list() {
        let session = session(
            MockBackend::new().then_reply(json!({ "error": { "message": "Quota exceeded" } })),
        );
        session.quick_add(QuickAddPreset::Ibuprofen).unwrap();
        let plan = session.load_suggested_plan("Flu").await.unwrap();
        assert!(plan.is_empty());
        assert_eq!(session.medications().len(), 1);
        assert!(session.suggestions().is_empty());
    }
}
