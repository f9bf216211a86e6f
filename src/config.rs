//! Application constants and analysis configuration.
//!
//! Configuration is read from the environment (the binary loads `.env` first).
//! Every value except the API key has a default, so a bare
//! `MEDLENS_API_KEY=...` is enough to run.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "MedLens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_KEY: &str = "MEDLENS_API_KEY";
pub const ENV_API_BASE: &str = "MEDLENS_API_BASE";
pub const ENV_SYMPTOM_MODELS: &str = "MEDLENS_SYMPTOM_MODELS";
pub const ENV_INTERACTION_MODELS: &str = "MEDLENS_INTERACTION_MODELS";
pub const ENV_PLAN_MODELS: &str = "MEDLENS_PLAN_MODELS";
pub const ENV_ATTEMPT_TIMEOUT: &str = "MEDLENS_ATTEMPT_TIMEOUT_SECS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medlens=info,warn"
}

/// Models tried for symptom analysis, in order.
pub fn default_symptom_models() -> Vec<String> {
    vec!["gemini-2.0-flash".to_string()]
}

/// Models tried for interaction checks, in order.
pub fn default_interaction_models() -> Vec<String> {
    vec![
        "gemini-2.0-flash".to_string(),
        "gemini-1.5-flash".to_string(),
        "gemini-2.5-flash-preview-05-20".to_string(),
    ]
}

/// Models tried for medication plan suggestions, in order.
pub fn default_plan_models() -> Vec<String> {
    vec!["gemini-2.5-flash-preview-05-20".to_string()]
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("MEDLENS_API_KEY is not set")]
    MissingApiKey,

    #[error("{name} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { name: &'static str, value: String },

    #[error("{0} must list at least one model")]
    EmptyModelList(&'static str),

    #[error("Invalid API base URL: '{0}'")]
    InvalidBaseUrl(String),
}

/// Settings for the analysis engine.
#[derive(Clone)]
pub struct AnalysisConfig {
    api_key: String,
    pub api_base: String,
    pub symptom_models: Vec<String>,
    pub interaction_models: Vec<String>,
    pub plan_models: Vec<String>,
    pub attempt_timeout: Duration,
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &"[redacted]")
            .field("api_base", &self.api_base)
            .field("symptom_models", &self.symptom_models)
            .field("interaction_models", &self.interaction_models)
            .field("plan_models", &self.plan_models)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            symptom_models: default_symptom_models(),
            interaction_models: default_interaction_models(),
            plan_models: default_plan_models(),
            attempt_timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
        }
    }
}

impl AnalysisConfig {
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_symptom_models(mut self, models: Vec<String>) -> Self {
        self.symptom_models = models;
        self
    }

    pub fn with_interaction_models(mut self, models: Vec<String>) -> Self {
        self.interaction_models = models;
        self
    }

    pub fn with_plan_models(mut self, models: Vec<String>) -> Self {
        self.plan_models = models;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Settings for running without the live service: no key and empty
    /// model lists, so every analysis goes straight to its local fallback.
    pub fn offline() -> Self {
        Self::default()
            .with_symptom_models(vec![])
            .with_interaction_models(vec![])
            .with_plan_models(vec![])
    }

    pub fn is_offline(&self) -> bool {
        self.api_key.is_empty()
            && self.symptom_models.is_empty()
            && self.interaction_models.is_empty()
            && self.plan_models.is_empty()
    }

    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        config.api_key = get(ENV_API_KEY).ok_or(ConfigError::MissingApiKey)?;

        if let Some(base) = get(ENV_API_BASE) {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(list) = get(ENV_SYMPTOM_MODELS) {
            config.symptom_models = parse_model_list(&list, ENV_SYMPTOM_MODELS)?;
        }
        if let Some(list) = get(ENV_INTERACTION_MODELS) {
            config.interaction_models = parse_model_list(&list, ENV_INTERACTION_MODELS)?;
        }
        if let Some(list) = get(ENV_PLAN_MODELS) {
            config.plan_models = parse_model_list(&list, ENV_PLAN_MODELS)?;
        }
        if let Some(secs) = get(ENV_ATTEMPT_TIMEOUT) {
            config.attempt_timeout = parse_timeout(&secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the settings needed to reach the live service.
    ///
    /// Empty model lists are allowed here; a request run against one is
    /// reported as "No models configured".
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if crate::analysis::gemini_types::validate_base_url(&self.api_base).is_err() {
            return Err(ConfigError::InvalidBaseUrl(self.api_base.clone()));
        }
        if self.attempt_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                name: ENV_ATTEMPT_TIMEOUT,
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Split a comma-separated model list, dropping blank items.
pub fn parse_model_list(raw: &str, name: &'static str) -> Result<Vec<String>, ConfigError> {
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if models.is_empty() {
        return Err(ConfigError::EmptyModelList(name));
    }
    Ok(models)
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            name: ENV_ATTEMPT_TIMEOUT,
            value: raw.to_string(),
        }),
    }
}
