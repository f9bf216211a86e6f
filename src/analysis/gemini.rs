use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::gemini_types::{
    short_model_name, validate_base_url, validate_model_name, GenerateContentRequest,
    ModelsResponse,
};
use super::types::GenerativeBackend;
use super::BackendError;

/// Header carrying the API credential.
const API_KEY_HEADER: &str = "X-goog-api-key";

/// Connection establishment limit. Whole-attempt limits are applied by the
/// fallback driver.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the generative-language `generateContent` API.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, BackendError> {
        let base_url = base_url.trim_end_matches('/');
        validate_base_url(base_url)?;

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/v1beta/models", self.base_url)
    }
}

fn classify_send_error(e: reqwest::Error) -> BackendError {
    if e.is_connect() {
        BackendError::Network(format!("Could not connect: {e}"))
    } else {
        BackendError::Network(e.to_string())
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<Value, BackendError> {
        validate_model_name(model)?;

        let body = GenerateContentRequest::json_prompt(prompt);
        let response = self
            .client
            .post(self.generate_url(model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        // Error statuses usually carry an `error` object; hand it to the
        // normalizer so the message is preserved.
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => Err(BackendError::Http {
                status: status.as_u16(),
            }),
            Err(e) => Err(BackendError::MalformedBody(e.to_string())),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(self.models_url())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: ModelsResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedBody(e.to_string()))?;

        Ok(parsed
            .models
            .into_iter()
            .map(|m| short_model_name(&m.name).to_string())
            .collect())
    }
}

/// Build a successful `generateContent` reply whose first candidate holds `text`.
pub fn candidate_reply(text: &str) -> Value {
    json!({
        "candidates": [
            { "content": { "role": "model", "parts": [ { "text": text } ] } }
        ]
    })
}

struct ScriptedStep {
    delay: Option<Duration>,
    reply: Result<Value, BackendError>,
}

/// Mock backend for testing: replays scripted replies in call order and
/// records the model id of every call.
///
/// Once the script runs out, every further call fails with a network error,
/// so `MockBackend::new()` alone behaves like an unreachable service.
pub struct MockBackend {
    script: Mutex<VecDeque<ScriptedStep>>,
    calls: Mutex<Vec<String>>,
    models: Vec<String>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            models: vec![],
        }
    }

    /// Queue a raw reply document.
    pub fn then_reply(self, reply: Value) -> Self {
        self.push(None, Ok(reply))
    }

    /// Queue a candidate reply whose text is `text`.
    pub fn then_text(self, text: &str) -> Self {
        self.push(None, Ok(candidate_reply(text)))
    }

    /// Queue a raw reply delivered after `delay`.
    pub fn then_reply_after(self, delay: Duration, reply: Value) -> Self {
        self.push(Some(delay), Ok(reply))
    }

    /// Queue a transport failure.
    pub fn then_fail(self, error: BackendError) -> Self {
        self.push(None, Err(error))
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Model ids passed to `generate`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn push(self, delay: Option<Duration>, reply: Result<Value, BackendError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(ScriptedStep { delay, reply });
        }
        self
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate(&self, model: &str, _prompt: &str) -> Result<Value, BackendError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(model.to_string());
        }
        let step = self.script.lock().ok().and_then(|mut s| s.pop_front());

        match step {
            Some(step) => {
                if let Some(delay) = step.delay {
                    tokio::time::sleep(delay).await;
                }
                step.reply
            }
            None => Err(BackendError::Network("connection refused".to_string())),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.models.clone())
    }
}
