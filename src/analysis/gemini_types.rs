//! Wire types for the generative-language `generateContent` API, plus the
//! validators applied before any HTTP call is made.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::BackendError;

/// MIME type requested for structured (JSON) output.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Request body for POST `/v1beta/models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<ContentMessage>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Single user turn carrying `prompt`, asking for a JSON reply.
    pub fn json_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![ContentMessage {
                role: "user".to_string(),
                parts: vec![ContentPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentMessage {
    pub role: String,
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
}

/// Raw response from GET `/v1beta/models`.
#[derive(Debug, Deserialize)]
pub(crate) struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelEntry {
    pub name: String,
}

/// Strip the `models/` resource prefix the list endpoint puts on names.
pub fn short_model_name(full_name: &str) -> &str {
    full_name.strip_prefix("models/").unwrap_or(full_name)
}

static MODEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").expect("static regex")
});

/// Validate a model identifier before it is interpolated into a URL path.
///
/// Model ids are path segments, so anything beyond alphanumerics, `.`, `_`
/// and `-` (slashes, colons, query characters) is rejected.
pub fn validate_model_name(name: &str) -> Result<(), BackendError> {
    if MODEL_NAME.is_match(name) {
        Ok(())
    } else {
        Err(BackendError::InvalidModelName(name.to_string()))
    }
}

/// Validate the API base URL.
///
/// The credential travels in a header, so plain `http://` is only accepted
/// for loopback hosts (local proxies, test servers). Everything else must
/// use `https://`.
pub fn validate_base_url(url: &str) -> Result<(), BackendError> {
    if let Some(rest) = url.strip_prefix("https://") {
        return if host_of(rest).is_empty() {
            Err(BackendError::InvalidUrl(url.to_string()))
        } else {
            Ok(())
        };
    }

    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| BackendError::InvalidUrl(url.to_string()))?;

    match host_of(rest) {
        "localhost" | "127.0.0.1" | "::1" => Ok(()),
        _ => Err(BackendError::InvalidUrl(url.to_string())),
    }
}

fn host_of(after_scheme: &str) -> &str {
    if let Some(bracketed) = after_scheme.strip_prefix('[') {
        return bracketed.split(']').next().unwrap_or("");
    }
    after_scheme
        .split(['/', ':'])
        .next()
        .unwrap_or("")
}
