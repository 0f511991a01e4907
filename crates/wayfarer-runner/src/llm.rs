//! Oracle HTTP backends.
//!
//! Enum dispatch over the two supported wire formats: `OpenAI`-compatible
//! chat completions and the Anthropic Messages API. Both go over HTTP via
//! `reqwest`. The credential is passed per call because the
//! [`OracleClient`](crate::oracle::OracleClient) owns rotation.
//!
//! The runner does not care which model is behind the API. It sends a
//! prompt and expects text containing a JSON object back.

use reqwest::StatusCode;
use wayfarer_core::RenderedPrompt;

use crate::config::{BackendType, OracleConfig};
use crate::error::OracleError;

/// Token budget of a single decision. Replies are one small JSON object.
const MAX_TOKENS: u32 = 256;

/// An oracle backend that turns a prompt into response text.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(HttpBackend),
    /// Anthropic Messages API.
    Anthropic(HttpBackend),
}

/// Shared HTTP plumbing of both backends.
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

impl HttpBackend {
    fn new(config: &OracleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
        }
    }
}

impl LlmBackend {
    /// Send a prompt with the given credential and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::RateLimited`] on HTTP 429 and another
    /// [`OracleError`] for every other failure.
    pub async fn complete(&self, prompt: &RenderedPrompt, api_key: &str) -> Result<String, OracleError> {
        match self {
            Self::OpenAi(http) => {
                let body = serde_json::json!({
                    "model": http.model,
                    "messages": [
                        {"role": "system", "content": prompt.system},
                        {"role": "user", "content": prompt.user}
                    ],
                    "temperature": 0.7,
                    "max_tokens": MAX_TOKENS,
                    "response_format": {"type": "json_object"}
                });
                let request = http
                    .client
                    .post(format!("{}/chat/completions", http.api_url))
                    .header("Authorization", format!("Bearer {api_key}"))
                    .json(&body);
                let json = send(request).await?;
                extract_openai_content(&json)
            }
            Self::Anthropic(http) => {
                let body = serde_json::json!({
                    "model": http.model,
                    "max_tokens": MAX_TOKENS,
                    "system": prompt.system,
                    "messages": [
                        {"role": "user", "content": prompt.user}
                    ]
                });
                let request = http
                    .client
                    .post(format!("{}/messages", http.api_url))
                    .header("x-api-key", api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&body);
                let json = send(request).await?;
                extract_anthropic_content(&json)
            }
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

/// Send a request and decode the JSON body of a successful response.
async fn send(request: reqwest::RequestBuilder) -> Result<serde_json::Value, OracleError> {
    let response = request
        .send()
        .await
        .map_err(|e| OracleError::Network(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(OracleError::RateLimited);
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(OracleError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| OracleError::Decode(format!("response body is not JSON: {e}")))
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, OracleError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| OracleError::Decode("missing choices[0].message.content".to_owned()))
}

/// Extract the text content from an Anthropic Messages API response. The
/// first `text` block wins.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, OracleError> {
    json.get("content")
        .and_then(serde_json::Value::as_array)
        .and_then(|blocks| {
            blocks
                .iter()
                .find_map(|b| b.get("text").and_then(serde_json::Value::as_str))
        })
        .map(ToOwned::to_owned)
        .ok_or_else(|| OracleError::Decode("missing text content block".to_owned()))
}

/// Create an oracle backend from configuration.
pub fn create_backend(config: &OracleConfig) -> LlmBackend {
    let http = HttpBackend::new(config);
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(http),
        BackendType::Anthropic => LlmBackend::Anthropic(http),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": {
                    "content": "{\"action\": \"chat\", \"target_id\": \"Bob\"}"
                }
            }]
        });
        let result = extract_openai_content(&json);
        assert!(result.unwrap_or_default().contains("Bob"));
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(matches!(
            extract_openai_content(&json),
            Err(OracleError::Decode(_))
        ));
    }

    #[test]
    fn extract_anthropic_content_skips_non_text_blocks() {
        let json = serde_json::json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "{\"action\": \"follow\"}"}
            ]
        });
        let result = extract_anthropic_content(&json);
        assert!(result.unwrap_or_default().contains("follow"));
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let mut config = OracleConfig {
            backend_type: BackendType::OpenAi,
            api_url: "https://api.openai.com/v1/".to_owned(),
            api_key: "test".to_owned(),
            secondary_api_key: None,
            model: "test-model".to_owned(),
        };
        let backend = create_backend(&config);
        assert_eq!(backend.name(), "openai-compatible");
        assert!(matches!(&backend, LlmBackend::OpenAi(http) if http.api_url == "https://api.openai.com/v1"));

        config.backend_type = BackendType::Anthropic;
        assert_eq!(create_backend(&config).name(), "anthropic");
    }
}
