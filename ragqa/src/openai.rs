//! OpenAI chat-completion model using the OpenAI REST API.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::llm::{ChatMessage, ChatModel, ChatRequest};

/// The default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// The default chat model.
pub const GPT_35_TURBO: &str = "gpt-3.5-turbo";

const PROVIDER: &str = "OpenAI";

/// A [`ChatModel`] backed by the OpenAI `/chat/completions` endpoint.
///
/// Uses `reqwest` to call the endpoint directly. No retries are attempted and
/// no timeout is set beyond the HTTP client's defaults.
///
/// # Configuration
///
/// - `model`: defaults to `gpt-3.5-turbo`.
/// - `base_url`: defaults to `https://api.openai.com/v1`; any
///   OpenAI-compatible server works.
/// - `api_key`: from the constructor or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use ragqa::{ChatModel, ChatRequest, OpenAIChatModel};
///
/// let model = OpenAIChatModel::new("sk-...")?;
/// let answer = model.complete(ChatRequest::from_prompt("Hi").with_temperature(0.0)).await?;
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAIChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIChatModel")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAIChatModel {
    /// Create a new model client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the key is empty or blank; no
    /// request is ever sent without a key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("OpenAI API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: GPT_35_TURBO.into(),
            base_url: OPENAI_BASE_URL.into(),
        })
    }

    /// Create a new model client using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::ConfigError("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `gpt-4o-mini`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another OpenAI-compatible base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn model_error(message: impl Into<String>) -> RagError {
    RagError::ModelError { provider: PROVIDER.into(), message: message.into() }
}

/// Extract the assistant text from a successful response body.
fn parse_completion(body: &str) -> Result<String> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| model_error(format!("failed to parse response: {e}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| model_error("API returned no completion choices"))
}

/// Best-effort human readable detail from an error body.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

// ── ChatModel implementation ───────────────────────────────────────

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            message_count = request.messages.len(),
            temperature = ?request.temperature,
            "sending chat completion"
        );

        let body = CompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                model_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to read response body");
            model_error(format!("failed to read response: {e}"))
        })?;

        if !status.is_success() {
            error!(provider = PROVIDER, %status, "API error");
            return Err(model_error(format!("API returned {status}: {}", error_detail(text))));
        }

        parse_completion(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected_before_any_request() {
        let err = OpenAIChatModel::new("  ").unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn builds_endpoint_from_base_url() {
        let model = OpenAIChatModel::new("sk-test").unwrap().with_base_url("http://localhost:8080/v1/");
        assert_eq!(model.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(model.name(), GPT_35_TURBO);
    }

    #[test]
    fn debug_output_hides_the_key() {
        let model = OpenAIChatModel::new("sk-secret").unwrap();
        assert!(!format!("{model:?}").contains("sk-secret"));
    }

    #[test]
    fn serializes_request_body() {
        let messages = vec![ChatMessage::user("What is the invoice total?")];
        let body =
            CompletionRequest { model: GPT_35_TURBO, messages: &messages, temperature: Some(0.0) };

        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "What is the invoice total?");
    }

    #[test]
    fn parses_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"$450"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "$450");
    }

    #[test]
    fn empty_choices_are_an_error() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, RagError::ModelError { .. }));
    }

    #[test]
    fn error_detail_prefers_api_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_detail(body.to_string()), "Incorrect API key provided");
        assert_eq!(error_detail("gateway timeout".to_string()), "gateway timeout");
    }
}
