//! Language-model seam.
//!
//! The [`Extractor`](crate::Extractor) talks to a model only through the
//! [`LanguageModel`] trait, so tests can substitute a canned model.
//! [`GroqClient`] is the production implementation against any
//! OpenAI-compatible chat-completions endpoint.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProviderErrorKind;
use crate::{Result, TabexError};

/// Default OpenAI-compatible endpoint.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), messages: Vec::new(), temperature: None }
    }

    /// Add a message to the conversation.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// "system", "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// A model answer plus the metadata channels that may carry token usage.
///
/// Each channel is optional and free-form; see [`resolve_usage`](crate::resolve_usage).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Completion text.
    pub content: String,
    /// Provider response envelope, minus the choices.
    pub response_metadata: Option<Value>,
    /// Normalized usage block, when the client provides one.
    pub usage_metadata: Option<Value>,
    /// Legacy per-generation output metadata.
    pub llm_output: Option<Value>,
    /// Provider-specific extras.
    pub additional_kwargs: Option<Value>,
}

impl ModelResponse {
    /// Splits a raw chat-completions body into content and metadata channels.
    ///
    /// Fails with [`ProviderErrorKind::EmptyResponse`] when the body has no
    /// first choice with string content.
    pub fn from_raw(raw: Value) -> Result<Self> {
        let Value::Object(mut envelope) = raw else {
            return Err(TabexError::provider(ProviderErrorKind::EmptyResponse, "response body is not a JSON object"));
        };

        let content = envelope
            .remove("choices")
            .and_then(|choices| first_message_content(&choices))
            .ok_or_else(|| TabexError::provider(ProviderErrorKind::EmptyResponse, "no completion in response"))?;
        let additional_kwargs = envelope.get("x_groq").cloned();

        Ok(Self {
            content,
            response_metadata: Some(Value::Object(envelope)),
            usage_metadata: None,
            llm_output: None,
            additional_kwargs,
        })
    }
}

fn first_message_content(choices: &Value) -> Option<String> {
    choices.get(0)?.get("message")?.get("content")?.as_str().map(str::to_string)
}

/// A chat model that turns a request into a single response.
///
/// Implementations make exactly one provider call per invocation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, request: &ChatRequest) -> Result<ModelResponse>;
}

/// Client for Groq's OpenAI-compatible chat-completions API.
#[derive(Clone)]
pub struct GroqClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { http_client: Client::new(), api_key: api_key.into(), base_url: GROQ_BASE_URL.to_string() }
    }

    /// Set a custom base URL (proxies, other compatible providers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LanguageModel for GroqClient {
    async fn invoke(&self, request: &ChatRequest) -> Result<ModelResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Model request failed");
                TabexError::provider(ProviderErrorKind::Network, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Model API error");
            return Err(TabexError::provider(status_kind(status), format!("HTTP {}: {}", status.as_u16(), error_text)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TabexError::provider(ProviderErrorKind::Api, format!("unreadable response body: {}", e)))?;

        debug!(model = %request.model, duration_ms = start.elapsed().as_millis(), "Chat completion");

        ModelResponse::from_raw(body)
    }
}

fn status_kind(status: StatusCode) -> ProviderErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorKind::Auth,
        StatusCode::TOO_MANY_REQUESTS => ProviderErrorKind::RateLimit,
        _ => ProviderErrorKind::Api,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest::new("llama-3.1-8b-instant")
            .message(Message::system("rules"))
            .message(Message::user("content"))
            .temperature(0.1);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "content");
        assert!(body.get("temperature").is_some());
    }

    #[test]
    fn test_temperature_omitted_when_unset() {
        let body = serde_json::to_value(ChatRequest::new("m")).unwrap();
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_from_raw_splits_channels() {
        let raw = json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"columns\":[]}"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7},
            "x_groq": {"id": "req_1"}
        });

        let response = ModelResponse::from_raw(raw).unwrap();
        assert_eq!(response.content, "{\"columns\":[]}");

        let metadata = response.response_metadata.unwrap();
        assert!(metadata.get("choices").is_none());
        assert_eq!(metadata["usage"]["total_tokens"], 7);
        assert_eq!(response.additional_kwargs.unwrap()["id"], "req_1");
    }

    #[rstest]
    #[case(json!({"choices": []}))]
    #[case(json!({"choices": [{"message": {"content": null}}]}))]
    #[case(json!({"usage": {}}))]
    #[case(json!("text"))]
    fn test_from_raw_without_completion(#[case] raw: Value) {
        match ModelResponse::from_raw(raw) {
            Err(TabexError::Provider { kind, .. }) => assert_eq!(kind, ProviderErrorKind::EmptyResponse),
            other => panic!("expected empty response error, got {:?}", other),
        }
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, ProviderErrorKind::Auth)]
    #[case(StatusCode::FORBIDDEN, ProviderErrorKind::Auth)]
    #[case(StatusCode::TOO_MANY_REQUESTS, ProviderErrorKind::RateLimit)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, ProviderErrorKind::Api)]
    fn test_status_kind(#[case] status: StatusCode, #[case] expected: ProviderErrorKind) {
        assert_eq!(status_kind(status), expected);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = GroqClient::new("key").with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
    }
}
