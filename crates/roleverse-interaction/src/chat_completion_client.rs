//! ChatCompletionClient - REST client for OpenAI-compatible chat completion APIs.
//!
//! Defaults target DeepSeek (`deepseek-chat`), but any endpoint speaking the
//! OpenAI chat-completions dialect works.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use roleverse_core::config::ModelSettings;
use roleverse_core::error::{Result as CoreResult, RoleverseError};
use roleverse_core::narrative::{ChatMessage, ModelError, NarrativeModel};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Narrative model backed by an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct ChatCompletionClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl ChatCompletionClient {
    /// Creates a client from the `[model]` settings.
    pub fn new(api_key: impl Into<String>, settings: &ModelSettings) -> CoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RoleverseError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: settings.base_url.clone(),
            model: settings.model_name.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &ChatCompletionRequest<'_>) -> Result<String, ModelError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ModelError::Malformed(format!("Failed to parse response: {err}")))?;

        extract_text_response(parsed)
    }
}

impl std::fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NarrativeModel for ChatCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, ModelError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            "[ChatCompletionClient] Sending {} message(s) to {} (temperature {})",
            messages.len(),
            self.model,
            temperature
        );

        let result = self.send_request(&request).await;
        if let Err(e) = &result {
            tracing::warn!("[ChatCompletionClient] Request failed: {}", e);
        }
        result
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: &message.content,
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, ModelError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ModelError::Malformed("API returned no content in the response".into()))
}

fn map_http_error(status: StatusCode, body: String) -> ModelError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    ModelError::Service {
        status: Some(status.as_u16()),
        message,
    }
}

fn map_transport_error(err: reqwest::Error) -> ModelError {
    if err.is_timeout() {
        ModelError::Timeout
    } else {
        ModelError::Service {
            status: None,
            message: format!("Request failed: {err}"),
        }
    }
}
