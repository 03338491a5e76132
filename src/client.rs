//! HTTP client for the inference server's OpenAI-compatible API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::ApiError;
use crate::models::{models_from_value, ModelDescriptor};
use crate::state::ChatMessage;

/// Client for an LM Studio style server. One instance per base URL; every
/// call is a single attempt with no retries.
#[derive(Clone)]
pub struct LmStudioClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

/// OpenAI-compatible chat completion request.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<RequestMessage>,
    temperature: f64,
    max_tokens: i32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Fixed generation parameters: the server-side model decides output length
/// (-1 means unrestricted in LM Studio), and streaming is never requested.
fn build_chat_body(history: &[ChatMessage], new_content: &str, model: &str) -> ChatCompletionRequest {
    let mut messages: Vec<RequestMessage> = history
        .iter()
        .map(|msg| RequestMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        })
        .collect();
    messages.push(RequestMessage {
        role: "user".to_string(),
        content: new_content.to_string(),
    });
    ChatCompletionRequest {
        model: model.to_string(),
        messages,
        temperature: 0.7,
        max_tokens: -1,
        stream: false,
    }
}

impl LmStudioClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: None,
        }
    }

    /// Deadline applied to every request from this client. An expired
    /// deadline aborts the transport and surfaces as [`ApiError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one chat turn and return the assistant's reply.
    ///
    /// `history` is the prior conversation in order; `new_content` is the
    /// user's fresh input. The caller appends the returned message to its own
    /// state only on success, so a failed send never discards what the user
    /// typed.
    pub async fn send_chat(
        &self,
        history: &[ChatMessage],
        new_content: &str,
        model: &str,
    ) -> Result<ChatMessage, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = build_chat_body(history, new_content, model);
        debug!("Sending chat request to {} with model {}", url, model);

        let mut request = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        debug!("Chat response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse =
            response.json().await.map_err(ApiError::from_reqwest)?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| ChatMessage::assistant(choice.message.content))
            .ok_or(ApiError::MalformedResponse)
    }

    /// List the models the server currently has available.
    ///
    /// `timeout` overrides the client-level deadline for this call; the
    /// diagnostics runner uses a short one so a dead server cannot stall the
    /// probe battery.
    pub async fn list_models(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Vec<ModelDescriptor>, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        debug!("Fetching models from {}", url);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(timeout) = timeout.or(self.timeout) {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        debug!("Models response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await.map_err(ApiError::from_reqwest)?;
        Ok(models_from_value(&value))
    }
}
