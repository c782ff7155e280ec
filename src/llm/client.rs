//! Chat-completions client for hosted, OpenAI-compatible chat models.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while requesting a chat completion.
#[derive(Debug, Error)]
pub enum ChatModelError {
    /// Provider could not be reached or rejected the credentials.
    #[error("Chat model unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate reply: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or carried no reply.
    #[error("Malformed chat model response: {0}")]
    InvalidResponse(String),
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Standing instructions.
    System,
    /// Caller turn.
    User,
    /// Model turn.
    Assistant,
}

/// One message in a chat exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System instruction message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Interface implemented by chat model backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the assistant reply for the given message sequence.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatModelError>;
}

/// OpenAI-compatible `POST {base}/chat/completions` client.
pub struct ChatCompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatCompletionClient {
    /// Build a client from the chat model settings in `config`.
    pub fn new(config: &Config) -> Result<Self, ChatModelError> {
        let http = Client::builder()
            .user_agent("ragchat/chat")
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|error| ChatModelError::ProviderUnavailable(error.to_string()))?;
        tracing::info!(
            model = %config.llm_model,
            base_url = %config.llm_base_url,
            temperature = config.llm_temperature,
            "Initializing chat model client"
        );
        Ok(Self {
            http,
            base_url: config.llm_base_url.clone(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for ChatCompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatModelError> {
        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
        });
        tracing::debug!(model = %self.model, messages = messages.len(), "Requesting chat completion");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ChatModelError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(ChatModelError::ProviderUnavailable(format!(
                "chat endpoint rejected credentials ({})",
                response.status()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatModelError::GenerationFailed(format!(
                "chat endpoint returned {status}: {body}"
            )));
        }

        let body: CompletionResponse = response.json().await.map_err(|error| {
            ChatModelError::InvalidResponse(format!("failed to decode completion: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ChatModelError::InvalidResponse("completion carried no choices".into()))
    }
}
