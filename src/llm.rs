use crate::config::Config;
use crate::error::ReplyError;
use crate::events::{Message, Role};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message in the completion payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for LlmMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role(),
            content: message.content().to_string(),
        }
    }
}

/// Request body for `/v1/chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<LlmMessage>,
    pub temperature: f64,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, messages: Vec<LlmMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Anything that can turn a conversation into a single reply.
///
/// The controller only sees this trait so tests can script replies and
/// latencies without a network.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: Vec<LlmMessage>) -> Result<String, ReplyError>;
}

/// Pull the reply text out of a completion response body.
///
/// Any JSON that lacks a non-empty `choices[0].message.content` string is an
/// empty reply; a body that is not JSON at all is a decode failure.
pub fn parse_completion(body: &str) -> Result<String, ReplyError> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .filter(|content| !content.is_empty())
        .map(str::to_string)
        .ok_or(ReplyError::EmptyReply)
}

/// Non-streaming client for OpenAI-compatible chat completion endpoints
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f64,
    api_key: Option<String>,
    api_key_env: String,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.get_api_key(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self, messages: Vec<LlmMessage>) -> LlmRequest {
        LlmRequest::new(self.model.clone(), messages).with_temperature(self.temperature)
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, messages: Vec<LlmMessage>) -> Result<String, ReplyError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| ReplyError::MissingApiKey {
            env: self.api_key_env.clone(),
        })?;

        let payload = self.build_request(messages);
        tracing::debug!(url = %self.url, model = %payload.model, messages = payload.messages.len(), "sending completion request");

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%status, body = %body, "completion API returned an error status");
        }

        parse_completion(&body)
    }
}
