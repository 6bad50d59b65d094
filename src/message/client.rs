//! Text-generation endpoint access.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::MessageError;

/// Trait for requesting a completion from a language model.
///
/// This abstraction allows mocking the endpoint in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one system instruction and one user prompt, returning the reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, MessageError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Chat-completions client over HTTP with bearer authorization.
///
/// Built even when endpoint settings are missing; every call then fails
/// with [`MessageError::NotConfigured`].
pub struct HttpCompletionClient {
    http: Client,
    url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

impl HttpCompletionClient {
    pub fn new(config: &Config) -> Result<Self, MessageError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MessageError::Request)?;

        Ok(Self {
            http,
            url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, MessageError> {
        let url = self
            .url
            .as_deref()
            .ok_or(MessageError::NotConfigured("BACKFILL_API_URL"))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MessageError::NotConfigured("BACKFILL_API_KEY"))?;
        let model = self
            .model
            .as_deref()
            .ok_or(MessageError::NotConfigured("BACKFILL_MODEL"))?;

        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        debug!("Requesting commit message from {} ({} prompt chars)", url, prompt.len());

        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(MessageError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable>".to_string());
            return Err(MessageError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(MessageError::Request)?;
        parse_reply(&text)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response body.
fn parse_reply(body: &str) -> Result<String, MessageError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| MessageError::MalformedResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| MessageError::MalformedResponse("no choices[0].message.content".to_string()))
}
