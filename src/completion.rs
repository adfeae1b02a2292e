//! External text-completion service used by the support chatbot.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::CompletionConfig;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion service returned {0}")]
    Status(u16),
    #[error("completion service returned no choices")]
    Empty,
    #[error("completion service is not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, CompletionError>;
}

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct OpenAiCompletion {
    client: Client,
    config: CompletionConfig,
}

impl OpenAiCompletion {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReply,
}

#[derive(Deserialize)]
struct WireReply {
    content: Option<String>,
}

#[async_trait]
impl TextCompletion for OpenAiCompletion {
    async fn complete(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CompletionError::NotConfigured)?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage {
            role: "system",
            content: system,
        });
        for turn in history {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(WireMessage {
                role,
                content: &turn.content,
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: message,
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&WireRequest {
                model: &self.config.model,
                messages,
                max_tokens: 500,
                temperature: 0.4,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CompletionError::Status(response.status().as_u16()));
        }

        let body: WireResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::Empty)
    }
}
