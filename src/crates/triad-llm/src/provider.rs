//! A minimal generic HTTP-backed [`ChatModel`].
//!
//! This is plumbing, not a vendor integration: it speaks a simple
//! OpenAI-compatible `{"model", "messages"}` JSON body, which Ollama,
//! LM Studio, OpenRouter, and most self-hosted gateways already accept.
//! Teams that need a specific vendor's native API (distinct system-prompt
//! handling, tool-call formats, etc.) should implement [`ChatModel`]
//! directly the way this module does, rather than extending it.

use crate::chat::{ChatModel, ChatRequest, ChatResponse, Message, MessageRole, Usage};
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_timeout() -> Duration {
    Duration::from_millis(5_000)
}

/// Configuration for [`HttpChatModel`].
#[derive(Debug, Clone)]
pub struct HttpChatModelConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl HttpChatModelConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            model: model.into(),
            timeout: default_timeout(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A [`ChatModel`] that POSTs an OpenAI-compatible chat completion body and
/// reads back the first choice.
pub struct HttpChatModel {
    config: HttpChatModelConfig,
    client: Client,
}

impl HttpChatModel {
    pub fn new(config: HttpChatModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for WireMessage {
    fn from(m: &Message) -> Self {
        let role = match m.role {
            MessageRole::System => "system",
            MessageRole::Human => "user",
            MessageRole::Assistant => "assistant",
        };
        WireMessage {
            role,
            content: m.content.clone(),
        }
    }
}

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        if request.messages.is_empty() {
            return Err(LlmError::Validation("messages must not be empty".into()));
        }

        let body = WireRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Transport(format!("timed out: {e}"))
            } else {
                LlmError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited(format!(
                "provider returned {status}"
            )));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(LlmError::Auth(format!("provider returned {status}")));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Provider {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: WireResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Provider {
                status: status.as_u16(),
                message: format!("malformed response body: {e}"),
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Provider {
                status: status.as_u16(),
                message: "response had no choices".into(),
            })?;

        Ok(ChatResponse {
            message: Message::assistant(choice.message.content),
            usage: parsed.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = HttpChatModelConfig::new("http://localhost:11434/v1", "llama3")
            .with_api_key("secret")
            .with_timeout(Duration::from_secs(2));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_rejects_empty_messages() {
        let config = HttpChatModelConfig::new("http://localhost:1234/v1", "test-model");
        let model = HttpChatModel::new(config).unwrap();
        let result = model.chat(ChatRequest::new(vec![])).await;
        assert!(matches!(result, Err(LlmError::Validation(_))));
    }
}
