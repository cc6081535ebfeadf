//! Chat-completion client.
//!
//! [`ChatTransport`] is the seam between answer synthesis and the network.
//! [`HttpChatClient`] speaks the OpenAI-compatible `chat/completions`
//! protocol (Groq by default) and reads the reply from
//! `choices[0].message.content`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{RagError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for `POST chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Model id reported in stats.
    fn model(&self) -> &str;

    /// Send one request and return the raw assistant text.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

pub struct HttpChatClient {
    url: String,
    model: String,
    api_key: Option<String>,
    max_retries: u32,
    client: reqwest::Client,
}

impl HttpChatClient {
    /// Build a client from `[llm]`. The API key is read from the environment
    /// variable named by `api_key_env`; a missing key is logged and requests
    /// go out unauthenticated.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!(
                "{} is not set; chat requests will be sent without credentials",
                config.api_key_env
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: config.url.clone(),
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }

    async fn send_once(&self, request: &ChatRequest) -> std::result::Result<String, Attempt> {
        let mut builder = self.client.post(&self.url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Attempt::Retry(format!("chat request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let msg = format!("chat API error {}: {}", status, body);
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                Attempt::Retry(msg)
            } else {
                Attempt::Fail(msg)
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Attempt::Fail(format!("chat response decode failed: {}", e)))?;
        parse_chat_response(&json).map_err(Attempt::Fail)
    }
}

enum Attempt {
    Retry(String),
    Fail(String),
}

#[async_trait]
impl ChatTransport for HttpChatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let mut last_err = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }
            match self.send_once(request).await {
                Ok(text) => {
                    debug!("Chat completion returned {} chars", text.chars().count());
                    return Ok(text);
                }
                Err(Attempt::Fail(msg)) => return Err(RagError::Synthesis(msg)),
                Err(Attempt::Retry(msg)) => {
                    warn!("{} (attempt {})", msg, attempt + 1);
                    last_err = msg;
                }
            }
        }
        Err(RagError::Synthesis(last_err))
    }
}

/// Extract `choices[0].message.content`, surfacing an `error` object if present.
fn parse_chat_response(json: &serde_json::Value) -> std::result::Result<String, String> {
    if let Some(error) = json.get("error") {
        return Err(format!("chat API returned error: {}", error));
    }
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| "invalid chat response: missing choices[0].message.content".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_openai_shape() {
        let request = ChatRequest {
            model: "llama3-70b-8192".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: 500,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3-70b-8192");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 500);
    }

    #[test]
    fn parses_first_choice() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello"}}]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "Hello");
    }

    #[test]
    fn malformed_or_error_bodies_fail() {
        assert!(parse_chat_response(&serde_json::json!({"choices": []})).is_err());
        assert!(parse_chat_response(&serde_json::json!({"error": {"message": "bad"}})).is_err());
    }
}
