//! AI generation provider client.
//!
//! The provider is an opaque HTTP API returning `{ content, usage }`.
//! Failures surface as recoverable errors; nothing here panics on a
//! provider outage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use reachout_core::AiProviderConfig;

use crate::services::AiError;

#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TokenUsage {
    pub tokens: i32,
    #[serde(default)]
    pub prompt_tokens: Option<i32>,
    #[serde(default)]
    pub completion_tokens: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationReply {
    pub content: String,
    pub usage: TokenUsage,
    #[serde(default)]
    pub model: Option<String>,
}

#[async_trait]
pub trait AiClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationReply, AiError>;
}

/// reqwest-backed client against the configured provider endpoint.
pub struct HttpAiClient {
    http_client: reqwest::Client,
    config: AiProviderConfig,
}

impl HttpAiClient {
    pub fn new(config: AiProviderConfig) -> Result<Self, AiError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent("Reachout/0.1")
            .build()
            .map_err(|e| AiError::Provider {
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

#[async_trait]
impl AiClient for HttpAiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationReply, AiError> {
        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Provider {
                message: format!("provider returned {status}: {body}"),
            });
        }

        Ok(response.json().await?)
    }
}

/// Canned-reply client for tests and offline development.
pub struct StaticAiClient {
    pub reply: GenerationReply,
}

impl StaticAiClient {
    pub fn with_content(content: &str) -> Self {
        Self {
            reply: GenerationReply {
                content: content.to_string(),
                usage: TokenUsage {
                    tokens: 42,
                    prompt_tokens: Some(30),
                    completion_tokens: Some(12),
                },
                model: Some("static-test".to_string()),
            },
        }
    }
}

#[async_trait]
impl AiClient for StaticAiClient {
    async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationReply, AiError> {
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_reply_deserializes_with_and_without_detail() {
        let reply: GenerationReply = serde_json::from_str(
            r#"{"content":"draft text","usage":{"tokens":128}}"#,
        )
        .unwrap();
        assert_eq!(reply.content, "draft text");
        assert_eq!(reply.usage.tokens, 128);
        assert!(reply.usage.prompt_tokens.is_none());

        let reply: GenerationReply = serde_json::from_str(
            r#"{"content":"x","usage":{"tokens":10,"prompt_tokens":7,"completion_tokens":3},"model":"gpt-4o-mini"}"#,
        )
        .unwrap();
        assert_eq!(reply.usage.completion_tokens, Some(3));
        assert_eq!(reply.model.as_deref(), Some("gpt-4o-mini"));
    }
}
