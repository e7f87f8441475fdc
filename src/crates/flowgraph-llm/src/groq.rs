//! Groq chat-completions client.
//!
//! Groq exposes an OpenAI-compatible endpoint, so this client reuses the
//! OpenAI wire protocol with Groq's base URL and `GROQ_API_KEY`.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use flowgraph_core::error::Result as GraphResult;
use flowgraph_core::{ChatModel, ChatRequest, ChatResponse};

use crate::config::RemoteLlmConfig;
use crate::error::LlmError;
use crate::openai::OpenAiClient;
use crate::rate_limit::RateLimiter;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq API client.
#[derive(Clone)]
pub struct GroqClient {
    config: RemoteLlmConfig,
    client: Client,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl GroqClient {
    /// Create a client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> crate::error::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::Http)?;
        Ok(Self {
            config,
            client,
            rate_limiter: None,
        })
    }

    /// Read `GROQ_API_KEY` and build a client for the given model.
    pub fn from_env(model: impl Into<String>) -> crate::error::Result<Self> {
        let config = RemoteLlmConfig::from_env("GROQ_API_KEY", GROQ_BASE_URL, model)?;
        Self::new(config)
    }

    /// Gate provider calls through `limiter`.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }
        let response = OpenAiClient::chat_completions(&self.client, &self.config, &request).await?;
        Ok(response)
    }
}
