//! OpenAI chat-completions client.
//!
//! Speaks the `/chat/completions` wire protocol, including tool calling.
//! The wire types are shared with [`GroqClient`](crate::GroqClient), which
//! uses the same protocol at a different base URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use flowgraph_core::error::Result as GraphResult;
use flowgraph_core::{ChatModel, ChatRequest, ChatResponse, Message, Role, ToolCall};

use crate::config::RemoteLlmConfig;
use crate::error::LlmError;
use crate::rate_limit::RateLimiter;

/// OpenAI API client.
///
/// Optionally gated by a [`RateLimiter`]; when set, every `chat` call awaits
/// a slot before hitting the provider.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl OpenAiClient {
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

    /// Read `OPENAI_API_KEY` and build a client for the given model.
    pub fn from_env(model: impl Into<String>) -> crate::error::Result<Self> {
        let config = RemoteLlmConfig::from_env("OPENAI_API_KEY", "https://api.openai.com/v1", model)?;
        Self::new(config)
    }

    /// Gate provider calls through `limiter`. A shared `Arc` lets several
    /// clients draw from one call budget.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }
    }

    pub(crate) async fn chat_completions(
        client: &Client,
        config: &RemoteLlmConfig,
        request: &ChatRequest,
    ) -> crate::error::Result<ChatResponse> {
        let url = format!("{}/chat/completions", config.base_url);

        let body = WireRequest {
            model: config.model.clone(),
            messages: request.messages.iter().map(wire_message).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(
                    request
                        .tools
                        .iter()
                        .map(|t| WireTool {
                            kind: "function".to_string(),
                            function: WireFunction {
                                name: t.name.clone(),
                                description: t.description.clone(),
                                parameters: t.parameters.clone(),
                            },
                        })
                        .collect(),
                )
            },
        };

        let response = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::Authentication(error_text),
                429 => LlmError::RateLimitExceeded(error_text),
                _ => LlmError::Provider(format!("API error {status}: {error_text}")),
            });
        }

        let wire: WireResponse = response.json().await.map_err(LlmError::Http)?;
        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                // Providers send arguments as a JSON-encoded string.
                let arguments: Value = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::Object(Default::default()));
                ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments,
                }
            })
            .collect();

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        self.throttle().await;
        let response = Self::chat_completions(&self.client, &self.config, &request).await?;
        Ok(response)
    }
}

fn wire_message(msg: &Message) -> WireMessage {
    WireMessage {
        role: match msg.role {
            Role::System => "system",
            Role::Human => "user",
            Role::Ai => "assistant",
            Role::Tool => "tool",
        }
        .to_string(),
        content: Some(msg.content.clone()),
        tool_call_id: msg.tool_call_id.clone(),
        tool_calls: if msg.tool_calls.is_empty() {
            None
        } else {
            Some(
                msg.tool_calls
                    .iter()
                    .map(|tc| WireToolCall {
                        id: tc.id.clone(),
                        kind: "function".to_string(),
                        function: WireFunctionCall {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect(),
            )
        },
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}
