//! Error types for LLM provider implementations.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when talking to a language-model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to serialize or deserialize provider payloads.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// API authentication failed (HTTP 401).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// API key not found in the environment. Fatal at startup.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Rate limit exceeded (HTTP 429).
    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The provider returned a payload we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// General provider error.
    #[error("provider error: {0}")]
    Provider(String),
}

impl LlmError {
    /// Whether retrying the request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Http(_) | LlmError::RateLimitExceeded(_)
        )
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}

/// Provider errors surface inside graph nodes as execution failures.
impl From<LlmError> for flowgraph_core::GraphError {
    fn from(err: LlmError) -> Self {
        flowgraph_core::GraphError::Execution(err.to_string())
    }
}
