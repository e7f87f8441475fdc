//! Error types for the retrieval pipeline.

use thiserror::Error;

/// Result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors from chunking, storage, retrieval, or generation.
#[derive(Debug, Error)]
pub enum RagError {
    /// Embedding provider failure.
    #[error("embedding failed: {0}")]
    Embedding(#[from] flowgraph_llm::LlmError),

    /// Generation failure from the chat model.
    #[error("generation failed: {0}")]
    Generation(#[from] flowgraph_core::GraphError),

    /// Persistence failure (collection save/load).
    #[error("persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    /// Collection file could not be parsed.
    #[error("corrupt collection data: {0}")]
    CorruptData(#[from] serde_json::Error),

    /// Caller-supplied input rejected before any external call.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
