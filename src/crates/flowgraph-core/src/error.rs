//! Error types for graph construction, validation, and execution.
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.
//! Validation errors come from `StateGraph::compile`; execution errors are
//! produced while a compiled graph is running.

use thiserror::Error;

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur during graph construction or execution.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph structure is invalid (missing node, dangling edge, ...).
    #[error("graph validation failed: {0}")]
    Validation(String),

    /// A node's executor returned an error. The run is aborted; there is no
    /// recovery at this layer.
    #[error("node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the failing node.
        node: String,
        /// The underlying error message.
        error: String,
    },

    /// General execution error (step limit exceeded, unroutable state, ...).
    #[error("execution failed: {0}")]
    Execution(String),

    /// State could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A session/state store operation failed.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error raised before any node executes.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GraphError {
    /// Wrap an arbitrary error as a node execution failure.
    pub fn in_node(node: impl Into<String>, error: impl std::fmt::Display) -> Self {
        GraphError::NodeExecution {
            node: node.into(),
            error: error.to_string(),
        }
    }
}
