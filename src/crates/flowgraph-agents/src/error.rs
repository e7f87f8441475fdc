//! Error types for prebuilt agents.

use thiserror::Error;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors from building or running a prebuilt agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Underlying graph construction or execution failure.
    #[error("graph error: {0}")]
    Graph(#[from] flowgraph_core::GraphError),

    /// Session history could not be loaded or saved.
    #[error("session error: {0}")]
    Session(String),

    /// The workflow finished without producing the expected output field.
    #[error("missing output: {0}")]
    MissingOutput(String),
}
