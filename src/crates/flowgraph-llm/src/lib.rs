//! flowgraph-llm: provider clients and embeddings.
//!
//! Implements the [`ChatModel`](flowgraph_core::ChatModel) trait for remote
//! OpenAI-compatible providers (OpenAI, Groq), plus text embeddings and a
//! sliding-window rate limiter for call budgeting.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod groq;
pub mod openai;
pub mod rate_limit;

pub use config::RemoteLlmConfig;
pub use embeddings::{Embeddings, HashEmbeddings, OpenAiEmbeddings};
pub use error::{LlmError, Result};
pub use groq::GroqClient;
pub use openai::OpenAiClient;
pub use rate_limit::RateLimiter;
