//! flowgraph-core: a small state-graph execution engine for agent workflows.
//!
//! Workflows are finite graphs of async nodes over a shared JSON state.
//! Nodes return partial updates; channels declare how updates merge
//! (replace or append). Conditional edges route on the state, and every
//! invocation is capped by a step limit so cyclic graphs always terminate.
//!
//! The crate also carries the shared seams the rest of the workspace builds
//! on: the [`ChatModel`] trait for language-model providers, [`Message`]
//! types for conversations, and the [`Store`] trait for session state.

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod llm;
pub mod messages;
pub mod store;

pub use builder::{Reducer, StateGraph};
pub use compiled::{CompiledGraph, DEFAULT_MAX_STEPS};
pub use error::{GraphError, Result};
pub use graph::{Edge, Graph, NodeSpec, END, START};
pub use llm::{ChatModel, ChatRequest, ChatResponse, ToolCall, ToolDefinition};
pub use messages::{add_messages, Message, Role};
pub use store::{InMemoryStore, Store};
