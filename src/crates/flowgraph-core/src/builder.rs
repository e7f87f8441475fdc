//! Fluent builder for state graphs.
//!
//! `StateGraph` mirrors the builder surface most agent-workflow libraries
//! expose: add nodes as async closures, wire edges, declare append channels,
//! then `compile()` into an executable [`CompiledGraph`].
//!
//! ```no_run
//! use flowgraph_core::{StateGraph, START, END};
//! use serde_json::json;
//!
//! # async fn demo() -> flowgraph_core::Result<()> {
//! let graph = StateGraph::new()
//!     .add_node("echo", |state| async move { Ok(state) })
//!     .add_edge(START, "echo")
//!     .add_edge("echo", END)
//!     .compile()?;
//! let out = graph.invoke(json!({"input": "hi"})).await?;
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::compiled::{CompiledGraph, DEFAULT_MAX_STEPS};
use crate::error::{GraphError, Result};
use crate::graph::{Graph, NodeSpec, RouterFn};

/// How a channel (top-level state key) merges a node's partial update into
/// the accumulated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducer {
    /// The update overwrites the previous value.
    #[default]
    Replace,
    /// Both values are arrays; the update is concatenated onto the end.
    Append,
}

/// Builder for a graph of async nodes over a shared JSON state.
pub struct StateGraph {
    graph: Graph,
    channels: HashMap<String, Reducer>,
    max_steps: usize,
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StateGraph {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            channels: HashMap::new(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Add a node. `executor` receives the full state and returns a partial
    /// update (a JSON object whose keys are merged per channel reducer).
    pub fn add_node<F, Fut>(mut self, id: impl Into<String>, executor: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let id = id.into();
        let spec = NodeSpec {
            name: id.clone(),
            executor: Arc::new(move |state| Box::pin(executor(state))),
        };
        self.graph.add_node(id, spec);
        self
    }

    /// Add a direct edge `from -> to`.
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.graph.add_edge(from.into(), to.into());
        self
    }

    /// Add a conditional edge: `router` inspects the state and returns a
    /// branch key, which is resolved to a target node through `branches`.
    pub fn add_conditional_edge<F>(
        mut self,
        from: impl Into<String>,
        router: F,
        branches: HashMap<String, String>,
    ) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        let router: RouterFn = Arc::new(router);
        self.graph.add_conditional_edge(from.into(), router, branches);
        self
    }

    /// Declare a state key as append-merged (list concatenation) instead of
    /// the default replace semantics.
    pub fn add_append_channel(mut self, key: impl Into<String>) -> Self {
        self.channels.insert(key.into(), Reducer::Append);
        self
    }

    /// Cap the number of node executions per invocation.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Validate the structure and produce an executable graph.
    pub fn compile(self) -> Result<CompiledGraph> {
        self.graph.validate().map_err(GraphError::Validation)?;
        Ok(CompiledGraph::new(self.graph, self.channels, self.max_steps))
    }
}
