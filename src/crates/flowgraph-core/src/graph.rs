//! Core graph data structures.
//!
//! A graph consists of **nodes** (async processing units that receive the
//! shared state and return a partial update), **edges** (direct or
//! conditional transitions), and the reserved [`START`] / [`END`] boundary
//! markers. Graphs are built through [`StateGraph`](crate::StateGraph) and
//! executed through [`CompiledGraph`](crate::CompiledGraph); this module
//! holds the underlying structure shared by both.
//!
//! ```text
//!  START ──→ generator ──→ critic ──(router)──→ { generator | finalizer }
//!                                                      finalizer ──→ END
//! ```

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;

/// Node identifier. Unique within a graph.
pub type NodeId = String;

/// Reserved identifier marking the graph entry point.
pub const START: &str = "__start__";

/// Reserved identifier marking graph termination.
pub const END: &str = "__end__";

/// Future returned by a node executor.
pub type NodeFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Async node executor: receives the current state and returns a partial
/// state update, merged by the engine according to channel reducers.
pub type NodeExecutor = Arc<dyn Fn(Value) -> NodeFuture + Send + Sync>;

/// Router function for conditional edges: a pure function of the state
/// returning a branch key, resolved through the edge's branch map.
pub type RouterFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// A node definition: name plus executor.
#[derive(Clone)]
pub struct NodeSpec {
    /// Human-readable node name, used in logs and errors.
    pub name: String,
    /// The async function executed when the node is scheduled.
    pub executor: NodeExecutor,
}

impl std::fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("executor", &"<function>")
            .finish()
    }
}

/// Edge between nodes.
#[derive(Clone)]
pub enum Edge {
    /// Unconditional transition to a single node.
    Direct(NodeId),

    /// Dynamic routing: the router inspects the state and returns a branch
    /// key which is resolved against `branches`. The branch map also serves
    /// validation, so every reachable target is known statically.
    Conditional {
        router: RouterFn,
        branches: HashMap<String, NodeId>,
    },
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<function>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// Graph structure: nodes, outgoing edges per node, and the entry point.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// All nodes keyed by id.
    pub nodes: HashMap<NodeId, NodeSpec>,
    /// Outgoing edges per source node (including [`START`]).
    pub edges: HashMap<NodeId, Vec<Edge>>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Replaces any existing node with the same id.
    pub fn add_node(&mut self, id: NodeId, spec: NodeSpec) {
        self.nodes.insert(id, spec);
    }

    /// Add a direct edge `from -> to`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.entry(from).or_default().push(Edge::Direct(to));
    }

    /// Add a conditional edge whose router selects among `branches`.
    pub fn add_conditional_edge(
        &mut self,
        from: NodeId,
        router: RouterFn,
        branches: HashMap<String, NodeId>,
    ) {
        self.edges
            .entry(from)
            .or_default()
            .push(Edge::Conditional { router, branches });
    }

    /// Structural validation: every edge source and target must exist (or be
    /// START/END), and START must have an outgoing edge.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.edges.contains_key(START) {
            return Err("no entry edge from __start__".to_string());
        }

        for (from, edges) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(format!("edge source '{from}' does not exist"));
            }
            for edge in edges {
                match edge {
                    Edge::Direct(to) => {
                        if to != END && !self.nodes.contains_key(to) {
                            return Err(format!("edge target '{to}' does not exist"));
                        }
                    }
                    Edge::Conditional { branches, .. } => {
                        for to in branches.values() {
                            if to != END && !self.nodes.contains_key(to) {
                                return Err(format!("branch target '{to}' does not exist"));
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
