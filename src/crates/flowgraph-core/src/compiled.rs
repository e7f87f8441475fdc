//! Sequential graph execution.
//!
//! A compiled graph runs one node at a time: execute the current node, merge
//! its partial update into the state using the declared channel reducers,
//! then follow the node's outgoing edge (evaluating routers for conditional
//! edges) until [`END`] is reached or the step cap trips.

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::builder::Reducer;
use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, NodeId, END, START};

/// Default cap on node executions per invocation.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// An executable graph produced by [`StateGraph::compile`](crate::StateGraph::compile).
pub struct CompiledGraph {
    graph: Graph,
    channels: HashMap<String, Reducer>,
    max_steps: usize,
}

impl CompiledGraph {
    pub(crate) fn new(
        graph: Graph,
        channels: HashMap<String, Reducer>,
        max_steps: usize,
    ) -> Self {
        Self {
            graph,
            channels,
            max_steps,
        }
    }

    /// Run the graph to completion from `input` and return the final state.
    ///
    /// Node failures abort the run as [`GraphError::NodeExecution`]; exceeding
    /// the step cap aborts as [`GraphError::Execution`].
    pub async fn invoke(&self, input: Value) -> Result<Value> {
        let mut state = if input.is_object() {
            input
        } else {
            return Err(GraphError::Execution(
                "initial state must be a JSON object".to_string(),
            ));
        };

        let mut current = self.next_node(START, &state)?;
        let mut step = 0usize;

        while current != END {
            if step >= self.max_steps {
                warn!(step, max_steps = self.max_steps, "step cap exceeded");
                return Err(GraphError::Execution(format!(
                    "maximum steps ({}) exceeded",
                    self.max_steps
                )));
            }

            let node = self.graph.nodes.get(&current).ok_or_else(|| {
                GraphError::Execution(format!("node '{current}' not found"))
            })?;

            debug!(node = %current, step, "executing node");
            let update = (node.executor)(state.clone())
                .await
                .map_err(|e| GraphError::in_node(&current, e))?;

            merge_update(&mut state, update, &self.channels)?;

            let next = self.next_node(&current, &state)?;
            current = next;
            step += 1;
        }

        Ok(state)
    }

    /// Resolve the next node from `from`, evaluating routers against `state`.
    fn next_node(&self, from: &str, state: &Value) -> Result<NodeId> {
        let edges = self.graph.edges.get(from).ok_or_else(|| {
            GraphError::Execution(format!("node '{from}' has no outgoing edge"))
        })?;

        // The builder surface only ever attaches one outgoing edge per node
        // in practice; the first routable edge wins.
        for edge in edges {
            match edge {
                Edge::Direct(to) => return Ok(to.clone()),
                Edge::Conditional { router, branches } => {
                    let key = router(state);
                    return branches.get(&key).cloned().ok_or_else(|| {
                        GraphError::Execution(format!(
                            "router at '{from}' returned unknown branch '{key}'"
                        ))
                    });
                }
            }
        }

        Err(GraphError::Execution(format!(
            "node '{from}' has no outgoing edge"
        )))
    }
}

/// Merge a node's partial update into the state. Keys declared as append
/// channels concatenate arrays; everything else replaces.
fn merge_update(
    state: &mut Value,
    update: Value,
    channels: &HashMap<String, Reducer>,
) -> Result<()> {
    let update = match update {
        Value::Object(map) => map,
        Value::Null => return Ok(()),
        other => {
            return Err(GraphError::Execution(format!(
                "node update must be a JSON object, got {other}"
            )))
        }
    };

    let target = state.as_object_mut().ok_or_else(|| {
        GraphError::Execution("state is not a JSON object".to_string())
    })?;

    for (key, value) in update {
        match channels.get(&key) {
            Some(Reducer::Append) => {
                let existing = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match (existing, value) {
                    (Value::Array(acc), Value::Array(items)) => acc.extend(items),
                    (Value::Array(acc), single) => acc.push(single),
                    (slot, value) => *slot = value,
                }
            }
            _ => {
                target.insert(key, value);
            }
        }
    }

    Ok(())
}
