//! Tool-routing assistant with session memory.
//!
//! Per turn, the assistant either answers directly or requests exactly the
//! capabilities it needs; tool results are fed back as ordinary messages and
//! the cycle repeats until the model answers in text. Conversation history
//! is keyed by an opaque session id through the core [`Store`], so a durable
//! backend can replace the in-memory map without touching this code.
//!
//! ```text
//!  START -> assistant -(route)-> { tools -> assistant | END }
//! ```

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use flowgraph_core::{
    ChatModel, ChatRequest, CompiledGraph, Message, StateGraph, Store, END, START,
};

use crate::error::{AgentError, Result};
use crate::tools::{ToolKit, ToolRequest};

const ASSISTANT_PROMPT: &str = "You are a helpful assistant. Use the available tools when a question needs a lookup; otherwise answer directly.";

/// A conversational assistant dispatching a closed capability set.
pub struct Assistant {
    graph: CompiledGraph,
    store: Arc<dyn Store>,
}

/// Configuration for the assistant.
pub struct AssistantConfig {
    model: Arc<dyn ChatModel>,
    toolkit: Arc<ToolKit>,
    store: Arc<dyn Store>,
    system_prompt: String,
}

impl AssistantConfig {
    pub fn new(model: Arc<dyn ChatModel>, toolkit: Arc<ToolKit>, store: Arc<dyn Store>) -> Self {
        Self {
            model,
            toolkit,
            store,
            system_prompt: ASSISTANT_PROMPT.to_string(),
        }
    }

    /// Override the system instruction.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn build(self) -> Result<Assistant> {
        let graph = build_assistant_graph(self.model, self.toolkit, self.system_prompt)?;
        Ok(Assistant {
            graph,
            store: self.store,
        })
    }
}

fn build_assistant_graph(
    model: Arc<dyn ChatModel>,
    toolkit: Arc<ToolKit>,
    system_prompt: String,
) -> Result<CompiledGraph> {
    let branches: HashMap<String, String> = [
        ("invoke_tool".to_string(), "tools".to_string()),
        ("finish".to_string(), END.to_string()),
    ]
    .into_iter()
    .collect();

    let graph = StateGraph::new()
        .add_append_channel("messages")
        .add_append_channel("tool_invocations")
        .add_node("assistant", move |state: Value| {
            let model = model.clone();
            let system = system_prompt.clone();
            async move {
                let mut messages: Vec<Message> =
                    serde_json::from_value(state["messages"].clone()).unwrap_or_default();
                messages.insert(0, Message::system(&system));

                let request = ChatRequest::new(messages).with_tools(ToolRequest::definitions());
                let response = model.chat(request).await?;

                if response.has_tool_calls() {
                    let message =
                        Message::ai_with_tool_calls(&response.content, response.tool_calls.clone());
                    Ok(json!({
                        "messages": [serde_json::to_value(&message)?],
                        "pending_calls": serde_json::to_value(&response.tool_calls)?,
                    }))
                } else {
                    let message = Message::ai(&response.content);
                    Ok(json!({
                        "messages": [serde_json::to_value(&message)?],
                        "pending_calls": Value::Null,
                        "final_response": response.content,
                    }))
                }
            }
        })
        .add_node("tools", move |state: Value| {
            let toolkit = toolkit.clone();
            async move {
                let calls: Vec<flowgraph_core::ToolCall> =
                    serde_json::from_value(state["pending_calls"].clone()).unwrap_or_default();

                let mut messages = Vec::new();
                let mut invoked = Vec::new();
                for call in &calls {
                    debug!(tool = %call.name, "invoking capability");
                    let result = toolkit.execute_call(call).await;
                    messages.push(serde_json::to_value(Message::tool(result, &call.id))?);
                    invoked.push(json!(call.name));
                }

                Ok(json!({
                    "messages": messages,
                    "tool_invocations": invoked,
                    "pending_calls": Value::Null,
                }))
            }
        })
        .add_edge(START, "assistant")
        .add_conditional_edge(
            "assistant",
            |state: &Value| {
                let pending = state["pending_calls"]
                    .as_array()
                    .map(|calls| !calls.is_empty())
                    .unwrap_or(false);
                if pending {
                    "invoke_tool".to_string()
                } else {
                    "finish".to_string()
                }
            },
            branches,
        )
        .add_edge("tools", "assistant")
        .compile()?;

    Ok(graph)
}

impl Assistant {
    /// Answer one user turn within the given session. History is loaded
    /// from the store, threaded through the graph, and saved back.
    pub async fn reply(&self, session_id: &str, user_input: &str) -> Result<String> {
        let key = format!("session:{session_id}");
        let mut history: Vec<Message> = match self.store.get(&key).await {
            Ok(Some(value)) => serde_json::from_value(value)
                .map_err(|e| AgentError::Session(e.to_string()))?,
            Ok(None) => Vec::new(),
            Err(e) => return Err(AgentError::Session(e.to_string())),
        };
        history.push(Message::human(user_input));

        let state = self
            .graph
            .invoke(json!({
                "messages": serde_json::to_value(&history)
                    .map_err(flowgraph_core::GraphError::from)?,
            }))
            .await?;

        let updated: Vec<Message> = serde_json::from_value(state["messages"].clone())
            .map_err(|e| AgentError::Session(e.to_string()))?;
        self.store
            .put(
                &key,
                serde_json::to_value(&updated).map_err(flowgraph_core::GraphError::from)?,
            )
            .await
            .map_err(|e| AgentError::Session(e.to_string()))?;

        state["final_response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AgentError::MissingOutput("final_response".into()))
    }

    /// Answer a single turn without session state, also reporting which
    /// tools the run invoked. Used by demos to show routing decisions.
    pub async fn reply_stateless(&self, user_input: &str) -> Result<(String, Vec<String>)> {
        let history = vec![Message::human(user_input)];
        let state = self
            .graph
            .invoke(json!({
                "messages": serde_json::to_value(&history)
                    .map_err(flowgraph_core::GraphError::from)?,
            }))
            .await?;

        let invocations = state["tool_invocations"]
            .as_array()
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let answer = state["final_response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AgentError::MissingOutput("final_response".into()))?;
        Ok((answer, invocations))
    }
}
