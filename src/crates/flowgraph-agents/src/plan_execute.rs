//! Plan, execute, synthesize, reflect.
//!
//! A planner decomposes the task into ordered steps, the executor runs them
//! strictly in sequence (each step sees every prior result), and the
//! synthesizer folds the accumulated results into an answer that then goes
//! through a short free-form critique loop.
//!
//! ```text
//!  START -> planner -(route)-> executor -(loop)-> synthesizer -> critic
//!                \____________________________________/              |
//!                             (empty plan)            (route) { synthesizer | finalizer -> END }
//! ```

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use flowgraph_core::{
    ChatModel, ChatRequest, CompiledGraph, Message, StateGraph, END, START,
};

use crate::error::{AgentError, Result};

/// Default cap on critique passes over the synthesized answer.
pub const MAX_REFLECTION_ITERATIONS: u64 = 2;

const PLANNER_PROMPT: &str = "Break the task into a short numbered list of concrete steps, one per line. Respond with the list only.";
const EXECUTOR_PROMPT: &str = "Execute the given step. Use the results of prior steps where relevant. Be concise.";
const SYNTHESIZER_PROMPT: &str = "Combine the step results into one coherent answer to the original task.";
const CRITIC_PROMPT: &str = "Review the answer against the task. If it is complete and correct, reply with the single word APPROVED. Otherwise describe what must be fixed.";

/// Parse a numbered-list response into step descriptions: a trimmed
/// non-empty line is a step iff any of its first three characters is an
/// ASCII digit.
///
/// Known limitation, preserved deliberately: differently formatted numbering
/// such as "Step one:" is silently dropped.
pub fn parse_plan(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| line.chars().take(3).any(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Configuration for the plan-execute pipeline. One model serves all roles;
/// the prompts differ per node.
pub struct PlanExecuteConfig {
    model: Arc<dyn ChatModel>,
    max_reflection_iterations: u64,
}

impl PlanExecuteConfig {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            max_reflection_iterations: MAX_REFLECTION_ITERATIONS,
        }
    }

    /// Set the critique-pass cap for the synthesis loop.
    pub fn with_max_reflection_iterations(mut self, max: u64) -> Self {
        self.max_reflection_iterations = max;
        self
    }

    /// Build the compiled pipeline. Invoke with `{"task": "..."}`; the
    /// result carries `plan`, `results`, and `final_output`.
    pub fn build(self) -> Result<CompiledGraph> {
        build_plan_execute_graph(self)
    }
}

fn build_plan_execute_graph(config: PlanExecuteConfig) -> Result<CompiledGraph> {
    let model = config.model;
    let max_reflections = config.max_reflection_iterations;

    let planner_model = model.clone();
    let executor_model = model.clone();
    let synthesizer_model = model.clone();
    let critic_model = model;

    let planner_branches: HashMap<String, String> = [
        ("execute".to_string(), "executor".to_string()),
        ("synthesize".to_string(), "synthesizer".to_string()),
    ]
    .into_iter()
    .collect();

    let executor_branches: HashMap<String, String> = [
        ("next_step".to_string(), "executor".to_string()),
        ("synthesize".to_string(), "synthesizer".to_string()),
    ]
    .into_iter()
    .collect();

    let critic_branches: HashMap<String, String> = [
        ("revise".to_string(), "synthesizer".to_string()),
        ("finalize".to_string(), "finalizer".to_string()),
    ]
    .into_iter()
    .collect();

    let graph = StateGraph::new()
        .add_append_channel("results")
        .add_node("planner", move |state: Value| {
            let model = planner_model.clone();
            async move {
                let task = state["task"].as_str().unwrap_or("").to_string();
                let response = model
                    .chat(ChatRequest::new(vec![
                        Message::system(PLANNER_PROMPT),
                        Message::human(task),
                    ]))
                    .await?;
                let plan = parse_plan(&response.content);
                debug!(steps = plan.len(), "plan parsed");
                Ok(json!({"plan": plan, "current_step": 0}))
            }
        })
        .add_node("executor", move |state: Value| {
            let model = executor_model.clone();
            async move {
                let plan: Vec<String> =
                    serde_json::from_value(state["plan"].clone()).unwrap_or_default();
                let index = state["current_step"].as_u64().unwrap_or(0) as usize;
                let step = plan.get(index).cloned().unwrap_or_default();

                let prior = state["results"]
                    .as_array()
                    .map(|results| {
                        results
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join("\n")
                    })
                    .unwrap_or_default();

                let prompt = if prior.is_empty() {
                    format!("Step: {step}")
                } else {
                    format!("Results so far:\n{prior}\n\nStep: {step}")
                };
                let response = model
                    .chat(ChatRequest::new(vec![
                        Message::system(EXECUTOR_PROMPT),
                        Message::human(prompt),
                    ]))
                    .await?;

                let result = format!("Step {} result: {}", index + 1, response.content);
                Ok(json!({"current_step": index + 1, "results": [result]}))
            }
        })
        .add_node("synthesizer", move |state: Value| {
            let model = synthesizer_model.clone();
            async move {
                let task = state["task"].as_str().unwrap_or("").to_string();
                let results = state["results"]
                    .as_array()
                    .map(|results| {
                        results
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join("\n")
                    })
                    .unwrap_or_default();

                let mut prompt = format!("Task: {task}\n\nStep results:\n{results}");
                if let Some(critique) = state["critique"].as_str() {
                    if let Some(draft) = state["draft"].as_str() {
                        prompt = format!(
                            "Task: {task}\n\nStep results:\n{results}\n\nPrevious answer:\n{draft}\n\nReviewer feedback:\n{critique}\n\nRevise the answer."
                        );
                    }
                }

                let response = model
                    .chat(ChatRequest::new(vec![
                        Message::system(SYNTHESIZER_PROMPT),
                        Message::human(prompt),
                    ]))
                    .await?;
                Ok(json!({"draft": response.content}))
            }
        })
        .add_node("critic", move |state: Value| {
            let model = critic_model.clone();
            async move {
                let task = state["task"].as_str().unwrap_or("");
                let draft = state["draft"].as_str().unwrap_or("");
                let iterations = state["iterations"].as_u64().unwrap_or(0);

                let response = model
                    .chat(ChatRequest::new(vec![
                        Message::system(CRITIC_PROMPT),
                        Message::human(format!("Task: {task}\n\nAnswer:\n{draft}")),
                    ]))
                    .await?;

                Ok(json!({
                    "critique": response.content,
                    "iterations": iterations + 1,
                }))
            }
        })
        .add_node("finalizer", |state: Value| async move {
            let draft = state["draft"].as_str().unwrap_or("").to_string();
            Ok(json!({"final_output": draft}))
        })
        .add_edge(START, "planner")
        .add_conditional_edge(
            "planner",
            |state: &Value| {
                let empty = state["plan"]
                    .as_array()
                    .map(|plan| plan.is_empty())
                    .unwrap_or(true);
                if empty {
                    "synthesize".to_string()
                } else {
                    "execute".to_string()
                }
            },
            planner_branches,
        )
        .add_conditional_edge(
            "executor",
            |state: &Value| {
                let plan_len = state["plan"].as_array().map(Vec::len).unwrap_or(0) as u64;
                if state["current_step"].as_u64().unwrap_or(0) < plan_len {
                    "next_step".to_string()
                } else {
                    "synthesize".to_string()
                }
            },
            executor_branches,
        )
        .add_edge("synthesizer", "critic")
        .add_conditional_edge(
            "critic",
            move |state: &Value| {
                let approved = state["critique"]
                    .as_str()
                    .map(|critique| critique.to_uppercase().contains("APPROVED"))
                    .unwrap_or(false);
                let iterations = state["iterations"].as_u64().unwrap_or(0);
                if approved || iterations >= max_reflections {
                    "finalize".to_string()
                } else {
                    "revise".to_string()
                }
            },
            critic_branches,
        )
        .add_edge("finalizer", END)
        .with_max_steps(64)
        .compile()?;

    Ok(graph)
}

/// Run the pipeline over `task` and return the final answer.
pub async fn run_plan_execute(graph: &CompiledGraph, task: &str) -> Result<String> {
    let state = graph.invoke(json!({"task": task, "iterations": 0})).await?;
    state["final_output"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AgentError::MissingOutput("final_output".into()))
}
