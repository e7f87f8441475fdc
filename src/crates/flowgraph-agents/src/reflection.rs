//! Bounded refine loop: generate, critique, route.
//!
//! A generator drafts a response, a critic scores it on three 1-5 criteria,
//! and the loop repeats until the critic approves or the iteration cap is
//! reached. Approval is never forced: when the cap trips, the last draft is
//! surfaced as the final output regardless of its scores.
//!
//! ```text
//!  START -> generator -> critic -(route)-> { generator | finalizer -> END }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use flowgraph_core::{
    ChatModel, ChatRequest, CompiledGraph, Message, StateGraph, END, START,
};

use crate::error::{AgentError, Result};

/// Default iteration cap for the refine loop.
pub const DEFAULT_MAX_ITERATIONS: u64 = 3;

/// Default per-criterion approval threshold.
pub const DEFAULT_APPROVAL_THRESHOLD: u8 = 4;

const GENERATOR_PROMPT: &str =
    "You are a writer producing clear, accurate responses. Revise thoroughly when given feedback.";
const CRITIC_PROMPT: &str = "You are a strict reviewer. Score the draft and respond with a JSON object: \
{\"clarity\": 1-5, \"completeness\": 1-5, \"accuracy\": 1-5, \"feedback\": \"...\"}";

/// One critique pass: three bounded criteria plus free-text feedback.
/// Immutable once created; appended to the state's score history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualityScore {
    pub clarity: u8,
    pub completeness: u8,
    pub accuracy: u8,
    #[serde(default)]
    pub feedback: String,
}

impl QualityScore {
    /// Approved iff every criterion meets the threshold.
    pub fn is_approved(&self, threshold: u8) -> bool {
        self.clarity >= threshold && self.completeness >= threshold && self.accuracy >= threshold
    }
}

/// Extract the first JSON object embedded in `text` and parse it as a
/// [`QualityScore`]. Tolerates prose around the object.
pub fn parse_score(text: &str) -> Option<QualityScore> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + offset + 1];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// Configuration for the refine loop.
pub struct ReflectionConfig {
    generator: Arc<dyn ChatModel>,
    critic: Arc<dyn ChatModel>,
    max_iterations: u64,
    approval_threshold: u8,
    generator_prompt: String,
    critic_prompt: String,
}

impl ReflectionConfig {
    pub fn new(generator: Arc<dyn ChatModel>, critic: Arc<dyn ChatModel>) -> Self {
        Self {
            generator,
            critic,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
            generator_prompt: GENERATOR_PROMPT.to_string(),
            critic_prompt: CRITIC_PROMPT.to_string(),
        }
    }

    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the per-criterion approval threshold.
    pub fn with_approval_threshold(mut self, threshold: u8) -> Self {
        self.approval_threshold = threshold;
        self
    }

    /// Override the generator system prompt.
    pub fn with_generator_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.generator_prompt = prompt.into();
        self
    }

    /// Override the critic system prompt.
    pub fn with_critic_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.critic_prompt = prompt.into();
        self
    }

    /// Build the compiled refine-loop graph. Invoke it with
    /// `{"task": "..."}`; the result carries `final_output`, `scores`, and
    /// `iterations`.
    pub fn build(self) -> Result<CompiledGraph> {
        build_reflection_graph(self)
    }
}

fn build_reflection_graph(config: ReflectionConfig) -> Result<CompiledGraph> {
    let generator = config.generator;
    let critic = config.critic;
    let max_iterations = config.max_iterations;
    let approval_threshold = config.approval_threshold;
    let generator_prompt = config.generator_prompt;
    let critic_prompt = config.critic_prompt;

    let branches: HashMap<String, String> = [
        ("refine".to_string(), "generator".to_string()),
        ("finalize".to_string(), "finalizer".to_string()),
    ]
    .into_iter()
    .collect();

    let graph = StateGraph::new()
        .add_append_channel("scores")
        .add_node("generator", move |state: Value| {
            let generator = generator.clone();
            let system = generator_prompt.clone();
            async move {
                let task = state["task"].as_str().unwrap_or("").to_string();
                let last_score: Option<QualityScore> = state["scores"]
                    .as_array()
                    .and_then(|scores| scores.last())
                    .and_then(|s| serde_json::from_value(s.clone()).ok());

                // The latest feedback goes into the prompt verbatim.
                let prompt = match (&last_score, state["draft"].as_str()) {
                    (Some(score), Some(draft)) => format!(
                        "Task: {task}\n\nPrevious draft:\n{draft}\n\nReviewer feedback:\n{}\n\nRewrite the draft addressing the feedback.",
                        score.feedback
                    ),
                    _ => format!("Task: {task}"),
                };

                let response = generator
                    .chat(ChatRequest::new(vec![
                        Message::system(&system),
                        Message::human(prompt),
                    ]))
                    .await?;
                Ok(json!({"draft": response.content}))
            }
        })
        .add_node("critic", move |state: Value| {
            let critic = critic.clone();
            let system = critic_prompt.clone();
            async move {
                let task = state["task"].as_str().unwrap_or("");
                let draft = state["draft"].as_str().unwrap_or("");
                let iterations = state["iterations"].as_u64().unwrap_or(0);

                let response = critic
                    .chat(ChatRequest::new(vec![
                        Message::system(&system),
                        Message::human(format!("Task: {task}\n\nDraft:\n{draft}")),
                    ]))
                    .await?;

                // An unparseable critique counts as rejection, keeping the
                // raw text as feedback for the next pass.
                let score = parse_score(&response.content).unwrap_or(QualityScore {
                    clarity: 1,
                    completeness: 1,
                    accuracy: 1,
                    feedback: response.content.clone(),
                });
                debug!(?score, iterations, "critique pass");

                Ok(json!({
                    "iterations": iterations + 1,
                    "scores": [serde_json::to_value(&score)?],
                }))
            }
        })
        .add_node("finalizer", |state: Value| async move {
            let draft = state["draft"].as_str().unwrap_or("").to_string();
            Ok(json!({"final_output": draft}))
        })
        .add_edge(START, "generator")
        .add_edge("generator", "critic")
        .add_conditional_edge(
            "critic",
            move |state: &Value| {
                let iterations = state["iterations"].as_u64().unwrap_or(0);
                let approved = state["scores"]
                    .as_array()
                    .and_then(|scores| scores.last())
                    .and_then(|s| serde_json::from_value::<QualityScore>(s.clone()).ok())
                    .map(|score| score.is_approved(approval_threshold))
                    .unwrap_or(false);
                if approved || iterations >= max_iterations {
                    "finalize".to_string()
                } else {
                    "refine".to_string()
                }
            },
            branches,
        )
        .add_edge("finalizer", END)
        // generator + critic per pass, plus the finalizer.
        .with_max_steps((max_iterations as usize + 1) * 2 + 1)
        .compile()?;

    Ok(graph)
}

/// Run a refine loop over `task` and return the final output.
pub async fn run_reflection(graph: &CompiledGraph, task: &str) -> Result<String> {
    let state = graph.invoke(json!({"task": task, "iterations": 0})).await?;
    state["final_output"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AgentError::MissingOutput("final_output".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_requires_all_criteria_at_threshold() {
        let approved = QualityScore {
            clarity: 4,
            completeness: 4,
            accuracy: 4,
            feedback: String::new(),
        };
        assert!(approved.is_approved(4));

        let rejected = QualityScore {
            clarity: 3,
            completeness: 4,
            accuracy: 4,
            feedback: String::new(),
        };
        assert!(!rejected.is_approved(4));
    }

    #[test]
    fn score_parses_from_prose_wrapped_json() {
        let text = "Here is my assessment:\n{\"clarity\": 4, \"completeness\": 3, \"accuracy\": 5, \"feedback\": \"add examples\"}\nThanks.";
        let score = parse_score(text).unwrap();
        assert_eq!(score.clarity, 4);
        assert_eq!(score.completeness, 3);
        assert_eq!(score.feedback, "add examples");
    }

    #[test]
    fn unparseable_text_yields_none() {
        assert_eq!(parse_score("looks good to me"), None);
        assert_eq!(parse_score("{not json}"), None);
    }

    #[test]
    fn score_round_trips() {
        let score = QualityScore {
            clarity: 5,
            completeness: 4,
            accuracy: 4,
            feedback: "tighten the intro".into(),
        };
        let json = serde_json::to_string(&score).unwrap();
        let back: QualityScore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, score);
    }
}
