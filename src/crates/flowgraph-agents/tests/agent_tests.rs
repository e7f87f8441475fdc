//! Behavioral tests for the prebuilt agents, driven by scripted models.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use flowgraph_core::{ChatModel, ChatRequest, ChatResponse, InMemoryStore, ToolCall};
use flowgraph_agents::{
    run_plan_execute, run_reflection, AssistantConfig, PlanExecuteConfig, ReflectionConfig,
    ToolKit,
};

/// Replays a fixed sequence of responses; repeats the last one when the
/// script runs out. Counts calls.
struct ScriptedModel {
    responses: Mutex<VecDeque<ChatResponse>>,
    fallback: ChatResponse,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(responses: Vec<ChatResponse>) -> Arc<Self> {
        let fallback = responses
            .last()
            .cloned()
            .unwrap_or_else(|| ChatResponse::text("(empty script)"));
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            fallback,
            calls: AtomicUsize::new(0),
        })
    }

    fn texts(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| ChatResponse::text(*t)).collect())
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, _request: ChatRequest) -> flowgraph_core::Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        Ok(responses.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

fn score(clarity: u8, completeness: u8, accuracy: u8, feedback: &str) -> String {
    json!({
        "clarity": clarity,
        "completeness": completeness,
        "accuracy": accuracy,
        "feedback": feedback,
    })
    .to_string()
}

#[tokio::test]
async fn refine_loop_is_bounded_when_never_approved() {
    let generator = ScriptedModel::texts(&["draft one", "draft two", "draft three"]);
    let critic = ScriptedModel::texts(&[&score(3, 4, 4, "needs work")]);

    let graph = ReflectionConfig::new(generator.clone(), critic.clone())
        .with_max_iterations(2)
        .build()
        .unwrap();

    let output = run_reflection(&graph, "Explain X in simple terms")
        .await
        .unwrap();

    // Cap of 2: two generator passes, two critique passes, last draft wins.
    assert_eq!(generator.call_count(), 2);
    assert_eq!(critic.call_count(), 2);
    assert!(generator.call_count() <= 2 + 1);
    assert_eq!(output, "draft two");
}

#[tokio::test]
async fn all_fours_approve_and_stop_the_loop() {
    let generator = ScriptedModel::texts(&["solid draft"]);
    let critic = ScriptedModel::texts(&[&score(4, 4, 4, "good")]);

    let graph = ReflectionConfig::new(generator.clone(), critic.clone())
        .with_max_iterations(3)
        .build()
        .unwrap();

    let output = run_reflection(&graph, "task").await.unwrap();
    assert_eq!(generator.call_count(), 1);
    assert_eq!(critic.call_count(), 1);
    assert_eq!(output, "solid draft");
}

#[tokio::test]
async fn single_three_blocks_approval() {
    let generator = ScriptedModel::texts(&["draft"]);
    // [3,4,4] is not approved, so the loop continues to the cap.
    let critic = ScriptedModel::texts(&[&score(3, 4, 4, "clarity is lacking")]);

    let graph = ReflectionConfig::new(generator.clone(), critic.clone())
        .with_max_iterations(3)
        .build()
        .unwrap();

    run_reflection(&graph, "task").await.unwrap();
    assert_eq!(critic.call_count(), 3);
}

#[tokio::test]
async fn iteration_counter_advances_once_per_critique() {
    let generator = ScriptedModel::texts(&["draft"]);
    let critic = ScriptedModel::texts(&[&score(2, 2, 2, "weak")]);

    let graph = ReflectionConfig::new(generator, critic.clone())
        .with_max_iterations(3)
        .build()
        .unwrap();

    let state = graph
        .invoke(json!({"task": "task", "iterations": 0}))
        .await
        .unwrap();
    assert_eq!(state["iterations"].as_u64().unwrap(), critic.call_count() as u64);
    assert_eq!(state["scores"].as_array().unwrap().len(), critic.call_count());
}

#[tokio::test]
async fn unparseable_critique_counts_as_rejection() {
    let generator = ScriptedModel::texts(&["draft"]);
    let critic = ScriptedModel::texts(&["looks fine I suppose"]);

    let graph = ReflectionConfig::new(generator.clone(), critic)
        .with_max_iterations(2)
        .build()
        .unwrap();

    let output = run_reflection(&graph, "task").await.unwrap();
    // Rejection every pass, so the cap decides.
    assert_eq!(generator.call_count(), 2);
    assert_eq!(output, "draft");
}

#[tokio::test]
async fn plan_of_n_steps_yields_n_ordered_results() {
    let model = ScriptedModel::new(vec![
        ChatResponse::text("1. Gather sources\n2. Summarize findings\n3. Draft conclusion"),
        ChatResponse::text("sources gathered"),
        ChatResponse::text("findings summarized"),
        ChatResponse::text("conclusion drafted"),
        ChatResponse::text("final synthesis"),
        ChatResponse::text("APPROVED"),
    ]);

    let graph = PlanExecuteConfig::new(model).build().unwrap();
    let state = graph
        .invoke(json!({"task": "write a report", "iterations": 0}))
        .await
        .unwrap();

    let results = state["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0], "Step 1 result: sources gathered");
    assert_eq!(results[1], "Step 2 result: findings summarized");
    assert_eq!(results[2], "Step 3 result: conclusion drafted");
    assert_eq!(state["final_output"], "final synthesis");
}

#[tokio::test]
async fn unapproved_synthesis_is_revised_then_capped() {
    let model = ScriptedModel::new(vec![
        ChatResponse::text("1. Only step"),
        ChatResponse::text("step done"),
        ChatResponse::text("first synthesis"),
        ChatResponse::text("Missing detail about Y"),
        ChatResponse::text("second synthesis"),
        ChatResponse::text("Still missing detail"),
    ]);

    let graph = PlanExecuteConfig::new(model)
        .with_max_reflection_iterations(2)
        .build()
        .unwrap();
    let output = run_plan_execute(&graph, "task").await.unwrap();
    // Two critique passes, never approved, cap surfaces the last revision.
    assert_eq!(output, "second synthesis");
}

#[tokio::test]
async fn empty_plan_goes_straight_to_synthesis() {
    let model = ScriptedModel::new(vec![
        ChatResponse::text("I could not break this down."),
        ChatResponse::text("direct answer"),
        ChatResponse::text("APPROVED"),
    ]);

    let graph = PlanExecuteConfig::new(model).build().unwrap();
    let state = graph
        .invoke(json!({"task": "trivial task", "iterations": 0}))
        .await
        .unwrap();
    assert!(state["results"].as_array().map(Vec::is_empty).unwrap_or(true));
    assert_eq!(state["final_output"], "direct answer");
}

#[tokio::test]
async fn assistant_answers_directly_with_zero_invocations() {
    let model = ScriptedModel::texts(&["Paris is the capital of France."]);
    let assistant = AssistantConfig::new(
        model,
        Arc::new(ToolKit::new()),
        Arc::new(InMemoryStore::new()),
    )
    .build()
    .unwrap();

    let (answer, invocations) = assistant
        .reply_stateless("What is the capital of France?")
        .await
        .unwrap();
    assert_eq!(answer, "Paris is the capital of France.");
    assert!(invocations.is_empty());
}

#[tokio::test]
async fn assistant_routes_through_requested_capability() {
    let weather_call = ToolCall {
        id: "call_w1".into(),
        name: "get_weather".into(),
        arguments: json!({"city": "Oslo"}),
    };
    let model = ScriptedModel::new(vec![
        ChatResponse {
            content: String::new(),
            tool_calls: vec![weather_call],
        },
        ChatResponse::text("It is snowing in Oslo at -2°C."),
    ]);

    let assistant = AssistantConfig::new(
        model.clone(),
        Arc::new(ToolKit::new()),
        Arc::new(InMemoryStore::new()),
    )
    .build()
    .unwrap();

    let (answer, invocations) = assistant
        .reply_stateless("What's the weather in Oslo?")
        .await
        .unwrap();
    assert_eq!(invocations, ["get_weather"]);
    assert!(answer.contains("Oslo"));
    // Assistant turn, then a second turn after the tool result.
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn sessions_are_isolated_by_key() {
    let model = ScriptedModel::texts(&["noted"]);
    let store = Arc::new(InMemoryStore::new());
    let assistant = AssistantConfig::new(model, Arc::new(ToolKit::new()), store.clone())
        .build()
        .unwrap();

    assistant.reply("alpha", "remember the number 7").await.unwrap();
    assistant.reply("beta", "hello").await.unwrap();
    assistant.reply("alpha", "and the number 9").await.unwrap();

    use flowgraph_core::Store;
    let alpha = store.get("session:alpha").await.unwrap().unwrap();
    let beta = store.get("session:beta").await.unwrap().unwrap();
    // Two alpha turns (4 messages), one beta turn (2 messages).
    assert_eq!(alpha.as_array().unwrap().len(), 4);
    assert_eq!(beta.as_array().unwrap().len(), 2);
}
