//! HTTP API tests driven through the router with `tower::ServiceExt`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use flowgraph_core::{ChatModel, ChatRequest, ChatResponse};
use flowgraph_llm::{Embeddings, HashEmbeddings};
use flowgraph_rag::{api, RagEngine, VectorCollection};

struct CannedModel(&'static str);

#[async_trait]
impl ChatModel for CannedModel {
    async fn chat(&self, _request: ChatRequest) -> flowgraph_core::Result<ChatResponse> {
        Ok(ChatResponse::text(self.0))
    }
}

async fn test_router() -> Router {
    let embedder = Arc::new(HashEmbeddings::default());
    let collection = VectorCollection::new("test", embedder.model_name());
    let engine = Arc::new(RagEngine::new(
        collection,
        embedder,
        Arc::new(CannedModel("the answer is 42")),
    ));
    engine
        .index(
            vec![
                "the borrow checker enforces ownership".to_string(),
                "cargo builds and tests rust projects".to_string(),
                "tokio schedules asynchronous tasks".to_string(),
                "axum routes http requests".to_string(),
            ],
            vec![],
        )
        .await
        .unwrap();
    api::create_router(engine)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_lists_endpoints() {
    let app = test_router().await;
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "flowgraph-rag");
}

#[tokio::test]
async fn health_is_ok() {
    let app = test_router().await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let app = test_router().await;
    let response = app
        .oneshot(post_json(
            "/search",
            json!({"question": "how does cargo build projects", "top_k": 3}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    let scores: Vec<f64> = results
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn empty_question_is_rejected_with_400() {
    let app = test_router().await;
    let response = app
        .oneshot(post_json("/search", json!({"question": "", "top_k": 3})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn out_of_range_top_k_is_rejected_with_400() {
    for top_k in [0, 11] {
        let app = test_router().await;
        let response = app
            .oneshot(post_json(
                "/search",
                json!({"question": "anything", "top_k": top_k}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn query_returns_generated_answer() {
    let app = test_router().await;
    let response = app
        .oneshot(post_json("/query", json!({"question": "what builds rust"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["question"], "what builds rust");
    assert_eq!(body["answer"], "the answer is 42");
}

#[tokio::test]
async fn stats_reports_chunks_and_model() {
    let app = test_router().await;
    let response = app
        .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_chunks"], 4);
    assert_eq!(body["embedding_model"], "hash-embeddings");
}

#[tokio::test]
async fn stream_emits_tokens_then_done() {
    let app = test_router().await;
    let response = app
        .oneshot(post_json(
            "/search/stream",
            json!({"question": "what builds rust", "top_k": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let raw = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(raw.contains("token"));
    assert!(raw.contains(r#"{"done":true}"#));
}

#[tokio::test]
async fn stream_rejects_out_of_range_top_k_with_400() {
    for top_k in [0, 11] {
        let app = test_router().await;
        let response = app
            .oneshot(post_json(
                "/search/stream",
                json!({"question": "anything", "top_k": top_k}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("top_k"));
    }
}

#[tokio::test]
async fn punctuated_greeting_streams_canned_reply() {
    let app = test_router().await;
    let response = app
        .oneshot(post_json("/search/stream", json!({"question": "Hello!"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let raw = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(raw.contains("Hello! Ask me anything"));
    assert!(raw.contains(r#"{"done":true}"#));
}

#[tokio::test]
async fn greeting_streams_canned_reply_without_retrieval() {
    let app = test_router().await;
    let response = app
        .oneshot(post_json("/search/stream", json!({"question": "hello"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let raw = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(raw.contains("Hello!"));
    assert!(raw.contains(r#"{"done":true}"#));
}
