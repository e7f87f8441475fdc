//! HTTP handler functions.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;

use crate::api::error::ApiResult;
use crate::api::routes::AppState;
use crate::store::{ScoredChunk, VectorCollection};

const DEFAULT_TOP_K: usize = 3;

/// Queries answered with a canned reply instead of retrieval.
const GREETINGS: [&str; 4] = ["hi", "hello", "hey", "greetings"];
const GREETING_REPLY: &str = "Hello! Ask me anything about the indexed documents.";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
    pub metadata: std::collections::HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub question: String,
    pub results: Vec<SearchHit>,
}

impl From<ScoredChunk> for SearchHit {
    fn from(chunk: ScoredChunk) -> Self {
        Self {
            text: chunk.text,
            score: chunk.score,
            metadata: chunk.metadata,
        }
    }
}

/// `GET /` service description.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "flowgraph-rag",
        "endpoints": ["/", "/health", "/query", "/search", "/search/stream", "/stats"],
    }))
}

/// `GET /health`.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// `POST /query`: retrieve context and generate a grounded answer.
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);
    let answer = state.engine.query(&request.question, top_k).await?;
    Ok(Json(QueryResponse {
        question: request.question,
        answer,
    }))
}

/// `POST /search`: ranked snippets with scores, retrieval only.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<SearchResponse>> {
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);
    let hits = state.engine.search(&request.question, top_k).await?;
    Ok(Json(SearchResponse {
        question: request.question,
        results: hits.into_iter().map(SearchHit::from).collect(),
    }))
}

/// `GET /stats`: chunk count and embedding model.
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let stats = state.engine.stats().await;
    Ok(Json(json!({
        "total_chunks": stats.total_chunks,
        "embedding_model": stats.embedding_model,
    })))
}

/// `POST /search/stream`: server-sent events of `{token}` payloads
/// terminated by `{done}`, or `{error}` on failure. Plain greetings get a
/// canned streamed reply without touching the retrieval pipeline.
pub async fn search_stream(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let question = request.question.trim().to_string();
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);
    VectorCollection::validate_query(&question, top_k)?;

    let stream = async_stream::stream! {
        // "hello!" counts as a greeting; trailing punctuation is not content.
        let normalized = question.to_lowercase();
        let answer = if GREETINGS.contains(&normalized.trim_end_matches(['!', '?', '.'])) {
            Ok(GREETING_REPLY.to_string())
        } else {
            state.engine.query(&question, top_k).await.map_err(|e| e.to_string())
        };

        match answer {
            Ok(text) => {
                for token in text.split_inclusive(' ') {
                    yield Ok(Event::default().data(json!({"token": token}).to_string()));
                }
                yield Ok(Event::default().data(json!({"done": true}).to_string()));
            }
            Err(detail) => {
                yield Ok(Event::default().data(json!({"error": detail}).to_string()));
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
