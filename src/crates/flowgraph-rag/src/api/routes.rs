//! API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::engine::RagEngine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RagEngine>,
}

/// Build the complete API router.
pub fn create_router(engine: Arc<RagEngine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/query", post(handlers::query))
        .route("/search", post(handlers::search))
        .route("/search/stream", post(handlers::search_stream))
        .route("/stats", get(handlers::stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
