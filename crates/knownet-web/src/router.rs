//! Axum router — maps all URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    chat::chat_submit,
    graph::{graph_view, graph_layout, graph_step},
    verify::verify_submit,
    recommend::recommend_submit,
    data::data_submit,
    system::{ping, health},
};
use crate::sse::sse_handler;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Chat
        .route("/api/chat", post(chat_submit))

        // Knowledge graph
        .route("/api/verify",    post(verify_submit))
        .route("/api/recommend", post(recommend_submit))
        .route("/api/data",      post(data_submit))

        // Session graph views
        .route("/api/graph/{session}",        get(graph_view))
        .route("/api/graph/{session}/layout", post(graph_layout))
        .route("/api/graph/{session}/step",   post(graph_step))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Probes
        .route("/api/_ping",   get(ping))
        .route("/api/_health", get(health))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
