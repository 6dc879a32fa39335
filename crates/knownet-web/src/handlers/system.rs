//! Liveness and health endpoints.

use axum::extract::{Json, State};
use serde::Serialize;
use serde_json::json;

use knownet_kg::store::KgStats;

use crate::state::SharedState;

/// GET /api/_ping — liveness probe used by ops.
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub kg: KgStats,
    pub provider: String,
    pub model: String,
    pub sessions: usize,
}

/// GET /api/_health — KG size, configured model, live session count.
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await.len();
    Json(HealthResponse {
        kg: state.kg.stats(),
        provider: state.config.llm.provider.clone(),
        model: state.llm.model_id(),
        sessions,
    })
}
