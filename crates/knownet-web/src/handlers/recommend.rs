//! Neighbor recommendation endpoint.

use axum::extract::{Json, State};
use serde::Serialize;

use knownet_kg::recommend::{recommend, RecommendRequest, Suggestion};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub resolved_head: String,
    pub suggestions: Vec<Suggestion>,
}

/// POST /api/recommend — follow-up suggestions around one entity.
pub async fn recommend_submit(
    State(state): State<SharedState>,
    Json(payload): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let head = payload.head.trim().to_string();
    if head.is_empty() {
        return Err(ApiError::bad_request("head (node name) is required"));
    }
    let suggestions = recommend(&state.kg, &payload);
    Ok(Json(RecommendResponse { resolved_head: head, suggestions }))
}
