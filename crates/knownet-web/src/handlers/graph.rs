//! Session graph views: step staging and layout direction.

use axum::extract::{Json, Path, Query, State};
use serde::{Deserialize, Serialize};

use knownet_graph::layout::Direction;
use knownet_graph::model::FlowElements;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize, Default)]
pub struct ViewQuery {
    /// View an earlier step without moving the session's active step.
    pub step: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GraphView {
    pub session_id: String,
    pub active_step: usize,
    pub max_step: usize,
    pub direction: Direction,
    pub question_entities: Vec<String>,
    #[serde(flatten)]
    pub elements: FlowElements,
}

#[derive(Debug, Deserialize)]
pub struct LayoutRequest {
    pub direction: Direction,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub step: usize,
}

async fn view_for(
    state: &SharedState,
    session_id: &str,
    step: Option<usize>,
) -> Result<GraphView, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(session_id)
        .ok_or_else(|| ApiError::not_found(format!("session not found: {session_id}")))?;
    let elements = session.graph_view(&state.config, step);
    Ok(GraphView {
        session_id: session_id.to_string(),
        active_step: session.active_step,
        max_step: session.max_step(),
        direction: session.direction,
        question_entities: session.question_entities.clone(),
        elements,
    })
}

/// GET /api/graph/{session} — laid-out, step-filtered view.
pub async fn graph_view(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<GraphView>, ApiError> {
    Ok(Json(view_for(&state, &session_id, query.step).await?))
}

/// POST /api/graph/{session}/layout — switch between TB and LR.
pub async fn graph_layout(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(payload): Json<LayoutRequest>,
) -> Result<Json<GraphView>, ApiError> {
    {
        let mut sessions = state.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| ApiError::not_found(format!("session not found: {session_id}")))?;
        session.set_direction(payload.direction);
    }
    Ok(Json(view_for(&state, &session_id, None).await?))
}

/// POST /api/graph/{session}/step — move the reveal slider.
pub async fn graph_step(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(payload): Json<StepRequest>,
) -> Result<Json<GraphView>, ApiError> {
    {
        let mut sessions = state.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| ApiError::not_found(format!("session not found: {session_id}")))?;
        session.set_step(payload.step);
    }
    Ok(Json(view_for(&state, &session_id, None).await?))
}
