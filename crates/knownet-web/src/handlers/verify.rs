//! Triple verification endpoint.

use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};

use knownet_kg::extraction::Triple;
use knownet_kg::verify::{verify_triples, Verification};

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// `[head, relation, tail]` rows.
    pub triples: Vec<(String, String, String)>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub results: Vec<Verification>,
}

/// POST /api/verify — check extracted triples against the knowledge graph.
pub async fn verify_submit(
    State(state): State<SharedState>,
    Json(payload): Json<VerifyRequest>,
) -> Json<VerifyResponse> {
    let triples: Vec<Triple> = payload
        .triples
        .into_iter()
        .map(|(h, r, t)| Triple::new(h, r, t))
        .collect();
    let results = verify_triples(&state.kg, &triples);
    Json(VerifyResponse { results })
}
