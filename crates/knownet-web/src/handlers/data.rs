//! Conversation subgraph endpoint.
//!
//! Given the triples of a new or continuing conversation, returns the
//! knowledge-graph subgraph induced by their entities plus follow-up
//! recommendations, and folds the subgraph into the session's flow graph.

use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use knownet_graph::builder::{VisEdge, VisNode};
use knownet_kg::recommend::{recommend, RecommendRequest};

use crate::error::ApiError;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize)]
pub struct DataRequest {
    /// "new_conversation" | "continue_conversation"
    pub input_type: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub data: DataPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct DataPayload {
    #[serde(default)]
    pub triples: Vec<(String, String, String)>,
}

#[derive(Debug, Serialize)]
pub struct VisRes {
    pub nodes: Vec<VisNode>,
    pub edges: Vec<VisEdge>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationItem {
    pub id: usize,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct DataBody {
    pub vis_res: VisRes,
    /// KG entity name → the name used in the conversation, where they differ.
    pub node_name_mapping: HashMap<String, String>,
    pub recommendation: Vec<RecommendationItem>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub status: String,
    pub message: String,
    pub data: DataBody,
}

/// POST /api/data — resolve conversation entities against the KG.
pub async fn data_submit(
    State(state): State<SharedState>,
    Json(payload): Json<DataRequest>,
) -> Result<Json<DataResponse>, ApiError> {
    if !matches!(payload.input_type.as_str(), "new_conversation" | "continue_conversation") {
        return Err(ApiError::bad_request(format!(
            "unknown input_type: {}",
            payload.input_type
        )));
    }

    // Entities in mention order, de-duplicated case-insensitively.
    let mut names: Vec<String> = Vec::new();
    for (subject, _, object) in &payload.data.triples {
        for name in [subject, object] {
            let name = name.trim();
            if !name.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.to_string());
            }
        }
    }

    let resolved: Vec<_> = names
        .iter()
        .filter_map(|name| state.kg.resolve(name).map(|idx| (name.clone(), idx)))
        .collect();

    let mut node_name_mapping = HashMap::new();
    let nodes: Vec<VisNode> = resolved
        .iter()
        .map(|(query_name, idx)| {
            let node = state.kg.node(*idx);
            if node.name != *query_name {
                node_name_mapping.insert(node.name.clone(), query_name.clone());
            }
            VisNode {
                id: idx.index().to_string(),
                name: node.name.clone(),
                category: Some(node.category.as_str().to_string()),
                cui: node.cui.clone(),
            }
        })
        .collect();

    let mut edges = Vec::new();
    for (i, (_, a)) in resolved.iter().enumerate() {
        for (_, b) in resolved.iter().skip(i + 1) {
            for edge in state.kg.edges_between(*a, *b) {
                edges.push(VisEdge {
                    source: a.index().to_string(),
                    target: b.index().to_string(),
                    relation: edge.rel_type.clone(),
                    papers: edge.papers.clone(),
                });
            }
        }
    }

    let recommendation: Vec<RecommendationItem> = resolved
        .first()
        .map(|(name, _)| {
            let req = RecommendRequest {
                head: name.clone(),
                k: 5,
                whitelist: Vec::new(),
                per_category_cap: 2,
                exclude: names.clone(),
            };
            recommend(&state.kg, &req)
                .into_iter()
                .enumerate()
                .map(|(id, s)| RecommendationItem { id, text: s.text })
                .collect()
        })
        .unwrap_or_default();

    if let Some(session_id) = &payload.session_id {
        let mut sessions = state.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.ingest_kg_payload(&nodes, &edges);
            state.publish(AppEvent::GraphUpdated {
                session_id: session_id.clone(),
                step: session.active_step,
                node_count: session.node_count(),
                edge_count: session.edge_count(),
            });
        }
    }

    Ok(Json(DataResponse {
        status: "success".to_string(),
        message: "chat subgraph resolved".to_string(),
        data: DataBody {
            vis_res: VisRes { nodes, edges },
            node_name_mapping,
            recommendation,
        },
    }))
}
