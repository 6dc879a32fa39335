//! Streaming chat endpoint.
//!
//! Relays the LLM's annotated response to the client as plain text chunks.
//! Once the stream completes, the full text is split, triples are extracted
//! and merged into the session graph at the current step, and verification
//! against the knowledge graph runs before events go out over SSE.

use axum::body::{Body, Bytes};
use axum::extract::{Json, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use knownet_kg::extraction::{extract_annotations, split_response};
use knownet_kg::verify::{verify_triples, VerifyStatus};
use knownet_llm::audit::LlmAuditEntry;
use knownet_llm::{LlmRequest, Message, ANNOTATION_SYSTEM_PROMPT};

use crate::error::ApiError;
use crate::session::ChatSession;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Session id; a fresh one is created when absent.
    pub id: Option<String>,
    /// Full transcript as the client holds it, newest question last.
    pub messages: Vec<Message>,
    /// True when the client re-asks the last question; the step stays put.
    #[serde(default)]
    pub regenerate: bool,
}

fn caller_api_key(headers: &HeaderMap) -> Option<SecretString> {
    ["x-api-key", "x-openai-key"].iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(SecretString::from)
    })
}

pub async fn chat_submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if payload.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }
    let api_key = caller_api_key(&headers);
    let session_id = payload
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    {
        let mut sessions = state.sessions.write().await;
        let session = sessions.entry(session_id.clone()).or_insert_with(|| {
            ChatSession::new(session_id.clone(), state.config.kg.high_level_terms.clone())
        });
        session.begin_turn(payload.regenerate);
    }

    let mut messages = vec![Message::system(ANNOTATION_SYSTEM_PROMPT)];
    messages.extend(payload.messages.iter().cloned());
    let req = LlmRequest {
        messages,
        model: None,
        max_tokens: Some(state.config.llm.max_tokens),
        temperature: Some(state.config.llm.temperature),
    };

    let started = std::time::Instant::now();
    let mut upstream = state.llm.route_stream(req, api_key).await?;

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(32);
    let task_state = state.clone();
    let task_session = session_id.clone();
    let user_messages = payload.messages;
    tokio::spawn(async move {
        let mut full = String::new();
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(text) => {
                    full.push_str(&text);
                    // A closed receiver means the client hung up; keep
                    // draining so the session still learns the triples.
                    let _ = tx.send(Ok(Bytes::from(text))).await;
                }
                Err(e) => {
                    tracing::error!(session = %task_session, "LLM stream failed: {e}");
                    let _ = tx.send(Err(std::io::Error::other(e.to_string()))).await;
                    return;
                }
            }
        }
        drop(tx);
        finish_turn(task_state, &task_session, &user_messages, &full, started.elapsed()).await;
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        [(header::HeaderName::from_static("x-session-id"), session_id)],
        body,
    )
        .into_response())
}

/// Post-completion pipeline: transcript, extraction, graph merge,
/// verification, events, audit.
async fn finish_turn(
    state: SharedState,
    session_id: &str,
    user_messages: &[Message],
    full: &str,
    latency: Duration,
) {
    let (prose, question_entities) = split_response(full);
    let extraction = extract_annotations(prose);
    let question_entity_count = question_entities.len();

    let (fresh, step, node_count, edge_count) = {
        let mut sessions = state.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return;
        };
        session.record_exchange(user_messages, prose.trim());
        session.question_entities = question_entities;
        let fresh = session.ingest_extraction(&extraction);
        (fresh, session.active_step, session.node_count(), session.edge_count())
    };

    LlmAuditEntry::new(
        Some(session_id.to_string()),
        state.llm.model_id(),
        state.config.llm.provider.clone(),
        0,
        0,
        full,
        latency.as_millis() as u64,
    )
    .record();

    tracing::debug!(
        session = session_id,
        question_entities = question_entity_count,
        triples = fresh.len(),
        "assistant turn parsed"
    );
    if fresh.is_empty() {
        return;
    }

    state.publish(AppEvent::TriplesExtracted {
        session_id: session_id.to_string(),
        count: fresh.len(),
    });
    state.publish(AppEvent::GraphUpdated {
        session_id: session_id.to_string(),
        step,
        node_count,
        edge_count,
    });

    let results = verify_triples(&state.kg, &fresh);
    let count_of = |s: VerifyStatus| results.iter().filter(|r| r.status == s).count();
    let (supported, relevant, unsure) = (
        count_of(VerifyStatus::Supported),
        count_of(VerifyStatus::Relevant),
        count_of(VerifyStatus::Unsure),
    );
    {
        let mut sessions = state.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.apply_verifications(&results);
        }
    }
    state.publish(AppEvent::VerificationComplete {
        session_id: session_id.to_string(),
        supported,
        relevant,
        unsure,
    });
}
