//! Shared application state for the web server.

use std::collections::HashMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use knownet_common::config::KnownetConfig;
use knownet_kg::store::KgStore;
use knownet_llm::LlmRouter;

use crate::session::ChatSession;

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// New triples were extracted from an assistant response
    TriplesExtracted { session_id: String, count: usize },
    /// A session's graph grew
    GraphUpdated { session_id: String, step: usize, node_count: usize, edge_count: usize },
    /// Verification finished for a batch of extracted triples
    VerificationComplete { session_id: String, supported: usize, relevant: usize, unsure: usize },
    /// General system notification
    Notification { level: String, message: String },
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: KnownetConfig,
    pub kg: Arc<KgStore>,
    pub llm: LlmRouter,
    pub sessions: RwLock<HashMap<String, ChatSession>>,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new(config: KnownetConfig, kg: KgStore, llm: LlmRouter) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            kg: Arc::new(kg),
            llm,
            sessions: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast, ignoring the no-subscribers case.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }
}

pub type SharedState = Arc<AppState>;
