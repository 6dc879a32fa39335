//! Audit records for LLM calls.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuditEntry {
    pub id: Uuid,
    pub session_id: Option<String>,
    pub model: String,
    pub backend: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    /// SHA-256 of the completion text; the text itself is not retained.
    pub output_hash: String,
    pub latency_ms: u64,
    pub called_at: chrono::DateTime<Utc>,
}

impl LlmAuditEntry {
    pub fn new(
        session_id: Option<String>,
        model: String,
        backend: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        output: &str,
        latency_ms: u64,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(output.as_bytes());
        let output_hash = format!("{:x}", hasher.finalize());

        Self {
            id: Uuid::new_v4(),
            session_id,
            model,
            backend,
            prompt_tokens,
            completion_tokens,
            output_hash,
            latency_ms,
            called_at: Utc::now(),
        }
    }

    /// Emit the entry to the structured log.
    pub fn record(&self) {
        tracing::info!(
            id = %self.id,
            session = self.session_id.as_deref().unwrap_or("-"),
            model = %self.model,
            backend = %self.backend,
            latency_ms = self.latency_ms,
            output_hash = %self.output_hash[..12.min(self.output_hash.len())],
            "llm call audited"
        );
    }
}
