//! knownet-web — HTTP surface for KnowNet.
//! Provides:
//!   - Streaming chat endpoint with post-completion triple extraction
//!   - Per-session graph views (layout direction, step staging)
//!   - Knowledge-graph verification & recommendation APIs
//!   - SSE event stream for connected clients

pub mod router;
pub mod handlers;
pub mod state;
pub mod session;
pub mod error;
pub mod sse;
