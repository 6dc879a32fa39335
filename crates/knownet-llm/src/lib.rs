//! knownet-llm — LLM backend abstraction layer.
//!
//! One trait over several chat-completion providers, a router that picks the
//! configured backend (with per-request key override), and audit records for
//! every call.

pub mod backend;
pub mod router;
pub mod audit;
pub mod prompt;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message, TextStream};
pub use router::LlmRouter;
pub use prompt::ANNOTATION_SYSTEM_PROMPT;
