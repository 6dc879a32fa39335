//! knownet-kg — Annotation extraction, the in-memory knowledge graph,
//! triple verification, and neighbor recommendation.

pub mod extraction;
pub mod store;
pub mod verify;
pub mod recommend;

pub use extraction::{Extraction, Triple, extract_annotations, split_response};
pub use store::{KgStore, KgStats};
pub use verify::{Verification, VerifyStatus, UiHint, verify_triples};
pub use recommend::{RecommendRequest, Suggestion, recommend};
