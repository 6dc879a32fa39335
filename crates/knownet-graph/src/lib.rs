//! knownet-graph — Conversation-linked flow-graph state.
//!
//! Turns extracted triples (or knowledge-graph query payloads) into flow
//! nodes and edges stamped with the conversation step that introduced them,
//! lays them out with a layered algorithm, and serves step-filtered views
//! with older elements de-emphasized.

pub mod model;
pub mod builder;
pub mod layout;
pub mod sync;

pub use model::{Anchor, FlowEdge, FlowElements, FlowNode, Position, Stroke};
pub use builder::{VisEdge, VisNode, from_kg_payload, from_triples};
pub use layout::{Direction, layout};
pub use sync::StepGraph;
