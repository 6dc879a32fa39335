//! Flow-graph element types sent to graph clients.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use knownet_common::entities::EntityCategory;
use knownet_kg::verify::VerifyStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Which side of the node box edges attach to; follows the layout direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    Bottom,
    Left,
    Right,
}

/// Edge stroke rendering, set by verification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stroke {
    Solid,
    /// Verified only weakly (different relation or 2-hop path).
    Dashed,
    /// Nothing in the knowledge graph backs this edge.
    Dotted,
}

impl Stroke {
    /// SVG dash pattern for the stroke.
    pub fn dash_array(&self) -> Option<&'static str> {
        match self {
            Stroke::Solid => None,
            Stroke::Dashed => Some("6 4"),
            Stroke::Dotted => Some("2 4"),
        }
    }
}

/// A rendered graph node. Content (id, label) is immutable once created;
/// category/color may be upgraded and position/opacity are derived state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub category: EntityCategory,
    /// Conversation step that introduced this node.
    pub step: usize,
    pub position: Position,
    pub color: String,
    pub opacity: f64,
    pub source_anchor: Anchor,
    pub target_anchor: Anchor,
}

impl FlowNode {
    /// Node ids derive from the entity text so repeated mentions collapse.
    pub fn id_for(label: &str) -> String {
        format!("node-{label}")
    }
}

/// A rendered graph edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Display label; verification rewrites it to "{relation} | {count}".
    pub label: String,
    /// The raw predicate, kept stable across label rewrites.
    pub relation: String,
    pub step: usize,
    pub opacity: f64,
    pub stroke: Stroke,
    /// Supporting paper ids, keyed by relation type.
    #[serde(default)]
    pub papers: HashMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerifyStatus>,
}

impl FlowEdge {
    pub fn id_for(source_label: &str, target_label: &str) -> String {
        format!("edge-{source_label}-{target_label}")
    }
}

/// A node/edge batch, either freshly built or a filtered view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowElements {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl FlowElements {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
