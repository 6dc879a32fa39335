//! Step-synchronized graph state for one conversation.
//!
//! Elements accumulate across conversation steps and are never removed:
//! each view shows everything introduced at or before the requested step,
//! with elements from older steps de-emphasized by opacity. Node content is
//! immutable after creation; only category upgrades, verification results,
//! and layout output mutate existing elements.

use std::collections::{HashMap, HashSet};

use knownet_common::config::LayoutConfig;
use knownet_common::entities::{color_for_category, RESERVED_GRAYS};
use knownet_common::relations::normalize_relation;
use knownet_kg::verify::{UiHint, Verification};

use crate::layout::{layout, Direction};
use crate::model::{FlowEdge, FlowElements, FlowNode, Stroke};

const ACTIVE_NODE_OPACITY: f64 = 1.0;
const FADED_NODE_OPACITY: f64 = 0.6;
const ACTIVE_EDGE_OPACITY: f64 = 1.0;
const FADED_EDGE_OPACITY: f64 = 0.4;

/// Append-only flow-graph state, staged by conversation step.
#[derive(Debug, Default)]
pub struct StepGraph {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    node_index: HashMap<String, usize>,
    edge_ids: HashSet<String>,
    /// Labels containing any of these terms are too generic to draw.
    high_level_terms: Vec<String>,
}

impl StepGraph {
    pub fn new(high_level_terms: Vec<String>) -> Self {
        Self {
            high_level_terms: high_level_terms
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Highest step any element carries.
    pub fn max_step(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.step)
            .chain(self.edges.iter().map(|e| e.step))
            .max()
            .unwrap_or(0)
    }

    fn is_high_level(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.high_level_terms.iter().any(|t| label.contains(t))
    }

    /// A category rewrite is an upgrade when the old one was uninformative
    /// (or rendered gray) and the new one says something.
    fn is_upgrade(old: &FlowNode, new: &FlowNode) -> bool {
        if new.category.is_uninformative() {
            return false;
        }
        old.category.is_uninformative()
            || RESERVED_GRAYS.contains(&old.color.as_str())
            || new.category != old.category
    }

    /// Fold a freshly built batch into the accumulated state, stamping new
    /// elements with `step`. Existing nodes keep their introduction step;
    /// an informative category arriving later upgrades category and color.
    pub fn merge(&mut self, batch: FlowElements, step: usize) {
        for mut node in batch.nodes {
            if self.is_high_level(&node.label) {
                continue;
            }
            match self.node_index.get(&node.id) {
                None => {
                    node.step = step;
                    self.node_index.insert(node.id.clone(), self.nodes.len());
                    self.nodes.push(node);
                }
                Some(&i) => {
                    let existing = &mut self.nodes[i];
                    if Self::is_upgrade(existing, &node) {
                        existing.color =
                            color_for_category(&node.category, &node.label).to_string();
                        existing.category = node.category;
                    }
                }
            }
        }
        for mut edge in batch.edges {
            if !self.edge_ids.contains(&edge.id)
                && self.node_index.contains_key(&edge.source)
                && self.node_index.contains_key(&edge.target)
            {
                edge.step = step;
                self.edge_ids.insert(edge.id.clone());
                self.edges.push(edge);
            }
        }
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            step,
            "graph state merged"
        );
    }

    /// Attach verification outcomes to their edges. Matching tries the
    /// normalized relation first, then the raw label.
    pub fn apply_verifications(&mut self, results: &[Verification]) {
        let key = |h: &str, r: &str, t: &str| {
            format!("{}|{}|{}", h.to_lowercase(), r.to_lowercase(), t.to_lowercase())
        };
        let mut by_key: HashMap<String, &Verification> = HashMap::new();
        for v in results {
            by_key.insert(key(&v.head, &v.relation, &v.tail), v);
        }

        for edge in &mut self.edges {
            let head = edge.source.trim_start_matches("node-");
            let tail = edge.target.trim_start_matches("node-");
            let norm = normalize_relation(&edge.relation);
            let hit = by_key
                .get(&key(head, &norm, tail))
                .or_else(|| by_key.get(&key(head, &edge.relation, tail)));
            let Some(v) = hit else { continue };

            edge.label = format!("{} | {}", edge.relation, v.count);
            edge.stroke = match v.ui_hint {
                UiHint::Solid => Stroke::Solid,
                UiHint::Weak => Stroke::Dashed,
                UiHint::Missing => Stroke::Dotted,
            };
            edge.verification = Some(v.status);
            if !v.papers.is_empty() {
                edge.papers.insert(v.rel_norm.clone(), v.papers.clone());
            }
        }
    }

    /// Relayout every node in place.
    pub fn relayout(&mut self, direction: Direction, cfg: &LayoutConfig) {
        layout(&mut self.nodes, &self.edges, direction, cfg);
    }

    /// Step-filtered view: everything introduced at or before `active_step`,
    /// with the active step at full opacity and older steps faded.
    pub fn view(&self, active_step: usize) -> FlowElements {
        let nodes = self
            .nodes
            .iter()
            .filter(|n| n.step <= active_step)
            .map(|n| {
                let mut n = n.clone();
                n.opacity = if n.step == active_step {
                    ACTIVE_NODE_OPACITY
                } else {
                    FADED_NODE_OPACITY
                };
                n
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| e.step <= active_step)
            .map(|e| {
                let mut e = e.clone();
                e.opacity = if e.step == active_step {
                    ACTIVE_EDGE_OPACITY
                } else {
                    FADED_EDGE_OPACITY
                };
                e
            })
            .collect();
        FlowElements { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::from_triples;
    use knownet_common::entities::EntityCategory;
    use knownet_kg::extraction::Triple;
    use knownet_kg::store::KgStore;
    use knownet_kg::verify::verify_triples;

    fn graph() -> StepGraph {
        StepGraph::new(vec!["physiology".into(), "supplement".into()])
    }

    fn batch(triples: &[Triple]) -> FlowElements {
        from_triples(triples, &HashMap::new(), 0)
    }

    #[test]
    fn test_merge_stamps_steps_and_keeps_introduction() {
        let mut g = graph();
        g.merge(batch(&[Triple::new("Fish Oil", "contain", "Omega-3 fatty acids")]), 0);
        g.merge(
            batch(&[
                Triple::new("Omega-3 fatty acids", "reduce", "cognitive decline"),
                Triple::new("Fish Oil", "contain", "Omega-3 fatty acids"),
            ]),
            1,
        );
        let view = g.view(1);
        let omega = view.nodes.iter().find(|n| n.label == "Omega-3 fatty acids").unwrap();
        // Introduced at step 0; the step-1 re-mention does not restamp it.
        assert_eq!(omega.step, 0);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_high_level_labels_are_filtered() {
        let mut g = graph();
        g.merge(batch(&[Triple::new("Dietary Supplements", "improve", "health")]), 0);
        assert_eq!(g.node_count(), 1);
        // The dangling edge is dropped with its endpoint.
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_category_upgrade() {
        let mut g = graph();
        g.merge(batch(&[Triple::new("lavender", "help", "anxiety")]), 0);
        {
            let v = g.view(0);
            let n = v.nodes.iter().find(|n| n.label == "lavender").unwrap();
            assert_eq!(n.category, EntityCategory::Objects);
        }

        let cats = HashMap::from([("lavender".to_string(), "Living Beings".to_string())]);
        let els = from_triples(&[Triple::new("lavender", "help", "anxiety")], &cats, 1);
        g.merge(els, 1);

        let v = g.view(1);
        let n = v.nodes.iter().find(|n| n.label == "lavender").unwrap();
        assert_eq!(n.category, EntityCategory::LivingBeings);
        assert_eq!(n.color, "#edc949");
    }

    #[test]
    fn test_view_filters_and_fades() {
        let mut g = graph();
        g.merge(batch(&[Triple::new("a", "r", "b")]), 0);
        g.merge(batch(&[Triple::new("b", "r", "c")]), 1);

        let early = g.view(0);
        assert_eq!(early.nodes.len(), 2);
        assert!(early.nodes.iter().all(|n| n.opacity == 1.0));

        let late = g.view(1);
        assert_eq!(late.nodes.len(), 3);
        let a = late.nodes.iter().find(|n| n.label == "a").unwrap();
        let c = late.nodes.iter().find(|n| n.label == "c").unwrap();
        assert_eq!(a.opacity, 0.6);
        assert_eq!(c.opacity, 1.0);
        let first_edge = late.edges.iter().find(|e| e.step == 0).unwrap();
        assert_eq!(first_edge.opacity, 0.4);
    }

    #[test]
    fn test_apply_verifications_rewrites_edges() {
        let store = KgStore::demo();
        let triples = vec![Triple::new("coenzyme Q10", "treat", "Diabetes")];
        let mut g = graph();
        g.merge(from_triples(&triples, &HashMap::new(), 0), 0);

        let results = verify_triples(&store, &triples);
        g.apply_verifications(&results);

        let v = g.view(0);
        let edge = &v.edges[0];
        assert_eq!(edge.label, "treat | 1");
        assert_eq!(edge.stroke, Stroke::Solid);
        assert_eq!(edge.papers["TREATS"], vec!["24593795"]);
    }

    #[test]
    fn test_unverifiable_edge_gets_dotted_stroke() {
        let store = KgStore::demo();
        let triples = vec![Triple::new("moon dust", "cures", "everything")];
        let mut g = graph();
        g.merge(from_triples(&triples, &HashMap::new(), 0), 0);
        g.apply_verifications(&verify_triples(&store, &triples));

        let v = g.view(0);
        assert_eq!(v.edges[0].stroke, Stroke::Dotted);
        assert_eq!(v.edges[0].label, "cures | 0");
    }

    #[test]
    fn test_max_step() {
        let mut g = graph();
        assert_eq!(g.max_step(), 0);
        g.merge(batch(&[Triple::new("a", "r", "b")]), 0);
        g.merge(batch(&[Triple::new("b", "r", "c")]), 3);
        assert_eq!(g.max_step(), 3);
    }
}
