//! Builds flow elements from the two upstream sources: triples extracted
//! from LLM responses, and subgraph payloads queried from the knowledge
//! graph.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use knownet_common::entities::{color_for_category, EntityCategory};
use knownet_kg::extraction::Triple;

use crate::model::{Anchor, FlowEdge, FlowElements, FlowNode, Position, Stroke};

fn new_node(label: &str, category: EntityCategory, step: usize) -> FlowNode {
    let color = color_for_category(&category, label).to_string();
    FlowNode {
        id: FlowNode::id_for(label),
        label: label.to_string(),
        category,
        step,
        position: Position::default(),
        color,
        opacity: 1.0,
        source_anchor: Anchor::Bottom,
        target_anchor: Anchor::Top,
    }
}

/// Convert extracted triples into flow elements stamped with `step`.
/// `categories` carries the raw category annotations per entity name.
pub fn from_triples(
    triples: &[Triple],
    categories: &HashMap<String, String>,
    step: usize,
) -> FlowElements {
    let mut out = FlowElements::default();
    let mut node_ids = HashSet::new();
    let mut edge_ids = HashSet::new();

    for triple in triples {
        for name in [&triple.subject, &triple.object] {
            let id = FlowNode::id_for(name);
            if node_ids.insert(id) {
                let category =
                    EntityCategory::normalize(name, categories.get(name).map(String::as_str));
                out.nodes.push(new_node(name, category, step));
            }
        }

        let edge_id = FlowEdge::id_for(&triple.subject, &triple.object);
        if edge_ids.insert(edge_id.clone()) {
            out.edges.push(FlowEdge {
                id: edge_id,
                source: FlowNode::id_for(&triple.subject),
                target: FlowNode::id_for(&triple.object),
                label: triple.predicate.clone(),
                relation: triple.predicate.clone(),
                step,
                opacity: 1.0,
                stroke: Stroke::Solid,
                papers: HashMap::new(),
                verification: None,
            });
        }
    }
    out
}

// ── Knowledge-graph subgraph payloads ─────────────────────────────────────────

/// Node record of a KG subgraph payload (the `vis_res` wire shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cui: Option<String>,
}

/// Edge record of a KG subgraph payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
    #[serde(default)]
    pub papers: Vec<String>,
}

/// Convert a KG subgraph payload into flow elements stamped with `step`.
///
/// Nodes de-duplicate by id. An edge and its reversal count as the same
/// edge; repeats accumulate their papers under the relation label instead
/// of adding a parallel edge.
pub fn from_kg_payload(nodes: &[VisNode], edges: &[VisEdge], step: usize) -> FlowElements {
    let mut out = FlowElements::default();
    let mut node_ids = HashSet::new();
    let mut edge_index: HashMap<String, usize> = HashMap::new();

    for node in nodes {
        if node_ids.insert(node.id.clone()) {
            let category = EntityCategory::normalize(&node.name, node.category.as_deref());
            let mut fnode = new_node(&node.name, category, step);
            fnode.id = node.id.clone();
            out.nodes.push(fnode);
        }
    }

    for edge in edges {
        let id = format!("e{}-{}", edge.source, edge.target);
        let rev_id = format!("e{}-{}", edge.target, edge.source);
        let existing = edge_index.get(&id).or_else(|| edge_index.get(&rev_id));
        match existing {
            Some(&i) => {
                let papers = out.edges[i].papers.entry(edge.relation.clone()).or_default();
                for p in &edge.papers {
                    if !papers.contains(p) {
                        papers.push(p.clone());
                    }
                }
            }
            None => {
                let mut papers = HashMap::new();
                papers.insert(edge.relation.clone(), edge.papers.clone());
                edge_index.insert(id.clone(), out.edges.len());
                out.edges.push(FlowEdge {
                    id,
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    label: edge.relation.clone(),
                    relation: edge.relation.clone(),
                    step,
                    opacity: 1.0,
                    stroke: Stroke::Solid,
                    papers,
                    verification: None,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples() -> Vec<Triple> {
        vec![
            Triple::new("Fish Oil", "contain", "Omega-3 fatty acids"),
            Triple::new("Omega-3 fatty acids", "reduce", "cognitive decline"),
            Triple::new("Fish Oil", "contain", "Omega-3 fatty acids"),
        ]
    }

    #[test]
    fn test_from_triples_dedups() {
        let cats = HashMap::from([(
            "Fish Oil".to_string(),
            "Dietary Supplement".to_string(),
        )]);
        let out = from_triples(&triples(), &cats, 0);
        assert_eq!(out.nodes.len(), 3);
        assert_eq!(out.edges.len(), 2);
        assert!(out.nodes.iter().all(|n| n.step == 0));
    }

    #[test]
    fn test_from_triples_categories_and_colors() {
        let cats = HashMap::from([(
            "Fish Oil".to_string(),
            "Dietary Supplement".to_string(),
        )]);
        let out = from_triples(&triples(), &cats, 1);
        let fish = out.nodes.iter().find(|n| n.label == "Fish Oil").unwrap();
        assert_eq!(fish.category, EntityCategory::DietarySupplement);
        assert_eq!(fish.color, "#91b9f4");
        // Unannotated entity falls back to the name heuristic.
        let decline = out.nodes.iter().find(|n| n.label == "cognitive decline").unwrap();
        assert_eq!(decline.category, EntityCategory::Physiology);
    }

    #[test]
    fn test_from_kg_payload_reverse_edge_accumulates() {
        let nodes = vec![
            VisNode { id: "0".into(), name: "coenzyme Q10".into(),
                      category: Some("Dietary Supplement".into()), cui: None },
            VisNode { id: "1".into(), name: "Congestive heart failure".into(),
                      category: Some("Disorders".into()), cui: None },
            // Payloads repeat nodes per edge row; dedup keeps the first.
            VisNode { id: "0".into(), name: "coenzyme Q10".into(),
                      category: Some("Dietary Supplement".into()), cui: None },
        ];
        let edges = vec![
            VisEdge { source: "0".into(), target: "1".into(),
                      relation: "ASSOCIATED_WITH".into(), papers: vec!["23221577".into()] },
            VisEdge { source: "1".into(), target: "0".into(),
                      relation: "ASSOCIATED_WITH".into(), papers: vec!["31687097".into()] },
            VisEdge { source: "0".into(), target: "1".into(),
                      relation: "AFFECTS".into(), papers: vec!["23221577".into()] },
        ];
        let out = from_kg_payload(&nodes, &edges, 2);
        assert_eq!(out.nodes.len(), 2);
        assert_eq!(out.edges.len(), 1);
        let edge = &out.edges[0];
        assert_eq!(edge.papers["ASSOCIATED_WITH"], vec!["23221577", "31687097"]);
        assert_eq!(edge.papers["AFFECTS"], vec!["23221577"]);
        assert_eq!(edge.step, 2);
    }
}
