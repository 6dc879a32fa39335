//! Triple verification against the knowledge graph.
//!
//! For each extracted triple the store is consulted with a fixed ladder:
//! exact relation match, then any relation between the endpoints, then a
//! 2-hop bridge, then nothing. Clients use the `ui_hint` to pick an edge
//! stroke: solid, dashed (weak), or dotted (missing).

use serde::{Deserialize, Serialize};

use knownet_common::relations::normalize_relation;

use crate::extraction::Triple;
use crate::store::{KgEdge, KgStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    /// The asserted relation exists between the endpoints.
    Supported,
    /// The endpoints are connected, but not by the asserted relation.
    Relevant,
    /// The graph has nothing connecting the endpoints.
    Unsure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiHint {
    Solid,
    Weak,
    Missing,
}

/// Verification outcome for one triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub head: String,
    pub relation: String,
    pub tail: String,
    pub rel_norm: String,
    pub status: VerifyStatus,
    pub count: usize,
    pub papers: Vec<String>,
    pub ui_hint: UiHint,
    /// Set when the endpoints connect through a different relation type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_relation: Option<String>,
    /// Set when only a 2-hop path exists; names the intermediate node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
}

const MAX_PAPERS: usize = 50;

fn unsure(head: &str, relation: &str, tail: &str, rel_norm: String) -> Verification {
    Verification {
        head: head.to_string(),
        relation: relation.to_string(),
        tail: tail.to_string(),
        rel_norm,
        status: VerifyStatus::Unsure,
        count: 0,
        papers: Vec::new(),
        ui_hint: UiHint::Missing,
        alt_relation: None,
        bridge: None,
    }
}

fn best_edge<'a>(edges: &[&'a KgEdge]) -> Option<&'a KgEdge> {
    edges.iter().max_by_key(|e| e.evidence()).copied()
}

/// Verify a batch of triples. Output order matches input order.
pub fn verify_triples(store: &KgStore, triples: &[Triple]) -> Vec<Verification> {
    triples.iter().map(|t| verify_one(store, t)).collect()
}

fn verify_one(store: &KgStore, triple: &Triple) -> Verification {
    let head = triple.subject.trim();
    let rel = triple.predicate.trim();
    let tail = triple.object.trim();
    let rel_norm = normalize_relation(rel);

    if head.is_empty() || rel.is_empty() || tail.is_empty() {
        return unsure(head, rel, tail, rel_norm);
    }

    let (Some(h), Some(t)) = (store.resolve(head), store.resolve(tail)) else {
        return unsure(head, rel, tail, rel_norm);
    };

    let edges = store.edges_between(h, t);
    let same: Vec<&KgEdge> = edges
        .iter()
        .filter(|e| e.rel_type == rel_norm)
        .copied()
        .collect();

    if let Some(top) = best_edge(&same) {
        return Verification {
            head: head.to_string(),
            relation: rel.to_string(),
            tail: tail.to_string(),
            rel_norm,
            status: VerifyStatus::Supported,
            count: top.evidence(),
            papers: top.papers.iter().take(MAX_PAPERS).cloned().collect(),
            ui_hint: UiHint::Solid,
            alt_relation: None,
            bridge: None,
        };
    }

    if let Some(top) = best_edge(&edges) {
        return Verification {
            head: head.to_string(),
            relation: rel.to_string(),
            tail: tail.to_string(),
            rel_norm,
            status: VerifyStatus::Relevant,
            count: top.evidence(),
            papers: top.papers.iter().take(MAX_PAPERS).cloned().collect(),
            ui_hint: UiHint::Weak,
            alt_relation: Some(top.rel_type.clone()),
            bridge: None,
        };
    }

    if let Some(bridge) = store.two_hop_bridge(h, t) {
        let mut v = unsure(head, rel, tail, rel_norm);
        v.status = VerifyStatus::Relevant;
        v.ui_hint = UiHint::Weak;
        v.bridge = Some(bridge.name);
        return v;
    }

    unsure(head, rel, tail, rel_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(s, p, o)
    }

    #[test]
    fn test_supported_with_paraphrased_relation() {
        let store = KgStore::demo();
        let out = verify_triples(&store, &[t("coenzyme Q10", "treat", "Diabetes")]);
        assert_eq!(out[0].status, VerifyStatus::Supported);
        assert_eq!(out[0].ui_hint, UiHint::Solid);
        assert_eq!(out[0].rel_norm, "TREATS");
        assert_eq!(out[0].papers, vec!["24593795"]);
    }

    #[test]
    fn test_relevant_reports_alternative_relation() {
        let store = KgStore::demo();
        let out = verify_triples(
            &store,
            &[t("coenzyme Q10", "PREVENTS", "Congestive heart failure")],
        );
        assert_eq!(out[0].status, VerifyStatus::Relevant);
        assert_eq!(out[0].ui_hint, UiHint::Weak);
        // Two relation types exist; the heavier-evidence one wins.
        assert_eq!(out[0].alt_relation.as_deref(), Some("ASSOCIATED_WITH"));
        assert_eq!(out[0].count, 2);
    }

    #[test]
    fn test_two_hop_bridge() {
        let store = KgStore::demo();
        let out = verify_triples(&store, &[t("Fish Oil", "INHIBITS", "cognitive decline")]);
        assert_eq!(out[0].status, VerifyStatus::Relevant);
        assert_eq!(out[0].bridge.as_deref(), Some("Omega-3 fatty acids"));
        assert_eq!(out[0].count, 0);
    }

    #[test]
    fn test_unknown_entities_are_unsure() {
        let store = KgStore::demo();
        let out = verify_triples(&store, &[t("unicorn horn", "TREATS", "everything")]);
        assert_eq!(out[0].status, VerifyStatus::Unsure);
        assert_eq!(out[0].ui_hint, UiHint::Missing);
    }

    #[test]
    fn test_malformed_triple() {
        let store = KgStore::demo();
        let out = verify_triples(&store, &[t("", "TREATS", "Diabetes")]);
        assert_eq!(out[0].status, VerifyStatus::Unsure);
    }

    #[test]
    fn test_batch_preserves_order() {
        let store = KgStore::demo();
        let out = verify_triples(
            &store,
            &[
                t("coenzyme Q10", "treats", "Diabetes"),
                t("nothing", "TREATS", "nowhere"),
            ],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].status, VerifyStatus::Supported);
        assert_eq!(out[1].status, VerifyStatus::Unsure);
    }
}
