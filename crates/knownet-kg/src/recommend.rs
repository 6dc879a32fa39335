//! Neighbor recommendation: 1-hop suggestions for "tell me more" follow-ups.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use knownet_common::entities::EntityCategory;

use crate::store::KgStore;

fn default_k() -> usize { 5 }
fn default_per_category_cap() -> usize { 2 }

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    /// Entity to expand from.
    pub head: String,

    #[serde(default = "default_k")]
    pub k: usize,

    /// Allowed relation types; empty means all.
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Diversity cap: at most this many suggestions per tail category
    /// before the pool tops the list up.
    #[serde(default = "default_per_category_cap", alias = "per_type_cap")]
    pub per_category_cap: usize,

    /// Tail names to leave out (case-insensitive).
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
    pub category: EntityCategory,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    /// Ready-made follow-up prompt shown to the user.
    pub text: String,
    pub head: EntityRef,
    pub relation: String,
    pub tail: EntityRef,
    pub count: usize,
    pub source: String,
}

#[derive(Debug, Clone)]
struct Candidate {
    tail_idx: petgraph::graph::NodeIndex,
    tail_name: String,
    rel_type: String,
    evidence: usize,
}

/// Rank 1-hop neighbors of `head` and turn the best into follow-up
/// suggestions. An unknown head yields an empty list.
pub fn recommend(store: &KgStore, req: &RecommendRequest) -> Vec<Suggestion> {
    let Some(head_idx) = store.resolve(&req.head) else {
        return Vec::new();
    };
    let head_node = store.node(head_idx);

    let whitelist: Vec<String> = req.whitelist.iter().map(|w| w.to_uppercase()).collect();
    let exclude: Vec<String> = req
        .exclude
        .iter()
        .map(|e| e.trim().to_lowercase())
        .collect();

    let mut pool: Vec<Candidate> = store
        .neighbors(head_idx)
        .into_iter()
        .filter(|(_, edge)| whitelist.is_empty() || whitelist.contains(&edge.rel_type))
        .filter(|(tail, _)| !exclude.contains(&store.node(*tail).name.to_lowercase()))
        .map(|(tail, edge)| Candidate {
            tail_idx: tail,
            tail_name: store.node(tail).name.clone(),
            rel_type: edge.rel_type.clone(),
            evidence: edge.evidence(),
        })
        .collect();

    pool.sort_by(|a, b| {
        b.evidence
            .cmp(&a.evidence)
            .then_with(|| a.rel_type.cmp(&b.rel_type))
            .then_with(|| a.tail_name.to_lowercase().cmp(&b.tail_name.to_lowercase()))
    });
    pool.truncate((req.k * 6).max(30));

    // Round-robin across tail categories under the cap, then top up from the
    // pool regardless of category until k.
    let mut picked: Vec<&Candidate> = Vec::new();
    let mut per_category: HashMap<&'static str, usize> = HashMap::new();
    for cand in &pool {
        if picked.len() >= req.k {
            break;
        }
        let cat = store.node(cand.tail_idx).category.as_str();
        let used = per_category.entry(cat).or_insert(0);
        if *used < req.per_category_cap {
            *used += 1;
            picked.push(cand);
        }
    }
    if picked.len() < req.k {
        for cand in &pool {
            if picked.len() >= req.k {
                break;
            }
            if !picked
                .iter()
                .any(|p| p.tail_idx == cand.tail_idx && p.rel_type == cand.rel_type)
            {
                picked.push(cand);
            }
        }
    }

    picked
        .into_iter()
        .map(|c| {
            let tail_node = store.node(c.tail_idx);
            Suggestion {
                text: format!("Show me more about {} and {}", head_node.name, c.tail_name),
                head: EntityRef {
                    id: format!("kg:{}", head_idx.index()),
                    name: head_node.name.clone(),
                    category: head_node.category.clone(),
                },
                relation: c.rel_type.clone(),
                tail: EntityRef {
                    id: format!("kg:{}", c.tail_idx.index()),
                    name: tail_node.name.clone(),
                    category: tail_node.category.clone(),
                },
                count: c.evidence,
                source: "1-hop".to_string(),
            }
        })
        .collect()
}
