//! In-memory knowledge graph store.
//!
//! An undirected multigraph over named entities: edges carry a canonical
//! relation type plus the paper identifiers supporting it. Mirrors the
//! curated supplement/health graph the service answers against. Node lookup
//! is case-insensitive by name.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use knownet_common::entities::EntityCategory;
use knownet_common::error::{KnownetError, Result};
use knownet_common::relations::normalize_relation;

/// A stored entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KgNode {
    pub name: String,
    pub category: EntityCategory,
    /// Concept identifier carried over from the source vocabulary, if any.
    pub cui: Option<String>,
}

/// A typed, evidence-backed connection between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KgEdge {
    pub rel_type: String,
    pub papers: Vec<String>,
}

impl KgEdge {
    /// Evidence strength: one unit per supporting paper, at least one.
    pub fn evidence(&self) -> usize {
        self.papers.len().max(1)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KgStats {
    pub node_count: usize,
    pub edge_count: usize,
}

/// A 2-hop connection through one intermediate node.
#[derive(Debug, Clone, Serialize)]
pub struct Bridge {
    pub name: String,
    pub first_relation: String,
    pub second_relation: String,
    pub total_weight: usize,
}

/// The store itself. Read-mostly after seeding.
#[derive(Debug, Default)]
pub struct KgStore {
    graph: UnGraph<KgNode, KgEdge>,
    by_name: HashMap<String, NodeIndex>,
}

// ── Seed document format ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SeedDoc {
    #[serde(default)]
    nodes: Vec<SeedNode>,
    #[serde(default)]
    edges: Vec<SeedEdge>,
}

#[derive(Debug, Deserialize)]
struct SeedNode {
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    cui: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedEdge {
    source: String,
    target: String,
    relation: String,
    #[serde(default)]
    papers: Vec<String>,
}

impl KgStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> KgStats {
        KgStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
        }
    }

    /// Insert or fetch an entity by name.
    pub fn upsert_entity(
        &mut self,
        name: &str,
        category: EntityCategory,
        cui: Option<String>,
    ) -> NodeIndex {
        let key = name.trim().to_lowercase();
        if let Some(&idx) = self.by_name.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(KgNode {
            name: name.trim().to_string(),
            category,
            cui,
        });
        self.by_name.insert(key, idx);
        idx
    }

    /// Add a typed relation between two existing entities. The relation label
    /// is normalized to its canonical type; repeated assertions of the same
    /// (pair, type) accumulate papers on the existing edge.
    pub fn add_relation(
        &mut self,
        head: &str,
        relation: &str,
        tail: &str,
        papers: Vec<String>,
    ) -> Result<()> {
        let h = self
            .resolve(head)
            .ok_or_else(|| KnownetError::EntityNotFound(head.to_string()))?;
        let t = self
            .resolve(tail)
            .ok_or_else(|| KnownetError::EntityNotFound(tail.to_string()))?;
        let rel_type = normalize_relation(relation);

        let existing = self
            .graph
            .edges_connecting(h, t)
            .find(|e| e.weight().rel_type == rel_type)
            .map(|e| e.id());
        match existing {
            Some(eid) => {
                let edge = &mut self.graph[eid];
                for p in papers {
                    if !edge.papers.contains(&p) {
                        edge.papers.push(p);
                    }
                }
            }
            None => {
                self.graph.add_edge(h, t, KgEdge { rel_type, papers });
            }
        }
        Ok(())
    }

    /// Case-insensitive entity lookup.
    pub fn resolve(&self, name: &str) -> Option<NodeIndex> {
        self.by_name.get(&name.trim().to_lowercase()).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &KgNode {
        &self.graph[idx]
    }

    /// All edges between two entities, any type.
    pub fn edges_between(&self, a: NodeIndex, b: NodeIndex) -> Vec<&KgEdge> {
        self.graph.edges_connecting(a, b).map(|e| e.weight()).collect()
    }

    /// All incident edges with the node on the other end.
    pub fn neighbors(&self, idx: NodeIndex) -> Vec<(NodeIndex, &KgEdge)> {
        self.graph
            .edges(idx)
            .map(|e| {
                let other = if e.source() == idx { e.target() } else { e.source() };
                (other, e.weight())
            })
            .collect()
    }

    /// Best bridge node connecting `a` and `b` through one intermediate,
    /// ranked by combined evidence of the two hops.
    pub fn two_hop_bridge(&self, a: NodeIndex, b: NodeIndex) -> Option<Bridge> {
        let mut best: Option<Bridge> = None;
        for (mid, e1) in self.neighbors(a) {
            if mid == a || mid == b {
                continue;
            }
            for e2 in self.edges_between(mid, b) {
                let weight = e1.evidence() + e2.evidence();
                if best.as_ref().map_or(true, |c| weight > c.total_weight) {
                    best = Some(Bridge {
                        name: self.graph[mid].name.clone(),
                        first_relation: e1.rel_type.clone(),
                        second_relation: e2.rel_type.clone(),
                        total_weight: weight,
                    });
                }
            }
        }
        best
    }

    // ── Seeding ──────────────────────────────────────────────────────────────

    /// Load a `{"nodes": [...], "edges": [...]}` JSON document into the store.
    pub fn load_json(&mut self, raw: &str) -> Result<()> {
        let doc: SeedDoc = serde_json::from_str(raw)?;
        for n in &doc.nodes {
            let category = EntityCategory::normalize(&n.name, n.category.as_deref());
            self.upsert_entity(&n.name, category, n.cui.clone());
        }
        for e in &doc.edges {
            // Seed edges may reference nodes the document forgot to declare.
            if self.resolve(&e.source).is_none() {
                self.upsert_entity(&e.source, EntityCategory::normalize(&e.source, None), None);
            }
            if self.resolve(&e.target).is_none() {
                self.upsert_entity(&e.target, EntityCategory::normalize(&e.target, None), None);
            }
            self.add_relation(&e.source, &e.relation, &e.target, e.papers.clone())?;
        }
        tracing::info!(
            nodes = self.node_count(),
            edges = self.edge_count(),
            "knowledge graph seeded"
        );
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut store = Self::new();
        store.load_json(&raw)?;
        Ok(store)
    }

    /// Small built-in graph used by tests and by dev setups without a seed file.
    pub fn demo() -> Self {
        let mut s = Self::new();
        let sup = EntityCategory::DietarySupplement;
        let dis = EntityCategory::Disorders;
        let phy = EntityCategory::Physiology;
        let chem = EntityCategory::ChemicalsDrugs;

        s.upsert_entity("coenzyme Q10", sup.clone(), Some("DC0056077".into()));
        s.upsert_entity("Congestive heart failure", dis.clone(), Some("C0018802".into()));
        s.upsert_entity("Diabetes", dis.clone(), Some("C0011847".into()));
        s.upsert_entity("Insulin Sensitivity", phy.clone(), Some("C0920563".into()));
        s.upsert_entity("Fish Oil", sup.clone(), None);
        s.upsert_entity("Omega-3 fatty acids", chem, None);
        s.upsert_entity("cognitive decline", phy.clone(), None);
        s.upsert_entity("Inflammation", phy, None);
        s.upsert_entity("Alzheimer's disease", dis, Some("C0002395".into()));
        s.upsert_entity("Ginkgo biloba", sup.clone(), None);
        s.upsert_entity("Vitamin E", sup, None);

        let facts: &[(&str, &str, &str, &[&str])] = &[
            ("coenzyme Q10", "ASSOCIATED_WITH", "Congestive heart failure", &["23221577", "31687097"]),
            ("coenzyme Q10", "AFFECTS", "Congestive heart failure", &["23221577"]),
            ("coenzyme Q10", "TREATS", "Diabetes", &["24593795"]),
            ("Insulin Sensitivity", "AFFECTS", "Diabetes", &["22005267", "26232096"]),
            ("Fish Oil", "INTERACTS_WITH", "Omega-3 fatty acids", &["19391122"]),
            ("Omega-3 fatty acids", "INHIBITS", "cognitive decline", &["26795198", "28466678"]),
            ("Omega-3 fatty acids", "INHIBITS", "Inflammation", &["12480795"]),
            ("Ginkgo biloba", "AFFECTS", "Alzheimer's disease", &["9343463"]),
            ("Vitamin E", "INHIBITS", "cognitive decline", &["24381967"]),
            ("Alzheimer's disease", "ASSOCIATED_WITH", "cognitive decline", &["15324362"]),
        ];
        for (h, r, t, papers) in facts {
            let papers = papers.iter().map(|p| p.to_string()).collect();
            // All endpoints were inserted above.
            s.add_relation(h, r, t, papers).expect("demo entities exist");
        }
        s
    }
}
