//! Layered layout for the flow graph.
//!
//! A compact directed-layer algorithm in the dagre family: longest-path rank
//! assignment, one barycenter ordering sweep, fixed node boxes, and the
//! finished drawing centered on a configured canvas. Deterministic for a
//! given element order.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use knownet_common::config::LayoutConfig;

use crate::model::{Anchor, FlowEdge, FlowNode};

/// Layout direction: ranks grow top-to-bottom or left-to-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    #[serde(rename = "LR")]
    LeftRight,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TB" => Ok(Direction::TopBottom),
            "LR" => Ok(Direction::LeftRight),
            other => Err(format!("unknown layout direction: {other}")),
        }
    }
}

/// Assign positions and edge anchors to `nodes` in place.
pub fn layout(nodes: &mut [FlowNode], edges: &[FlowEdge], direction: Direction, cfg: &LayoutConfig) {
    if nodes.is_empty() {
        return;
    }

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        index.insert(node.id.as_str(), graph.add_node(i));
    }
    for edge in edges {
        if let (Some(&s), Some(&t)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
            if s != t {
                graph.add_edge(s, t, ());
            }
        }
    }

    let order = topo_order(&graph);
    let ranks = longest_path_ranks(&graph, &order);

    // Group nodes per rank in topological order, then run one barycenter
    // sweep so children line up under their parents.
    let max_rank = ranks.values().copied().max().unwrap_or(0);
    let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); max_rank + 1];
    for &idx in &order {
        layers[ranks[&idx]].push(idx);
    }
    barycenter_sweep(&graph, &ranks, &mut layers);

    // Coordinates on the primary (rank) and secondary (in-layer) axes.
    let (box_main, box_cross, gap_main, gap_cross) = match direction {
        Direction::TopBottom => (cfg.node_height, cfg.node_width, cfg.rank_gap, cfg.node_gap),
        Direction::LeftRight => (cfg.node_width, cfg.node_height, cfg.rank_gap, cfg.node_gap),
    };

    let mut positions: HashMap<NodeIndex, (f64, f64)> = HashMap::new();
    for (rank, layer) in layers.iter().enumerate() {
        let main = rank as f64 * (box_main + gap_main);
        let row_span = layer.len() as f64 * box_cross + (layer.len() as f64 - 1.0) * gap_cross;
        for (slot, &idx) in layer.iter().enumerate() {
            let cross = slot as f64 * (box_cross + gap_cross) - row_span / 2.0;
            positions.insert(idx, (main, cross));
        }
    }

    // Center the bounding box on the configured canvas.
    let (min_main, max_main) = positions
        .values()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(m, _)| {
            (lo.min(m), hi.max(m + box_main))
        });
    let (min_cross, max_cross) = positions
        .values()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, c)| {
            (lo.min(c), hi.max(c + box_cross))
        });
    let (canvas_main, canvas_cross) = match direction {
        Direction::TopBottom => (cfg.canvas_height, cfg.canvas_width),
        Direction::LeftRight => (cfg.canvas_width, cfg.canvas_height),
    };
    let shift_main = (canvas_main - (max_main - min_main)) / 2.0 - min_main;
    let shift_cross = (canvas_cross - (max_cross - min_cross)) / 2.0 - min_cross;

    for idx in graph.node_indices() {
        let i = graph[idx];
        let (main, cross) = positions[&idx];
        let (x, y) = match direction {
            Direction::TopBottom => (cross + shift_cross, main + shift_main),
            Direction::LeftRight => (main + shift_main, cross + shift_cross),
        };
        nodes[i].position.x = x;
        nodes[i].position.y = y;
        let (source_anchor, target_anchor) = match direction {
            Direction::TopBottom => (Anchor::Bottom, Anchor::Top),
            Direction::LeftRight => (Anchor::Right, Anchor::Left),
        };
        nodes[i].source_anchor = source_anchor;
        nodes[i].target_anchor = target_anchor;
    }
}

/// Topological-ish order that tolerates cycles: DFS postorder reversed,
/// visiting roots in insertion order. Back-edges are simply ignored.
fn topo_order(graph: &DiGraph<usize, ()>) -> Vec<NodeIndex> {
    let mut visited = vec![false; graph.node_count()];
    let mut post = Vec::with_capacity(graph.node_count());

    fn visit(
        graph: &DiGraph<usize, ()>,
        idx: NodeIndex,
        visited: &mut [bool],
        post: &mut Vec<NodeIndex>,
    ) {
        visited[idx.index()] = true;
        for edge in graph.edges(idx) {
            if !visited[edge.target().index()] {
                visit(graph, edge.target(), visited, post);
            }
        }
        post.push(idx);
    }

    for idx in graph.node_indices() {
        if !visited[idx.index()] {
            visit(graph, idx, &mut visited, &mut post);
        }
    }
    post.reverse();
    post
}

/// Longest-path layering: a node sits one rank below its deepest placed
/// predecessor. Isolated nodes and sources sit at rank 0.
fn longest_path_ranks(
    graph: &DiGraph<usize, ()>,
    order: &[NodeIndex],
) -> HashMap<NodeIndex, usize> {
    let mut ranks: HashMap<NodeIndex, usize> = HashMap::new();
    for &idx in order {
        let rank = graph
            .edges_directed(idx, petgraph::Direction::Incoming)
            .filter_map(|e| ranks.get(&e.source()))
            .map(|r| r + 1)
            .max()
            .unwrap_or(0);
        ranks.insert(idx, rank);
    }
    ranks
}

/// Reorder each layer (after the first) by the mean position of its
/// predecessors in the layer above. Stable, so ties keep insertion order.
fn barycenter_sweep(
    graph: &DiGraph<usize, ()>,
    ranks: &HashMap<NodeIndex, usize>,
    layers: &mut [Vec<NodeIndex>],
) {
    for rank in 1..layers.len() {
        let above: HashMap<NodeIndex, usize> = layers[rank - 1]
            .iter()
            .enumerate()
            .map(|(slot, &idx)| (idx, slot))
            .collect();
        let mut keyed: Vec<(f64, NodeIndex)> = layers[rank]
            .iter()
            .map(|&idx| {
                let parents: Vec<usize> = graph
                    .edges_directed(idx, petgraph::Direction::Incoming)
                    .filter(|e| ranks.get(&e.source()) == Some(&(rank - 1)))
                    .filter_map(|e| above.get(&e.source()).copied())
                    .collect();
                let key = if parents.is_empty() {
                    f64::MAX // parentless nodes drift to the end of the layer
                } else {
                    parents.iter().sum::<usize>() as f64 / parents.len() as f64
                };
                (key, idx)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        layers[rank] = keyed.into_iter().map(|(_, idx)| idx).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::from_triples;
    use knownet_kg::extraction::Triple;
    use std::collections::HashMap as Map;

    fn sample() -> (Vec<FlowNode>, Vec<FlowEdge>) {
        let triples = vec![
            Triple::new("Fish Oil", "contain", "Omega-3 fatty acids"),
            Triple::new("Omega-3 fatty acids", "reduce", "cognitive decline"),
            Triple::new("Omega-3 fatty acids", "fight", "Inflammation"),
        ];
        let els = from_triples(&triples, &Map::new(), 0);
        (els.nodes, els.edges)
    }

    fn node<'a>(nodes: &'a [FlowNode], label: &str) -> &'a FlowNode {
        nodes.iter().find(|n| n.label == label).unwrap()
    }

    #[test]
    fn test_ranks_follow_edges_top_bottom() {
        let (mut nodes, edges) = sample();
        layout(&mut nodes, &edges, Direction::TopBottom, &LayoutConfig::default());
        let fish = node(&nodes, "Fish Oil").position;
        let omega = node(&nodes, "Omega-3 fatty acids").position;
        let decline = node(&nodes, "cognitive decline").position;
        assert!(fish.y < omega.y);
        assert!(omega.y < decline.y);
    }

    #[test]
    fn test_left_right_transposes() {
        let (mut nodes, edges) = sample();
        layout(&mut nodes, &edges, Direction::LeftRight, &LayoutConfig::default());
        let fish = node(&nodes, "Fish Oil");
        let omega = node(&nodes, "Omega-3 fatty acids");
        assert!(fish.position.x < omega.position.x);
        assert_eq!(fish.source_anchor, Anchor::Right);
        assert_eq!(fish.target_anchor, Anchor::Left);
    }

    #[test]
    fn test_siblings_share_rank_without_overlap() {
        let (mut nodes, edges) = sample();
        layout(&mut nodes, &edges, Direction::TopBottom, &LayoutConfig::default());
        let decline = node(&nodes, "cognitive decline").position;
        let infl = node(&nodes, "Inflammation").position;
        assert_eq!(decline.y, infl.y);
        assert!((decline.x - infl.x).abs() >= LayoutConfig::default().node_width);
    }

    #[test]
    fn test_deterministic() {
        let (mut a_nodes, edges) = sample();
        let (mut b_nodes, _) = sample();
        let cfg = LayoutConfig::default();
        layout(&mut a_nodes, &edges, Direction::TopBottom, &cfg);
        layout(&mut b_nodes, &edges, Direction::TopBottom, &cfg);
        for (a, b) in a_nodes.iter().zip(&b_nodes) {
            assert_eq!(a.position, b.position);
        }
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let triples = vec![
            Triple::new("a", "r", "b"),
            Triple::new("b", "r", "c"),
            Triple::new("c", "r", "a"),
        ];
        let els = from_triples(&triples, &Map::new(), 0);
        let mut nodes = els.nodes;
        layout(&mut nodes, &els.edges, Direction::TopBottom, &LayoutConfig::default());
        // Ranks exist and are finite; the back-edge is ignored.
        assert!(nodes.iter().all(|n| n.position.y.is_finite()));
    }

    #[test]
    fn test_drawing_centers_on_canvas() {
        let (mut nodes, edges) = sample();
        let cfg = LayoutConfig::default();
        layout(&mut nodes, &edges, Direction::TopBottom, &cfg);
        let min_x = nodes.iter().map(|n| n.position.x).fold(f64::INFINITY, f64::min);
        let max_x = nodes
            .iter()
            .map(|n| n.position.x + cfg.node_width)
            .fold(f64::NEG_INFINITY, f64::max);
        let center = (min_x + max_x) / 2.0;
        assert!((center - cfg.canvas_width / 2.0).abs() < 1.0);
    }
}
