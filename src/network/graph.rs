//! Exchange network graph
//!
//! Participants are nodes, candidate exchanges are directed edges
//! (provider → recipient). Backed by a `StableDiGraph` so node and edge
//! indices stay valid across removals, with id → index maps for O(1)
//! lookup by participant or edge id.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::types::{Edge, Node};

/// The exchange network
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    graph: StableDiGraph<Node, Edge>,
    node_index: HashMap<String, NodeIndex>,
    edge_index: HashMap<String, EdgeIndex>,
    /// Live nodes in insertion order (freed slots get reused by petgraph)
    order: Vec<NodeIndex>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================
    // NODES
    // ============================================

    /// Insert a participant, replacing any existing node with the same id.
    /// Edges attached to a replaced node are kept.
    pub fn add_node(&mut self, node: Node) {
        if let Some(&idx) = self.node_index.get(&node.id) {
            self.graph[idx] = node;
            return;
        }

        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        self.order.push(idx);
    }

    /// Remove a participant and every edge touching it (both directions)
    pub fn remove_node(&mut self, node_id: &str) -> Option<Node> {
        let idx = self.node_index.remove(node_id)?;

        let touching: Vec<String> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| e.weight().id.clone())
            .collect();

        for edge_id in &touching {
            self.remove_edge(edge_id);
        }

        self.order.retain(|&i| i != idx);
        debug!("Removed node {} and {} edges", node_id, touching.len());
        self.graph.remove_node(idx)
    }

    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        self.node_index.get(node_id).map(|&idx| &self.graph[idx])
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node_index.contains_key(node_id)
    }

    /// All participants, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().map(move |&idx| &self.graph[idx])
    }

    // ============================================
    // EDGES
    // ============================================

    /// Insert an edge, replacing any existing edge with the same id.
    ///
    /// Returns false and leaves the graph untouched (including any edge
    /// already stored under this id) when either endpoint is not a
    /// registered node.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        let (Some(&from), Some(&to)) = (
            self.node_index.get(&edge.from_id),
            self.node_index.get(&edge.to_id),
        ) else {
            warn!(
                "Rejected edge {}: endpoint {} → {} not in graph",
                edge.id, edge.from_id, edge.to_id
            );
            return false;
        };

        if self.edge_index.contains_key(&edge.id) {
            self.remove_edge(&edge.id);
        }

        let id = edge.id.clone();
        let idx = self.graph.add_edge(from, to, edge);
        self.edge_index.insert(id, idx);
        true
    }

    /// Remove an edge by id; no-op if absent
    pub fn remove_edge(&mut self, edge_id: &str) -> Option<Edge> {
        let idx = self.edge_index.remove(edge_id)?;
        self.graph.remove_edge(idx)
    }

    pub fn get_edge(&self, edge_id: &str) -> Option<&Edge> {
        self.edge_index.get(edge_id).map(|&idx| &self.graph[idx])
    }

    /// Edges supplied by this participant; empty if unknown
    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.directed_edges(node_id, Direction::Outgoing)
    }

    /// Edges received by this participant; empty if unknown
    pub fn incoming_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.directed_edges(node_id, Direction::Incoming)
    }

    fn directed_edges(&self, node_id: &str, dir: Direction) -> Vec<&Edge> {
        match self.node_index.get(node_id) {
            Some(&idx) => self
                .graph
                .edges_directed(idx, dir)
                .map(|e| e.weight())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Distinct participants reachable by one outgoing edge
    pub fn neighbours(&self, node_id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.outgoing_edges(node_id)
            .into_iter()
            .map(|e| e.to_id.as_str())
            .filter(|to| seen.insert(*to))
            .collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_indices().map(move |idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // ============================================
    // INDEXED ACCESS (cycle search hot path)
    // ============================================

    pub(crate) fn index_of(&self, node_id: &str) -> Option<NodeIndex> {
        self.node_index.get(node_id).copied()
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    /// Node indices in insertion order
    pub(crate) fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.order.iter().copied()
    }

    /// Outgoing edges as (target index, edge) pairs
    pub(crate) fn outgoing_indexed(
        &self,
        idx: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, &Edge)> + '_ {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    pub(crate) fn edge(id: &str, from: &str, to: &str, weight: f64) -> Edge {
        Edge::scored(id, from, to, format!("off-{}", id), None, weight)
    }

    pub(crate) fn graph_with(nodes: &[&str], edges: &[(&str, &str, &str, f64)]) -> NetworkGraph {
        let mut graph = NetworkGraph::new();
        for id in nodes {
            graph.add_node(Node::new(*id, 0.8));
        }
        for (id, from, to, weight) in edges {
            assert!(graph.add_edge(edge(id, from, to, *weight)));
        }
        graph
    }

    /// Every stored edge appears exactly in its endpoints' adjacency, and nowhere else
    fn assert_adjacency_consistent(graph: &NetworkGraph) {
        let mut outgoing_total = 0;
        let mut incoming_total = 0;

        for node in graph.nodes() {
            for e in graph.outgoing_edges(&node.id) {
                assert_eq!(e.from_id, node.id);
                assert!(graph.get_edge(&e.id).is_some());
                outgoing_total += 1;
            }
            for e in graph.incoming_edges(&node.id) {
                assert_eq!(e.to_id, node.id);
                assert!(graph.get_edge(&e.id).is_some());
                incoming_total += 1;
            }
        }

        assert_eq!(outgoing_total, graph.edge_count());
        assert_eq!(incoming_total, graph.edge_count());
        assert_eq!(graph.edges().count(), graph.edge_count());
    }

    #[test]
    fn test_add_and_lookup() {
        let graph = graph_with(
            &["alice", "bob", "carol"],
            &[("e1", "alice", "bob", 0.9), ("e2", "bob", "carol", 0.5)],
        );

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.get_edge("e1").map(|e| e.to_id.as_str()), Some("bob"));
        assert!(graph.get_node("dave").is_none());
        assert!(graph.get_edge("e9").is_none());
        assert_eq!(graph.neighbours("alice"), vec!["bob"]);
        assert_eq!(graph.incoming_edges("carol").len(), 1);
        assert!(graph.outgoing_edges("dave").is_empty());
    }

    #[test]
    fn test_add_node_is_idempotent_and_keeps_edges() {
        let mut graph = graph_with(&["alice", "bob"], &[("e1", "alice", "bob", 0.9)]);

        graph.add_node(Node::new("alice", 0.2));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.get_node("alice").map(|n| n.trust_score), Some(0.2));
        assert_eq!(graph.outgoing_edges("alice").len(), 1);
    }

    #[test]
    fn test_replacing_edge_clears_stale_adjacency() {
        let mut graph = graph_with(
            &["alice", "bob", "carol"],
            &[("e1", "alice", "bob", 0.9)],
        );

        assert!(graph.add_edge(edge("e1", "alice", "carol", 0.4)));

        assert_eq!(graph.edge_count(), 1);
        assert!(graph.incoming_edges("bob").is_empty());
        assert_eq!(graph.neighbours("alice"), vec!["carol"]);
        assert_adjacency_consistent(&graph);
    }

    #[test]
    fn test_edge_to_unknown_node_is_rejected() {
        let mut graph = graph_with(&["alice"], &[]);
        assert!(!graph.add_edge(edge("e1", "alice", "ghost", 0.5)));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_rejected_replacement_keeps_existing_edge() {
        let mut graph = graph_with(&["alice", "bob"], &[("e1", "alice", "bob", 0.9)]);

        assert!(!graph.add_edge(edge("e1", "alice", "ghost", 0.4)));

        assert_eq!(graph.edge_count(), 1);
        let kept = graph.get_edge("e1").unwrap();
        assert_eq!(kept.to_id, "bob");
        assert_eq!(kept.weight, 0.9);
        assert_eq!(graph.outgoing_edges("alice").len(), 1);
        assert_adjacency_consistent(&graph);
    }

    #[test]
    fn test_nodes_keep_insertion_order_after_slot_reuse() {
        let mut graph = graph_with(&["a", "b", "c"], &[]);
        graph.remove_node("b");
        graph.add_node(Node::new("d", 0.5));
        graph.add_node(Node::new("a", 0.9));

        let ids: Vec<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);

        let by_index: Vec<&str> = graph
            .node_indices()
            .map(|idx| graph.node_at(idx).id.as_str())
            .collect();
        assert_eq!(by_index, ids);
        assert!(!graph.contains_node("b"));
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut graph = graph_with(
            &["alice", "bob", "carol"],
            &[
                ("e1", "alice", "bob", 0.9),
                ("e2", "bob", "carol", 0.5),
                ("e3", "carol", "bob", 0.5),
                ("e4", "carol", "alice", 0.7),
            ],
        );

        let removed = graph.remove_node("bob");

        assert_eq!(removed.map(|n| n.id), Some("bob".to_string()));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.get_edge("e1").is_none());
        assert!(graph.get_edge("e3").is_none());
        assert!(graph.get_edge("e4").is_some());
        assert!(graph.remove_node("bob").is_none());
        assert_adjacency_consistent(&graph);
    }

    #[test]
    fn test_neighbours_are_distinct() {
        let graph = graph_with(
            &["alice", "bob"],
            &[("e1", "alice", "bob", 0.9), ("e2", "alice", "bob", 0.4)],
        );
        assert_eq!(graph.neighbours("alice"), vec!["bob"]);
        assert_eq!(graph.outgoing_edges("alice").len(), 2);
    }

    #[test]
    fn test_random_mutations_keep_adjacency_consistent() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut graph = NetworkGraph::new();
        let ids: Vec<String> = (0..8).map(|i| format!("p{}", i)).collect();

        for _ in 0..500 {
            match rng.gen_range(0..5) {
                0 => graph.add_node(Node::new(ids[rng.gen_range(0..ids.len())].clone(), 0.5)),
                1 => {
                    graph.remove_node(&ids[rng.gen_range(0..ids.len())]);
                }
                2 | 3 => {
                    let id = format!("e{}", rng.gen_range(0..20));
                    let from = &ids[rng.gen_range(0..ids.len())];
                    let to = &ids[rng.gen_range(0..ids.len())];
                    graph.add_edge(edge(&id, from, to, 0.5));
                }
                _ => {
                    graph.remove_edge(&format!("e{}", rng.gen_range(0..20)));
                }
            }
            assert_adjacency_consistent(&graph);
        }
    }
}
