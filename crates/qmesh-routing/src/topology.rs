//! Topology store
//!
//! A directed graph of peer ids. Edges are added in both directions whenever a
//! peer declares a neighbor, carry a weight (1 unless changed) and are never
//! duplicated. Removing a peer from the address table does not touch this
//! graph; [`Topology::remove_node`] is the separate operation that does.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use qmesh_core::{PeerId, RoutingError, RoutingResult};

/// Weight given to newly added edges
pub const DEFAULT_EDGE_WEIGHT: u32 = 1;

/// Directed peer graph
#[derive(Debug, Clone, Default)]
pub struct Topology {
    graph: StableDiGraph<PeerId, u32>,
    index: HashMap<PeerId, NodeIndex>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index; existing nodes are left untouched
    pub fn add_node(&mut self, peer: &PeerId) -> NodeIndex {
        if let Some(&index) = self.index.get(peer) {
            return index;
        }
        let index = self.graph.add_node(peer.clone());
        self.index.insert(peer.clone(), index);
        index
    }

    /// Connect `a` and `b` in both directions
    ///
    /// Each missing direction is added with the default weight. Returns the
    /// number of edges added, so re-connecting is a no-op returning 0.
    pub fn connect(&mut self, a: &PeerId, b: &PeerId) -> usize {
        if a == b {
            return 0;
        }

        let ia = self.add_node(a);
        let ib = self.add_node(b);
        let mut added = 0;
        for (from, to) in [(ia, ib), (ib, ia)] {
            if self.graph.find_edge(from, to).is_none() {
                self.graph.add_edge(from, to, DEFAULT_EDGE_WEIGHT);
                added += 1;
            }
        }
        added
    }

    /// Register `peer` and connect it to every declared neighbor
    pub fn add_peer(&mut self, peer: &PeerId, neighbors: &[PeerId]) -> usize {
        self.add_node(peer);
        neighbors
            .iter()
            .map(|neighbor| self.connect(peer, neighbor))
            .sum()
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, peer: &PeerId) -> RoutingResult<()> {
        let index = self
            .index
            .remove(peer)
            .ok_or_else(|| RoutingError::NodeNotFound(peer.clone()))?;
        self.graph.remove_node(index);
        Ok(())
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.index.contains_key(peer)
    }

    pub fn node_index(&self, peer: &PeerId) -> Option<NodeIndex> {
        self.index.get(peer).copied()
    }

    /// Peer stored at `index`
    pub fn peer(&self, index: NodeIndex) -> Option<&PeerId> {
        self.graph.node_weight(index)
    }

    pub fn has_edge(&self, from: &PeerId, to: &PeerId) -> bool {
        match (self.node_index(from), self.node_index(to)) {
            (Some(a), Some(b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Weight of the edge `from -> to`
    pub fn weight(&self, from: &PeerId, to: &PeerId) -> Option<u32> {
        let edge = self
            .graph
            .find_edge(self.node_index(from)?, self.node_index(to)?)?;
        self.graph.edge_weight(edge).copied()
    }

    /// Change the weight of the edge `from -> to`
    pub fn set_weight(&mut self, from: &PeerId, to: &PeerId, weight: u32) -> RoutingResult<()> {
        let a = self
            .node_index(from)
            .ok_or_else(|| RoutingError::NodeNotFound(from.clone()))?;
        let b = self
            .node_index(to)
            .ok_or_else(|| RoutingError::NodeNotFound(to.clone()))?;
        let edge = self.graph.find_edge(a, b).ok_or_else(|| RoutingError::NoPath {
            from: from.clone(),
            to: to.clone(),
        })?;
        self.graph[edge] = weight;
        Ok(())
    }

    /// Outgoing neighbors of `peer`, sorted
    pub fn neighbors(&self, peer: &PeerId) -> Vec<PeerId> {
        let Some(index) = self.node_index(peer) else {
            return Vec::new();
        };
        let mut neighbors: Vec<PeerId> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        neighbors.sort();
        neighbors
    }

    /// All peers, sorted
    pub fn peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.index.keys().cloned().collect();
        peers.sort();
        peers
    }

    /// All directed edges as `(from, to)`, sorted
    pub fn edges(&self) -> Vec<(PeerId, PeerId)> {
        let mut edges: Vec<(PeerId, PeerId)> = self
            .graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(from, to)| (self.graph[from].clone(), self.graph[to].clone()))
            .collect();
        edges.sort();
        edges
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn graph(&self) -> &StableDiGraph<PeerId, u32> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_id(name: &str) -> PeerId {
        PeerId::from(name)
    }

    #[test]
    fn test_connect_adds_both_directions_once() {
        let mut topology = Topology::new();
        let (a, b) = (make_id("A"), make_id("B"));

        assert_eq!(topology.connect(&a, &b), 2);
        assert_eq!(topology.connect(&b, &a), 0);
        assert_eq!(topology.edge_count(), 2);
        assert!(topology.has_edge(&a, &b));
        assert!(topology.has_edge(&b, &a));
        assert_eq!(topology.weight(&a, &b), Some(DEFAULT_EDGE_WEIGHT));
    }

    #[test]
    fn test_self_loops_are_ignored() {
        let mut topology = Topology::new();
        let a = make_id("A");

        assert_eq!(topology.connect(&a, &a), 0);
        assert_eq!(topology.edge_count(), 0);
    }

    #[test]
    fn test_add_peer_is_idempotent() {
        let mut topology = Topology::new();
        let neighbors = PeerId::many(["B", "C"]);

        topology.add_peer(&make_id("A"), &neighbors);
        let first = topology.edges();
        assert_eq!(topology.add_peer(&make_id("A"), &neighbors), 0);

        assert_eq!(topology.edges(), first);
        assert_eq!(topology.node_count(), 3);
    }

    #[test]
    fn test_remove_node_drops_edges() {
        let mut topology = Topology::new();
        topology.add_peer(&make_id("A"), &PeerId::many(["B"]));
        topology.add_peer(&make_id("B"), &PeerId::many(["C"]));

        topology.remove_node(&make_id("B")).unwrap();

        assert!(!topology.contains(&make_id("B")));
        assert_eq!(topology.edge_count(), 0);
        assert!(topology.neighbors(&make_id("A")).is_empty());
        assert_eq!(
            topology.remove_node(&make_id("B")),
            Err(RoutingError::NodeNotFound(make_id("B")))
        );
    }

    #[test]
    fn test_removed_peer_can_return() {
        let mut topology = Topology::new();
        topology.add_peer(&make_id("A"), &PeerId::many(["B"]));
        topology.remove_node(&make_id("A")).unwrap();

        topology.add_peer(&make_id("A"), &PeerId::many(["B"]));
        assert!(topology.has_edge(&make_id("A"), &make_id("B")));
        assert_eq!(topology.node_count(), 2);
    }

    #[test]
    fn test_set_weight() {
        let mut topology = Topology::new();
        topology.connect(&make_id("A"), &make_id("B"));

        topology.set_weight(&make_id("A"), &make_id("B"), 5).unwrap();
        assert_eq!(topology.weight(&make_id("A"), &make_id("B")), Some(5));
        assert_eq!(topology.weight(&make_id("B"), &make_id("A")), Some(1));

        assert!(matches!(
            topology.set_weight(&make_id("A"), &make_id("Z"), 2),
            Err(RoutingError::NodeNotFound(_))
        ));
    }
}
