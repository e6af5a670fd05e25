//! Routing strategies and the router that validates their output
//!
//! A strategy is any function from a topology and two endpoints to a hop
//! list. [`Router`] holds the active strategy, lets it be swapped at runtime
//! and turns raw hop lists into validated [`Route`]s.

use std::sync::Arc;

use parking_lot::RwLock;
use petgraph::algo::astar;
use petgraph::visit::EdgeRef;
use qmesh_core::{PeerId, Route, RoutingError, RoutingResult};
use tracing::trace;

use crate::topology::Topology;

/// Path computation over a [`Topology`]
pub trait RoutingStrategy: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Compute the hop list from `from` to `to`, both inclusive
    fn route(&self, topology: &Topology, from: &PeerId, to: &PeerId) -> RoutingResult<Vec<PeerId>>;
}

/// Any matching closure can be injected as a strategy
impl<F> RoutingStrategy for F
where
    F: Fn(&Topology, &PeerId, &PeerId) -> RoutingResult<Vec<PeerId>> + Send + Sync,
{
    fn name(&self) -> &str {
        "custom"
    }

    fn route(&self, topology: &Topology, from: &PeerId, to: &PeerId) -> RoutingResult<Vec<PeerId>> {
        self(topology, from, to)
    }
}

/// Fewest hops, ignoring edge weights
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestPath;

impl RoutingStrategy for ShortestPath {
    fn name(&self) -> &str {
        "shortest-path"
    }

    fn route(&self, topology: &Topology, from: &PeerId, to: &PeerId) -> RoutingResult<Vec<PeerId>> {
        search(topology, from, to, |_| 1)
    }
}

/// Lowest total edge weight
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedShortestPath;

impl RoutingStrategy for WeightedShortestPath {
    fn name(&self) -> &str {
        "weighted-shortest-path"
    }

    fn route(&self, topology: &Topology, from: &PeerId, to: &PeerId) -> RoutingResult<Vec<PeerId>> {
        search(topology, from, to, |weight| weight)
    }
}

fn search(
    topology: &Topology,
    from: &PeerId,
    to: &PeerId,
    cost: impl Fn(u32) -> u32,
) -> RoutingResult<Vec<PeerId>> {
    let start = topology
        .node_index(from)
        .ok_or_else(|| RoutingError::NodeNotFound(from.clone()))?;
    let goal = topology
        .node_index(to)
        .ok_or_else(|| RoutingError::NodeNotFound(to.clone()))?;

    let (_, path) = astar(
        topology.graph(),
        start,
        |node| node == goal,
        |edge| cost(*edge.weight()),
        |_| 0,
    )
    .ok_or_else(|| RoutingError::NoPath {
        from: from.clone(),
        to: to.clone(),
    })?;

    Ok(path
        .into_iter()
        .filter_map(|index| topology.peer(index).cloned())
        .collect())
}

/// Holds the active strategy and validates the routes it produces
pub struct Router {
    strategy: RwLock<Arc<dyn RoutingStrategy>>,
}

impl Router {
    pub fn new(strategy: Arc<dyn RoutingStrategy>) -> Self {
        Self {
            strategy: RwLock::new(strategy),
        }
    }

    /// Replace the active strategy; routes computed afterwards use it
    pub fn set_strategy(&self, strategy: Arc<dyn RoutingStrategy>) {
        *self.strategy.write() = strategy;
    }

    pub fn strategy_name(&self) -> String {
        self.strategy.read().name().to_string()
    }

    /// Compute a validated route from `from` to `to`
    ///
    /// Fails with `InvalidRoute` when fewer than two hops come back and with
    /// `BrokenRoute` when the hops do not form a path between the endpoints.
    pub fn route(&self, topology: &Topology, from: &PeerId, to: &PeerId) -> RoutingResult<Route> {
        let strategy = Arc::clone(&*self.strategy.read());
        let route = Route::new(strategy.route(topology, from, to)?)?;

        let connected = route.links().all(|(a, b)| topology.has_edge(a, b));
        if route.sender() != from || route.receiver() != to || !connected {
            return Err(RoutingError::BrokenRoute {
                strategy: strategy.name().to_string(),
                from: from.clone(),
                to: to.clone(),
            });
        }

        trace!(strategy = strategy.name(), route = %route, "Route computed");
        Ok(route)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Arc::new(ShortestPath))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_id(name: &str) -> PeerId {
        PeerId::from(name)
    }

    /// A - B - C - D in a line, plus a direct A - D shortcut when `shortcut`
    fn make_topology(shortcut: bool) -> Topology {
        let mut topology = Topology::new();
        topology.add_peer(&make_id("A"), &PeerId::many(["B"]));
        topology.add_peer(&make_id("B"), &PeerId::many(["C"]));
        topology.add_peer(&make_id("C"), &PeerId::many(["D"]));
        if shortcut {
            topology.connect(&make_id("A"), &make_id("D"));
        }
        topology
    }

    #[test]
    fn test_shortest_path_on_line() {
        let router = Router::default();
        let route = router
            .route(&make_topology(false), &make_id("A"), &make_id("D"))
            .unwrap();
        assert_eq!(route.hops(), PeerId::many(["A", "B", "C", "D"]).as_slice());
    }

    #[test]
    fn test_weighted_path_avoids_heavy_edge() {
        let mut topology = make_topology(true);
        topology
            .set_weight(&make_id("A"), &make_id("D"), 10)
            .unwrap();

        let unweighted = Router::default()
            .route(&topology, &make_id("A"), &make_id("D"))
            .unwrap();
        assert!(unweighted.is_direct());

        let weighted = Router::new(Arc::new(WeightedShortestPath))
            .route(&topology, &make_id("A"), &make_id("D"))
            .unwrap();
        assert_eq!(weighted.len(), 4);
    }

    #[test]
    fn test_unknown_endpoint() {
        let router = Router::default();
        let result = router.route(&make_topology(false), &make_id("A"), &make_id("Z"));
        assert_eq!(result, Err(RoutingError::NodeNotFound(make_id("Z"))));
    }

    #[test]
    fn test_no_path_between_components() {
        let mut topology = make_topology(false);
        topology.connect(&make_id("X"), &make_id("Y"));

        let result = Router::default().route(&topology, &make_id("A"), &make_id("X"));
        assert!(matches!(result, Err(RoutingError::NoPath { .. })));
    }

    #[test]
    fn test_route_to_self_is_invalid() {
        let result = Router::default().route(&make_topology(false), &make_id("A"), &make_id("A"));
        assert_eq!(result, Err(RoutingError::InvalidRoute { len: 1 }));
    }

    #[test]
    fn test_closure_strategy_is_validated() {
        let router = Router::default();
        router.set_strategy(Arc::new(
            |_: &Topology, from: &PeerId, to: &PeerId| -> RoutingResult<Vec<PeerId>> {
                Ok(vec![from.clone(), to.clone()])
            },
        ));
        assert_eq!(router.strategy_name(), "custom");

        // A and D are not adjacent without the shortcut
        let result = router.route(&make_topology(false), &make_id("A"), &make_id("D"));
        assert!(matches!(result, Err(RoutingError::BrokenRoute { .. })));

        let route = router
            .route(&make_topology(true), &make_id("A"), &make_id("D"))
            .unwrap();
        assert!(route.is_direct());
    }
}
