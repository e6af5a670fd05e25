//! # qmesh Routing
//!
//! Topology, addressing and path computation for the qmesh network.
//!
//! ## Core Components
//!
//! - [`Topology`]: Directed peer graph with symmetric, weighted edges
//! - [`AddressTable`]: Peer id to peer handle mapping
//! - [`Router`]: Holds the active [`RoutingStrategy`] and validates its routes
//!
//! ## Strategies
//!
//! [`ShortestPath`] (fewest hops) is the default. [`WeightedShortestPath`]
//! minimises total edge weight, and any
//! `Fn(&Topology, &PeerId, &PeerId) -> RoutingResult<Vec<PeerId>>` closure can
//! be injected in their place.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qmesh_routing::{Router, Topology};
//!
//! let mut topology = Topology::new();
//! topology.add_peer(&a, &[b.clone()]);
//! topology.add_peer(&b, &[c.clone()]);
//!
//! let route = Router::default().route(&topology, &a, &c)?;
//! assert_eq!(route.len(), 3);
//! ```

pub mod strategy;
pub mod table;
pub mod topology;

// Re-export main types
pub use strategy::{Router, RoutingStrategy, ShortestPath, WeightedShortestPath};
pub use table::AddressTable;
pub use topology::{DEFAULT_EDGE_WEIGHT, Topology};

// Re-export core routing types for convenience
pub use qmesh_core::{Route, RoutingError, RoutingResult};
