//! # qmesh Network
//!
//! The routing authority of the qmesh simulator.
//!
//! A [`Network`] keeps the topology and address table, computes routes and
//! runs a single background dispatch loop over an unbounded packet queue.
//! Each dequeued packet is:
//!
//! 1. **QUANTUM_PREPASS**: quantum payloads have their units moved along the
//!    full route first
//! 2. **ROUTE**: a route is computed, or in source-routed mode the envelope's
//!    embedded route is trimmed
//! 3. **DELIVER** (direct neighbors): envelopes are unwrapped, resource
//!    requests materialised, everything else handed over unchanged
//! 4. **RELAY** (longer routes): the packet is wrapped in a relay envelope and
//!    handed to the next hop
//! 5. **SWAP** (longer routes, resource requests): a swap chain is spawned as
//!    an independent task
//!
//! Failures drop the packet at hand and never stop the loop.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qmesh_network::{Network, NetworkConfig};
//!
//! let network = Network::new(NetworkConfig::default());
//! let alice = Arc::new(SimHost::new("Alice", backend, Arc::new(network.handle())));
//! network.add(alice);
//! network.start().await?;
//!
//! network.send(Packet::signal("Alice", "Bob", "hello"))?;
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod handle;
pub mod network;
pub mod stats;

mod dispatch;
mod mover;
mod state;
mod swap;

// Re-export main types
pub use config::{DEFAULT_DISPATCH_DELAY, NetworkConfig};
pub use error::{DispatchError, DispatchResult, NetworkError, NetworkResult};
pub use event::DispatchEvent;
pub use handle::NetworkHandle;
pub use network::Network;
pub use stats::{NetworkStats, StatsSnapshot};

// Re-export routing types used on the control surface
pub use qmesh_routing::{AddressTable, RoutingStrategy, ShortestPath, WeightedShortestPath};
