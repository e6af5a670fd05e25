//! # qmesh Core
//!
//! Core types, peer contracts and errors for the qmesh network simulator.
//!
//! The routing authority in `qmesh-network` never owns peer state. It talks to
//! peers only through the contracts defined here, so the same dispatch logic runs
//! against the in-memory simulation shipped in this crate and against any other
//! backend that implements [`Peer`].
//!
//! ## Key Traits
//!
//! - [`Peer`]: A simulated endpoint with its own pairwise resources and inbound handler
//! - [`UnitBackend`]: Leaf transport that physically moves simulated quantum units
//! - [`PacketSink`]: Where peers enqueue packets for the network to dispatch
//!
//! ## Key Types
//!
//! - [`PeerId`]: Opaque peer identifier
//! - [`Packet`] / [`Payload`]: The unit of work on the network queue
//! - [`Route`]: A validated sender-to-receiver hop sequence
//! - [`PairwiseResource`]: A resource shared between exactly two peers
//!
//! ## Simulation
//!
//! [`SimFabric`] and [`SimHost`] provide an in-memory backend and peer used by
//! tests and scenario code.

pub mod codec;
pub mod error;
pub mod identity;
pub mod packet;
pub mod peer;
pub mod resource;
pub mod sim_backend;
pub mod sim_host;

// Re-export main types
pub use codec::*;
pub use error::*;
pub use identity::*;
pub use packet::*;
pub use peer::*;
pub use resource::*;
pub use sim_backend::*;
pub use sim_host::*;
