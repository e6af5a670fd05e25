//! Error types for qmesh

use thiserror::Error;

use crate::identity::PeerId;

/// Errors related to routing and route handling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("Node not found in topology: {0}")]
    NodeNotFound(PeerId),

    #[error("No path from {from} to {to}")]
    NoPath { from: PeerId, to: PeerId },

    #[error("Invalid route of length {len}: at least two hops are required")]
    InvalidRoute { len: usize },

    #[error("Peer {peer} is not on the route")]
    NotOnRoute { peer: PeerId },

    #[error("TTL expired while relaying from {at}")]
    TtlExpired { at: PeerId },

    #[error("Strategy {strategy} returned a route that is not a path from {from} to {to}")]
    BrokenRoute {
        strategy: String,
        from: PeerId,
        to: PeerId,
    },
}

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Errors raised by the unit transport backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unknown backend endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Backend channel closed for {0}")]
    ChannelClosed(String),

    #[error("Unit {unit} is held by {holder}, not by {endpoint}")]
    ForeignHandle {
        unit: uuid::Uuid,
        holder: String,
        endpoint: String,
    },
}

/// Errors raised by a peer while serving a network request
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Network queue closed")]
    QueueClosed,

    #[error("Unexpected payload for {protocol} packet")]
    UnexpectedPayload { protocol: String },

    #[error("No pairwise resource shared with {0}")]
    MissingResource(PeerId),
}

/// Result type for peer operations
pub type PeerResult<T> = Result<T, PeerError>;
