//! Error types for the network

use qmesh_core::{PeerError, PeerId, RoutingError};
use thiserror::Error;

/// Faults while processing one packet
///
/// These never leave the dispatch loop: the packet is logged and dropped.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerId),

    #[error("Peer {peer} failed: {source}")]
    Peer {
        peer: PeerId,
        #[source]
        source: PeerError,
    },

    #[error("Missing or malformed payload for {protocol} packet")]
    MissingPayload { protocol: String },

    #[error("Timed out waiting for {hop} to hold a resource shared with {partner}")]
    SwapTimeout { hop: PeerId, partner: PeerId },
}

impl DispatchError {
    /// Wrap a peer failure, for use with `map_err`
    pub(crate) fn peer(peer: &PeerId) -> impl FnOnce(PeerError) -> Self + '_ {
        move |source| Self::Peer {
            peer: peer.clone(),
            source,
        }
    }
}

/// Errors returned by the network control surface
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Network already started")]
    AlreadyStarted,

    #[error("Network queue closed")]
    QueueClosed,

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),
}

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;
