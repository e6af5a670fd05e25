//! Dispatch events

use chrono::{DateTime, Utc};
use qmesh_core::{PeerId, Protocol, ResourceId};
use serde::{Deserialize, Serialize};

/// What happened to packets and swap chains, broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispatchEvent {
    /// A packet was handed to its final receiver
    Delivered {
        from: PeerId,
        to: PeerId,
        protocol: Protocol,
        timestamp: DateTime<Utc>,
    },

    /// A packet was wrapped and handed to the next hop
    Relayed {
        from: PeerId,
        via: PeerId,
        to: PeerId,
        ttl: u8,
        timestamp: DateTime<Utc>,
    },

    /// Quantum units finished moving along a route
    QuantumMoved {
        from: PeerId,
        to: PeerId,
        units: usize,
        timestamp: DateTime<Utc>,
    },

    SwapStarted {
        from: PeerId,
        to: PeerId,
        resource_id: ResourceId,
        hops: usize,
        timestamp: DateTime<Utc>,
    },

    SwapCompleted {
        from: PeerId,
        to: PeerId,
        resource_id: ResourceId,
        timestamp: DateTime<Utc>,
    },

    SwapFailed {
        from: PeerId,
        to: PeerId,
        resource_id: ResourceId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A packet was dropped
    Dropped {
        from: PeerId,
        to: PeerId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl DispatchEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Delivered { timestamp, .. }
            | Self::Relayed { timestamp, .. }
            | Self::QuantumMoved { timestamp, .. }
            | Self::SwapStarted { timestamp, .. }
            | Self::SwapCompleted { timestamp, .. }
            | Self::SwapFailed { timestamp, .. }
            | Self::Dropped { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped { .. })
    }
}
