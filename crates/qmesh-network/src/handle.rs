//! Producer side of the packet queue

use std::sync::Arc;

use qmesh_core::{Packet, PacketSink, PeerError};
use tokio::sync::mpsc;

use crate::error::{NetworkError, NetworkResult};
use crate::stats::NetworkStats;

/// Cloneable sender onto a network's packet queue
///
/// Peers are given one at construction and use it to hand packets back to
/// the network they belong to.
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    tx: mpsc::UnboundedSender<Packet>,
    stats: Arc<NetworkStats>,
}

impl NetworkHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Packet>, stats: Arc<NetworkStats>) -> Self {
        Self { tx, stats }
    }

    /// Enqueue a packet for dispatch
    pub fn send(&self, packet: Packet) -> NetworkResult<()> {
        self.tx.send(packet).map_err(|_| NetworkError::QueueClosed)?;
        self.stats.record_enqueued();
        Ok(())
    }
}

impl PacketSink for NetworkHandle {
    fn enqueue(&self, packet: Packet) -> Result<(), PeerError> {
        self.send(packet).map_err(|_| PeerError::QueueClosed)
    }
}
