//! Peer and backend contracts
//!
//! The network never owns pairwise resources. Everything it knows about a peer
//! goes through [`Peer`], and everything a peer knows about physically moving
//! units goes through [`UnitBackend`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{BackendError, PeerError};
use crate::identity::PeerId;
use crate::packet::Packet;
use crate::resource::{PairwiseResource, QuantumUnit, ResourceId, UnitHandle};

/// How often the default [`Peer::wait_for_pairwise_resource`] re-checks
pub const RESOURCE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A simulated network endpoint
///
/// Implementations own their neighbor list, pairwise resources and inbound
/// message state. All methods may be called from the network's dispatch task
/// and from swap tasks concurrently.
#[async_trait]
pub trait Peer: Send + Sync {
    /// Identifier used as the address table and topology key
    fn id(&self) -> &PeerId;

    /// Name used for backend addressing
    fn display_name(&self) -> &str;

    /// Declared neighbors
    fn neighbors(&self) -> Vec<PeerId>;

    /// Inbound packet handler
    async fn receive(&self, packet: Packet) -> Result<(), PeerError>;

    /// Materialise one pairwise resource with `partner` through the backend
    ///
    /// Reuses `resource_id` when given, otherwise mints a new one. The local
    /// half is returned, not filed; callers decide where it goes.
    async fn create_pairwise_resource(
        &self,
        partner: &PeerId,
        partner_name: &str,
        resource_id: Option<ResourceId>,
    ) -> Result<(UnitHandle, ResourceId), PeerError>;

    /// Take the oldest resource shared with `partner`, if any
    fn get_pairwise_resource(&self, partner: &PeerId) -> Option<PairwiseResource>;

    /// Take the oldest resource shared with `partner` tagged `resource_id`
    fn take_pairwise_resource(
        &self,
        partner: &PeerId,
        resource_id: &ResourceId,
    ) -> Option<PairwiseResource>;

    /// Wait until a resource shared with `partner` exists, then take it
    async fn wait_for_pairwise_resource(&self, partner: &PeerId) -> PairwiseResource {
        loop {
            if let Some(resource) = self.get_pairwise_resource(partner) {
                return resource;
            }
            tokio::time::sleep(RESOURCE_POLL_INTERVAL).await;
        }
    }

    /// Wait until a resource shared with `partner` and tagged `resource_id`
    /// exists, then take it; other resources with `partner` are left alone
    async fn wait_for_tagged_resource(
        &self,
        partner: &PeerId,
        resource_id: &ResourceId,
    ) -> PairwiseResource {
        loop {
            if let Some(resource) = self.take_pairwise_resource(partner, resource_id) {
                return resource;
            }
            tokio::time::sleep(RESOURCE_POLL_INTERVAL).await;
        }
    }

    /// File a resource as shared with `partner`
    fn add_pairwise_resource(&self, partner: &PeerId, resource: PairwiseResource);

    /// Check whether a resource shared with `partner` is held, without taking it
    fn shares_pairwise_resource(&self, partner: &PeerId) -> bool;

    /// Send a unit to the endpoint named `destination_name`
    async fn send_unit(&self, handle: UnitHandle, destination_name: &str) -> Result<(), PeerError>;

    /// Block until the next unit arrives at this peer
    async fn recv_unit(&self) -> Result<UnitHandle, PeerError>;

    /// File a unit received from `origin`
    fn add_data_unit(&self, origin: &PeerId, unit: QuantumUnit);
}

/// Leaf transport that physically moves simulated units between endpoints
#[async_trait]
pub trait UnitBackend: Send + Sync {
    /// Name this endpoint is addressed by
    fn name(&self) -> &str;

    async fn send_unit(&self, handle: UnitHandle, destination: &str) -> Result<(), BackendError>;

    async fn recv_unit(&self) -> Result<UnitHandle, BackendError>;

    /// Create a pair, keep one half and hand the other to `partner`
    async fn create_paired_unit(&self, partner: &str) -> Result<UnitHandle, BackendError>;

    /// Wait for the half of a pair created by `partner`
    async fn recv_paired_unit(&self, partner: &str) -> Result<UnitHandle, BackendError>;
}

/// Where peers hand packets back to the network
pub trait PacketSink: Send + Sync {
    fn enqueue(&self, packet: Packet) -> Result<(), PeerError>;
}
