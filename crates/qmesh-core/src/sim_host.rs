//! In-memory peer
//!
//! [`SimHost`] implements the peer half of the network protocol on top of any
//! [`UnitBackend`]: it files pairwise resources as they are granted, forwards
//! relay envelopes back to the network and performs the transfer step of a
//! swap chain. Grants name the creator's backend endpoint explicitly; transfer
//! arrivals record the next hop's peer id as the unit holder.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::{debug, instrument, trace, warn};

use crate::codec::{self, Unwrapped};
use crate::error::PeerError;
use crate::identity::PeerId;
use crate::packet::{Packet, Payload, PayloadType, Protocol};
use crate::peer::{PacketSink, Peer, UnitBackend};
use crate::resource::{
    PairwiseResource, QuantumUnit, ResourceId, Transfer, TransferKind, UnitHandle,
};

/// A packet as it arrived at a host
#[derive(Debug, Clone)]
pub struct ReceivedPacket {
    pub packet: Packet,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct HostCounters {
    resources_created: AtomicU64,
    envelopes_forwarded: AtomicU64,
    transfers_sent: AtomicU64,
    transfers_received: AtomicU64,
}

/// Simulated peer holding its own resources and message log
pub struct SimHost {
    id: PeerId,
    neighbors: RwLock<Vec<PeerId>>,
    backend: Arc<dyn UnitBackend>,
    sink: Arc<dyn PacketSink>,
    resources: DashMap<PeerId, VecDeque<PairwiseResource>>,
    resource_added: Notify,
    data_units: DashMap<PeerId, Vec<QuantumUnit>>,
    received: Mutex<Vec<ReceivedPacket>>,
    packet_arrived: Notify,
    counters: HostCounters,
}

impl SimHost {
    pub fn new(
        id: impl Into<PeerId>,
        backend: Arc<dyn UnitBackend>,
        sink: Arc<dyn PacketSink>,
    ) -> Self {
        Self {
            id: id.into(),
            neighbors: RwLock::new(Vec::new()),
            backend,
            sink,
            resources: DashMap::new(),
            resource_added: Notify::new(),
            data_units: DashMap::new(),
            received: Mutex::new(Vec::new()),
            packet_arrived: Notify::new(),
            counters: HostCounters::default(),
        }
    }

    /// Set the declared neighbors
    pub fn with_neighbors<S: Into<PeerId>>(self, neighbors: impl IntoIterator<Item = S>) -> Self {
        *self.neighbors.write() = neighbors.into_iter().map(Into::into).collect();
        self
    }

    /// Declare another neighbor; the network learns it on the next `add`
    pub fn add_neighbor(&self, neighbor: impl Into<PeerId>) {
        let neighbor = neighbor.into();
        let mut neighbors = self.neighbors.write();
        if !neighbors.contains(&neighbor) {
            neighbors.push(neighbor);
        }
    }

    /// Every packet handed to this host, in arrival order
    pub fn received(&self) -> Vec<Packet> {
        self.received
            .lock()
            .iter()
            .map(|record| record.packet.clone())
            .collect()
    }

    pub fn received_records(&self) -> Vec<ReceivedPacket> {
        self.received.lock().clone()
    }

    /// Wait until at least `count` packets have arrived
    pub async fn wait_for_packets(&self, count: usize) -> Vec<Packet> {
        loop {
            let notified = self.packet_arrived.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.received.lock().len() >= count {
                return self.received();
            }
            notified.await;
        }
    }

    /// Units received from `origin`
    pub fn data_units(&self, origin: &PeerId) -> Vec<QuantumUnit> {
        self.data_units
            .get(origin)
            .map(|units| units.clone())
            .unwrap_or_default()
    }

    /// Number of resources held with `partner`
    pub fn resource_count(&self, partner: &PeerId) -> usize {
        self.resources
            .get(partner)
            .map(|held| held.len())
            .unwrap_or(0)
    }

    /// Peek at the resources held with `partner` without taking them
    pub fn resources_with(&self, partner: &PeerId) -> Vec<PairwiseResource> {
        self.resources
            .get(partner)
            .map(|held| held.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn resources_created(&self) -> u64 {
        self.counters.resources_created.load(Ordering::Relaxed)
    }

    pub fn envelopes_forwarded(&self) -> u64 {
        self.counters.envelopes_forwarded.load(Ordering::Relaxed)
    }

    pub fn transfers_sent(&self) -> u64 {
        self.counters.transfers_sent.load(Ordering::Relaxed)
    }

    pub fn transfers_received(&self) -> u64 {
        self.counters.transfers_received.load(Ordering::Relaxed)
    }

    fn record(&self, packet: &Packet) {
        self.received.lock().push(ReceivedPacket {
            packet: packet.clone(),
            received_at: Utc::now(),
        });
        self.packet_arrived.notify_waiters();
    }

    async fn handle(&self, packet: Packet) -> Result<(), PeerError> {
        match (&packet.protocol, packet.payload) {
            (
                Protocol::RecResource,
                Payload::ResourceGrant {
                    resource_id,
                    swappable,
                    creator_name,
                },
            ) => {
                self.accept_grant(&packet.sender, &creator_name, resource_id, swappable)
                    .await
            }
            (Protocol::SendTransfer, Payload::Transfer(transfer)) if packet.sender == self.id => {
                self.send_transfer(&packet.receiver, transfer)
            }
            (Protocol::RecTransfer, Payload::Transfer(transfer)) => {
                self.accept_transfer(&packet.sender, transfer)
            }
            (Protocol::SendTransfer | Protocol::RecTransfer, _) => {
                Err(PeerError::UnexpectedPayload {
                    protocol: packet.protocol.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Collect our half of a pair the sender just created
    async fn accept_grant(
        &self,
        creator: &PeerId,
        creator_name: &str,
        resource_id: ResourceId,
        swappable: bool,
    ) -> Result<(), PeerError> {
        let unit = self.backend.recv_paired_unit(creator_name).await?;
        self.add_pairwise_resource(
            creator,
            PairwiseResource {
                unit,
                resource_id,
                swappable,
            },
        );
        Ok(())
    }

    /// Take the carrier shared with `partner`, preferring one tagged `resource_id`
    fn take_carrier(
        &self,
        partner: &PeerId,
        resource_id: &ResourceId,
    ) -> Result<PairwiseResource, PeerError> {
        self.take_pairwise_resource(partner, resource_id)
            .or_else(|| self.get_pairwise_resource(partner))
            .ok_or_else(|| PeerError::MissingResource(partner.clone()))
    }

    /// Move a unit one hop onwards, consuming the resource shared with `next`
    fn send_transfer(&self, next: &PeerId, transfer: Transfer) -> Result<(), PeerError> {
        let carrier = self.take_carrier(next, &transfer.resource_id)?;
        trace!(
            peer = %self.id,
            next = %next,
            carrier = %carrier.resource_id,
            "Consumed carrier resource"
        );

        let arrival = Transfer {
            unit: transfer.unit.moved_to(next.as_str()),
            ..transfer
        };
        self.sink.enqueue(Packet::new(
            self.id.clone(),
            next.clone(),
            Protocol::RecTransfer,
            PayloadType::Signal,
            Payload::Transfer(arrival),
        ))?;
        self.counters.transfers_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// File a transferred unit, consuming the carrier shared with `from`
    fn accept_transfer(&self, from: &PeerId, transfer: Transfer) -> Result<(), PeerError> {
        self.take_carrier(from, &transfer.resource_id)?;

        match transfer.kind {
            TransferKind::Resource => self.add_pairwise_resource(
                &transfer.origin,
                PairwiseResource::swappable(transfer.unit, transfer.resource_id),
            ),
            TransferKind::Data => self.add_data_unit(
                &transfer.origin,
                QuantumUnit {
                    unit_id: transfer.resource_id.to_string(),
                    handle: transfer.unit,
                    blocked: false,
                },
            ),
        }
        self.counters.transfers_received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl Peer for SimHost {
    fn id(&self) -> &PeerId {
        &self.id
    }

    fn display_name(&self) -> &str {
        self.backend.name()
    }

    fn neighbors(&self) -> Vec<PeerId> {
        self.neighbors.read().clone()
    }

    #[instrument(skip(self, packet), fields(peer = %self.id, packet = %packet))]
    async fn receive(&self, packet: Packet) -> Result<(), PeerError> {
        self.record(&packet);

        match codec::unwrap(packet, &self.id) {
            Unwrapped::Local(packet) | Unwrapped::Deliver(packet) => self.handle(packet).await,
            Unwrapped::Forward(envelope) => {
                debug!(route = ?envelope.route().map(ToString::to_string), "Forwarding envelope");
                self.counters
                    .envelopes_forwarded
                    .fetch_add(1, Ordering::Relaxed);
                self.sink.enqueue(envelope)
            }
        }
    }

    async fn create_pairwise_resource(
        &self,
        partner: &PeerId,
        partner_name: &str,
        resource_id: Option<ResourceId>,
    ) -> Result<(UnitHandle, ResourceId), PeerError> {
        let unit = self.backend.create_paired_unit(partner_name).await?;
        let resource_id = resource_id.unwrap_or_else(ResourceId::generate);
        self.counters
            .resources_created
            .fetch_add(1, Ordering::Relaxed);

        debug!(peer = %self.id, partner = %partner, resource = %resource_id, "Created pairwise resource");
        Ok((unit, resource_id))
    }

    fn get_pairwise_resource(&self, partner: &PeerId) -> Option<PairwiseResource> {
        self.resources
            .get_mut(partner)
            .and_then(|mut held| held.pop_front())
    }

    fn take_pairwise_resource(
        &self,
        partner: &PeerId,
        resource_id: &ResourceId,
    ) -> Option<PairwiseResource> {
        let mut held = self.resources.get_mut(partner)?;
        let position = held
            .iter()
            .position(|resource| resource.resource_id == *resource_id)?;
        held.remove(position)
    }

    async fn wait_for_pairwise_resource(&self, partner: &PeerId) -> PairwiseResource {
        loop {
            let notified = self.resource_added.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(resource) = self.get_pairwise_resource(partner) {
                return resource;
            }
            notified.await;
        }
    }

    async fn wait_for_tagged_resource(
        &self,
        partner: &PeerId,
        resource_id: &ResourceId,
    ) -> PairwiseResource {
        loop {
            let notified = self.resource_added.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(resource) = self.take_pairwise_resource(partner, resource_id) {
                return resource;
            }
            notified.await;
        }
    }

    fn add_pairwise_resource(&self, partner: &PeerId, resource: PairwiseResource) {
        if resource.unit.holder != self.backend.name() {
            warn!(
                peer = %self.id,
                holder = %resource.unit.holder,
                "Filing a resource whose unit is held elsewhere"
            );
        }
        self.resources
            .entry(partner.clone())
            .or_default()
            .push_back(resource);
        self.resource_added.notify_waiters();
    }

    fn shares_pairwise_resource(&self, partner: &PeerId) -> bool {
        self.resources
            .get(partner)
            .map(|held| !held.is_empty())
            .unwrap_or(false)
    }

    async fn send_unit(&self, handle: UnitHandle, destination_name: &str) -> Result<(), PeerError> {
        self.backend.send_unit(handle, destination_name).await?;
        Ok(())
    }

    async fn recv_unit(&self) -> Result<UnitHandle, PeerError> {
        Ok(self.backend.recv_unit().await?)
    }

    fn add_data_unit(&self, origin: &PeerId, unit: QuantumUnit) {
        self.data_units
            .entry(origin.clone())
            .or_default()
            .push(unit);
    }
}
