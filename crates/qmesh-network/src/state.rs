//! State shared by the control surface, the dispatch loop and swap tasks

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use qmesh_core::{PairwiseResource, Packet, Payload, Peer, PeerId, ResourceId, Route};
use qmesh_routing::{AddressTable, Router, RoutingResult, Topology};
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::NetworkConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::event::DispatchEvent;
use crate::stats::NetworkStats;

pub(crate) struct NetworkState {
    pub config: NetworkConfig,
    delay_nanos: AtomicU64,
    pub topology: RwLock<Topology>,
    pub table: AddressTable,
    pub router: Router,
    pub stats: Arc<NetworkStats>,
    events: broadcast::Sender<DispatchEvent>,
}

impl NetworkState {
    pub fn new(config: NetworkConfig, router: Router) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            delay_nanos: AtomicU64::new(duration_nanos(config.delay)),
            config,
            topology: RwLock::new(Topology::new()),
            table: AddressTable::new(),
            router,
            stats: Arc::new(NetworkStats::default()),
            events,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_nanos(self.delay_nanos.load(Ordering::Relaxed))
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_nanos
            .store(duration_nanos(delay), Ordering::Relaxed);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    /// Broadcast an event; having no subscribers is fine
    pub fn emit(&self, event: DispatchEvent) {
        let _ = self.events.send(event);
    }

    pub fn peer(&self, id: &PeerId) -> DispatchResult<Arc<dyn Peer>> {
        self.table
            .get(id)
            .ok_or_else(|| DispatchError::UnknownPeer(id.clone()))
    }

    /// Route over the current topology with the active strategy
    pub fn route(&self, from: &PeerId, to: &PeerId) -> RoutingResult<Route> {
        let topology = self.topology.read();
        self.router.route(&topology, from, to)
    }

    /// Create one pairwise resource from `packet.sender` to `packet.receiver`
    ///
    /// The sender files its half, then `packet` is delivered to the receiver
    /// with its payload replaced by the grant.
    pub async fn materialize_resource(
        &self,
        mut packet: Packet,
        requested: Option<ResourceId>,
        swappable: bool,
    ) -> DispatchResult<ResourceId> {
        let sender = self.peer(&packet.sender)?;
        let receiver = self.peer(&packet.receiver)?;
        let receiver_name = receiver.display_name().to_string();

        let (unit, resource_id) = sender
            .create_pairwise_resource(&packet.receiver, &receiver_name, requested)
            .await
            .map_err(DispatchError::peer(&packet.sender))?;
        sender.add_pairwise_resource(
            &packet.receiver,
            PairwiseResource {
                unit,
                resource_id: resource_id.clone(),
                swappable,
            },
        );
        self.stats.record_resource();

        debug!(
            from = %packet.sender,
            to = %packet.receiver,
            resource = %resource_id,
            swappable,
            "Materialized pairwise resource"
        );

        packet.payload = Payload::ResourceGrant {
            resource_id: resource_id.clone(),
            swappable,
            creator_name: sender.display_name().to_string(),
        };
        let to = packet.receiver.clone();
        receiver
            .receive(packet)
            .await
            .map_err(DispatchError::peer(&to))?;
        Ok(resource_id)
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
