//! The routing authority
//!
//! A [`Network`] owns the topology, the address table, the router and the
//! packet queue. Peers are registered with [`Network::add`] and given a
//! [`NetworkHandle`] at construction so they can enqueue packets themselves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use qmesh_core::{Packet, Peer, PeerId, Route, RoutingMode};
use qmesh_routing::{AddressTable, Router, RoutingStrategy};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::config::NetworkConfig;
use crate::dispatch;
use crate::error::{NetworkError, NetworkResult};
use crate::event::DispatchEvent;
use crate::handle::NetworkHandle;
use crate::state::NetworkState;
use crate::stats::StatsSnapshot;

/// Central routing authority for a set of peers
///
/// Lifecycle is `new -> start -> stop -> drop`; a stopped network keeps its
/// queue and may be started again.
pub struct Network {
    state: Arc<NetworkState>,
    handle: NetworkHandle,
    /// Queue receiver while no dispatch loop owns it
    queue: Mutex<Option<mpsc::UnboundedReceiver<Packet>>>,
    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
    /// Dispatch loop task, which returns the queue when it exits
    worker: Mutex<Option<JoinHandle<mpsc::UnboundedReceiver<Packet>>>>,
    /// Whether the dispatch loop is running
    started: AtomicBool,
}

impl Network {
    /// Create a network using the unweighted shortest-path strategy
    pub fn new(config: NetworkConfig) -> Self {
        Self::with_router(config, Router::default())
    }

    /// Create a network using `strategy` for every route
    pub fn with_strategy(config: NetworkConfig, strategy: Arc<dyn RoutingStrategy>) -> Self {
        Self::with_router(config, Router::new(strategy))
    }

    fn with_router(config: NetworkConfig, router: Router) -> Self {
        let state = Arc::new(NetworkState::new(config, router));
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(
            strategy = %state.router.strategy_name(),
            mode = ?state.config.routing_mode,
            "Network created"
        );

        Self {
            handle: NetworkHandle::new(tx, Arc::clone(&state.stats)),
            state,
            queue: Mutex::new(Some(rx)),
            shutdown_tx,
            worker: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Start the dispatch loop on the current tokio runtime
    #[instrument(skip(self))]
    pub async fn start(&self) -> NetworkResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(NetworkError::AlreadyStarted);
        }

        let Some(queue) = self.queue.lock().take() else {
            self.started.store(false, Ordering::SeqCst);
            return Err(NetworkError::QueueClosed);
        };

        let worker = tokio::spawn(dispatch::run(
            Arc::clone(&self.state),
            queue,
            self.shutdown_tx.subscribe(),
        ));
        *self.worker.lock() = Some(worker);

        info!("Network started");
        Ok(())
    }

    /// Stop the dispatch loop and wait for it to exit
    ///
    /// In-flight swap chains keep running. Packets still queued stay queued
    /// for the next start.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> NetworkResult<()> {
        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        let _ = self.shutdown_tx.send(());

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            match worker.await {
                Ok(queue) => *self.queue.lock() = Some(queue),
                Err(e) => error!(error = %e, "Dispatch loop ended abnormally"),
            }
        }

        self.started.store(false, Ordering::SeqCst);
        info!("Network stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Sender onto this network's queue, for constructing peers
    pub fn handle(&self) -> NetworkHandle {
        self.handle.clone()
    }

    /// Enqueue a packet
    pub fn send(&self, packet: Packet) -> NetworkResult<()> {
        debug!(packet = %packet, "Packet enqueued");
        self.handle.send(packet)
    }

    /// Register a peer and connect it to its declared neighbors
    ///
    /// Re-adding a peer replaces its handle and adds only missing edges.
    pub fn add(&self, peer: Arc<dyn Peer>) {
        let id = peer.id().clone();
        let neighbors = peer.neighbors();

        self.state.table.insert(peer);
        let added = self.state.topology.write().add_peer(&id, &neighbors);

        debug!(peer = %id, neighbors = neighbors.len(), edges_added = added, "Peer added");
    }

    /// Drop a peer from the address table only; its topology node stays
    pub fn remove(&self, id: &PeerId) -> Option<Arc<dyn Peer>> {
        let removed = self.state.table.remove(id);
        if removed.is_some() {
            debug!(peer = %id, "Peer removed from address table");
        }
        removed
    }

    /// Drop a node and its edges from the topology only
    ///
    /// Returns false, after logging, when the node does not exist.
    pub fn remove_node(&self, id: &PeerId) -> bool {
        match self.state.topology.write().remove_node(id) {
            Ok(()) => {
                debug!(peer = %id, "Topology node removed");
                true
            }
            Err(e) => {
                error!(peer = %id, error = %e, "Cannot remove topology node");
                false
            }
        }
    }

    pub fn lookup(&self, id: &PeerId) -> Option<Arc<dyn Peer>> {
        self.state.table.get(id)
    }

    /// Backend addressing name of a registered peer
    pub fn display_name(&self, id: &PeerId) -> Option<String> {
        self.state.table.display_name(id)
    }

    /// Replace the routing strategy for subsequent packets
    pub fn set_routing_algorithm(&self, strategy: impl RoutingStrategy + 'static) {
        self.state.router.set_strategy(Arc::new(strategy));
        info!(strategy = %self.state.router.strategy_name(), "Routing strategy replaced");
    }

    pub fn routing_algorithm(&self) -> String {
        self.state.router.strategy_name()
    }

    /// Change the pause applied before each dequeued packet
    pub fn set_delay(&self, delay: Duration) {
        self.state.set_delay(delay);
    }

    pub fn delay(&self) -> Duration {
        self.state.delay()
    }

    pub fn routing_mode(&self) -> RoutingMode {
        self.state.config.routing_mode
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.state.config
    }

    /// Compute the current route between two peers
    pub fn get_route(&self, from: &PeerId, to: &PeerId) -> NetworkResult<Route> {
        Ok(self.state.route(from, to)?)
    }

    /// Shared view of the address table
    pub fn address_table(&self) -> AddressTable {
        self.state.table.clone()
    }

    /// Every directed topology edge, sorted
    pub fn topology_edges(&self) -> Vec<(PeerId, PeerId)> {
        self.state.topology.read().edges()
    }

    /// True when both peers report a resource shared with the other
    pub fn shares_resource(&self, a: &PeerId, b: &PeerId) -> bool {
        match (self.lookup(a), self.lookup(b)) {
            (Some(pa), Some(pb)) => pa.shares_pairwise_resource(b) && pb.shares_pairwise_resource(a),
            _ => false,
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot()
    }

    /// Subscribe to dispatch events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.state.subscribe()
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("running", &self.is_running())
            .field("peers", &self.state.table.len())
            .field("strategy", &self.state.router.strategy_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_twice_fails() {
        let network = Network::new(NetworkConfig::testing());

        network.start().await.unwrap();
        assert!(network.is_running());
        assert!(matches!(
            network.start().await,
            Err(NetworkError::AlreadyStarted)
        ));

        network.stop().await.unwrap();
        assert!(!network.is_running());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let network = Network::new(NetworkConfig::testing());
        network.stop().await.unwrap();
        assert!(!network.is_running());
    }

    #[tokio::test]
    async fn test_set_delay() {
        let network = Network::new(NetworkConfig::default());
        assert_eq!(network.delay(), Duration::from_millis(500));

        network.set_delay(Duration::from_millis(20));
        assert_eq!(network.delay(), Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_send_counts_enqueued() {
        let network = Network::new(NetworkConfig::testing());
        network.send(Packet::signal("A", "B", "x")).unwrap();
        network.handle().send(Packet::signal("B", "A", "y")).unwrap();
        assert_eq!(network.stats().enqueued, 2);
    }
}
