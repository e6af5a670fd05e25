//! Swap orchestrator
//!
//! Turns a chain of pairwise resources along a route into one resource shared
//! by the route's endpoints:
//!
//! 1. Every consecutive pair `(route[i], route[i + 1])` materialises a
//!    swappable resource tagged with the chain's resource id.
//! 2. For each interior hop in order, wait until the hop holds a resource
//!    shared with the sender, then instruct it to transfer that unit to the
//!    next hop. The next hop files the arrival as shared with the sender.
//! 3. Once the receiver holds its half, the sender re-files its half of the
//!    first link as shared with the receiver.
//!
//! Every wait is keyed by `(partner, resource id)`, so resources a peer
//! already held, or halves of other chains in flight, are never consumed.
//! Waits use the peer's notification-backed
//! [`wait_for_tagged_resource`](qmesh_core::Peer::wait_for_tagged_resource),
//! optionally bounded by [`NetworkConfig::swap_wait_timeout`](crate::NetworkConfig).

use std::sync::Arc;

use chrono::Utc;
use qmesh_core::{
    PairwiseResource, Packet, Payload, PayloadType, PeerId, Protocol, ResourceId, Route,
    Transfer, TransferKind,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::error::{DispatchError, DispatchResult};
use crate::event::DispatchEvent;
use crate::state::NetworkState;

pub(crate) struct SwapOrchestrator {
    state: Arc<NetworkState>,
    route: Route,
    resource_id: ResourceId,
}

impl SwapOrchestrator {
    /// Run a swap chain as an independent task
    ///
    /// The task is never cancelled, including by a network stop.
    pub fn spawn(state: Arc<NetworkState>, route: Route, resource_id: ResourceId) -> JoinHandle<()> {
        let orchestrator = Self {
            state,
            route,
            resource_id,
        };
        tokio::spawn(orchestrator.run())
    }

    #[instrument(skip(self), fields(route = %self.route, resource = %self.resource_id))]
    async fn run(self) {
        let from = self.route.sender().clone();
        let to = self.route.receiver().clone();

        self.state.stats.record_swap_started();
        self.state.emit(DispatchEvent::SwapStarted {
            from: from.clone(),
            to: to.clone(),
            resource_id: self.resource_id.clone(),
            hops: self.route.len() - 1,
            timestamp: Utc::now(),
        });
        info!("Swap chain started");

        match self.execute().await {
            Ok(()) => {
                info!("Swap chain completed");
                self.state.stats.record_swap_completed();
                self.state.emit(DispatchEvent::SwapCompleted {
                    from,
                    to,
                    resource_id: self.resource_id.clone(),
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                error!(error = %e, "Swap chain failed");
                self.state.stats.record_swap_failed();
                self.state.emit(DispatchEvent::SwapFailed {
                    from,
                    to,
                    resource_id: self.resource_id.clone(),
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    async fn execute(&self) -> DispatchResult<()> {
        let hops = self.route.hops();
        let origin = self.route.sender();

        for (a, b) in self.route.links() {
            let request = Packet::new(
                a.clone(),
                b.clone(),
                Protocol::RecResource,
                PayloadType::Signal,
                Payload::Empty,
            );
            self.state
                .materialize_resource(request, Some(self.resource_id.clone()), true)
                .await?;
        }

        for i in 0..hops.len() - 2 {
            let (hop, next) = (&hops[i + 1], &hops[i + 2]);
            let held = self.await_resource(hop, origin).await?;

            debug!(hop = %hop, next = %next, "Transferring pairing");
            let instruction = Packet::new(
                hop.clone(),
                next.clone(),
                Protocol::SendTransfer,
                PayloadType::Signal,
                Payload::Transfer(Transfer {
                    unit: held.unit,
                    resource_id: self.resource_id.clone(),
                    origin: origin.clone(),
                    kind: TransferKind::Resource,
                }),
            );
            self.state
                .peer(hop)?
                .receive(instruction)
                .await
                .map_err(DispatchError::peer(hop))?;
        }

        let receiver = self.route.receiver();
        let arrived = self.await_resource(receiver, origin).await?;
        self.state
            .peer(receiver)?
            .add_pairwise_resource(
                origin,
                PairwiseResource {
                    swappable: false,
                    ..arrived
                },
            );

        let first_link = self.await_resource(origin, self.route.next_hop()).await?;
        self.state.peer(origin)?.add_pairwise_resource(
            receiver,
            PairwiseResource {
                unit: first_link.unit,
                resource_id: self.resource_id.clone(),
                swappable: false,
            },
        );
        Ok(())
    }

    /// Take this chain's resource `holder` shares with `partner`, waiting for
    /// it to exist
    async fn await_resource(
        &self,
        holder: &PeerId,
        partner: &PeerId,
    ) -> DispatchResult<PairwiseResource> {
        let peer = self.state.peer(holder)?;
        let wait = peer.wait_for_tagged_resource(partner, &self.resource_id);

        match self.state.config.swap_wait_timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                DispatchError::SwapTimeout {
                    hop: holder.clone(),
                    partner: partner.clone(),
                }
            }),
            None => Ok(wait.await),
        }
    }
}
