//! Dispatch loop
//!
//! The single consumer of the packet queue. Each dequeued packet goes through
//! `QUANTUM_PREPASS -> ROUTE -> DELIVER | RELAY | SWAP` and ends up delivered
//! or dropped. A failure only ever drops the packet at hand.

use std::sync::Arc;

use chrono::Utc;
use qmesh_core::{Packet, Payload, PeerId, Protocol, ResourceId, Route, RoutingMode, codec};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument};

use crate::error::{DispatchError, DispatchResult};
use crate::event::DispatchEvent;
use crate::mover;
use crate::state::NetworkState;
use crate::swap::SwapOrchestrator;

/// Drain `queue` until shutdown is signalled, then hand the queue back
///
/// Shutdown is checked before each packet; a packet already being processed
/// is finished first.
pub(crate) async fn run(
    state: Arc<NetworkState>,
    mut queue: mpsc::UnboundedReceiver<Packet>,
    mut shutdown: broadcast::Receiver<()>,
) -> mpsc::UnboundedReceiver<Packet> {
    info!("Dispatch loop started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            packet = queue.recv() => {
                let Some(packet) = packet else { break };

                let delay = state.delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                process(&state, packet).await;
            }
        }
    }

    info!("Dispatch loop stopped");
    queue
}

/// Dispatch one packet, turning any failure into a logged drop
pub(crate) async fn process(state: &Arc<NetworkState>, packet: Packet) {
    let from = packet.sender.clone();
    let to = packet.receiver.clone();

    if let Err(e) = dispatch(state, packet).await {
        error!(from = %from, to = %to, error = %e, "Dropping packet");
        state.stats.record_dropped();
        state.emit(DispatchEvent::Dropped {
            from,
            to,
            reason: e.to_string(),
            timestamp: Utc::now(),
        });
    }
}

#[instrument(skip(state, packet), fields(packet = %packet))]
async fn dispatch(state: &Arc<NetworkState>, mut packet: Packet) -> DispatchResult<()> {
    if packet.is_quantum() {
        mover::move_units(state, &mut packet).await?;
    }

    let route = resolve_route(state, &packet)?;
    debug!(route = %route, "Route resolved");

    if route.is_direct() {
        return deliver(state, &route, packet).await;
    }

    if packet.protocol == Protocol::RecResource {
        let resource_id = match &packet.payload {
            Payload::ResourceRequest {
                resource_id: Some(id),
                ..
            } => id.clone(),
            _ => ResourceId::generate(),
        };
        SwapOrchestrator::spawn(Arc::clone(state), route, resource_id);
        return Ok(());
    }

    relay(state, &route, packet).await
}

/// Recompute the route, or follow the embedded one in source-routed mode
fn resolve_route(state: &NetworkState, packet: &Packet) -> DispatchResult<Route> {
    if state.config.routing_mode == RoutingMode::SourceRouted {
        if let Some(embedded) = packet.route() {
            return Ok(embedded.suffix_from(&packet.sender)?);
        }
    }
    Ok(state.route(&packet.sender, &packet.receiver)?)
}

/// Final hop: unwrap envelopes, materialise resource requests, hand over
async fn deliver(state: &NetworkState, route: &Route, packet: Packet) -> DispatchResult<()> {
    let receiver = route.receiver();

    match packet.protocol {
        Protocol::Relay => {
            let Payload::Relay(envelope) = packet.payload else {
                return Err(DispatchError::MissingPayload {
                    protocol: packet.protocol.to_string(),
                });
            };
            hand_over(state, *envelope.inner, receiver).await
        }
        Protocol::RecResource => {
            let (requested, swappable) = match &packet.payload {
                Payload::ResourceRequest {
                    resource_id,
                    swappable,
                } => (resource_id.clone(), *swappable),
                _ => (None, false),
            };
            let from = packet.sender.clone();
            state
                .materialize_resource(packet, requested, swappable)
                .await?;
            state.stats.record_delivered();
            state.emit(DispatchEvent::Delivered {
                from,
                to: receiver.clone(),
                protocol: Protocol::RecResource,
                timestamp: Utc::now(),
            });
            Ok(())
        }
        _ => hand_over(state, packet, receiver).await,
    }
}

async fn hand_over(state: &NetworkState, packet: Packet, receiver: &PeerId) -> DispatchResult<()> {
    let peer = state.peer(receiver)?;
    let from = packet.sender.clone();
    let protocol = packet.protocol.clone();

    peer.receive(packet)
        .await
        .map_err(DispatchError::peer(receiver))?;

    state.stats.record_delivered();
    state.emit(DispatchEvent::Delivered {
        from,
        to: receiver.clone(),
        protocol,
        timestamp: Utc::now(),
    });
    Ok(())
}

/// Wrap for the next leg and hand to `route[1]`
async fn relay(state: &NetworkState, route: &Route, packet: Packet) -> DispatchResult<()> {
    let envelope = codec::reencapsulate(
        route,
        packet,
        state.config.default_ttl,
        state.config.routing_mode,
    )?;
    let ttl = envelope.ttl().unwrap_or_default();
    let next_hop = route.next_hop();

    state
        .peer(next_hop)?
        .receive(envelope)
        .await
        .map_err(DispatchError::peer(next_hop))?;

    state.stats.record_relayed();
    state.emit(DispatchEvent::Relayed {
        from: route.sender().clone(),
        via: next_hop.clone(),
        to: route.receiver().clone(),
        ttl,
        timestamp: Utc::now(),
    });
    Ok(())
}
