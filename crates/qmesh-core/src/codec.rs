//! Relay envelope codec
//!
//! Routes longer than one hop are traversed inside a [`RelayEnvelope`]. The
//! envelope's inner packet is never rewritten; only the outer sender, receiver,
//! route and TTL change from hop to hop.

use crate::error::RoutingError;
use crate::identity::PeerId;
use crate::packet::{Packet, Payload, PayloadType, Protocol, RelayEnvelope, Route, RoutingMode};

/// Outcome of unwrapping a packet at a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unwrapped {
    /// This peer is the final receiver: handle the inner packet
    Deliver(Packet),
    /// Hand the envelope back to the network, now sent from this peer
    Forward(Packet),
    /// Not a relay envelope
    Local(Packet),
}

/// Wrap `inner` for the first hop of `route`
///
/// The envelope is addressed from `route[1]`. In hop-by-hop mode its receiver
/// is the final receiver; in source-routed mode only the next-next hop is
/// exposed.
pub fn encapsulate(route: &Route, inner: Packet, ttl: u8, mode: RoutingMode) -> Packet {
    let receiver = match mode {
        RoutingMode::HopByHop => route.receiver(),
        RoutingMode::SourceRouted => route.hops().get(2).unwrap_or(route.receiver()),
    };

    Packet {
        sender: route.next_hop().clone(),
        receiver: receiver.clone(),
        protocol: Protocol::Relay,
        payload_type: PayloadType::Signal,
        payload: Payload::Relay(RelayEnvelope {
            route: route.clone(),
            ttl,
            inner: Box::new(inner),
        }),
    }
}

/// Wrap `packet` for the next leg of a relay
///
/// An existing envelope is opened first so envelopes never nest, and its TTL
/// is decremented. Plain packets get `default_ttl`.
pub fn reencapsulate(
    route: &Route,
    packet: Packet,
    default_ttl: u8,
    mode: RoutingMode,
) -> Result<Packet, RoutingError> {
    let Packet {
        sender,
        receiver,
        protocol,
        payload_type,
        payload,
    } = packet;

    match payload {
        Payload::Relay(envelope) => {
            let ttl = envelope.ttl.saturating_sub(1);
            if ttl == 0 {
                return Err(RoutingError::TtlExpired { at: sender });
            }
            Ok(encapsulate(route, *envelope.inner, ttl, mode))
        }
        payload => {
            let inner = Packet {
                sender,
                receiver,
                protocol,
                payload_type,
                payload,
            };
            Ok(encapsulate(route, inner, default_ttl, mode))
        }
    }
}

/// Decide what peer `at` does with an incoming packet
pub fn unwrap(packet: Packet, at: &PeerId) -> Unwrapped {
    match packet.payload {
        Payload::Relay(envelope) if envelope.inner.receiver == *at => {
            Unwrapped::Deliver(*envelope.inner)
        }
        Payload::Relay(envelope) => Unwrapped::Forward(Packet {
            sender: at.clone(),
            payload: Payload::Relay(envelope),
            ..packet
        }),
        payload => Unwrapped::Local(Packet { payload, ..packet }),
    }
}
