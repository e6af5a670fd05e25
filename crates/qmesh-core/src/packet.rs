//! Packets, payloads and routes
//!
//! A [`Packet`] always carries the five mandatory fields. Route and TTL only
//! exist on relay envelopes, so they live inside [`Payload::Relay`] instead of
//! being optional fields on every packet.

use std::fmt;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::identity::PeerId;
use crate::resource::{QuantumUnit, ResourceId, Transfer};

/// Hop budget given to new relay envelopes
pub const DEFAULT_TTL: u8 = 10;

/// Protocol tag of a packet
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Multi-hop relay envelope
    #[display("RELAY")]
    Relay,
    /// Request (or grant) of a pairwise resource
    #[display("REC_RESOURCE")]
    RecResource,
    /// Instruction to a hop to transfer a held unit onwards
    #[display("SEND_TRANSFER")]
    SendTransfer,
    /// Arrival of a transferred unit
    #[display("REC_TRANSFER")]
    RecTransfer,
    #[display("SIGNAL")]
    Signal,
    #[display("CLASSICAL")]
    Classical,
    #[display("ACK")]
    Ack,
    /// Application protocol the network routes without interpreting
    #[display("{_0}")]
    Other(String),
}

/// Kind of content carried by a packet
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadType {
    #[display("QUANTUM")]
    Quantum,
    #[display("SIGNAL")]
    Signal,
    #[display("CLASSICAL")]
    Classical,
}

/// Protocol-specific packet body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    /// Units moved by the quantum prepass
    Units(Vec<QuantumUnit>),
    /// Request for a pairwise resource between sender and receiver
    ResourceRequest {
        resource_id: Option<ResourceId>,
        swappable: bool,
    },
    /// A materialised resource, delivered to the partner
    ///
    /// `creator_name` is the backend name the creator's half was parked under.
    ResourceGrant {
        resource_id: ResourceId,
        swappable: bool,
        creator_name: String,
    },
    Transfer(Transfer),
    Relay(RelayEnvelope),
}

/// Wrapper used to traverse a route longer than one hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub route: Route,
    pub ttl: u8,
    /// The original packet, never rewritten while relayed
    pub inner: Box<Packet>,
}

/// The unit of work on the network queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub sender: PeerId,
    pub receiver: PeerId,
    pub protocol: Protocol,
    pub payload_type: PayloadType,
    pub payload: Payload,
}

impl Packet {
    pub fn new(
        sender: impl Into<PeerId>,
        receiver: impl Into<PeerId>,
        protocol: Protocol,
        payload_type: PayloadType,
        payload: Payload,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            protocol,
            payload_type,
            payload,
        }
    }

    /// Create a text signal
    pub fn signal(
        sender: impl Into<PeerId>,
        receiver: impl Into<PeerId>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            sender,
            receiver,
            Protocol::Signal,
            PayloadType::Signal,
            Payload::Text(text.into()),
        )
    }

    /// Create a classical message
    pub fn classical(
        sender: impl Into<PeerId>,
        receiver: impl Into<PeerId>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            sender,
            receiver,
            Protocol::Classical,
            PayloadType::Classical,
            Payload::Text(text.into()),
        )
    }

    /// Ask for a pairwise resource between `sender` and `receiver`
    ///
    /// A supplied `resource_id` is reused by every hop of a swap chain.
    pub fn resource_request(
        sender: impl Into<PeerId>,
        receiver: impl Into<PeerId>,
        resource_id: Option<ResourceId>,
    ) -> Self {
        Self::new(
            sender,
            receiver,
            Protocol::RecResource,
            PayloadType::Signal,
            Payload::ResourceRequest {
                resource_id,
                swappable: false,
            },
        )
    }

    /// Create a quantum packet carrying `units`
    pub fn quantum(
        sender: impl Into<PeerId>,
        receiver: impl Into<PeerId>,
        protocol: Protocol,
        units: Vec<QuantumUnit>,
    ) -> Self {
        Self::new(
            sender,
            receiver,
            protocol,
            PayloadType::Quantum,
            Payload::Units(units),
        )
    }

    /// Relay envelope, if this packet is one
    pub fn envelope(&self) -> Option<&RelayEnvelope> {
        match &self.payload {
            Payload::Relay(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Embedded route, present only on relay envelopes
    pub fn route(&self) -> Option<&Route> {
        self.envelope().map(|envelope| &envelope.route)
    }

    /// Remaining hop budget, present only on relay envelopes
    pub fn ttl(&self) -> Option<u8> {
        self.envelope().map(|envelope| envelope.ttl)
    }

    pub fn is_relay(&self) -> bool {
        self.protocol == Protocol::Relay && self.envelope().is_some()
    }

    pub fn is_quantum(&self) -> bool {
        self.payload_type == PayloadType::Quantum
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{} [{}/{}]",
            self.sender, self.receiver, self.protocol, self.payload_type
        )
    }
}

/// How forwarding hops learn the path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingMode {
    /// Every hop recomputes the route
    #[default]
    HopByHop,
    /// The route is embedded once at origination and each hop trims its prefix
    SourceRouted,
}

/// An ordered path of at least two peers
///
/// `route[0]` is the sender and the last entry the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<PeerId>", into = "Vec<PeerId>")]
pub struct Route(Vec<PeerId>);

impl Route {
    pub fn new(hops: Vec<PeerId>) -> Result<Self, RoutingError> {
        if hops.len() < 2 {
            return Err(RoutingError::InvalidRoute { len: hops.len() });
        }
        Ok(Self(hops))
    }

    pub fn sender(&self) -> &PeerId {
        &self.0[0]
    }

    pub fn receiver(&self) -> &PeerId {
        &self.0[self.0.len() - 1]
    }

    /// First hop past the sender
    pub fn next_hop(&self) -> &PeerId {
        &self.0[1]
    }

    pub fn hops(&self) -> &[PeerId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Routes always hold at least two hops
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when sender and receiver are direct neighbors
    pub fn is_direct(&self) -> bool {
        self.0.len() == 2
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.0.contains(peer)
    }

    /// The remaining route starting at `peer`
    pub fn suffix_from(&self, peer: &PeerId) -> Result<Route, RoutingError> {
        let index = self
            .0
            .iter()
            .position(|hop| hop == peer)
            .ok_or_else(|| RoutingError::NotOnRoute { peer: peer.clone() })?;
        Route::new(self.0[index..].to_vec())
    }

    /// Consecutive `(route[i], route[i + 1])` links
    pub fn links(&self) -> impl Iterator<Item = (&PeerId, &PeerId)> {
        self.0.windows(2).map(|pair| (&pair[0], &pair[1]))
    }
}

impl TryFrom<Vec<PeerId>> for Route {
    type Error = RoutingError;

    fn try_from(hops: Vec<PeerId>) -> Result<Self, Self::Error> {
        Route::new(hops)
    }
}

impl From<Route> for Vec<PeerId> {
    fn from(route: Route) -> Self {
        route.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hops: Vec<&str> = self.0.iter().map(PeerId::as_str).collect();
        write!(f, "{}", hops.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(names: &[&str]) -> Route {
        Route::new(PeerId::many(names)).unwrap()
    }

    #[test]
    fn test_short_routes_are_invalid() {
        assert_eq!(
            Route::new(vec![]),
            Err(RoutingError::InvalidRoute { len: 0 })
        );
        assert_eq!(
            Route::new(PeerId::many(&["A"])),
            Err(RoutingError::InvalidRoute { len: 1 })
        );
    }

    #[test]
    fn test_route_endpoints() {
        let route = route(&["A", "B", "C"]);
        assert_eq!(route.sender().as_str(), "A");
        assert_eq!(route.next_hop().as_str(), "B");
        assert_eq!(route.receiver().as_str(), "C");
        assert!(!route.is_direct());
        assert_eq!(route.to_string(), "A -> B -> C");
    }

    #[test]
    fn test_suffix_from_trims_prefix() {
        let route = route(&["A", "B", "C", "D"]);

        let suffix = route.suffix_from(&PeerId::from("B")).unwrap();
        assert_eq!(suffix.hops(), PeerId::many(&["B", "C", "D"]).as_slice());

        // Trimming down to the receiver leaves a single hop
        assert_eq!(
            route.suffix_from(&PeerId::from("D")),
            Err(RoutingError::InvalidRoute { len: 1 })
        );
        assert!(matches!(
            route.suffix_from(&PeerId::from("Z")),
            Err(RoutingError::NotOnRoute { .. })
        ));
    }

    #[test]
    fn test_links_pair_consecutive_hops() {
        let route = route(&["A", "B", "C"]);
        let links: Vec<(String, String)> = route
            .links()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        assert_eq!(
            links,
            vec![
                ("A".to_string(), "B".to_string()),
                ("B".to_string(), "C".to_string())
            ]
        );
    }

    #[test]
    fn test_route_deserialization_rejects_short_routes() {
        let err = serde_json::from_str::<Route>(r#"["A"]"#);
        assert!(err.is_err());

        let ok: Route = serde_json::from_str(r#"["A","B"]"#).unwrap();
        assert!(ok.is_direct());
    }

    #[test]
    fn test_route_and_ttl_only_on_envelopes() {
        let inner = Packet::signal("A", "C", "x");
        assert!(inner.route().is_none());
        assert!(inner.ttl().is_none());

        let envelope = Packet::new(
            "B",
            "C",
            Protocol::Relay,
            PayloadType::Signal,
            Payload::Relay(RelayEnvelope {
                route: route(&["A", "B", "C"]),
                ttl: DEFAULT_TTL,
                inner: Box::new(inner),
            }),
        );
        assert!(envelope.is_relay());
        assert_eq!(envelope.ttl(), Some(DEFAULT_TTL));
        assert_eq!(envelope.route().map(Route::len), Some(3));
    }

    #[test]
    fn test_protocol_display_tags() {
        assert_eq!(Protocol::RecResource.to_string(), "REC_RESOURCE");
        assert_eq!(Protocol::Other("PING".into()).to_string(), "PING");
        assert_eq!(
            Packet::signal("A", "B", "x").to_string(),
            "A->B [SIGNAL/SIGNAL]"
        );
    }
}
