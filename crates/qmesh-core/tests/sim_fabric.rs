//! Integration tests for the in-memory backend and host
//!
//! These drive several hosts over one fabric without a network, standing in
//! for the dispatch loop by handing packets around manually.

use std::sync::Arc;

use parking_lot::Mutex;
use qmesh_core::{
    Packet, PacketSink, Payload, PayloadType, Peer, PeerError, PeerId, Protocol, SimFabric,
    SimHost, Transfer, TransferKind, UnitBackend,
};
use tokio_test::{assert_err, assert_ok};

#[derive(Default)]
struct Outbox {
    packets: Mutex<Vec<Packet>>,
}

impl PacketSink for Outbox {
    fn enqueue(&self, packet: Packet) -> Result<(), PeerError> {
        self.packets.lock().push(packet);
        Ok(())
    }
}

impl Outbox {
    fn drain(&self) -> Vec<Packet> {
        std::mem::take(&mut *self.packets.lock())
    }
}

fn make_id(name: &str) -> PeerId {
    PeerId::from(name)
}

fn make_hosts(names: &[&str]) -> (Arc<SimFabric>, Arc<Outbox>, Vec<SimHost>) {
    let fabric = SimFabric::new();
    let outbox = Arc::new(Outbox::default());
    let hosts = names
        .iter()
        .map(|name| SimHost::new(*name, Arc::new(fabric.endpoint(*name)), outbox.clone()))
        .collect();
    (fabric, outbox, hosts)
}

/// Create a pair from `a` to `b` the way the network materialises one
async fn materialize(a: &SimHost, b: &SimHost, swappable: bool) {
    let (unit, resource_id) = assert_ok!(
        a.create_pairwise_resource(b.id(), b.display_name(), None)
            .await
    );
    a.add_pairwise_resource(
        b.id(),
        qmesh_core::PairwiseResource {
            unit,
            resource_id: resource_id.clone(),
            swappable,
        },
    );
    assert_ok!(
        b.receive(Packet::new(
            a.id().clone(),
            b.id().clone(),
            Protocol::RecResource,
            PayloadType::Signal,
            Payload::ResourceGrant {
                resource_id,
                swappable,
                creator_name: a.display_name().to_string(),
            },
        ))
        .await
    );
}

#[tokio::test]
async fn test_pair_is_shared_both_ways() {
    let (fabric, _outbox, hosts) = make_hosts(&["A", "B"]);
    let (a, b) = (&hosts[0], &hosts[1]);

    materialize(a, b, false).await;

    assert!(a.shares_pairwise_resource(&make_id("B")));
    assert!(b.shares_pairwise_resource(&make_id("A")));
    assert_eq!(fabric.pairs_created(), 1);
    assert_eq!(
        a.resources_with(&make_id("B"))[0].resource_id,
        b.resources_with(&make_id("A"))[0].resource_id
    );
}

#[tokio::test]
async fn test_transfer_moves_pairing_one_hop() {
    // Setup: line A - B - C with pairs on both links
    let (_fabric, outbox, hosts) = make_hosts(&["A", "B", "C"]);
    let (a, b, c) = (&hosts[0], &hosts[1], &hosts[2]);
    materialize(a, b, true).await;
    materialize(b, c, true).await;

    // B gives up its half shared with A and sends it to C over the B-C pair
    let held = b.get_pairwise_resource(&make_id("A")).unwrap();
    assert_ok!(
        b.receive(Packet::new(
            "B",
            "C",
            Protocol::SendTransfer,
            PayloadType::Signal,
            Payload::Transfer(Transfer {
                unit: held.unit,
                resource_id: held.resource_id,
                origin: make_id("A"),
                kind: TransferKind::Resource,
            }),
        ))
        .await
    );

    let arrivals = outbox.drain();
    assert_eq!(arrivals.len(), 1);
    assert_ok!(c.receive(arrivals[0].clone()).await);

    assert!(c.shares_pairwise_resource(&make_id("A")));
    assert!(!c.shares_pairwise_resource(&make_id("B")));
    assert!(!b.shares_pairwise_resource(&make_id("C")));
}

#[tokio::test]
async fn test_units_travel_through_peers() {
    let (_fabric, _outbox, hosts) = make_hosts(&["A", "B"]);
    let (a, b) = (&hosts[0], &hosts[1]);

    let unit = qmesh_core::UnitHandle::fresh("A");
    assert_ok!(a.send_unit(unit.clone(), b.display_name()).await);

    let arrived = assert_ok!(b.recv_unit().await);
    assert_eq!(arrived.unit, unit.unit);

    // The pre-move handle is not valid at B
    assert_err!(b.send_unit(unit, a.display_name()).await);
}

#[tokio::test]
async fn test_grant_uses_creator_backend_name() {
    let fabric = SimFabric::new();
    let outbox = Arc::new(Outbox::default());
    let alice = SimHost::new("Alice", Arc::new(fabric.endpoint("alice-0")), outbox.clone());
    let bob = SimHost::new("Bob", Arc::new(fabric.endpoint("bob-0")), outbox);

    let (unit, resource_id) = assert_ok!(
        alice
            .create_pairwise_resource(bob.id(), bob.display_name(), None)
            .await
    );
    assert_eq!(unit.holder, "alice-0");

    let grant = Packet::new(
        "Alice",
        "Bob",
        Protocol::RecResource,
        PayloadType::Signal,
        Payload::ResourceGrant {
            resource_id: resource_id.clone(),
            swappable: false,
            creator_name: alice.display_name().to_string(),
        },
    );
    assert_ok!(
        tokio::time::timeout(std::time::Duration::from_secs(1), bob.receive(grant))
            .await
            .expect("grant must not wait on the peer id")
    );

    let held = bob.resources_with(&make_id("Alice"));
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].resource_id, resource_id);
    assert_eq!(held[0].unit.holder, "bob-0");
}

#[tokio::test]
async fn test_backend_name_matches_peer_id() {
    let fabric = SimFabric::new();
    let endpoint = fabric.endpoint("Alice");
    assert_eq!(endpoint.name(), "Alice");
}
