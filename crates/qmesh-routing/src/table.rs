//! Address table
//!
//! Maps peer ids to live peer handles. This is the source of truth for
//! whether a peer is known; the topology may still hold a node for a peer
//! that has been removed here.

use std::sync::Arc;

use dashmap::DashMap;
use qmesh_core::{Peer, PeerId};

/// Shared map from peer id to peer handle
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct AddressTable {
    peers: Arc<DashMap<PeerId, Arc<dyn Peer>>>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer under its own id, returning any handle it replaced
    pub fn insert(&self, peer: Arc<dyn Peer>) -> Option<Arc<dyn Peer>> {
        self.peers.insert(peer.id().clone(), peer)
    }

    pub fn remove(&self, id: &PeerId) -> Option<Arc<dyn Peer>> {
        self.peers.remove(id).map(|(_, peer)| peer)
    }

    pub fn get(&self, id: &PeerId) -> Option<Arc<dyn Peer>> {
        self.peers.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Backend addressing name of a registered peer
    pub fn display_name(&self, id: &PeerId) -> Option<String> {
        self.peers
            .get(id)
            .map(|entry| entry.value().display_name().to_string())
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.peers.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl std::fmt::Debug for AddressTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressTable")
            .field("peers", &self.ids())
            .finish()
    }
}
