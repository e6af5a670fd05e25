//! In-memory unit backend
//!
//! A [`SimFabric`] connects any number of [`SimEndpoint`]s by name. Units sent
//! between endpoints travel over unbounded channels; paired units are parked
//! per `(owner, creator)` until the owner collects them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let fabric = SimFabric::new();
//! let alice = fabric.endpoint("Alice");
//! let bob = fabric.endpoint("Bob");
//!
//! let local = alice.create_paired_unit("Bob").await?;
//! let remote = bob.recv_paired_unit("Alice").await?;
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::trace;

use crate::error::BackendError;
use crate::peer::UnitBackend;
use crate::resource::UnitHandle;

/// Shared medium connecting simulated endpoints
#[derive(Default)]
pub struct SimFabric {
    /// Unit inboxes keyed by endpoint name
    inboxes: DashMap<String, mpsc::UnboundedSender<UnitHandle>>,
    /// Uncollected pair halves keyed by (owner, creator)
    pairs: DashMap<(String, String), VecDeque<UnitHandle>>,
    pair_ready: Notify,
    units_moved: AtomicU64,
    pairs_created: AtomicU64,
}

impl SimFabric {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an endpoint named `name`
    ///
    /// Registering a name twice replaces the earlier endpoint's inbox.
    pub fn endpoint(self: &Arc<Self>, name: impl Into<String>) -> SimEndpoint {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.insert(name.clone(), tx);
        SimEndpoint {
            name,
            fabric: Arc::clone(self),
            inbox: Mutex::new(rx),
        }
    }

    pub fn has_endpoint(&self, name: &str) -> bool {
        self.inboxes.contains_key(name)
    }

    /// Units delivered between endpoints so far
    pub fn units_moved(&self) -> u64 {
        self.units_moved.load(Ordering::Relaxed)
    }

    /// Pairs created so far
    pub fn pairs_created(&self) -> u64 {
        self.pairs_created.load(Ordering::Relaxed)
    }

    fn take_pair(&self, owner: &str, creator: &str) -> Option<UnitHandle> {
        self.pairs
            .get_mut(&(owner.to_string(), creator.to_string()))
            .and_then(|mut halves| halves.pop_front())
    }
}

/// One named endpoint on a [`SimFabric`]
pub struct SimEndpoint {
    name: String,
    fabric: Arc<SimFabric>,
    inbox: Mutex<mpsc::UnboundedReceiver<UnitHandle>>,
}

impl SimEndpoint {
    pub fn fabric(&self) -> &Arc<SimFabric> {
        &self.fabric
    }
}

#[async_trait]
impl UnitBackend for SimEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_unit(&self, handle: UnitHandle, destination: &str) -> Result<(), BackendError> {
        if handle.holder != self.name {
            return Err(BackendError::ForeignHandle {
                unit: handle.unit,
                holder: handle.holder,
                endpoint: self.name.clone(),
            });
        }

        let inbox = self
            .fabric
            .inboxes
            .get(destination)
            .map(|tx| tx.clone())
            .ok_or_else(|| BackendError::UnknownEndpoint(destination.to_string()))?;

        inbox
            .send(handle.moved_to(destination))
            .map_err(|_| BackendError::ChannelClosed(destination.to_string()))?;
        self.fabric.units_moved.fetch_add(1, Ordering::Relaxed);

        trace!(from = %self.name, to = %destination, unit = %handle.unit, "Unit sent");
        Ok(())
    }

    async fn recv_unit(&self) -> Result<UnitHandle, BackendError> {
        let mut inbox = self.inbox.lock().await;
        inbox
            .recv()
            .await
            .ok_or_else(|| BackendError::ChannelClosed(self.name.clone()))
    }

    async fn create_paired_unit(&self, partner: &str) -> Result<UnitHandle, BackendError> {
        if !self.fabric.has_endpoint(partner) {
            return Err(BackendError::UnknownEndpoint(partner.to_string()));
        }

        self.fabric
            .pairs
            .entry((partner.to_string(), self.name.clone()))
            .or_default()
            .push_back(UnitHandle::fresh(partner));
        self.fabric.pairs_created.fetch_add(1, Ordering::Relaxed);
        self.fabric.pair_ready.notify_waiters();

        trace!(creator = %self.name, partner = %partner, "Pair created");
        Ok(UnitHandle::fresh(self.name.clone()))
    }

    async fn recv_paired_unit(&self, partner: &str) -> Result<UnitHandle, BackendError> {
        loop {
            let notified = self.fabric.pair_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(half) = self.fabric.take_pair(&self.name, partner) {
                return Ok(half);
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_moves_unit_to_destination() {
        let fabric = SimFabric::new();
        let alice = fabric.endpoint("Alice");
        let bob = fabric.endpoint("Bob");

        let unit = UnitHandle::fresh("Alice");
        alice.send_unit(unit.clone(), "Bob").await.unwrap();

        let received = bob.recv_unit().await.unwrap();
        assert_eq!(received.unit, unit.unit);
        assert_eq!(received.holder, "Bob");
        assert_eq!(fabric.units_moved(), 1);
    }

    #[tokio::test]
    async fn test_send_rejects_foreign_handle() {
        let fabric = SimFabric::new();
        let alice = fabric.endpoint("Alice");
        let _bob = fabric.endpoint("Bob");

        let result = alice.send_unit(UnitHandle::fresh("Bob"), "Bob").await;
        assert!(matches!(result, Err(BackendError::ForeignHandle { .. })));
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let fabric = SimFabric::new();
        let alice = fabric.endpoint("Alice");

        let result = alice.send_unit(UnitHandle::fresh("Alice"), "Nobody").await;
        assert!(matches!(result, Err(BackendError::UnknownEndpoint(name)) if name == "Nobody"));
        assert!(alice.create_paired_unit("Nobody").await.is_err());
    }

    #[tokio::test]
    async fn test_paired_unit_waits_for_creator() {
        let fabric = SimFabric::new();
        let alice = fabric.endpoint("Alice");
        let bob = Arc::new(fabric.endpoint("Bob"));

        let waiter = {
            let bob = Arc::clone(&bob);
            tokio::spawn(async move { bob.recv_paired_unit("Alice").await })
        };
        tokio::task::yield_now().await;

        let local = alice.create_paired_unit("Bob").await.unwrap();
        let remote = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(local.holder, "Alice");
        assert_eq!(remote.holder, "Bob");
        assert_eq!(fabric.pairs_created(), 1);
    }
}
