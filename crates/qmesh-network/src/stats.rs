//! Network counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters, updated by the dispatch loop and swap tasks
#[derive(Debug, Default)]
pub struct NetworkStats {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    relayed: AtomicU64,
    quantum_transfers: AtomicU64,
    units_moved: AtomicU64,
    resources_materialized: AtomicU64,
    swaps_started: AtomicU64,
    swaps_completed: AtomicU64,
    swaps_failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`NetworkStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub delivered: u64,
    pub relayed: u64,
    pub quantum_transfers: u64,
    pub units_moved: u64,
    pub resources_materialized: u64,
    pub swaps_started: u64,
    pub swaps_completed: u64,
    pub swaps_failed: u64,
    pub dropped: u64,
}

impl StatsSnapshot {
    /// Swaps started but neither completed nor failed
    pub fn swaps_in_flight(&self) -> u64 {
        self.swaps_started
            .saturating_sub(self.swaps_completed + self.swaps_failed)
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl NetworkStats {
    pub(crate) fn record_enqueued(&self) {
        bump(&self.enqueued);
    }

    pub(crate) fn record_delivered(&self) {
        bump(&self.delivered);
    }

    pub(crate) fn record_relayed(&self) {
        bump(&self.relayed);
    }

    pub(crate) fn record_quantum_transfer(&self, units: usize) {
        bump(&self.quantum_transfers);
        self.units_moved.fetch_add(units as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_resource(&self) {
        bump(&self.resources_materialized);
    }

    pub(crate) fn record_swap_started(&self) {
        bump(&self.swaps_started);
    }

    pub(crate) fn record_swap_completed(&self) {
        bump(&self.swaps_completed);
    }

    pub(crate) fn record_swap_failed(&self) {
        bump(&self.swaps_failed);
    }

    pub(crate) fn record_dropped(&self) {
        bump(&self.dropped);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            enqueued: load(&self.enqueued),
            delivered: load(&self.delivered),
            relayed: load(&self.relayed),
            quantum_transfers: load(&self.quantum_transfers),
            units_moved: load(&self.units_moved),
            resources_materialized: load(&self.resources_materialized),
            swaps_started: load(&self.swaps_started),
            swaps_completed: load(&self.swaps_completed),
            swaps_failed: load(&self.swaps_failed),
            dropped: load(&self.dropped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = NetworkStats::default();
        stats.record_enqueued();
        stats.record_enqueued();
        stats.record_quantum_transfer(3);
        stats.record_swap_started();
        stats.record_swap_started();
        stats.record_swap_failed();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.enqueued, 2);
        assert_eq!(snapshot.quantum_transfers, 1);
        assert_eq!(snapshot.units_moved, 3);
        assert_eq!(snapshot.swaps_in_flight(), 1);
    }
}
