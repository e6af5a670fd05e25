//! Configuration for the network

use std::time::Duration;

use qmesh_core::{DEFAULT_TTL, RoutingMode};
use serde::{Deserialize, Serialize};

/// Default pause before each dequeued packet is processed
pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_millis(500);

/// Configuration for a [`Network`](crate::Network)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Pause before each dequeued packet, pacing backend interaction
    pub delay: Duration,
    /// Whether forwarding hops recompute routes or follow the embedded one
    pub routing_mode: RoutingMode,
    /// Hop budget of new relay envelopes
    pub default_ttl: u8,
    /// Upper bound on each swap-chain wait; `None` waits indefinitely
    pub swap_wait_timeout: Option<Duration>,
    /// File units moved by the quantum prepass at their destination
    pub store_delivered_units: bool,
    /// Dispatch event broadcast channel capacity
    pub event_channel_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DISPATCH_DELAY,
            routing_mode: RoutingMode::HopByHop,
            default_ttl: DEFAULT_TTL,
            swap_wait_timeout: None,
            store_delivered_units: true,
            event_channel_capacity: 1024,
        }
    }
}

impl NetworkConfig {
    /// No pacing delay and bounded swap waits
    pub fn testing() -> Self {
        Self {
            delay: Duration::ZERO,
            swap_wait_timeout: Some(Duration::from_secs(5)),
            ..Self::default()
        }
    }

    /// Set the dispatch delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the routing mode
    pub fn with_routing_mode(mut self, mode: RoutingMode) -> Self {
        self.routing_mode = mode;
        self
    }

    /// Set the TTL given to new relay envelopes
    pub fn with_default_ttl(mut self, ttl: u8) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Bound every swap-chain wait by `timeout`
    pub fn with_swap_wait_timeout(mut self, timeout: Duration) -> Self {
        self.swap_wait_timeout = Some(timeout);
        self
    }

    /// Choose whether moved units are filed at their destination
    pub fn with_store_delivered_units(mut self, store: bool) -> Self {
        self.store_delivered_units = store;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.delay, Duration::from_millis(500));
        assert_eq!(config.routing_mode, RoutingMode::HopByHop);
        assert_eq!(config.default_ttl, 10);
        assert!(config.swap_wait_timeout.is_none());
        assert!(config.store_delivered_units);
    }

    #[test]
    fn test_builders() {
        let config = NetworkConfig::testing()
            .with_routing_mode(RoutingMode::SourceRouted)
            .with_default_ttl(3)
            .with_event_channel_capacity(16);

        assert!(config.delay.is_zero());
        assert_eq!(config.routing_mode, RoutingMode::SourceRouted);
        assert_eq!(config.default_ttl, 3);
        assert_eq!(config.event_channel_capacity, 16);
        assert!(config.swap_wait_timeout.is_some());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{"routing_mode":"SourceRouted","default_ttl":4}"#).unwrap();

        assert_eq!(config.routing_mode, RoutingMode::SourceRouted);
        assert_eq!(config.default_ttl, 4);
        assert_eq!(config.delay, DEFAULT_DISPATCH_DELAY);
    }
}
