//! Pairwise resources and simulated quantum units
//!
//! The network orchestrates *when* resources are created and exchanged; the
//! resources themselves always live inside the peers that hold them.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::PeerId;

/// Identifier shared by both halves of a pairwise resource
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Live handle of one simulated quantum unit
///
/// A handle is only valid at its current holder. Moving a unit across a link
/// yields a new handle with the same `unit` id and a bumped `generation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitHandle {
    /// Identity of the underlying unit, stable across moves
    pub unit: Uuid,
    /// Backend name of the endpoint currently holding the unit
    pub holder: String,
    /// Number of links this unit has crossed
    pub generation: u32,
}

impl UnitHandle {
    /// Create a fresh unit held by `holder`
    pub fn fresh(holder: impl Into<String>) -> Self {
        Self {
            unit: Uuid::new_v4(),
            holder: holder.into(),
            generation: 0,
        }
    }

    /// The handle this unit gets once it arrives at `holder`
    pub fn moved_to(&self, holder: impl Into<String>) -> Self {
        Self {
            unit: self.unit,
            holder: holder.into(),
            generation: self.generation + 1,
        }
    }
}

/// A unit carried in a quantum payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantumUnit {
    /// Application-level identifier of the unit
    pub unit_id: String,
    /// Current live handle
    pub handle: UnitHandle,
    /// Whether the unit is blocked while in flight
    pub blocked: bool,
}

impl QuantumUnit {
    /// Wrap a handle into a payload unit
    pub fn new(unit_id: impl Into<String>, handle: UnitHandle) -> Self {
        Self {
            unit_id: unit_id.into(),
            handle,
            blocked: true,
        }
    }
}

/// A resource shared between exactly two peers, as held by one of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairwiseResource {
    /// Local half of the pair
    pub unit: UnitHandle,
    /// Identifier both halves are tagged with
    pub resource_id: ResourceId,
    /// Whether the resource was created as one link of a swap chain
    pub swappable: bool,
}

impl PairwiseResource {
    pub fn new(unit: UnitHandle, resource_id: ResourceId) -> Self {
        Self {
            unit,
            resource_id,
            swappable: false,
        }
    }

    pub fn swappable(unit: UnitHandle, resource_id: ResourceId) -> Self {
        Self {
            unit,
            resource_id,
            swappable: true,
        }
    }
}

/// What a transferred unit represents at its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    /// Half of a pairwise resource shared with the origin
    Resource,
    /// A plain data unit sent by the origin
    Data,
}

/// Body of a transfer instruction or arrival
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub unit: UnitHandle,
    pub resource_id: ResourceId,
    /// Peer the transferred unit is logically shared with
    pub origin: PeerId,
    pub kind: TransferKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_resource_ids_differ() {
        assert_ne!(ResourceId::generate(), ResourceId::generate());
    }

    #[test]
    fn test_moved_handle_keeps_unit_identity() {
        let handle = UnitHandle::fresh("Alice");
        let moved = handle.moved_to("Bob");

        assert_eq!(moved.unit, handle.unit);
        assert_eq!(moved.holder, "Bob");
        assert_eq!(moved.generation, 1);
        assert_ne!(moved, handle);
    }

    #[test]
    fn test_new_quantum_unit_is_blocked() {
        let unit = QuantumUnit::new("q1", UnitHandle::fresh("Alice"));
        assert!(unit.blocked);
    }
}
