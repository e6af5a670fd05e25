//! Peer identities

use std::borrow::Borrow;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Opaque peer identifier
///
/// Unique key into the address table and into every topology node.
#[derive(
    Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build identifiers for a list of names, in order
    pub fn many<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Vec<Self> {
        names
            .into_iter()
            .map(|name| Self::new(name.as_ref()))
            .collect()
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for PeerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PeerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
