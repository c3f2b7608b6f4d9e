//! Strongly-typed identifiers for Weft entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a component node within a flow graph.
///
/// Node IDs are assigned in insertion order during Load and remain stable for
/// the lifetime of the runtime, so iterating nodes in ID order reproduces the
/// insertion sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a new node ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Get the ID as a usize index into the node arena.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId::new(3).to_string(), "node_3");
    }

    #[test]
    fn node_id_ordering_follows_raw_value() {
        assert!(NodeId::new(1) < NodeId::new(2));
        assert_eq!(NodeId::new(7).index(), 7);
    }
}
