//! The routed message envelope.

use std::fmt;

use convoy_types::NodeId;

/// Unique message identifier, assigned by the originator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Delivery class. Hazard traffic is the only class escalated across
/// cluster boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    /// Safety-critical; escalated through the boundary gateway chain.
    Hazard,
    /// Ordinary intra-cluster traffic.
    #[default]
    Routine,
}

/// A message as seen by the routing tiers. Payload contents are opaque to
/// the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub id: MessageId,
    pub source: NodeId,
    pub priority: Priority,
    pub payload: String,
}

impl Message {
    /// A routine intra-cluster message.
    #[must_use]
    pub fn routine(id: u64, source: NodeId, payload: impl Into<String>) -> Self {
        Self {
            id: MessageId(id),
            source,
            priority: Priority::Routine,
            payload: payload.into(),
        }
    }

    /// A hazard message, eligible for boundary escalation.
    #[must_use]
    pub fn hazard(id: u64, source: NodeId, payload: impl Into<String>) -> Self {
        Self {
            id: MessageId(id),
            source,
            priority: Priority::Hazard,
            payload: payload.into(),
        }
    }
}
