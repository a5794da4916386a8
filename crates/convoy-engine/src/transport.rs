//! In-process transport for simulation runs.

use std::collections::BTreeMap;

use convoy_routing::{Message, MessageId, Transport};
use convoy_types::NodeId;

/// Transport that records every hop instead of sending anything.
///
/// The routing tiers already decide reachability from world geometry, so
/// the simulation transport only has to account for deliveries.
#[derive(Debug, Default)]
pub struct SimTransport {
    hops: Vec<(NodeId, NodeId, MessageId)>,
    received: BTreeMap<NodeId, usize>,
}

impl SimTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total hops performed since the last reset.
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Messages a node has received (counting one per hop that ends at it).
    pub fn received_by(&self, node: NodeId) -> usize {
        self.received.get(&node).copied().unwrap_or(0)
    }

    /// The recorded hop sequence.
    pub fn hops(&self) -> &[(NodeId, NodeId, MessageId)] {
        &self.hops
    }

    pub fn reset(&mut self) {
        self.hops.clear();
        self.received.clear();
    }
}

impl Transport for SimTransport {
    fn deliver(&mut self, from: NodeId, to: NodeId, message: &Message) {
        self.hops.push((from, to, message.id));
        *self.received.entry(to).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_hops_and_receipts() {
        let mut t = SimTransport::new();
        let msg = Message::routine(1, NodeId(0), "beacon");
        t.deliver(NodeId(0), NodeId(1), &msg);
        t.deliver(NodeId(0), NodeId(2), &msg);
        t.deliver(NodeId(1), NodeId(2), &msg);

        assert_eq!(t.hop_count(), 3);
        assert_eq!(t.received_by(NodeId(2)), 2);
        assert_eq!(t.received_by(NodeId(9)), 0);

        t.reset();
        assert_eq!(t.hop_count(), 0);
    }
}
