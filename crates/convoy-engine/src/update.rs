//! Mobility intake.

use convoy_types::{Node, NodeId, Position, Velocity, WorldState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A mobility report from one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub node_id: NodeId,
    pub position: Position,
    pub velocity: Velocity,
    /// Sender-side timestamp; updates are applied oldest first so the
    /// newest report wins.
    pub timestamp: u64,
}

/// Apply a batch of updates, registering nodes seen for the first time.
///
/// Returns the ids that were newly registered.
pub(crate) fn apply_updates(world: &mut WorldState, mut updates: Vec<PositionUpdate>) -> Vec<NodeId> {
    updates.sort_by_key(|u| u.timestamp);
    let mut registered = Vec::new();
    for update in updates {
        match world.nodes.get_mut(&update.node_id) {
            Some(node) => {
                node.position = update.position;
                node.velocity = update.velocity;
            }
            None => {
                debug!(node = %update.node_id, "registering new node");
                world.upsert_node(Node::new(update.node_id, update.position, update.velocity));
                registered.push(update.node_id);
            }
        }
    }
    registered
}
