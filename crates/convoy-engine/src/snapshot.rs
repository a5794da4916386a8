//! Read-only cluster snapshots for external consumers.

use convoy_types::{ClusterId, ElectionState, NodeId, Position, WorldState};
use serde::{Deserialize, Serialize};

/// One cluster's externally visible state.
///
/// Gateways are a pair list rather than a map so the snapshot stays plain
/// JSON (object keys must be strings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub cluster: ClusterId,
    pub members: Vec<NodeId>,
    pub leader: Option<NodeId>,
    pub co_leader: Option<NodeId>,
    pub relays: Vec<NodeId>,
    pub gateways: Vec<(ClusterId, NodeId)>,
    pub centroid: Position,
    pub radius: f64,
    pub epoch: u64,
    pub state: ElectionState,
}

/// Snapshot every live cluster, ordered by id.
pub fn cluster_snapshots(world: &WorldState) -> Vec<ClusterSnapshot> {
    world
        .clusters
        .values()
        .map(|c| ClusterSnapshot {
            cluster: c.id,
            members: c.member_ids.iter().copied().collect(),
            leader: c.leader_id,
            co_leader: c.co_leader_id,
            relays: c.relay_ids.iter().copied().collect(),
            gateways: c.boundary_map.iter().map(|(&k, &v)| (k, v)).collect(),
            centroid: c.centroid,
            radius: c.radius,
            epoch: c.epoch,
            state: c.state,
        })
        .collect()
}
