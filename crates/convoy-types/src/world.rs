//! The explicit world state passed by reference into every phase.
//!
//! There are no global registries: the simulation driver owns exactly one
//! `WorldState` and lends it to the clustering, trust, election and
//! routing phases in a fixed order each tick.

use std::collections::BTreeMap;

use crate::cluster::{Cluster, ClusterId};
use crate::geometry::Position;
use crate::node::{Node, NodeId};

/// All nodes and clusters known to the engine.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    /// All live nodes, ordered by id for deterministic iteration.
    pub nodes: BTreeMap<NodeId, Node>,
    /// All live clusters.
    pub clusters: BTreeMap<ClusterId, Cluster>,
    /// Current tick; advanced only by the driver.
    pub tick: u64,
    next_cluster_id: u64,
}

impl WorldState {
    /// Empty world at tick zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node.
    pub fn upsert_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Allocate the next cluster id.
    pub fn allocate_cluster_id(&mut self) -> ClusterId {
        let id = ClusterId(self.next_cluster_id);
        self.next_cluster_id += 1;
        id
    }

    /// Node ids not currently assigned to any cluster, ascending.
    pub fn unassigned(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.cluster_id.is_none())
            .map(|n| n.id)
            .collect()
    }

    /// Node ids within `radius` of `origin`, ascending, excluding none.
    pub fn within_range(&self, origin: Position, radius: f64) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.position.distance(&origin) <= radius)
            .map(|n| n.id)
            .collect()
    }

    /// Position of a node, if it exists.
    pub fn position_of(&self, id: NodeId) -> Option<Position> {
        self.nodes.get(&id).map(|n| n.position)
    }

    /// The cluster a node belongs to, if any.
    pub fn cluster_of(&self, id: NodeId) -> Option<&Cluster> {
        let cid = self.nodes.get(&id)?.cluster_id?;
        self.clusters.get(&cid)
    }

    /// Whether `id` currently leads any cluster. Derived, never cached.
    pub fn is_leader(&self, id: NodeId) -> bool {
        self.cluster_of(id).is_some_and(|c| c.is_leader(id))
    }

    /// Recompute a cluster's centroid and radius from member positions.
    ///
    /// No-op for clusters whose members all vanished; those are dissolved
    /// by the clustering refresh instead.
    pub fn refresh_geometry(&mut self, cluster_id: ClusterId) {
        let Some(cluster) = self.clusters.get(&cluster_id) else {
            return;
        };
        let positions: Vec<Position> = cluster
            .member_ids
            .iter()
            .filter_map(|id| self.position_of(*id))
            .collect();
        let Some(centroid) = Position::centroid(positions.iter().copied()) else {
            return;
        };
        let radius = positions
            .iter()
            .map(|p| p.distance(&centroid))
            .fold(0.0f64, f64::max);
        if let Some(cluster) = self.clusters.get_mut(&cluster_id) {
            cluster.centroid = centroid;
            cluster.radius = radius;
        }
    }

    /// Walk the cross-reference invariant: every id a cluster references
    /// must name a node whose `cluster_id` points back at that cluster.
    ///
    /// Returns the offending (cluster, node) pairs; empty means consistent.
    pub fn check_consistency(&self) -> Vec<(ClusterId, NodeId)> {
        let mut violations = Vec::new();
        for cluster in self.clusters.values() {
            let referenced = cluster
                .member_ids
                .iter()
                .copied()
                .chain(cluster.leader_id)
                .chain(cluster.co_leader_id)
                .chain(cluster.relay_ids.iter().copied())
                .chain(cluster.boundary_map.values().copied());
            for id in referenced {
                let points_back = self
                    .nodes
                    .get(&id)
                    .is_some_and(|n| n.cluster_id == Some(cluster.id));
                if !points_back {
                    violations.push((cluster.id, id));
                }
            }
        }
        violations
    }
}
