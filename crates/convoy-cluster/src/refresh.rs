//! Start-of-tick cluster maintenance.

use convoy_types::{ClusterId, EngineConfig, NodeId, WorldState};
use tracing::debug;

/// What the refresh pass changed.
#[derive(Debug, Default, Clone)]
pub struct RefreshReport {
    /// Members evicted for drifting beyond the cluster radius bound.
    pub evicted: Vec<(ClusterId, NodeId)>,
    /// Clusters dissolved for falling below two members.
    pub dissolved: Vec<ClusterId>,
}

/// Evict drifted members, recompute geometry, dissolve non-viable
/// clusters.
///
/// Runs before formation so that evicted and orphaned nodes are back in
/// the unassigned pool for the same tick's formation pass.
pub fn refresh_clusters(world: &mut WorldState, cfg: &EngineConfig) -> RefreshReport {
    let mut report = RefreshReport::default();
    let cluster_ids: Vec<ClusterId> = world.clusters.keys().copied().collect();

    for cid in cluster_ids {
        // Drop references to nodes that no longer exist at all.
        let stale: Vec<NodeId> = world.clusters[&cid]
            .member_ids
            .iter()
            .copied()
            .filter(|id| !world.nodes.contains_key(id))
            .collect();
        for id in stale {
            if let Some(cluster) = world.clusters.get_mut(&cid) {
                cluster.remove_member(id);
            }
        }

        world.refresh_geometry(cid);

        // Members beyond the formation radius no longer satisfy the
        // contract they were admitted under; push them back to the pool.
        let centroid = world.clusters[&cid].centroid;
        let drifted: Vec<NodeId> = world.clusters[&cid]
            .member_ids
            .iter()
            .copied()
            .filter(|id| {
                world
                    .position_of(*id)
                    .is_some_and(|p| p.distance(&centroid) > cfg.max_cluster_radius)
            })
            .collect();
        for id in drifted {
            if let Some(cluster) = world.clusters.get_mut(&cid) {
                cluster.remove_member(id);
            }
            if let Some(node) = world.nodes.get_mut(&id) {
                node.cluster_id = None;
            }
            report.evicted.push((cid, id));
        }

        if !world.clusters[&cid].is_viable() {
            dissolve(world, cid);
            report.dissolved.push(cid);
        } else {
            world.refresh_geometry(cid);
        }
    }

    if !report.dissolved.is_empty() || !report.evicted.is_empty() {
        debug!(
            dissolved = report.dissolved.len(),
            evicted = report.evicted.len(),
            "cluster refresh complete"
        );
    }
    report
}

/// Remove a cluster, returning its members to the unassigned pool.
pub(crate) fn dissolve(world: &mut WorldState, cid: ClusterId) {
    if let Some(cluster) = world.clusters.remove(&cid) {
        for id in cluster.member_ids {
            if let Some(node) = world.nodes.get_mut(&id) {
                node.cluster_id = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_types::{Cluster, Node, Position, Velocity};
    use std::collections::BTreeSet;

    fn world_with_cluster(positions: &[(u64, f64, f64)]) -> (WorldState, ClusterId) {
        let mut world = WorldState::new();
        let mut members = BTreeSet::new();
        for &(id, x, y) in positions {
            let n = Node::new(NodeId(id), Position::new(x, y), Velocity::default());
            members.insert(n.id);
            world.upsert_node(n);
        }
        let cid = world.allocate_cluster_id();
        for id in &members {
            world.nodes.get_mut(id).unwrap().cluster_id = Some(cid);
        }
        world.clusters.insert(cid, Cluster::new(cid, members));
        world.refresh_geometry(cid);
        (world, cid)
    }

    #[test]
    fn evicts_member_beyond_radius_bound() {
        let cfg = EngineConfig::default();
        // Two close members and one far beyond max_cluster_radius of the
        // centroid they form.
        let (mut world, cid) =
            world_with_cluster(&[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 5000.0, 0.0)]);

        let report = refresh_clusters(&mut world, &cfg);
        assert_eq!(report.evicted, vec![(cid, NodeId(3))]);
        assert!(world.clusters[&cid].contains(NodeId(1)));
        assert!(!world.clusters[&cid].contains(NodeId(3)));
        assert_eq!(world.nodes[&NodeId(3)].cluster_id, None);
    }

    #[test]
    fn dissolves_below_two_members() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = world_with_cluster(&[(1, 0.0, 0.0), (2, 5000.0, 0.0)]);

        // Eviction of the far member leaves one; cluster must dissolve and
        // the survivor returns to the pool.
        let report = refresh_clusters(&mut world, &cfg);
        assert!(report.dissolved.contains(&cid));
        assert!(!world.clusters.contains_key(&cid));
        assert_eq!(world.nodes[&NodeId(1)].cluster_id, None);
        assert_eq!(world.nodes[&NodeId(2)].cluster_id, None);
    }

    #[test]
    fn healthy_cluster_untouched() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = world_with_cluster(&[(1, 0.0, 0.0), (2, 20.0, 0.0), (3, 40.0, 0.0)]);

        let report = refresh_clusters(&mut world, &cfg);
        assert!(report.evicted.is_empty());
        assert!(report.dissolved.is_empty());
        assert_eq!(world.clusters[&cid].member_ids.len(), 3);
        assert!(world.check_consistency().is_empty());
    }

    #[test]
    fn drops_vanished_nodes() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = world_with_cluster(&[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 20.0, 0.0)]);
        world.nodes.remove(&NodeId(2));

        refresh_clusters(&mut world, &cfg);
        assert!(!world.clusters[&cid].contains(NodeId(2)));
        assert!(world.check_consistency().is_empty());
    }
}
