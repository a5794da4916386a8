//! Greedy cluster formation over the unassigned pool.

use std::collections::BTreeSet;

use convoy_types::{Cluster, ClusterId, EngineConfig, NodeId, WorldState};
use tracing::debug;

/// Form new clusters from unassigned nodes.
///
/// Seeds are visited in ascending node-id order; for each still-unassigned
/// seed, the candidate set is every other unassigned node within
/// `max_cluster_radius` whose speed differs by less than `speed_threshold`
/// and whose circular heading differs by less than `direction_threshold`.
/// A cluster is instantiated when seed plus candidates reach
/// `min_cluster_size`.
///
/// Greedy and order-dependent by design: the deterministic seed order
/// makes runs reproducible, and a globally optimal partition is not worth
/// the per-tick cost.
pub fn form_clusters(world: &mut WorldState, cfg: &EngineConfig) -> Vec<ClusterId> {
    let mut formed = Vec::new();
    let seeds = world.unassigned();

    for seed in seeds {
        // May have been swept up as a candidate of an earlier seed.
        let Some(seed_node) = world.nodes.get(&seed) else {
            continue;
        };
        if seed_node.cluster_id.is_some() {
            continue;
        }
        let seed_pos = seed_node.position;
        let seed_vel = seed_node.velocity;

        let candidates: BTreeSet<NodeId> = world
            .nodes
            .values()
            .filter(|n| n.id != seed && n.cluster_id.is_none())
            .filter(|n| n.position.distance(&seed_pos) <= cfg.max_cluster_radius)
            .filter(|n| n.velocity.speed_delta(&seed_vel) < cfg.speed_threshold)
            .filter(|n| n.velocity.heading_delta(&seed_vel) < cfg.direction_threshold)
            .map(|n| n.id)
            .collect();

        if candidates.len() + 1 < cfg.min_cluster_size {
            continue;
        }

        let mut members = candidates;
        members.insert(seed);

        let cid = world.allocate_cluster_id();
        for id in &members {
            if let Some(node) = world.nodes.get_mut(id) {
                node.cluster_id = Some(cid);
                node.joined_cluster_at = world.tick;
            }
        }
        world.clusters.insert(cid, Cluster::new(cid, members));
        world.refresh_geometry(cid);

        debug!(cluster = %cid, size = world.clusters[&cid].member_ids.len(), "cluster formed");
        formed.push(cid);
    }

    formed
}
