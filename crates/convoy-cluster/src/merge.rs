//! Merge consolidation: collapse overlapping clusters to a fixpoint.

use convoy_types::{ClusterId, EngineConfig, Position, WorldState};
use tracing::debug;

use crate::MERGE_OVERLAP_RATIO;

/// One completed merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRecord {
    pub survivor: ClusterId,
    pub absorbed: ClusterId,
}

/// Repeatedly scan all cluster pairs and merge until a full pass performs
/// zero merges.
///
/// Cluster B merges into A when the anchors are within
/// `max_cluster_radius` AND (the overlap ratio in either direction
/// exceeds [`MERGE_OVERLAP_RATIO`] OR the anchors are within
/// `close_merge_distance`). The anchor is the leader's position when a
/// leader exists, else the centroid - freshly formed clusters have not
/// elected yet but must still be able to merge.
///
/// Terminates: every merge removes one cluster, so the pass count is
/// bounded by the initial cluster count.
pub fn merge_clusters(world: &mut WorldState, cfg: &EngineConfig) -> Vec<MergeRecord> {
    let mut records = Vec::new();

    'passes: loop {
        let ids: Vec<ClusterId> = world.clusters.keys().copied().collect();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                if should_merge(world, cfg, a, b) {
                    absorb(world, a, b);
                    records.push(MergeRecord {
                        survivor: a,
                        absorbed: b,
                    });
                    debug!(survivor = %a, absorbed = %b, "clusters merged");
                    // Geometry changed; restart the pass over fresh state.
                    continue 'passes;
                }
            }
        }
        break;
    }

    records
}

/// Anchor point for merge distance checks.
fn anchor(world: &WorldState, cid: ClusterId) -> Position {
    let cluster = &world.clusters[&cid];
    cluster
        .leader_id
        .and_then(|l| world.position_of(l))
        .unwrap_or(cluster.centroid)
}

fn should_merge(world: &WorldState, cfg: &EngineConfig, a: ClusterId, b: ClusterId) -> bool {
    let anchor_a = anchor(world, a);
    let anchor_b = anchor(world, b);
    let dist = anchor_a.distance(&anchor_b);
    if dist >= cfg.max_cluster_radius {
        return false;
    }
    if dist < cfg.close_merge_distance {
        return true;
    }
    // Overlap is directional (members of one side against the other's
    // anchor), so check both orientations before giving up on the pair.
    overlap_ratio(world, cfg, a, b) > MERGE_OVERLAP_RATIO
        || overlap_ratio(world, cfg, b, a) > MERGE_OVERLAP_RATIO
}

/// Fraction of B's members within communication range of A's anchor.
fn overlap_ratio(world: &WorldState, cfg: &EngineConfig, a: ClusterId, b: ClusterId) -> f64 {
    let anchor_a = anchor(world, a);
    let members_b = &world.clusters[&b].member_ids;
    if members_b.is_empty() {
        return 0.0;
    }
    let reachable = members_b
        .iter()
        .filter(|id| {
            world
                .position_of(**id)
                .is_some_and(|p| p.distance(&anchor_a) <= cfg.communication_range)
        })
        .count();
    reachable as f64 / members_b.len() as f64
}

/// Move every member of `absorbed` into `survivor` and drop the absorbed
/// cluster. The survivor keeps its leader, epoch and state.
fn absorb(world: &mut WorldState, survivor: ClusterId, absorbed: ClusterId) {
    let Some(old) = world.clusters.remove(&absorbed) else {
        return;
    };
    let tick = world.tick;
    for id in &old.member_ids {
        if let Some(node) = world.nodes.get_mut(id) {
            node.cluster_id = Some(survivor);
            // Tenure restarts in the surviving cluster.
            node.joined_cluster_at = tick;
        }
    }
    if let Some(cluster) = world.clusters.get_mut(&survivor) {
        cluster.member_ids.extend(old.member_ids.iter().copied());
    }
    world.refresh_geometry(survivor);
}
