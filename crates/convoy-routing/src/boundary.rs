//! Tier-3 boundary gateway election.
//!
//! For every neighboring cluster inside detection range, the cluster
//! elects one member as its gateway toward that neighbor. Gateways are
//! per-neighbor: a cluster with three neighbors carries up to three
//! entries in its boundary map, possibly all the same node.

use std::collections::BTreeMap;

use convoy_election::{is_eligible, stability_score};
use convoy_types::{EngineConfig, ClusterId, Node, NodeId, Position, WorldState};
use tracing::debug;

/// Result of one cluster's gateway election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryReport {
    pub cluster: ClusterId,
    /// Elected gateway per neighbor cluster.
    pub gateways: BTreeMap<ClusterId, NodeId>,
}

/// Elect boundary gateways for one cluster and write the boundary map.
///
/// Neighbors are clusters whose centroid lies within
/// `boundary_detection_range`. The elected gateway is the eligible member
/// maximizing proximity to the neighbor, trust, connectivity back into its
/// own cluster, and stability. A cluster with no eligible members ends up
/// with an empty map; hazard escalation toward it fails loudly instead.
pub fn elect_boundaries(
    world: &mut WorldState,
    cid: ClusterId,
    cfg: &EngineConfig,
) -> BoundaryReport {
    let gateways = {
        let Some(cluster) = world.clusters.get(&cid) else {
            return BoundaryReport {
                cluster: cid,
                gateways: BTreeMap::new(),
            };
        };

        let neighbors: Vec<(ClusterId, Position)> = world
            .clusters
            .values()
            .filter(|c| c.id != cid)
            .filter(|c| c.centroid.distance(&cluster.centroid) <= cfg.boundary_detection_range)
            .map(|c| (c.id, c.centroid))
            .collect();

        let member_positions: Vec<(NodeId, Position)> = cluster
            .member_ids
            .iter()
            .filter_map(|id| world.nodes.get(id))
            .map(|n| (n.id, n.position))
            .collect();

        let mut gateways = BTreeMap::new();
        for (neighbor, neighbor_centroid) in neighbors {
            let best = cluster
                .member_ids
                .iter()
                .filter_map(|id| world.nodes.get(id))
                .filter(|n| is_eligible(n, cfg))
                .map(|n| {
                    let score = boundary_score(
                        n,
                        &member_positions,
                        neighbor_centroid,
                        cfg,
                        world.tick,
                    );
                    (n.id, score)
                })
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            if let Some((id, _)) = best {
                gateways.insert(neighbor, id);
            }
        }
        gateways
    };

    if let Some(cluster) = world.clusters.get_mut(&cid) {
        cluster.boundary_map = gateways.clone();
    }
    debug!(cluster = %cid, neighbors = gateways.len(), "boundary map rebuilt");
    BoundaryReport {
        cluster: cid,
        gateways,
    }
}

/// Gateway composite: proximity to the neighbor centroid, trust,
/// connectivity back into the home cluster, stability.
fn boundary_score(
    node: &Node,
    members: &[(NodeId, Position)],
    neighbor_centroid: Position,
    cfg: &EngineConfig,
    tick: u64,
) -> f64 {
    let w = &cfg.weights.boundary;
    let proximity = (1.0
        - node.position.distance(&neighbor_centroid) / cfg.boundary_detection_range)
        .clamp(0.0, 1.0);
    w.proximity * proximity
        + w.trust * node.trust_score
        + w.connectivity * connectivity(node, members, cfg)
        + w.stability * stability_score(node, cfg, tick)
}

/// Fraction of fellow members within direct range of the candidate. A
/// gateway that cannot reach its own cluster is useless however close it
/// sits to the neighbor.
fn connectivity(node: &Node, members: &[(NodeId, Position)], cfg: &EngineConfig) -> f64 {
    let peers: Vec<&Position> = members
        .iter()
        .filter(|(id, _)| *id != node.id)
        .map(|(_, p)| p)
        .collect();
    if peers.is_empty() {
        return 0.0;
    }
    let reachable = peers
        .iter()
        .filter(|p| p.distance(&node.position) <= cfg.communication_range)
        .count();
    reachable as f64 / peers.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_types::{Cluster, Velocity, WorldState};
    use std::collections::BTreeSet;

    fn add_cluster(world: &mut WorldState, coords: &[(u64, f64, f64)]) -> ClusterId {
        let cid = world.allocate_cluster_id();
        let mut members = BTreeSet::new();
        for &(id, x, y) in coords {
            let mut n = Node::new(NodeId(id), Position::new(x, y), Velocity::default());
            n.set_trust(0.8);
            n.cluster_id = Some(cid);
            world.upsert_node(n);
            members.insert(NodeId(id));
        }
        world.clusters.insert(cid, Cluster::new(cid, members));
        world.refresh_geometry(cid);
        cid
    }

    #[test]
    fn closest_member_toward_neighbor_wins() {
        let cfg = EngineConfig::default();
        let mut world = WorldState::new();
        let a = add_cluster(&mut world, &[(0, 0.0, 0.0), (1, 100.0, 0.0), (2, 200.0, 0.0)]);
        let b = add_cluster(&mut world, &[(10, 700.0, 0.0), (11, 800.0, 0.0)]);

        let report = elect_boundaries(&mut world, a, &cfg);
        // n2 sits closest to cluster b and is equally trusted and connected.
        assert_eq!(report.gateways.get(&b), Some(&NodeId(2)));
        assert_eq!(world.clusters[&a].boundary_map.get(&b), Some(&NodeId(2)));
    }

    #[test]
    fn out_of_detection_range_neighbor_gets_no_gateway() {
        let cfg = EngineConfig::default();
        let mut world = WorldState::new();
        let a = add_cluster(&mut world, &[(0, 0.0, 0.0), (1, 100.0, 0.0)]);
        let _far = add_cluster(&mut world, &[(10, 5000.0, 0.0), (11, 5100.0, 0.0)]);

        let report = elect_boundaries(&mut world, a, &cfg);
        assert!(report.gateways.is_empty());
    }

    #[test]
    fn flagged_members_are_never_gateways() {
        let cfg = EngineConfig::default();
        let mut world = WorldState::new();
        let a = add_cluster(&mut world, &[(0, 0.0, 0.0), (1, 100.0, 0.0), (2, 200.0, 0.0)]);
        let b = add_cluster(&mut world, &[(10, 700.0, 0.0), (11, 800.0, 0.0)]);
        world.nodes.get_mut(&NodeId(2)).unwrap().is_sleeper_agent = true;

        let report = elect_boundaries(&mut world, a, &cfg);
        assert_eq!(report.gateways.get(&b), Some(&NodeId(1)));
    }

    #[test]
    fn each_neighbor_gets_its_own_gateway() {
        let cfg = EngineConfig::default();
        let mut world = WorldState::new();
        let a = add_cluster(&mut world, &[(0, -100.0, 0.0), (1, 0.0, 0.0), (2, 100.0, 0.0)]);
        let east = add_cluster(&mut world, &[(10, 700.0, 0.0), (11, 800.0, 0.0)]);
        let west = add_cluster(&mut world, &[(20, -700.0, 0.0), (21, -800.0, 0.0)]);

        let report = elect_boundaries(&mut world, a, &cfg);
        assert_eq!(report.gateways.get(&east), Some(&NodeId(2)));
        assert_eq!(report.gateways.get(&west), Some(&NodeId(0)));
    }

    #[test]
    fn connectivity_counts_reachable_peers() {
        let cfg = EngineConfig::default();
        let node = Node::new(NodeId(0), Position::ORIGIN, Velocity::default());
        let members = vec![
            (NodeId(0), Position::ORIGIN),
            (NodeId(1), Position::new(100.0, 0.0)),
            (NodeId(2), Position::new(1000.0, 0.0)),
        ];
        assert!((connectivity(&node, &members, &cfg) - 0.5).abs() < 1e-9);
    }
}
