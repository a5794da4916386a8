//! Tier-2 relay election: greedy set cover over out-of-range members.

use std::collections::BTreeSet;

use convoy_election::{centrality_score, is_eligible, stability_score};
use convoy_types::{Cluster, ClusterId, EngineConfig, Node, NodeId, WorldState};
use tracing::{debug, warn};

/// Result of one cluster's relay election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub cluster: ClusterId,
    /// Relays in election order.
    pub relays: Vec<NodeId>,
    /// Members no elected relay can reach. Non-empty coverage gaps are
    /// reported and retried next tick, never fatal.
    pub uncovered: Vec<NodeId>,
}

impl RelayReport {
    pub fn is_complete(&self) -> bool {
        self.uncovered.is_empty()
    }
}

/// Elect relays for one cluster and write them into `relay_ids`.
///
/// Greedy rounds: each round scores every eligible in-range candidate
/// against the members still uncovered, elects the best, and removes the
/// members it reaches. Terminates when coverage is complete, the relay cap
/// is hit, or no remaining candidate reaches any uncovered member.
///
/// Returns `None` for leaderless clusters; without a leader there is no
/// tier-1 anchor to relay from.
pub fn elect_relays(
    world: &mut WorldState,
    cid: ClusterId,
    cfg: &EngineConfig,
) -> Option<RelayReport> {
    let (relays, uncovered) = {
        let cluster = world.clusters.get(&cid)?;
        let leader = cluster.leader_id?;
        let leader_pos = world.position_of(leader)?;

        let mut uncovered: BTreeSet<NodeId> = cluster
            .member_ids
            .iter()
            .filter_map(|id| world.nodes.get(id))
            .filter(|n| n.position.distance(&leader_pos) > cfg.communication_range)
            .map(|n| n.id)
            .collect();

        // Only members the leader can hand the message to directly.
        let candidates: Vec<NodeId> = cluster
            .member_ids
            .iter()
            .filter(|&&id| id != leader)
            .filter_map(|id| world.nodes.get(id))
            .filter(|n| {
                is_eligible(n, cfg) && n.position.distance(&leader_pos) <= cfg.communication_range
            })
            .map(|n| n.id)
            .collect();

        let mut relays: Vec<NodeId> = Vec::new();
        while !uncovered.is_empty() && relays.len() < cfg.relay_cap {
            let mut best: Option<(NodeId, f64, Vec<NodeId>)> = None;
            for &id in &candidates {
                if relays.contains(&id) {
                    continue;
                }
                let Some(node) = world.nodes.get(&id) else {
                    continue;
                };
                let reached: Vec<NodeId> = uncovered
                    .iter()
                    .filter(|u| {
                        world
                            .position_of(**u)
                            .is_some_and(|p| p.distance(&node.position) <= cfg.communication_range)
                    })
                    .copied()
                    .collect();
                if reached.is_empty() {
                    continue;
                }
                let coverage = reached.len() as f64 / uncovered.len() as f64;
                let score = relay_score(node, cluster, cfg, world.tick, coverage);
                if best.as_ref().is_none_or(|(_, s, _)| score > *s) {
                    best = Some((id, score, reached));
                }
            }
            // No candidate reaches anyone left: coverage gap, stop here.
            let Some((id, _, reached)) = best else {
                break;
            };
            relays.push(id);
            for r in reached {
                uncovered.remove(&r);
            }
        }
        (relays, uncovered)
    };

    let cluster = world.clusters.get_mut(&cid)?;
    cluster.relay_ids = relays.iter().copied().collect();
    if uncovered.is_empty() {
        debug!(cluster = %cid, relays = relays.len(), "relay coverage complete");
    } else {
        warn!(cluster = %cid, gap = uncovered.len(), "relay coverage incomplete");
    }
    Some(RelayReport {
        cluster: cid,
        relays,
        uncovered: uncovered.into_iter().collect(),
    })
}

/// Relay composite: trust, centrality, stability and the fraction of the
/// still-uncovered set this candidate reaches.
fn relay_score(node: &Node, cluster: &Cluster, cfg: &EngineConfig, tick: u64, coverage: f64) -> f64 {
    let w = &cfg.weights.relay;
    w.trust * node.trust_score
        + w.centrality * centrality_score(node, cluster)
        + w.stability * stability_score(node, cfg, tick)
        + w.coverage * coverage
}
