//! Leader failure detection and the election/succession phase driver.

use convoy_types::{ClusterId, ElectionState, EngineConfig, NodeId, WorldState};
use tracing::{debug, warn};

use crate::quorum::{ElectionMethod, ElectionStrategy};
use crate::score::{composite_score, is_eligible};
use crate::{ElectionError, LEADER_DRIFT_FACTOR};

/// Why a sitting leader was deposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Leader left the member set.
    NotAMember,
    /// Trust fell below the eligibility threshold.
    TrustCollapsed,
    /// Flagged malicious or sleeper since the last check.
    Flagged,
    /// Drifted beyond `radius × 1.5` from the centroid.
    Drifted,
}

/// Check the four failure triggers for a cluster's sitting leader.
///
/// Returns `None` when there is no leader or the leader is healthy.
pub fn leader_has_failed(
    world: &WorldState,
    cluster: ClusterId,
    cfg: &EngineConfig,
) -> Option<FailureReason> {
    let cluster_ref = world.clusters.get(&cluster)?;
    let leader = cluster_ref.leader_id?;

    if !cluster_ref.contains(leader) {
        return Some(FailureReason::NotAMember);
    }
    let node = world.nodes.get(&leader)?;
    if node.is_flagged() {
        return Some(FailureReason::Flagged);
    }
    if node.trust_score < cfg.leader_eligibility_threshold {
        return Some(FailureReason::TrustCollapsed);
    }
    if cluster_ref.radius > 0.0
        && node.position.distance(&cluster_ref.centroid) > cluster_ref.radius * LEADER_DRIFT_FACTOR
    {
        return Some(FailureReason::Drifted);
    }
    None
}

/// One leadership change applied during the phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderChange {
    pub cluster: ClusterId,
    pub old_leader: Option<NodeId>,
    pub new_leader: NodeId,
    pub co_leader: Option<NodeId>,
    pub method: ElectionMethod,
    /// Epoch after the change.
    pub epoch: u64,
    /// Failure that triggered the change, if any.
    pub reason: Option<FailureReason>,
}

/// Outcome of the election/succession phase.
#[derive(Debug, Default, Clone)]
pub struct ElectionPhaseReport {
    pub changes: Vec<LeaderChange>,
    /// Clusters left leaderless for lack of candidates; retried next tick.
    pub leaderless: Vec<(ClusterId, ElectionError)>,
}

/// Run failure detection, succession and elections over every cluster.
///
/// `demoted` lists clusters whose leader was convicted during this tick's
/// detection phase - their failure path runs here, in the same tick, not
/// the next one. The phase guarantees that no cluster with at least one
/// eligible member ends the tick in `NoLeader`.
pub fn run_election_phase<S: ElectionStrategy>(
    world: &mut WorldState,
    cfg: &EngineConfig,
    strategy: &S,
    demoted: &[ClusterId],
) -> ElectionPhaseReport {
    let mut report = ElectionPhaseReport::default();
    let cluster_ids: Vec<ClusterId> = world.clusters.keys().copied().collect();

    for cid in cluster_ids {
        let needs_action = {
            let cluster = &world.clusters[&cid];
            match cluster.state {
                ElectionState::NoLeader | ElectionState::Electing => true,
                ElectionState::LeaderActive | ElectionState::SuccessionPending => {
                    demoted.contains(&cid) || leader_has_failed(world, cid, cfg).is_some()
                }
            }
        };
        if !needs_action {
            continue;
        }

        let reason = leader_has_failed(world, cid, cfg);
        let old_leader = world.clusters[&cid].leader_id;

        if old_leader.is_some() {
            // Failure path: prefer instant promotion over a voting round.
            if let Some(co) = viable_co_leader(world, cid, cfg) {
                promote(world, cid, co, old_leader, reason, cfg, &mut report);
                continue;
            }
            if let Some(cluster) = world.clusters.get_mut(&cid) {
                cluster.leader_id = None;
                cluster.co_leader_id = None;
                cluster.state = ElectionState::Electing;
            }
        }

        match strategy.elect(world, cid, cfg) {
            Ok(outcome) => {
                let Some(cluster) = world.clusters.get_mut(&cid) else {
                    continue;
                };
                cluster.install_leader(outcome.leader, outcome.co_leader);
                report.changes.push(LeaderChange {
                    cluster: cid,
                    old_leader,
                    new_leader: outcome.leader,
                    co_leader: outcome.co_leader,
                    method: outcome.method,
                    epoch: cluster.epoch,
                    reason,
                });
            }
            Err(err) => {
                if let Some(cluster) = world.clusters.get_mut(&cid) {
                    cluster.leader_id = None;
                    cluster.co_leader_id = None;
                    cluster.state = ElectionState::NoLeader;
                }
                warn!(cluster = %cid, %err, "cluster leaderless, retrying next tick");
                report.leaderless.push((cid, err));
            }
        }
    }

    report
}

/// The current co-leader, if it still passes the eligibility filter.
fn viable_co_leader(world: &WorldState, cid: ClusterId, cfg: &EngineConfig) -> Option<NodeId> {
    let cluster = world.clusters.get(&cid)?;
    let co = cluster.co_leader_id?;
    if !cluster.contains(co) {
        return None;
    }
    let node = world.nodes.get(&co)?;
    is_eligible(node, cfg).then_some(co)
}

/// Constant-time succession: promote the co-leader without a voting
/// round, then pick a fresh co-leader from the remaining eligible members
/// by composite score.
fn promote(
    world: &mut WorldState,
    cid: ClusterId,
    co: NodeId,
    old_leader: Option<NodeId>,
    reason: Option<FailureReason>,
    cfg: &EngineConfig,
    report: &mut ElectionPhaseReport,
) {
    if let Some(cluster) = world.clusters.get_mut(&cid) {
        cluster.state = ElectionState::SuccessionPending;
    }
    let next_co = best_co_candidate(world, cid, co, cfg);
    let Some(cluster) = world.clusters.get_mut(&cid) else {
        return;
    };
    cluster.install_leader(co, next_co);
    debug!(cluster = %cid, leader = %co, "co-leader promoted without vote");
    report.changes.push(LeaderChange {
        cluster: cid,
        old_leader,
        new_leader: co,
        co_leader: next_co,
        method: ElectionMethod::Promotion,
        epoch: cluster.epoch,
        reason,
    });
}

/// Highest-composite eligible member other than the new leader.
fn best_co_candidate(
    world: &WorldState,
    cid: ClusterId,
    leader: NodeId,
    cfg: &EngineConfig,
) -> Option<NodeId> {
    let cluster = world.clusters.get(&cid)?;
    cluster
        .member_ids
        .iter()
        .filter(|&&id| id != leader)
        .filter_map(|id| world.nodes.get(id))
        .filter(|n| is_eligible(n, cfg))
        .map(|n| (n.id, composite_score(n, cluster, cfg, world.tick)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuorumElection;
    use convoy_types::{Cluster, Node, Position, Velocity};
    use std::collections::BTreeSet;

    fn clustered_world(trusts: &[f64]) -> (WorldState, ClusterId) {
        let mut world = WorldState::new();
        let mut members = BTreeSet::new();
        for (i, &t) in trusts.iter().enumerate() {
            let id = NodeId(i as u64);
            let mut n = Node::new(id, Position::new(i as f64 * 10.0, 0.0), Velocity::default());
            n.set_trust(t);
            world.upsert_node(n);
            members.insert(id);
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
    fn fresh_cluster_gets_a_leader() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = clustered_world(&[0.9, 0.7, 0.6]);

        let report = run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        assert_eq!(report.changes.len(), 1);
        let cluster = &world.clusters[&cid];
        assert_eq!(cluster.state, ElectionState::LeaderActive);
        assert!(cluster.leader_id.is_some());
        assert_eq!(cluster.epoch, 1);
    }

    #[test]
    fn healthy_leader_is_left_alone() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = clustered_world(&[0.9, 0.7, 0.6]);
        run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        let epoch = world.clusters[&cid].epoch;

        let report = run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        assert!(report.changes.is_empty());
        assert_eq!(world.clusters[&cid].epoch, epoch);
    }

    #[test]
    fn drifted_leader_triggers_promotion_same_tick() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = clustered_world(&[0.9, 0.8, 0.7, 0.6]);
        run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        let leader = world.clusters[&cid].leader_id.unwrap();
        let co = world.clusters[&cid].co_leader_id.unwrap();

        // Move the leader out past 1.5 × radius
        let (centroid, radius) = {
            let c = &world.clusters[&cid];
            (c.centroid, c.radius)
        };
        world.nodes.get_mut(&leader).unwrap().position =
            Position::new(centroid.x + radius * 1.6, centroid.y);

        assert_eq!(
            leader_has_failed(&world, cid, &cfg),
            Some(FailureReason::Drifted)
        );
        let report = run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        assert_eq!(report.changes.len(), 1);
        let change = &report.changes[0];
        assert_eq!(change.method, ElectionMethod::Promotion);
        assert_eq!(change.new_leader, co);
        // A fresh co-leader was chosen from the remaining eligible members
        assert!(change.co_leader.is_some());
        assert_ne!(change.co_leader, Some(co));
        assert_eq!(world.clusters[&cid].state, ElectionState::LeaderActive);
    }

    #[test]
    fn promotion_skips_ineligible_co_leader() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = clustered_world(&[0.9, 0.8, 0.7]);
        run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        let leader = world.clusters[&cid].leader_id.unwrap();
        let co = world.clusters[&cid].co_leader_id.unwrap();

        // Both leader and co-leader go bad
        world.nodes.get_mut(&leader).unwrap().is_malicious = true;
        world.nodes.get_mut(&co).unwrap().is_sleeper_agent = true;

        let report = run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        assert_eq!(report.changes.len(), 1);
        let change = &report.changes[0];
        // Full election, not promotion, and the winner is the one clean node
        assert_ne!(change.method, ElectionMethod::Promotion);
        assert_ne!(change.new_leader, leader);
        assert_ne!(change.new_leader, co);
    }

    #[test]
    fn demoted_leader_cluster_is_handled_same_tick() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = clustered_world(&[0.9, 0.8, 0.7]);
        run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        let leader = world.clusters[&cid].leader_id.unwrap();

        // Detection phase convicted the leader this tick
        world.nodes.get_mut(&leader).unwrap().is_malicious = true;
        let report = run_election_phase(&mut world, &cfg, &QuorumElection, &[cid]);

        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].reason, Some(FailureReason::Flagged));
        assert_ne!(world.clusters[&cid].leader_id, Some(leader));
        assert_eq!(world.clusters[&cid].state, ElectionState::LeaderActive);
    }

    #[test]
    fn all_ineligible_cluster_stays_leaderless_but_reported() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = clustered_world(&[0.3, 0.2]);

        let report = run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        assert!(report.changes.is_empty());
        assert_eq!(
            report.leaderless,
            vec![(cid, ElectionError::NoEligibleCandidate(cid))]
        );
        assert_eq!(world.clusters[&cid].state, ElectionState::NoLeader);
    }

    #[test]
    fn trust_collapse_triggers_failure() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = clustered_world(&[0.9, 0.8, 0.7]);
        run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        let leader = world.clusters[&cid].leader_id.unwrap();

        world.nodes.get_mut(&leader).unwrap().set_trust(0.2);
        assert_eq!(
            leader_has_failed(&world, cid, &cfg),
            Some(FailureReason::TrustCollapsed)
        );

        let report = run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        assert_eq!(report.changes.len(), 1);
        assert_ne!(world.clusters[&cid].leader_id, Some(leader));
    }

    #[test]
    fn epoch_increases_monotonically_across_changes() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = clustered_world(&[0.9, 0.8, 0.7, 0.6]);
        run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        let e1 = world.clusters[&cid].epoch;

        let leader = world.clusters[&cid].leader_id.unwrap();
        world.nodes.get_mut(&leader).unwrap().set_trust(0.1);
        run_election_phase(&mut world, &cfg, &QuorumElection, &[]);
        let e2 = world.clusters[&cid].epoch;
        assert!(e2 > e1);
    }
}
