//! Trust-weighted quorum voting.

use convoy_types::{ClusterId, EngineConfig, NodeId, WorldState};
use tracing::debug;

use crate::score::{composite_score, is_eligible};
use crate::ElectionError;

/// How a leader was installed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElectionMethod {
    /// Won the trust-weighted vote outright with the given weight share.
    Quorum { share: f64 },
    /// No candidate reached the majority share; highest composite score
    /// won. Logged as an event, not an error.
    ScoreFallback,
    /// Co-leader promoted on leader failure; no voting round.
    Promotion,
}

/// Result of one election round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectionOutcome {
    pub leader: NodeId,
    /// Runner-up by composite score; `None` when only one candidate stood.
    pub co_leader: Option<NodeId>,
    pub method: ElectionMethod,
}

/// Runs one election round for a cluster.
///
/// Implementations read the world and return an outcome; installing the
/// leader (and the epoch bump) is the succession driver's job. A
/// networked implementation would collect real ballots with a timeout and
/// fall back to the highest-score rule on expiry.
pub trait ElectionStrategy {
    fn elect(
        &self,
        world: &WorldState,
        cluster: ClusterId,
        cfg: &EngineConfig,
    ) -> Result<ElectionOutcome, ElectionError>;
}

/// Centralized trust-weighted quorum vote.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuorumElection;

impl QuorumElection {
    /// Candidates ranked by composite score, descending; id ascending as
    /// the deterministic tie-break.
    fn ranked_candidates(
        world: &WorldState,
        cluster: ClusterId,
        cfg: &EngineConfig,
    ) -> Vec<(NodeId, f64)> {
        let Some(cluster_ref) = world.clusters.get(&cluster) else {
            return Vec::new();
        };
        let mut ranked: Vec<(NodeId, f64)> = cluster_ref
            .member_ids
            .iter()
            .filter_map(|id| world.nodes.get(id))
            .filter(|n| is_eligible(n, cfg))
            .map(|n| (n.id, composite_score(n, cluster_ref, cfg, world.tick)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

impl ElectionStrategy for QuorumElection {
    fn elect(
        &self,
        world: &WorldState,
        cluster: ClusterId,
        cfg: &EngineConfig,
    ) -> Result<ElectionOutcome, ElectionError> {
        let ranked = Self::ranked_candidates(world, cluster, cfg);
        let Some(&(top, _)) = ranked.first() else {
            return Err(ElectionError::NoEligibleCandidate(cluster));
        };
        let co_leader = ranked.get(1).map(|&(id, _)| id);

        // Every eligible member votes for the top-ranked candidate, each
        // vote weighted by the voter's share of the eligible trust mass.
        let total_trust: f64 = ranked
            .iter()
            .map(|(id, _)| world.nodes[id].trust_score)
            .sum();
        let method = if total_trust > 0.0 {
            let share: f64 = ranked
                .iter()
                .map(|(id, _)| world.nodes[id].trust_score / total_trust)
                .sum();
            if share >= cfg.majority_threshold {
                ElectionMethod::Quorum { share }
            } else {
                ElectionMethod::ScoreFallback
            }
        } else {
            // Degenerate all-zero-trust electorate: weights are undefined,
            // apply the highest-score rule directly.
            ElectionMethod::ScoreFallback
        };

        debug!(cluster = %cluster, leader = %top, ?method, "election round complete");
        Ok(ElectionOutcome {
            leader: top,
            co_leader,
            method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn highest_scorer_wins_with_quorum() {
        let cfg = EngineConfig::default();
        let (world, cid) = clustered_world(&[0.9, 0.7, 0.6]);

        let outcome = QuorumElection.elect(&world, cid, &cfg).unwrap();
        assert_eq!(outcome.leader, NodeId(0));
        assert!(matches!(outcome.method, ElectionMethod::Quorum { share } if share >= 0.51));
    }

    #[test]
    fn runner_up_becomes_co_leader() {
        let cfg = EngineConfig::default();
        let (world, cid) = clustered_world(&[0.9, 0.7, 0.6]);

        let outcome = QuorumElection.elect(&world, cid, &cfg).unwrap();
        assert_eq!(outcome.co_leader, Some(NodeId(1)));
        assert_ne!(outcome.co_leader, Some(outcome.leader));
    }

    #[test]
    fn single_candidate_has_no_co_leader() {
        let cfg = EngineConfig::default();
        let (world, cid) = clustered_world(&[0.9, 0.3, 0.2]);

        let outcome = QuorumElection.elect(&world, cid, &cfg).unwrap();
        assert_eq!(outcome.leader, NodeId(0));
        assert_eq!(outcome.co_leader, None);
    }

    #[test]
    fn ineligible_members_never_win() {
        let cfg = EngineConfig::default();
        let (mut world, cid) = clustered_world(&[0.95, 0.7, 0.6]);
        world.nodes.get_mut(&NodeId(0)).unwrap().is_malicious = true;

        let outcome = QuorumElection.elect(&world, cid, &cfg).unwrap();
        assert_eq!(outcome.leader, NodeId(1));
        assert_eq!(outcome.co_leader, Some(NodeId(2)));
    }

    #[test]
    fn no_eligible_candidate_is_an_error() {
        let cfg = EngineConfig::default();
        let (world, cid) = clustered_world(&[0.3, 0.2, 0.1]);

        assert_eq!(
            QuorumElection.elect(&world, cid, &cfg),
            Err(ElectionError::NoEligibleCandidate(cid))
        );
    }

    #[test]
    fn zero_trust_electorate_falls_back_to_score() {
        let cfg = EngineConfig {
            leader_eligibility_threshold: 0.0,
            ..EngineConfig::default()
        };
        let (world, cid) = clustered_world(&[0.0, 0.0]);

        let outcome = QuorumElection.elect(&world, cid, &cfg).unwrap();
        assert_eq!(outcome.method, ElectionMethod::ScoreFallback);
    }

    #[test]
    fn election_is_deterministic() {
        let cfg = EngineConfig::default();
        let (world, cid) = clustered_world(&[0.8, 0.8, 0.8, 0.8]);

        let a = QuorumElection.elect(&world, cid, &cfg).unwrap();
        let b = QuorumElection.elect(&world, cid, &cfg).unwrap();
        assert_eq!(a, b);
    }
}
