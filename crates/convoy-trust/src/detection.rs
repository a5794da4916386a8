//! Authority-voting detection (PoA-style).
//!
//! Each cluster's high-trust members form its authority set - derived
//! fresh every cycle, never stored. A member whose suspicion score
//! crosses the threshold is put to the authorities; conviction needs 30%
//! of them (minimum one) and is computed centrally today. The
//! [`DetectionStrategy`] trait is the seam for a future networked vote
//! with real message passing and timeouts.

use convoy_types::{ClusterId, EngineConfig, NodeId, WorldState};
use tracing::{debug, warn};

use crate::{CONVICTION_RATIO, MALICIOUS_PENALTY, SUSPICION_THRESHOLD};

/// A detection verdict against one cluster member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub node: NodeId,
    pub cluster: ClusterId,
    /// Suspicion score that triggered the vote.
    pub suspicion: f64,
    /// Authorities that voted against the node.
    pub votes: usize,
    /// Size of the cluster's authority set at vote time.
    pub authorities: usize,
}

/// Screens one cluster's members and returns conviction verdicts.
///
/// Implementations must be pure with respect to the world: verdicts are
/// applied separately by [`apply_verdicts`], which keeps detection and
/// mutation serialized within a cluster.
pub trait DetectionStrategy {
    fn screen(&self, world: &WorldState, cluster: ClusterId, cfg: &EngineConfig) -> Vec<Verdict>;
}

/// Centralized authority voting.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorityVote;

impl AuthorityVote {
    /// Suspicion score for one member, summed over the indicators.
    fn suspicion(world: &WorldState, id: NodeId, cfg: &EngineConfig) -> f64 {
        let node = &world.nodes[&id];
        let mut score = 0.0;
        if node.trust_score < 0.4 {
            score += 0.3;
        }
        if node.is_malicious {
            score += 0.5;
        }
        if node.velocity.speed > cfg.suspicion_speed_ceiling {
            score += 0.2;
        }
        if node.message_rate > cfg.suspicion_rate_ceiling {
            score += 0.2;
        }
        score
    }
}

impl DetectionStrategy for AuthorityVote {
    fn screen(&self, world: &WorldState, cluster: ClusterId, cfg: &EngineConfig) -> Vec<Verdict> {
        let Some(cluster_ref) = world.clusters.get(&cluster) else {
            return Vec::new();
        };

        let authorities: Vec<NodeId> = cluster_ref
            .member_ids
            .iter()
            .copied()
            .filter(|id| {
                world
                    .nodes
                    .get(id)
                    .is_some_and(|n| n.trust_score > cfg.authority_trust_threshold)
            })
            .collect();
        if authorities.is_empty() {
            return Vec::new();
        }

        let mut verdicts = Vec::new();
        for &member in &cluster_ref.member_ids {
            if !world.nodes.contains_key(&member) {
                continue;
            }
            // Already-flagged members stay under scrutiny: the malicious
            // indicator keeps their suspicion above threshold, so the
            // penalty compounds every cycle they remain in the cluster.
            let suspicion = Self::suspicion(world, member, cfg);
            if suspicion <= SUSPICION_THRESHOLD {
                continue;
            }

            // A suspect sitting in the authority set does not vote on
            // itself.
            let jury: Vec<NodeId> = authorities
                .iter()
                .copied()
                .filter(|&a| a != member)
                .collect();
            if jury.is_empty() {
                continue;
            }
            let needed = conviction_quorum(jury.len());
            // Every authority that sees the suspicion votes; centrally
            // computed, so all of them do.
            let votes = jury.len();
            if votes >= needed {
                verdicts.push(Verdict {
                    node: member,
                    cluster,
                    suspicion,
                    votes,
                    authorities: jury.len(),
                });
            }
        }
        verdicts
    }
}

/// Votes required to convict, given the authority set size:
/// `ceil(0.30 × n)`, minimum 1.
pub(crate) fn conviction_quorum(authorities: usize) -> usize {
    ((authorities as f64 * CONVICTION_RATIO).ceil() as usize).max(1)
}

/// A conviction that was applied to the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conviction {
    pub verdict: Verdict,
    /// The node held leadership when convicted; the election phase must
    /// run its failure path this same tick.
    pub was_leader: bool,
}

/// Applied verdicts for one detection cycle.
#[derive(Debug, Default, Clone)]
pub struct DetectionReport {
    pub convictions: Vec<Conviction>,
}

impl DetectionReport {
    /// Clusters whose sitting leader was convicted this cycle.
    pub fn demoted_leader_clusters(&self) -> Vec<ClusterId> {
        self.convictions
            .iter()
            .filter(|c| c.was_leader)
            .map(|c| c.verdict.cluster)
            .collect()
    }
}

/// Apply verdicts: set the malicious flag and the trust penalty, noting
/// convicted sitting leaders so succession runs without a tick of
/// leaderless drift.
pub fn apply_verdicts(world: &mut WorldState, verdicts: Vec<Verdict>) -> DetectionReport {
    let mut report = DetectionReport::default();
    for verdict in verdicts {
        let was_leader = world.is_leader(verdict.node);
        let Some(node) = world.nodes.get_mut(&verdict.node) else {
            continue;
        };
        node.is_malicious = true;
        node.scale_trust(MALICIOUS_PENALTY);
        if was_leader {
            warn!(
                node = %verdict.node,
                cluster = %verdict.cluster,
                "sitting leader convicted as malicious"
            );
        } else {
            debug!(node = %verdict.node, votes = verdict.votes, "member convicted as malicious");
        }
        report.convictions.push(Conviction { verdict, was_leader });
    }
    report
}
