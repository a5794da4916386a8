//! The cluster record and its election state machine.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::geometry::Position;
use crate::node::NodeId;
use crate::MIN_LIVE_MEMBERS;

/// Unique cluster identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterId(pub u64);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Per-cluster leadership state.
///
/// `NoLeader → Electing → LeaderActive`; a leader failure moves the
/// cluster to `Electing` (full vote) or `SuccessionPending` (co-leader
/// promotion, no vote), both of which resolve back to `LeaderActive`
/// within the same election phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElectionState {
    /// Freshly formed, never elected.
    #[default]
    NoLeader,
    /// A quorum vote is due this phase.
    Electing,
    /// Leader installed and healthy as of the last check.
    LeaderActive,
    /// Leader failed with a viable co-leader standing by.
    SuccessionPending,
}

/// A dynamically formed group of kinematically compatible nodes.
///
/// Invariant: every id referenced here (members, leader, co-leader,
/// relays, boundary values) names a node whose `cluster_id` equals
/// `self.id`. The engine's consistency check walks exactly this rule.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster {
    pub id: ClusterId,
    /// Member set; `>= 2` while the cluster is alive. Ordered for
    /// deterministic iteration.
    pub member_ids: BTreeSet<NodeId>,
    pub leader_id: Option<NodeId>,
    /// Standby coordinator; always distinct from `leader_id`.
    pub co_leader_id: Option<NodeId>,
    pub centroid: Position,
    /// Distance from centroid to the farthest member.
    pub radius: f64,
    /// Elected intra-cluster relays, capped by configuration.
    pub relay_ids: BTreeSet<NodeId>,
    /// Gateway per neighboring cluster.
    pub boundary_map: BTreeMap<ClusterId, NodeId>,
    /// Monotonic counter, incremented on each completed election or
    /// promotion.
    pub epoch: u64,
    pub state: ElectionState,
}

impl Cluster {
    /// Create a cluster over an initial member set.
    ///
    /// Centroid and radius start zeroed; the clustering engine recomputes
    /// them immediately after assignment.
    pub fn new(id: ClusterId, member_ids: BTreeSet<NodeId>) -> Self {
        Self {
            id,
            member_ids,
            leader_id: None,
            co_leader_id: None,
            centroid: Position::ORIGIN,
            radius: 0.0,
            relay_ids: BTreeSet::new(),
            boundary_map: BTreeMap::new(),
            epoch: 0,
            state: ElectionState::NoLeader,
        }
    }

    /// Whether the membership is still large enough to stay alive.
    pub fn is_viable(&self) -> bool {
        self.member_ids.len() >= MIN_LIVE_MEMBERS
    }

    /// Whether `node` is a member.
    pub fn contains(&self, node: NodeId) -> bool {
        self.member_ids.contains(&node)
    }

    /// Whether `node` currently holds the leader role.
    pub fn is_leader(&self, node: NodeId) -> bool {
        self.leader_id == Some(node)
    }

    /// Whether `node` holds any coordinator or forwarding role.
    pub fn has_role(&self, node: NodeId) -> bool {
        self.is_leader(node)
            || self.co_leader_id == Some(node)
            || self.relay_ids.contains(&node)
            || self.boundary_map.values().any(|&b| b == node)
    }

    /// Remove a member, clearing any role it held.
    ///
    /// Role fields referencing a departed node would dangle; clearing them
    /// here keeps the reference invariant at the single removal site.
    pub fn remove_member(&mut self, node: NodeId) {
        self.member_ids.remove(&node);
        if self.leader_id == Some(node) {
            self.leader_id = None;
        }
        if self.co_leader_id == Some(node) {
            self.co_leader_id = None;
        }
        self.relay_ids.remove(&node);
        self.boundary_map.retain(|_, &mut b| b != node);
    }

    /// Install a new leader, bumping the epoch.
    pub fn install_leader(&mut self, leader: NodeId, co_leader: Option<NodeId>) {
        debug_assert!(co_leader != Some(leader));
        self.leader_id = Some(leader);
        self.co_leader_id = co_leader;
        self.epoch += 1;
        self.state = ElectionState::LeaderActive;
    }
}
