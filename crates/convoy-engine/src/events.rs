//! Engine events for the log and the broadcast feed.

use convoy_election::ElectionMethod;
use convoy_types::{ClusterId, NodeId};
use serde::{Deserialize, Serialize};

/// How a leader change came about, as recorded in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElectionVia {
    /// Won the trust-weighted vote outright.
    Quorum,
    /// Installed by the highest-score fallback rule.
    ScoreFallback,
    /// Co-leader promoted on leader failure, no vote.
    Promotion,
}

impl From<ElectionMethod> for ElectionVia {
    fn from(method: ElectionMethod) -> Self {
        match method {
            ElectionMethod::Quorum { .. } => Self::Quorum,
            ElectionMethod::ScoreFallback => Self::ScoreFallback,
            ElectionMethod::Promotion => Self::Promotion,
        }
    }
}

/// Everything observable that happens during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// A new cluster formed from unassigned nodes
    ClusterFormed {
        cluster: ClusterId,
        members: Vec<NodeId>,
        tick: u64,
    },

    /// One cluster absorbed another
    ClustersMerged {
        survivor: ClusterId,
        absorbed: ClusterId,
        tick: u64,
    },

    /// A cluster fell below two members and dissolved
    ClusterDissolved { cluster: ClusterId, tick: u64 },

    /// A member drifted out of the cluster radius and was evicted
    MemberEvicted {
        cluster: ClusterId,
        node: NodeId,
        tick: u64,
    },

    /// Authorities convicted a member as malicious
    NodeFlaggedMalicious {
        node: NodeId,
        cluster: ClusterId,
        votes: usize,
        authorities: usize,
        tick: u64,
    },

    /// An unjustified trust rise flagged a node as a sleeper agent
    SleeperDetected { node: NodeId, delta: f64, tick: u64 },

    /// A flag cleared under a rehabilitation policy
    NodeRehabilitated { node: NodeId, tick: u64 },

    /// A leader was installed (election or promotion)
    LeaderChanged {
        cluster: ClusterId,
        leader: NodeId,
        epoch: u64,
        via: ElectionVia,
        tick: u64,
    },

    /// A co-leader was designated
    CoLeaderChosen {
        cluster: ClusterId,
        co_leader: NodeId,
        tick: u64,
    },

    /// No eligible candidate; the cluster stays leaderless until retry
    ClusterLeaderless { cluster: ClusterId, tick: u64 },

    /// The cluster's relay set changed
    RelaysElected {
        cluster: ClusterId,
        relays: Vec<NodeId>,
        tick: u64,
    },

    /// Some members are beyond every elected relay
    RelayCoverageIncomplete {
        cluster: ClusterId,
        uncovered: Vec<NodeId>,
        tick: u64,
    },

    /// A boundary gateway toward a neighbor was (re)elected
    BoundaryElected {
        cluster: ClusterId,
        neighbor: ClusterId,
        gateway: NodeId,
        tick: u64,
    },
}

impl EngineEvent {
    /// Tick the event was emitted on.
    pub fn tick(&self) -> u64 {
        match self {
            Self::ClusterFormed { tick, .. }
            | Self::ClustersMerged { tick, .. }
            | Self::ClusterDissolved { tick, .. }
            | Self::MemberEvicted { tick, .. }
            | Self::NodeFlaggedMalicious { tick, .. }
            | Self::SleeperDetected { tick, .. }
            | Self::NodeRehabilitated { tick, .. }
            | Self::LeaderChanged { tick, .. }
            | Self::CoLeaderChosen { tick, .. }
            | Self::ClusterLeaderless { tick, .. }
            | Self::RelaysElected { tick, .. }
            | Self::RelayCoverageIncomplete { tick, .. }
            | Self::BoundaryElected { tick, .. } => *tick,
        }
    }
}
