//! The node record: kinematics, trust state and capability profiles.

use std::collections::VecDeque;
use std::fmt;

use crate::geometry::{Position, Velocity};
use crate::{ClusterId, TRUST_HISTORY_LEN};

/// Unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One trust sample taken during a trust cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrustSample {
    /// Trust score at the time of the sample.
    pub score: f64,
    /// Tick the sample was taken on.
    pub tick: u64,
}

/// Bounded FIFO of the most recent trust samples.
///
/// Holds at most [`TRUST_HISTORY_LEN`] entries; pushing an eleventh evicts
/// the oldest. Sleeper detection reads the trailing window, the trust
/// formula reads the mean.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrustHistory {
    samples: VecDeque<TrustSample>,
}

impl TrustHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample, evicting the oldest when full.
    pub fn push(&mut self, score: f64, tick: u64) {
        if self.samples.len() == TRUST_HISTORY_LEN {
            self.samples.pop_front();
        }
        self.samples.push_back(TrustSample { score, tick });
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean of all stored scores, or `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(|s| s.score).sum();
        Some(sum / self.samples.len() as f64)
    }

    /// The trailing `window` samples, oldest first.
    ///
    /// Returns fewer than `window` entries when the history is shorter.
    pub fn tail(&self, window: usize) -> impl Iterator<Item = &TrustSample> {
        let skip = self.samples.len().saturating_sub(window);
        self.samples.iter().skip(skip)
    }

    /// All samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TrustSample> {
        self.samples.iter()
    }
}

/// Static capacity profile used by the resource metric.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceProfile {
    /// Normalized bandwidth capacity, `[0, 1]`.
    pub bandwidth_capacity: f64,
    /// Normalized compute capacity, `[0, 1]`.
    pub compute_capacity: f64,
}

impl ResourceProfile {
    /// Mean of the two capacities - the `resource` metric.
    pub fn score(&self) -> f64 {
        (self.bandwidth_capacity + self.compute_capacity) / 2.0
    }
}

impl Default for ResourceProfile {
    fn default() -> Self {
        Self {
            bandwidth_capacity: 0.5,
            compute_capacity: 0.5,
        }
    }
}

/// Observed behavior profile used by trust scoring and detection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BehaviorProfile {
    /// Fraction of this node's messages that verified as authentic.
    pub message_authenticity: f64,
    /// Fraction of cooperation requests this node honored.
    pub cooperation_rate: f64,
    /// Behavioral consistency over time, `[0, 1]`.
    pub consistency: f64,
}

impl BehaviorProfile {
    /// Mean of authenticity and cooperation - the `behavior` metric.
    pub fn score(&self) -> f64 {
        (self.message_authenticity + self.cooperation_rate) / 2.0
    }

    /// Authenticity/consistency factor applied to this node's social
    /// contribution toward its neighbors.
    pub fn credibility(&self) -> f64 {
        (self.message_authenticity + self.consistency) / 2.0
    }
}

impl Default for BehaviorProfile {
    /// New nodes start with a clean record; observed misbehavior lowers
    /// the fields. A sub-1.0 starting credibility would bleed trust out
    /// of every neighborhood through the social blend.
    fn default() -> Self {
        Self {
            message_authenticity: 1.0,
            cooperation_rate: 1.0,
            consistency: 1.0,
        }
    }
}

/// A mobile network participant.
///
/// Trust fields are written only by the trust evaluator, `cluster_id` only
/// by the clustering engine. Roles are derived from the cluster record.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub velocity: Velocity,
    /// Current trust score, always clamped to `[0, 1]`.
    pub trust_score: f64,
    /// Last [`TRUST_HISTORY_LEN`] trust samples.
    pub history: TrustHistory,
    /// Trust as seen by this node's neighborhood, last cycle.
    pub social_trust: f64,
    pub resource: ResourceProfile,
    pub behavior: BehaviorProfile,
    /// Link quality estimate, `[0, 1]`; feeds the stability metric.
    pub connection_quality: f64,
    /// Observed messages per tick; feeds suspicion scoring.
    pub message_rate: f64,
    pub is_malicious: bool,
    pub is_sleeper_agent: bool,
    /// Owning cluster, if any. Written only by the clustering engine.
    pub cluster_id: Option<ClusterId>,
    /// Tick this node joined its current cluster; feeds the stability metric.
    pub joined_cluster_at: u64,
}

impl Node {
    /// Create a node with neutral trust and default profiles.
    pub fn new(id: NodeId, position: Position, velocity: Velocity) -> Self {
        Self {
            id,
            position,
            velocity,
            trust_score: 0.5,
            history: TrustHistory::new(),
            social_trust: 0.5,
            resource: ResourceProfile::default(),
            behavior: BehaviorProfile::default(),
            connection_quality: 0.8,
            message_rate: 1.0,
            is_malicious: false,
            is_sleeper_agent: false,
            cluster_id: None,
            joined_cluster_at: 0,
        }
    }

    /// Set the trust score, clamped into `[0, 1]`.
    ///
    /// The single mutation point for `trust_score`; keeps the clamp
    /// invariant without trusting every call site.
    pub fn set_trust(&mut self, score: f64) {
        self.trust_score = score.clamp(0.0, 1.0);
    }

    /// Scale the trust score by a penalty factor, clamped.
    pub fn scale_trust(&mut self, factor: f64) {
        self.set_trust(self.trust_score * factor);
    }

    /// Whether this node carries any security flag.
    pub fn is_flagged(&self) -> bool {
        self.is_malicious || self.is_sleeper_agent
    }

    /// Ticks spent in the current cluster as of `tick`.
    pub fn tenure(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.joined_cluster_at)
    }
}
