//! Engine configuration and the versioned scoring weight sets.
//!
//! Every threshold the engine consumes lives here, loaded by the embedding
//! application and validated once at startup. An invalid configuration is
//! the only fatal error class in the system: a threshold outside `[0, 1]`
//! or a negative range can violate every downstream invariant, so the
//! driver refuses to start rather than limp.

use thiserror::Error;

/// Errors raised by [`EngineConfig::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A unit-interval parameter fell outside `[0, 1]`.
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },

    /// A distance or range parameter was zero or negative.
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    /// A count parameter was below its floor.
    #[error("{name} must be at least {min}, got {value}")]
    CountTooSmall {
        name: &'static str,
        min: usize,
        value: usize,
    },

    /// A weight set does not form a convex combination.
    #[error("weight set '{set}' must be non-negative and sum to 1, sums to {sum}")]
    BadWeightSet { set: &'static str, sum: f64 },
}

/// Leader composite-score weights.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaderWeights {
    pub trust: f64,
    pub resource: f64,
    pub stability: f64,
    pub behavior: f64,
    pub centrality: f64,
}

impl LeaderWeights {
    fn sum(&self) -> f64 {
        self.trust + self.resource + self.stability + self.behavior + self.centrality
    }

    fn min(&self) -> f64 {
        self.trust
            .min(self.resource)
            .min(self.stability)
            .min(self.behavior)
            .min(self.centrality)
    }
}

/// Relay selection weights. `coverage` applies to the fraction of the
/// still-uncovered out-of-range set a candidate can reach.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelayWeights {
    pub trust: f64,
    pub centrality: f64,
    pub stability: f64,
    pub coverage: f64,
}

impl RelayWeights {
    fn sum(&self) -> f64 {
        self.trust + self.centrality + self.stability + self.coverage
    }

    fn min(&self) -> f64 {
        self.trust
            .min(self.centrality)
            .min(self.stability)
            .min(self.coverage)
    }
}

/// Boundary gateway selection weights.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryWeights {
    pub proximity: f64,
    pub trust: f64,
    pub connectivity: f64,
    pub stability: f64,
}

impl BoundaryWeights {
    fn sum(&self) -> f64 {
        self.proximity + self.trust + self.connectivity + self.stability
    }

    fn min(&self) -> f64 {
        self.proximity
            .min(self.trust)
            .min(self.connectivity)
            .min(self.stability)
    }
}

/// Named, versioned scoring configuration.
///
/// The weight formulas are injected rather than hard-coded so that tuning
/// regimes can coexist and tests can pin a scheme explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoringWeights {
    /// Scheme identifier, e.g. `"v2"`.
    #[cfg_attr(feature = "serde", serde(skip_deserializing))]
    pub version: &'static str,
    pub leader: LeaderWeights,
    pub relay: RelayWeights,
    pub boundary: BoundaryWeights,
}

impl ScoringWeights {
    /// Current canonical scheme: 5-metric leader scoring
    /// (trust/resource/stability/behavior/centrality = 40/20/15/15/10).
    #[must_use]
    pub const fn v2() -> Self {
        Self {
            version: "v2",
            leader: LeaderWeights {
                trust: 0.40,
                resource: 0.20,
                stability: 0.15,
                behavior: 0.15,
                centrality: 0.10,
            },
            relay: RelayWeights {
                trust: 0.35,
                centrality: 0.25,
                stability: 0.20,
                coverage: 0.20,
            },
            boundary: BoundaryWeights {
                proximity: 0.40,
                trust: 0.30,
                connectivity: 0.20,
                stability: 0.10,
            },
        }
    }

    /// Legacy 2-metric leader scheme (trust 60 / resource 40), kept for
    /// comparison runs. Relay and boundary weights match `v2`.
    #[must_use]
    pub const fn v1_trust_resource() -> Self {
        let v2 = Self::v2();
        Self {
            version: "v1-trust-resource",
            leader: LeaderWeights {
                trust: 0.60,
                resource: 0.40,
                stability: 0.0,
                behavior: 0.0,
                centrality: 0.0,
            },
            relay: v2.relay,
            boundary: v2.boundary,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::v2()
    }
}

/// Policy for security flags once set.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlagPolicy {
    /// Flags never clear; flagged nodes are excluded from every role for
    /// the lifetime of the run.
    Permanent,
    /// A flag clears once the node's historical-average trust climbs back
    /// above `threshold`.
    Rehabilitate { threshold: f64 },
}

impl Default for FlagPolicy {
    fn default() -> Self {
        Self::Permanent
    }
}

/// The full configuration surface of the engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Maximum distance from a formation seed to a candidate member.
    pub max_cluster_radius: f64,
    /// Maximum speed delta for kinematic compatibility.
    pub speed_threshold: f64,
    /// Maximum circular heading delta (degrees) for compatibility.
    pub direction_threshold: f64,
    /// Minimum members to instantiate a cluster (>= 2).
    pub min_cluster_size: usize,
    /// Leader distance below which two clusters merge unconditionally.
    pub close_merge_distance: f64,
    /// Direct radio range.
    pub communication_range: f64,
    /// Neighbor-cluster centroid distance for boundary gateway election.
    pub boundary_detection_range: f64,
    /// Trust above which a member counts as an authority.
    pub authority_trust_threshold: f64,
    /// Trust floor for leader/relay/boundary eligibility.
    pub leader_eligibility_threshold: f64,
    /// Trust-weighted vote share required to win outright.
    pub majority_threshold: f64,
    /// Maximum relays elected per cluster per tick.
    pub relay_cap: usize,
    /// Speed above which a node accrues suspicion.
    pub suspicion_speed_ceiling: f64,
    /// Message rate above which a node accrues suspicion.
    pub suspicion_rate_ceiling: f64,
    /// Ticks of tenure at which the stability metric saturates.
    pub stability_horizon_ticks: u64,
    /// What happens to malicious/sleeper flags over time.
    pub flag_policy: FlagPolicy,
    pub weights: ScoringWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cluster_radius: 400.0,
            speed_threshold: 15.0,
            direction_threshold: 30.0,
            min_cluster_size: 2,
            close_merge_distance: 350.0,
            communication_range: 250.0,
            boundary_detection_range: 800.0,
            authority_trust_threshold: 0.8,
            leader_eligibility_threshold: 0.5,
            majority_threshold: 0.51,
            relay_cap: 10,
            suspicion_speed_ceiling: 40.0,
            suspicion_rate_ceiling: 10.0,
            stability_horizon_ticks: 50,
            flag_policy: FlagPolicy::Permanent,
            weights: ScoringWeights::v2(),
        }
    }
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl EngineConfig {
    /// Validate every parameter; the driver calls this before its first
    /// tick and treats any error as fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("max_cluster_radius", self.max_cluster_radius),
            ("speed_threshold", self.speed_threshold),
            ("close_merge_distance", self.close_merge_distance),
            ("communication_range", self.communication_range),
            ("boundary_detection_range", self.boundary_detection_range),
            ("suspicion_speed_ceiling", self.suspicion_speed_ceiling),
            ("suspicion_rate_ceiling", self.suspicion_rate_ceiling),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if !(self.direction_threshold > 0.0) || self.direction_threshold > 180.0 {
            return Err(ConfigError::NonPositive {
                name: "direction_threshold",
                value: self.direction_threshold,
            });
        }

        for (name, value) in [
            ("authority_trust_threshold", self.authority_trust_threshold),
            (
                "leader_eligibility_threshold",
                self.leader_eligibility_threshold,
            ),
            ("majority_threshold", self.majority_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value });
            }
        }

        if let FlagPolicy::Rehabilitate { threshold } = self.flag_policy {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::OutOfUnitRange {
                    name: "flag_policy.threshold",
                    value: threshold,
                });
            }
        }

        if self.min_cluster_size < 2 {
            return Err(ConfigError::CountTooSmall {
                name: "min_cluster_size",
                min: 2,
                value: self.min_cluster_size,
            });
        }
        if self.relay_cap < 1 {
            return Err(ConfigError::CountTooSmall {
                name: "relay_cap",
                min: 1,
                value: self.relay_cap,
            });
        }
        if self.stability_horizon_ticks == 0 {
            return Err(ConfigError::CountTooSmall {
                name: "stability_horizon_ticks",
                min: 1,
                value: 0,
            });
        }

        let w = &self.weights;
        for (set, sum, min) in [
            ("leader", w.leader.sum(), w.leader.min()),
            ("relay", w.relay.sum(), w.relay.min()),
            ("boundary", w.boundary.sum(), w.boundary.min()),
        ] {
            if min < 0.0 || (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(ConfigError::BadWeightSet { set, sum });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_passes_validation() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn both_weight_schemes_are_convex() {
        for weights in [ScoringWeights::v2(), ScoringWeights::v1_trust_resource()] {
            let cfg = EngineConfig {
                weights,
                ..EngineConfig::default()
            };
            assert!(cfg.validate().is_ok(), "scheme {} invalid", weights.version);
        }
    }

    #[test]
    fn rejects_out_of_unit_threshold() {
        let cfg = EngineConfig {
            majority_threshold: 1.2,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfUnitRange {
                name: "majority_threshold",
                ..
            })
        ));
    }

    #[test]
    fn rejects_negative_range() {
        let cfg = EngineConfig {
            communication_range: -1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NonPositive { .. })));
    }

    #[test]
    fn rejects_nan_range() {
        let cfg = EngineConfig {
            max_cluster_radius: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_singleton_clusters() {
        let cfg = EngineConfig {
            min_cluster_size: 1,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::CountTooSmall {
                name: "min_cluster_size",
                ..
            })
        ));
    }

    #[test]
    fn rejects_lopsided_weights() {
        let mut weights = ScoringWeights::v2();
        weights.leader.trust = 0.9;
        let cfg = EngineConfig {
            weights,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::BadWeightSet { set: "leader", .. })
        ));
    }

    #[test]
    fn rejects_bad_rehabilitation_threshold() {
        let cfg = EngineConfig {
            flag_policy: FlagPolicy::Rehabilitate { threshold: 1.5 },
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
