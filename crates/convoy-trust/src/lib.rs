//! Convoy Trust & Security Evaluator
//!
//! Maintains every node's trust score and screens cluster members for
//! malicious or deceptive behavior. Two detection mechanisms run each
//! cycle:
//!
//! - **Authority voting** ([`AuthorityVote`]): high-trust members of a
//!   cluster vote on suspicious peers, PoA-style. Conviction needs 30% of
//!   the cluster's authorities (minimum one).
//! - **Sleeper detection** ([`detect_sleepers`]): a trust score that rose
//!   sharply without behavioral justification marks the node as a sleeper
//!   agent - delayed malicious intent built on farmed reputation.
//!
//! Voting is computed centrally today; [`DetectionStrategy`] is the seam
//! where a networked implementation with real message passing and
//! per-cluster timeouts slots in without touching any caller.

mod evaluator;
mod detection;
mod sleeper;

pub use evaluator::{run_trust_cycle, TrustCycleReport};
pub use detection::{
    apply_verdicts, AuthorityVote, Conviction, DetectionReport, DetectionStrategy, Verdict,
};
pub use sleeper::{detect_sleepers, SleeperFlag};

/// Suspicion above which authorities are polled.
pub const SUSPICION_THRESHOLD: f64 = 0.5;

/// Fraction of a cluster's authorities needed to convict.
pub const CONVICTION_RATIO: f64 = 0.30;

/// Trust multiplier applied on a malicious conviction.
pub const MALICIOUS_PENALTY: f64 = 0.7;

/// Trust multiplier applied on a sleeper flag.
pub const SLEEPER_PENALTY: f64 = 0.5;

/// Unjustified trust rise over the sleeper window that triggers a flag.
pub const SLEEPER_RISE_THRESHOLD: f64 = 0.3;

/// Authenticity and consistency must both exceed this for a sharp trust
/// rise to count as justified.
pub const SLEEPER_JUSTIFICATION_FLOOR: f64 = 0.9;
