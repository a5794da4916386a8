//! Convoy Election & Succession Manager
//!
//! Elects a leader and co-leader per cluster from composite scores, with
//! a trust-weighted quorum vote and instant co-leader succession on
//! leader failure.
//!
//! # State Machine
//!
//! ```text
//! NoLeader ──elect──▶ LeaderActive
//!     ▲                  │ failure trigger
//!     │      ┌───────────┴───────────┐
//!     │      ▼                       ▼
//!     │  SuccessionPending       Electing
//!     │  (co-leader viable)    (full vote)
//!     │      │ promote, no vote      │ quorum or fallback
//!     │      ▼                       ▼
//!     └── LeaderActive ◀─────── LeaderActive
//! ```
//!
//! A conviction of the sitting leader in the detection phase triggers the
//! failure path in the **same tick** - a cluster with eligible members
//! never crosses a tick boundary leaderless.
//!
//! # Strategy Seam
//!
//! Voting is computed synchronously in-process today. [`ElectionStrategy`]
//! abstracts the vote so a networked implementation (real ballots,
//! per-cluster timeouts falling back to the highest-score rule) can
//! replace [`QuorumElection`] without changing the driver.

mod score;
mod quorum;
mod succession;

pub use score::{centrality_score, composite_score, is_eligible, stability_score};
pub use quorum::{ElectionMethod, ElectionOutcome, ElectionStrategy, QuorumElection};
pub use succession::{
    leader_has_failed, run_election_phase, ElectionPhaseReport, FailureReason, LeaderChange,
};

use convoy_types::ClusterId;
use thiserror::Error;

/// Leader drift bound: a leader farther than `radius × 1.5` from the
/// centroid has failed.
pub const LEADER_DRIFT_FACTOR: f64 = 1.5;

/// Errors raised by an election round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ElectionError {
    /// No member passes the eligibility filter. The cluster stays
    /// leaderless this tick and the driver retries next tick; never
    /// silently swallowed.
    #[error("cluster {0} has no eligible leader candidate")]
    NoEligibleCandidate(ClusterId),
}
