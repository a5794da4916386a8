//! Convoy Clustering Engine
//!
//! Partitions mobile nodes into clusters by proximity and kinematic
//! compatibility, then consolidates overlapping clusters until the merge
//! pass reaches a fixpoint.
//!
//! # Phase Order
//!
//! The driver runs the three operations in sequence at the top of every
//! tick:
//!
//! 1. [`refresh_clusters`] - evict drifted members, recompute geometry,
//!    dissolve non-viable clusters.
//! 2. [`form_clusters`] - greedy seed formation over the unassigned pool,
//!    in ascending node-id order for reproducibility.
//! 3. [`merge_clusters`] - repeated full passes until no pair merges.
//!
//! The greedy partition is order-dependent and not globally optimal; that
//! is the accepted trade-off for per-tick cost.
//!
//! # Failure Semantics
//!
//! Nothing here is fatal. A cluster below two members dissolves silently
//! and its former members re-enter the unassigned pool for the next
//! formation pass.

mod formation;
mod merge;
mod refresh;

pub use formation::form_clusters;
pub use merge::{merge_clusters, MergeRecord};
pub use refresh::{refresh_clusters, RefreshReport};

/// Fraction of an absorbed cluster's members that must be reachable from
/// the survivor's anchor for an overlap-based merge.
pub const MERGE_OVERLAP_RATIO: f64 = 0.3;
