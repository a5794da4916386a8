//! Convoy Data Model
//!
//! Shared types for the trust-based cluster management engine: planar
//! geometry, the node and cluster records, and the configuration surface.
//!
//! # Ownership Rules
//!
//! Roles (leader, co-leader, relay, boundary gateway) are **derived** from
//! the owning [`Cluster`] record and never cached on a [`Node`]. A node's
//! `cluster_id` is written only by the clustering engine; its trust fields
//! only by the trust evaluator. Keeping a single writer per field is what
//! makes the per-tick phases safe to reorder-check and parallelize across
//! clusters.
//!
//! # Determinism
//!
//! Every collection in this crate is B-tree ordered so that iteration over
//! nodes and clusters is stable across runs. Seed order during cluster
//! formation is part of the engine's contract with its tests.

mod geometry;
mod node;
mod cluster;
mod config;
mod world;

pub use geometry::{Position, Velocity, heading_delta};
pub use node::{BehaviorProfile, Node, NodeId, ResourceProfile, TrustHistory, TrustSample};
pub use cluster::{Cluster, ClusterId, ElectionState};
pub use config::{
    BoundaryWeights, ConfigError, EngineConfig, FlagPolicy, LeaderWeights, RelayWeights,
    ScoringWeights,
};
pub use world::WorldState;

/// Bounded length of a node's trust history.
pub const TRUST_HISTORY_LEN: usize = 10;

/// Number of trailing history samples inspected by sleeper detection.
pub const SLEEPER_WINDOW: usize = 3;

/// Minimum membership for a cluster to stay alive.
pub const MIN_LIVE_MEMBERS: usize = 2;
