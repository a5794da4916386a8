//! Convoy Message Routing
//!
//! Three delivery tiers, tried in order of cost:
//!
//! 1. **Direct**: the leader reaches every member inside its radio range
//!    in one hop.
//! 2. **Relay**: elected intra-cluster relays forward to members the
//!    leader cannot reach directly.
//! 3. **Boundary**: per-neighbor gateway nodes bridge clusters for
//!    inter-cluster traffic.
//!
//! Relay and gateway elections run once per tick after leadership settles,
//! writing their results into [`Cluster::relay_ids`] and
//! [`Cluster::boundary_map`]. Delivery itself goes through a [`Transport`],
//! which in the simulation just counts hops; a networked deployment would
//! put real sockets behind the same trait.
//!
//! Incomplete relay coverage is a reported condition, not an error: a
//! member that no relay can reach stays listed in the relay report and the
//! next tick retries with fresh geometry.
//!
//! [`Cluster::relay_ids`]: convoy_types::Cluster::relay_ids
//! [`Cluster::boundary_map`]: convoy_types::Cluster::boundary_map

mod boundary;
mod message;
mod relay;
mod route;

pub use boundary::{elect_boundaries, BoundaryReport};
pub use message::{Message, MessageId, Priority};
pub use relay::{elect_relays, RelayReport};
pub use route::{broadcast_cluster, escalate_hazard, BroadcastReport, HazardPath, Transport};

use convoy_types::{ClusterId, EngineConfig, NodeId, WorldState};
use thiserror::Error;

/// Errors raised while routing a concrete message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The originating cluster has no leader to anchor the tiers.
    #[error("cluster {0} has no leader to originate routing")]
    NoLeader(ClusterId),

    /// No boundary gateway is elected toward the target cluster.
    #[error("no boundary gateway from {from} toward {to}")]
    NoGateway { from: ClusterId, to: ClusterId },

    /// The addressed node is not known to the world.
    #[error("unknown recipient {0}")]
    UnknownRecipient(NodeId),
}

/// Outcome of one tick's relay and gateway elections.
#[derive(Debug, Default, Clone)]
pub struct RoutingPhaseReport {
    pub relays: Vec<RelayReport>,
    pub boundaries: Vec<BoundaryReport>,
}

/// Re-elect relays and boundary gateways for every cluster.
///
/// Runs after the election phase so role eligibility reflects this tick's
/// trust scores and leadership.
pub fn run_routing_phase(world: &mut WorldState, cfg: &EngineConfig) -> RoutingPhaseReport {
    let mut report = RoutingPhaseReport::default();
    let cluster_ids: Vec<ClusterId> = world.clusters.keys().copied().collect();
    for cid in cluster_ids {
        if let Some(relays) = elect_relays(world, cid, cfg) {
            report.relays.push(relays);
        }
        report.boundaries.push(elect_boundaries(world, cid, cfg));
    }
    report
}
