//! Message delivery over the elected topology.

use convoy_types::{ClusterId, EngineConfig, NodeId, WorldState};
use tracing::{debug, warn};

use crate::message::Message;
use crate::RoutingError;

/// Delivery backend. The routing tiers decide who forwards to whom; the
/// transport performs the hop.
///
/// The simulation transport just records hops and counts deliveries. A
/// networked implementation would serialize the message onto a socket
/// behind the same two calls.
pub trait Transport {
    /// Perform one hop from `from` to `to`.
    fn deliver(&mut self, from: NodeId, to: NodeId, message: &Message);
}

/// Outcome of a cluster-wide broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members reached in one hop from the leader.
    pub direct: Vec<NodeId>,
    /// Members reached through a relay, with the relay that served them.
    pub relayed: Vec<(NodeId, NodeId)>,
    /// Members no tier could reach this tick.
    pub unreached: Vec<NodeId>,
}

/// Broadcast a message from the cluster leader to every member.
///
/// Tier 1 covers members inside the leader's radio range; tier 2 hands the
/// message to each elected relay once and lets it forward to the members
/// it covers. Members outside both tiers are reported, not dropped
/// silently.
pub fn broadcast_cluster(
    world: &WorldState,
    cfg: &EngineConfig,
    transport: &mut dyn Transport,
    cid: ClusterId,
    message: &Message,
) -> Result<BroadcastReport, RoutingError> {
    let cluster = world
        .clusters
        .get(&cid)
        .ok_or(RoutingError::NoLeader(cid))?;
    let leader = cluster.leader_id.ok_or(RoutingError::NoLeader(cid))?;
    let leader_pos = world
        .position_of(leader)
        .ok_or(RoutingError::UnknownRecipient(leader))?;

    let mut report = BroadcastReport::default();
    let mut pending: Vec<NodeId> = Vec::new();

    for &member in &cluster.member_ids {
        if member == leader {
            continue;
        }
        let Some(pos) = world.position_of(member) else {
            report.unreached.push(member);
            continue;
        };
        if pos.distance(&leader_pos) <= cfg.communication_range {
            transport.deliver(leader, member, message);
            report.direct.push(member);
        } else {
            pending.push(member);
        }
    }

    for member in pending {
        let served_by = cluster.relay_ids.iter().copied().find(|relay| {
            match (world.position_of(*relay), world.position_of(member)) {
                (Some(rp), Some(mp)) => mp.distance(&rp) <= cfg.communication_range,
                _ => false,
            }
        });
        match served_by {
            Some(relay) => {
                // Leader hands off to the relay, relay forwards.
                transport.deliver(leader, relay, message);
                transport.deliver(relay, member, message);
                report.relayed.push((member, relay));
            }
            None => report.unreached.push(member),
        }
    }

    if report.unreached.is_empty() {
        debug!(cluster = %cid, message = %message.id, "broadcast complete");
    } else {
        warn!(
            cluster = %cid,
            message = %message.id,
            unreached = report.unreached.len(),
            "broadcast left members unreached"
        );
    }
    Ok(report)
}

/// The hop sequence of one hazard escalation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardPath {
    /// Node sequence: leader, own gateway, neighbor gateway (when the
    /// neighbor elected one toward us), neighbor leader.
    pub hops: Vec<NodeId>,
}

/// Escalate a hazard message from one cluster to a neighboring one.
///
/// Chain: own leader, own boundary gateway toward the neighbor, the
/// neighbor's gateway back toward us when it elected one, and finally the
/// neighbor's leader, who rebroadcasts inside its own cluster. A missing
/// gateway or a leaderless neighbor is a hard error; hazard traffic must
/// never vanish quietly.
pub fn escalate_hazard(
    world: &WorldState,
    transport: &mut dyn Transport,
    from: ClusterId,
    to: ClusterId,
    message: &Message,
) -> Result<HazardPath, RoutingError> {
    let source = world
        .clusters
        .get(&from)
        .ok_or(RoutingError::NoLeader(from))?;
    let target = world.clusters.get(&to).ok_or(RoutingError::NoLeader(to))?;

    let leader = source.leader_id.ok_or(RoutingError::NoLeader(from))?;
    let gateway = source
        .boundary_map
        .get(&to)
        .copied()
        .ok_or(RoutingError::NoGateway { from, to })?;
    let target_leader = target.leader_id.ok_or(RoutingError::NoLeader(to))?;

    let mut hops = vec![leader];
    if gateway != leader {
        transport.deliver(leader, gateway, message);
        hops.push(gateway);
    }

    // The neighbor's own gateway toward us is the preferred entry point;
    // fall back to its leader directly when it elected none.
    let entry = target.boundary_map.get(&from).copied();
    let mut carrier = gateway;
    if let Some(entry) = entry {
        if entry != carrier {
            transport.deliver(carrier, entry, message);
            hops.push(entry);
            carrier = entry;
        }
    }
    if target_leader != carrier {
        transport.deliver(carrier, target_leader, message);
        hops.push(target_leader);
    }

    debug!(%from, %to, message = %message.id, hops = hops.len(), "hazard escalated");
    Ok(HazardPath { hops })
}
