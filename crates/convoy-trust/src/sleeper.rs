//! Historical-anomaly ("sleeper agent") detection.
//!
//! A sleeper farms reputation: its trust climbs steeply, then the node
//! turns. The tell is a sharp rise in the trust history without the
//! behavioral evidence (authenticity, consistency) that honest
//! improvement produces.

use convoy_types::{NodeId, WorldState, SLEEPER_WINDOW};
use tracing::debug;

use crate::{SLEEPER_JUSTIFICATION_FLOOR, SLEEPER_PENALTY, SLEEPER_RISE_THRESHOLD};

/// One sleeper flag raised this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleeperFlag {
    pub node: NodeId,
    /// Trust rise over the inspection window.
    pub delta: f64,
}

/// Inspect every node's trailing trust history and flag unjustified
/// sharp rises.
///
/// Current leaders are exempt: their score moves with cluster duties and
/// leadership already has its own failure detection. A flagged node is
/// excluded from leader, co-leader, relay and boundary roles for as long
/// as the flag stands (see `FlagPolicy` for whether it ever clears).
pub fn detect_sleepers(world: &mut WorldState) -> Vec<SleeperFlag> {
    let candidates: Vec<(NodeId, f64)> = world
        .nodes
        .values()
        .filter(|n| !n.is_sleeper_agent)
        .filter(|n| !world.is_leader(n.id))
        .filter_map(|n| {
            let window: Vec<f64> = n.history.tail(SLEEPER_WINDOW).map(|s| s.score).collect();
            if window.len() < SLEEPER_WINDOW {
                return None;
            }
            let delta = window[window.len() - 1] - window[0];
            if delta <= SLEEPER_RISE_THRESHOLD {
                return None;
            }
            let justified = n.behavior.message_authenticity > SLEEPER_JUSTIFICATION_FLOOR
                && n.behavior.consistency > SLEEPER_JUSTIFICATION_FLOOR;
            if justified {
                None
            } else {
                Some((n.id, delta))
            }
        })
        .collect();

    let mut flags = Vec::with_capacity(candidates.len());
    for (id, delta) in candidates {
        let Some(node) = world.nodes.get_mut(&id) else {
            continue;
        };
        node.is_sleeper_agent = true;
        node.scale_trust(SLEEPER_PENALTY);
        debug!(node = %id, delta, "sleeper agent flagged");
        flags.push(SleeperFlag { node: id, delta });
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_types::{Cluster, ClusterId, Node, Position, Velocity};
    use std::collections::BTreeSet;

    fn node_with_history(id: u64, samples: &[f64]) -> Node {
        let mut n = Node::new(NodeId(id), Position::ORIGIN, Velocity::default());
        for (t, &s) in samples.iter().enumerate() {
            n.history.push(s, t as u64);
        }
        n.set_trust(*samples.last().unwrap());
        n
    }

    #[test]
    fn justified_rise_is_not_flagged() {
        let mut world = WorldState::new();
        let mut n = node_with_history(1, &[0.5, 0.52, 0.67, 0.95]);
        n.behavior.message_authenticity = 0.95;
        n.behavior.consistency = 0.95;
        world.upsert_node(n);

        assert!(detect_sleepers(&mut world).is_empty());
        assert!(!world.nodes[&NodeId(1)].is_sleeper_agent);
        assert!((world.nodes[&NodeId(1)].trust_score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn unjustified_rise_is_flagged_and_penalized() {
        let mut world = WorldState::new();
        // Last 3 samples: 0.52, 0.67 ... jump to 0.95 → delta 0.43
        let mut n = node_with_history(1, &[0.5, 0.52, 0.67, 0.95]);
        n.behavior.message_authenticity = 0.5;
        world.upsert_node(n);

        let flags = detect_sleepers(&mut world);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].node, NodeId(1));
        assert!((flags[0].delta - 0.43).abs() < 1e-9);

        let node = &world.nodes[&NodeId(1)];
        assert!(node.is_sleeper_agent);
        assert!((node.trust_score - 0.95 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn gradual_rise_is_not_flagged() {
        let mut world = WorldState::new();
        let mut n = node_with_history(1, &[0.5, 0.55, 0.6, 0.65]);
        n.behavior.message_authenticity = 0.5;
        world.upsert_node(n);

        assert!(detect_sleepers(&mut world).is_empty());
    }

    #[test]
    fn short_history_is_not_flagged() {
        let mut world = WorldState::new();
        let mut n = node_with_history(1, &[0.5, 0.95]);
        n.behavior.message_authenticity = 0.5;
        world.upsert_node(n);

        assert!(detect_sleepers(&mut world).is_empty());
    }

    #[test]
    fn current_leader_is_exempt() {
        let mut world = WorldState::new();
        let mut leader = node_with_history(1, &[0.5, 0.52, 0.95]);
        leader.behavior.message_authenticity = 0.5;
        world.upsert_node(leader);
        world.upsert_node(Node::new(
            NodeId(2),
            Position::new(10.0, 0.0),
            Velocity::default(),
        ));

        let cid = world.allocate_cluster_id();
        let members: BTreeSet<NodeId> = [NodeId(1), NodeId(2)].into();
        for id in &members {
            world.nodes.get_mut(id).unwrap().cluster_id = Some(cid);
        }
        let mut cluster = Cluster::new(cid, members);
        cluster.install_leader(NodeId(1), Some(NodeId(2)));
        world.clusters.insert(cid, cluster);
        assert_eq!(cid, ClusterId(0));

        assert!(detect_sleepers(&mut world).is_empty());
    }

    #[test]
    fn flag_is_not_reapplied() {
        let mut world = WorldState::new();
        let mut n = node_with_history(1, &[0.5, 0.52, 0.95]);
        n.behavior.message_authenticity = 0.5;
        world.upsert_node(n);

        assert_eq!(detect_sleepers(&mut world).len(), 1);
        let trust_after_first = world.nodes[&NodeId(1)].trust_score;
        assert!(detect_sleepers(&mut world).is_empty());
        assert_eq!(world.nodes[&NodeId(1)].trust_score, trust_after_first);
    }
}
