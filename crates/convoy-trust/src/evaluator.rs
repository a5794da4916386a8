//! The per-tick trust cycle.
//!
//! Each node's new score blends its own track record with how its current
//! neighborhood scores it:
//!
//! ```text
//! trust' = 0.5 · mean(history) + 0.5 · social_trust
//! ```
//!
//! where `social_trust` averages neighbor trust scores, each contribution
//! discounted for flagged neighbors (×0.3 malicious, ×0.2 sleeper),
//! boosted for authorities (×1.2), and scaled by the neighbor's own
//! authenticity/consistency credibility. The whole cycle reads a
//! consistent snapshot: every node's social trust is computed from
//! pre-cycle scores before any score is written.

use convoy_types::{EngineConfig, FlagPolicy, NodeId, WorldState};
use tracing::debug;

/// Multiplier on contributions from malicious neighbors.
const MALICIOUS_DISCOUNT: f64 = 0.3;
/// Multiplier on contributions from sleeper-flagged neighbors.
const SLEEPER_DISCOUNT: f64 = 0.2;
/// Multiplier on contributions from authority neighbors.
const AUTHORITY_BOOST: f64 = 1.2;

/// Outcome of one trust cycle.
#[derive(Debug, Default, Clone)]
pub struct TrustCycleReport {
    /// Nodes whose scores were updated this cycle.
    pub updated: usize,
    /// Flagged nodes whose flags cleared under a rehabilitation policy.
    pub rehabilitated: Vec<NodeId>,
}

/// Run one trust cycle over every node.
pub fn run_trust_cycle(world: &mut WorldState, cfg: &EngineConfig) -> TrustCycleReport {
    let tick = world.tick;

    // Phase 1: read-only scoring pass over the pre-cycle snapshot.
    let mut planned: Vec<(NodeId, f64)> = Vec::with_capacity(world.nodes.len());
    for node in world.nodes.values() {
        planned.push((node.id, social_trust(world, node.id, cfg)));
    }

    // Phase 2: apply. History gets the pre-cycle score first, so the
    // historical mean already includes the present.
    let mut report = TrustCycleReport::default();
    for (id, social) in planned {
        let Some(node) = world.nodes.get_mut(&id) else {
            continue;
        };
        node.history.push(node.trust_score, tick);
        node.social_trust = social;
        let historical = node.history.mean().unwrap_or(node.trust_score);
        node.set_trust(0.5 * historical + 0.5 * social);
        report.updated += 1;

        if let FlagPolicy::Rehabilitate { threshold } = cfg.flag_policy {
            if node.is_flagged() && node.history.mean().unwrap_or(0.0) > threshold {
                node.is_malicious = false;
                node.is_sleeper_agent = false;
                report.rehabilitated.push(id);
                debug!(node = %id, "flags cleared by rehabilitation policy");
            }
        }
    }

    report
}

/// Weighted mean of neighbor trust contributions.
///
/// A node with no neighbors in radio range keeps its own score as the
/// social component: isolation neither bleeds nor farms trust.
fn social_trust(world: &WorldState, id: NodeId, cfg: &EngineConfig) -> f64 {
    let node = &world.nodes[&id];
    let mut sum = 0.0;
    let mut count = 0usize;

    for neighbor in world.nodes.values() {
        if neighbor.id == id {
            continue;
        }
        if neighbor.position.distance(&node.position) > cfg.communication_range {
            continue;
        }
        let mut factor = 1.0;
        if neighbor.is_malicious {
            factor *= MALICIOUS_DISCOUNT;
        }
        if neighbor.is_sleeper_agent {
            factor *= SLEEPER_DISCOUNT;
        }
        if !neighbor.is_flagged() && neighbor.trust_score > cfg.authority_trust_threshold {
            factor *= AUTHORITY_BOOST;
        }
        sum += neighbor.trust_score * factor * neighbor.behavior.credibility();
        count += 1;
    }

    if count == 0 {
        node.trust_score
    } else {
        (sum / count as f64).clamp(0.0, 1.0)
    }
}
