//! Eligibility filter and composite candidate scoring.

use convoy_types::{Cluster, EngineConfig, Node};

/// Leader/co-leader/relay/boundary eligibility: sufficient trust and no
/// security flags.
pub fn is_eligible(node: &Node, cfg: &EngineConfig) -> bool {
    node.trust_score >= cfg.leader_eligibility_threshold && !node.is_flagged()
}

/// Stability metric: normalized cluster tenure blended with connection
/// quality.
///
/// Tenure saturates at `stability_horizon_ticks` - a member that has
/// survived the horizon is as stable as it gets.
pub fn stability_score(node: &Node, cfg: &EngineConfig, tick: u64) -> f64 {
    let tenure = (node.tenure(tick) as f64 / cfg.stability_horizon_ticks as f64).min(1.0);
    0.5 * tenure + 0.5 * node.connection_quality
}

/// Centrality metric: `1 − distance(node, centroid) / radius`, clamped.
///
/// A zero-radius cluster (all members co-located) makes everyone
/// perfectly central.
pub fn centrality_score(node: &Node, cluster: &Cluster) -> f64 {
    if cluster.radius <= 0.0 {
        return 1.0;
    }
    (1.0 - node.position.distance(&cluster.centroid) / cluster.radius).clamp(0.0, 1.0)
}

/// Composite leader score under the injected weight scheme.
pub fn composite_score(node: &Node, cluster: &Cluster, cfg: &EngineConfig, tick: u64) -> f64 {
    let w = &cfg.weights.leader;
    w.trust * node.trust_score
        + w.resource * node.resource.score()
        + w.stability * stability_score(node, cfg, tick)
        + w.behavior * node.behavior.score()
        + w.centrality * centrality_score(node, cluster)
}
