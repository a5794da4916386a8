//! Convoy Simulation Driver
//!
//! Runs a randomized highway scenario and prints the final cluster
//! topology as JSON.

use convoy_engine::{Engine, PositionUpdate};
use convoy_types::{EngineConfig, NodeId, Position, Velocity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let node_count: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(40);
    let ticks: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(30);
    let seed: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(7);

    println!("Convoy Cluster Simulator");
    println!("========================");
    println!();
    println!("{} nodes, {} ticks, seed {}", node_count, ticks, seed);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut engine = Engine::new(EngineConfig::default())?;

    // Nodes start spread along a two-lane highway, eastbound and
    // westbound, with small per-node speed jitter.
    let mut initial = Vec::with_capacity(node_count);
    for i in 0..node_count {
        let eastbound = rng.gen_bool(0.5);
        let heading = if eastbound { 90.0 } else { 270.0 };
        let y = if eastbound { 0.0 } else { 60.0 };
        initial.push(PositionUpdate {
            node_id: NodeId(i as u64),
            position: Position::new(rng.gen_range(0.0..3000.0), y),
            velocity: Velocity::new(rng.gen_range(18.0..25.0), heading),
            timestamp: 0,
        });
    }
    engine.run_tick(initial);

    for tick in 1..ticks {
        let updates = engine
            .world()
            .nodes
            .values()
            .map(|n| {
                let dx = if n.velocity.heading < 180.0 {
                    n.velocity.speed
                } else {
                    -n.velocity.speed
                };
                PositionUpdate {
                    node_id: n.id,
                    position: Position::new(n.position.x + dx, n.position.y),
                    velocity: Velocity::new(
                        (n.velocity.speed + rng.gen_range(-1.0..1.0)).max(1.0),
                        n.velocity.heading,
                    ),
                    timestamp: tick,
                }
            })
            .collect();
        engine.run_tick(updates);
    }

    println!();
    println!("Simulation complete:");
    println!("  Nodes: {}", engine.world().nodes.len());
    println!("  Clusters: {}", engine.world().clusters.len());
    println!("  Events: {}", engine.events().len());
    println!();
    println!("Final topology:");
    println!("{}", serde_json::to_string_pretty(&engine.cluster_snapshots())?);

    Ok(())
}
