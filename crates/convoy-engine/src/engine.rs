//! The tick driver.

use std::collections::BTreeMap;

use convoy_cluster::{form_clusters, merge_clusters, refresh_clusters};
use convoy_election::{run_election_phase, QuorumElection};
use convoy_routing::{
    broadcast_cluster, escalate_hazard, run_routing_phase, BroadcastReport, HazardPath, Message,
    RoutingError,
};
use convoy_trust::{apply_verdicts, detect_sleepers, run_trust_cycle, AuthorityVote, DetectionStrategy};
use convoy_types::{ClusterId, EngineConfig, NodeId, WorldState};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::events::EngineEvent;
use crate::snapshot::{cluster_snapshots, ClusterSnapshot};
use crate::transport::SimTransport;
use crate::update::{apply_updates, PositionUpdate};
use crate::EngineError;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What one tick did.
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    pub tick: u64,
    /// Nodes registered for the first time this tick.
    pub registered: Vec<NodeId>,
    /// Events emitted this tick, in phase order.
    pub events: Vec<EngineEvent>,
}

/// The cluster management engine.
///
/// Owns the world, the configuration, the event log and the simulation
/// transport. One call to [`Engine::run_tick`] runs the full pipeline.
pub struct Engine {
    cfg: EngineConfig,
    world: WorldState,
    events: Vec<EngineEvent>,
    event_tx: broadcast::Sender<EngineEvent>,
    transport: SimTransport,
}

impl Engine {
    /// Build an engine over an empty world.
    ///
    /// The configuration is validated here; a bad configuration is the
    /// one fatal error in the system.
    pub fn new(cfg: EngineConfig) -> Result<Self, EngineError> {
        cfg.validate()?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            cfg,
            world: WorldState::new(),
            events: Vec::new(),
            event_tx,
            transport: SimTransport::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Mutable world access for embedding drivers and tests. The engine
    /// re-derives everything from the world each tick, so out-of-band
    /// edits are picked up at the next `run_tick`.
    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    /// The full event log since startup.
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Subscribe to live events. Slow consumers miss events rather than
    /// stalling the tick.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn transport(&self) -> &SimTransport {
        &self.transport
    }

    /// Snapshot every live cluster.
    pub fn cluster_snapshots(&self) -> Vec<ClusterSnapshot> {
        cluster_snapshots(&self.world)
    }

    /// Advance one tick: apply mobility, then run clustering, trust,
    /// election and routing in their fixed order.
    pub fn run_tick(&mut self, updates: Vec<PositionUpdate>) -> TickReport {
        self.world.tick += 1;
        let tick = self.world.tick;
        let events_before = self.events.len();

        let registered = apply_updates(&mut self.world, updates);

        // Clustering
        let refresh = refresh_clusters(&mut self.world, &self.cfg);
        for (cluster, node) in refresh.evicted {
            self.emit(EngineEvent::MemberEvicted { cluster, node, tick });
        }
        for cluster in refresh.dissolved {
            self.emit(EngineEvent::ClusterDissolved { cluster, tick });
        }
        for cluster in form_clusters(&mut self.world, &self.cfg) {
            let members = self.world.clusters[&cluster]
                .member_ids
                .iter()
                .copied()
                .collect();
            self.emit(EngineEvent::ClusterFormed {
                cluster,
                members,
                tick,
            });
        }
        for merge in merge_clusters(&mut self.world, &self.cfg) {
            self.emit(EngineEvent::ClustersMerged {
                survivor: merge.survivor,
                absorbed: merge.absorbed,
                tick,
            });
        }

        // Trust and detection
        let trust = run_trust_cycle(&mut self.world, &self.cfg);
        for node in trust.rehabilitated {
            self.emit(EngineEvent::NodeRehabilitated { node, tick });
        }
        let cluster_ids: Vec<ClusterId> = self.world.clusters.keys().copied().collect();
        let mut verdicts = Vec::new();
        for cid in &cluster_ids {
            verdicts.extend(AuthorityVote.screen(&self.world, *cid, &self.cfg));
        }
        let detection = apply_verdicts(&mut self.world, verdicts);
        for conviction in &detection.convictions {
            self.emit(EngineEvent::NodeFlaggedMalicious {
                node: conviction.verdict.node,
                cluster: conviction.verdict.cluster,
                votes: conviction.verdict.votes,
                authorities: conviction.verdict.authorities,
                tick,
            });
        }
        for flag in detect_sleepers(&mut self.world) {
            self.emit(EngineEvent::SleeperDetected {
                node: flag.node,
                delta: flag.delta,
                tick,
            });
        }

        // Election and succession, including leaders convicted this tick
        let demoted = detection.demoted_leader_clusters();
        let election = run_election_phase(&mut self.world, &self.cfg, &QuorumElection, &demoted);
        for change in election.changes {
            self.emit(EngineEvent::LeaderChanged {
                cluster: change.cluster,
                leader: change.new_leader,
                epoch: change.epoch,
                via: change.method.into(),
                tick,
            });
            if let Some(co_leader) = change.co_leader {
                self.emit(EngineEvent::CoLeaderChosen {
                    cluster: change.cluster,
                    co_leader,
                    tick,
                });
            }
        }
        for (cluster, _) in election.leaderless {
            self.emit(EngineEvent::ClusterLeaderless { cluster, tick });
        }

        // Routing roles; only changes are worth logging
        let prior = self.routing_roles();
        let routing = run_routing_phase(&mut self.world, &self.cfg);
        let after = self.routing_roles();
        for relay in routing.relays {
            let changed = prior.get(&relay.cluster).map(|(r, _)| r) != Some(&relay.relays);
            if changed && !relay.relays.is_empty() {
                self.emit(EngineEvent::RelaysElected {
                    cluster: relay.cluster,
                    relays: relay.relays.clone(),
                    tick,
                });
            }
            if !relay.uncovered.is_empty() {
                self.emit(EngineEvent::RelayCoverageIncomplete {
                    cluster: relay.cluster,
                    uncovered: relay.uncovered,
                    tick,
                });
            }
        }
        for (cluster, (_, gateways)) in &after {
            let prior_gateways = prior.get(cluster).map(|(_, g)| g);
            for (&neighbor, &gateway) in gateways {
                if prior_gateways.and_then(|g| g.get(&neighbor)) != Some(&gateway) {
                    self.emit(EngineEvent::BoundaryElected {
                        cluster: *cluster,
                        neighbor,
                        gateway,
                        tick,
                    });
                }
            }
        }

        debug_assert!(self.world.check_consistency().is_empty());
        debug!(
            tick,
            clusters = self.world.clusters.len(),
            nodes = self.world.nodes.len(),
            "tick complete"
        );

        TickReport {
            tick,
            registered,
            events: self.events[events_before..].to_vec(),
        }
    }

    /// Broadcast a message inside a cluster using the elected topology.
    pub fn broadcast(
        &mut self,
        cluster: ClusterId,
        message: &Message,
    ) -> Result<BroadcastReport, RoutingError> {
        broadcast_cluster(&self.world, &self.cfg, &mut self.transport, cluster, message)
    }

    /// Escalate a hazard message to a neighboring cluster through the
    /// boundary gateway chain.
    pub fn escalate(
        &mut self,
        from: ClusterId,
        to: ClusterId,
        message: &Message,
    ) -> Result<HazardPath, RoutingError> {
        let path = escalate_hazard(&self.world, &mut self.transport, from, to, message)?;
        info!(%from, %to, message = %message.id, "hazard escalated across boundary");
        Ok(path)
    }

    fn emit(&mut self, event: EngineEvent) {
        let _ = self.event_tx.send(event.clone());
        self.events.push(event);
    }

    #[allow(clippy::type_complexity)]
    fn routing_roles(
        &self,
    ) -> BTreeMap<ClusterId, (Vec<NodeId>, BTreeMap<ClusterId, NodeId>)> {
        self.world
            .clusters
            .values()
            .map(|c| {
                (
                    c.id,
                    (
                        c.relay_ids.iter().copied().collect(),
                        c.boundary_map.clone(),
                    ),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_types::{Position, Velocity};

    fn update(id: u64, x: f64, y: f64) -> PositionUpdate {
        PositionUpdate {
            node_id: NodeId(id),
            position: Position::new(x, y),
            velocity: Velocity::new(10.0, 90.0),
            timestamp: 0,
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = EngineConfig {
            min_cluster_size: 1,
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(cfg), Err(EngineError::Config(_))));
    }

    #[test]
    fn tick_advances_and_registers() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let report = engine.run_tick(vec![update(1, 0.0, 0.0), update(2, 50.0, 0.0)]);
        assert_eq!(report.tick, 1);
        assert_eq!(report.registered, vec![NodeId(1), NodeId(2)]);
        assert_eq!(engine.world().nodes.len(), 2);
    }

    #[test]
    fn subscribers_see_emitted_events() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let mut rx = engine.subscribe();
        engine.run_tick(vec![update(1, 0.0, 0.0), update(2, 50.0, 0.0)]);

        // Formation and the first election both happened this tick.
        let first = rx.try_recv().unwrap();
        assert!(matches!(first, EngineEvent::ClusterFormed { .. }));
    }
}
