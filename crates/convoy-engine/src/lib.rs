//! Convoy Engine
//!
//! The tick-driven driver that owns the world and runs the full pipeline:
//!
//! ```text
//! position updates
//!       │
//!       ▼
//! refresh ▶ form ▶ merge          (clustering)
//!       ▼
//! trust cycle ▶ authority vote ▶ sleeper scan
//!       ▼
//! failure check ▶ succession / election
//!       ▼
//! relay election ▶ boundary election
//! ```
//!
//! The driver owns exactly one [`WorldState`] and lends it to each phase
//! in this order; within a tick the phases are serialized, so no phase
//! ever observes a half-applied world. Everything that happened in a tick
//! comes back as [`EngineEvent`]s, appended to the in-memory log and
//! fanned out over a tokio broadcast channel for live consumers.
//!
//! [`WorldState`]: convoy_types::WorldState

mod engine;
mod events;
mod snapshot;
mod transport;
mod update;

pub use engine::{Engine, TickReport};
pub use events::{ElectionVia, EngineEvent};
pub use snapshot::{cluster_snapshots, ClusterSnapshot};
pub use transport::SimTransport;
pub use update::PositionUpdate;

use convoy_types::ConfigError;
use thiserror::Error;

/// Fatal driver errors. Everything else in the pipeline degrades and
/// reports; only a rejected configuration stops the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
