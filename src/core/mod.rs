//! Core simulation module
//!
//! Contains the simulation driver, its configuration, clock, events and the
//! deferred task scheduler.

mod config;
mod error;
mod events;
pub mod logging;
mod simulation;
mod snapshot;
mod stats;
mod tasks;
mod time;

pub use config::{Authority, AvatarConfig, HazardConfig, HazardTuning, PursuitConfig, SimConfig};
pub use error::{ConfigError, LevelError, SnapshotError};
pub use events::{EventQueue, SimEvent};
pub use simulation::Simulation;
pub use snapshot::{AgentRecord, AvatarRecord, DoorRecord, SimSnapshot};
pub use stats::TickStats;
pub use tasks::{Scheduler, Task, TaskContext, TaskId, TaskStep};
pub use time::SimClock;
