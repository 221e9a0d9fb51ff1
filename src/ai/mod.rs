//! AI and navigation module
//!
//! Provides agent perception, the pursuit state machine, catch sequences,
//! grid pathfinding and steering.

mod catch;
mod pathfinding;
mod perception;
mod pursuit;
mod steering;
mod variant;

pub use catch::{CatchPhase, CatchSequence, begin_catch};
pub use pathfinding::{CellHandle, NavGrid, NavigationService, PathResult, find_path};
pub use perception::{AvatarView, MemoryEntry, Observer, Perception, scan};
pub use pursuit::{
    Decision, NavRequest, Pursuit, PursuitContext, PursuitState, Teleport, door_in_probe, locomote,
    request_navigation, roll_idle_interval, select_target, think,
};
pub use steering::{Arrive, Seek, SteeringBehavior, SteeringOutput, follow_path};
pub use variant::{Agent, AgentKind, AgentProfile, AgentProfiles, Locomotion, VisionCone};
