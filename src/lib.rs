//! Pursuit and hazard simulation for a chase game
//!
//! This crate provides:
//! - Agent perception with vision cones, line of sight and decaying memory
//! - A pursuit state machine (wander, chase, catch) with door handling
//! - A capsule movement controller with step-up and ground snapping
//! - Stun, trip and slip hazards for running avatars
//! - A fixed-tick, seeded, deterministic simulation driver

pub mod ai;
pub mod core;
pub mod ecs;
pub mod level;
pub mod movement;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{AgentKind, NavGrid, NavigationService, PursuitState};
    pub use crate::core::{
        Authority, LevelError, SimConfig, SimEvent, SimSnapshot, Simulation, logging,
    };
    pub use crate::ecs::{CollisionCapsule, Transform, Velocity, World};
    pub use crate::level::{AgentSpawn, Bounds, Door, DoorState, Inventory, LevelContext, LevelKind, LootId};
    pub use crate::movement::{AvatarState, HazardKind, MoveInput};
    pub use crate::physics::{ColliderHandle, PhysicsWorld, tags};
    pub use glam::{Quat, Vec2, Vec3};
    pub use hecs::Entity;
}
