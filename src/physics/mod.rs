//! Collision world module
//!
//! Built on top of rapier3d

pub mod tags;
mod world;

pub use rapier3d::prelude::{ColliderHandle, Group, RigidBodyHandle};
pub use world::{CAST_SKIN, PhysicsProxy, PhysicsWorld, RaycastHit, SweepHit, TraceFilter};
