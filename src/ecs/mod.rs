//! Entity Component System module
//!
//! Built on top of the hecs ECS library

mod components;
mod world;

pub use components::{CollisionCapsule, Transform, Velocity, planar};
pub use world::World;
