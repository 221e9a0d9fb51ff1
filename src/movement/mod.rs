//! Avatar movement and hazards
//!
//! The controller integrates input into a capsule moving through the
//! collision world; the hazard detector then looks at where the avatar went
//! and what it was trying to do.

mod avatar;
mod controller;
mod hazard;
mod input;
mod move_helper;

pub use avatar::{AvatarState, GroundContact, MotionState};
pub use controller::{MoveOutcome, MovementController};
pub use hazard::{ActiveHazard, HazardDetector, HazardEffect, HazardKind, HazardReport, HazardState};
pub use input::MoveInput;
pub use move_helper::{GROUND_GAP, MoveHelper, clip_velocity};
