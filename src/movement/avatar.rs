//! Avatar-side state components

use glam::Vec3;
use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::physics::ColliderHandle;

/// Life and control flags of an avatar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarState {
    /// Cleared when a catch sequence kills the avatar
    pub alive: bool,
    /// Movement and hazard evaluation suppressed
    pub movement_locked: bool,
    /// Agent currently holding this avatar
    pub being_caught: Option<Entity>,
    /// Entity the avatar's camera should look at
    pub camera_target: Option<Entity>,
}

impl Default for AvatarState {
    fn default() -> Self {
        Self {
            alive: true,
            movement_locked: false,
            being_caught: None,
            camera_target: None,
        }
    }
}

impl AvatarState {
    /// Whether the controller may move this avatar
    #[must_use]
    pub fn can_move(&self) -> bool {
        self.alive && !self.movement_locked
    }
}

/// Surface the avatar is standing on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundContact {
    /// Supporting collider, re-resolved every tick
    #[serde(skip)]
    pub collider: Option<ColliderHandle>,
    /// Surface normal
    pub normal: Vec3,
}

/// Controller memory carried between ticks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionState {
    /// Ground contact after the last move
    pub ground: Option<GroundContact>,
    /// Jump button state last tick, for edge detection
    pub jump_was_down: bool,
    /// Velocity before collision response on the last move
    pub intended_velocity: Vec3,
}

impl MotionState {
    /// Whether the avatar is standing on something
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.ground.is_some()
    }
}
