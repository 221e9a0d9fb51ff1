//! Avatar movement controller
//!
//! Turns input into velocity with discrete acceleration and momentum-scaled
//! deceleration (running avatars skid), then moves the capsule through the
//! collision world with step-up, depenetration and ground snapping.

use glam::Vec3;

use super::{GroundContact, HazardEffect, MotionState, MoveHelper, MoveInput};
use crate::core::AvatarConfig;
use crate::ecs::{CollisionCapsule, planar};
use crate::physics::{ColliderHandle, PhysicsWorld, TraceFilter};

/// Floor on the momentum coefficient so a near-stopped avatar halts at once
const MIN_MOMENTUM: f32 = 1e-2;

/// Result of one controller step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    /// Final feet position
    pub position: Vec3,
    /// Final velocity
    pub velocity: Vec3,
    /// Ground contact after the move
    pub ground: Option<GroundContact>,
}

/// Moves avatars
#[derive(Debug, Clone, Copy)]
pub struct MovementController<'a> {
    /// Avatar tuning
    pub config: &'a AvatarConfig,
    /// Downward acceleration in units/s²
    pub gravity: f32,
}

impl<'a> MovementController<'a> {
    /// Create a controller
    #[must_use]
    pub fn new(config: &'a AvatarConfig, gravity: f32) -> Self {
        Self { config, gravity }
    }

    /// Desired planar velocity for `input` under `effect`
    #[must_use]
    pub fn wish_velocity(&self, input: &MoveInput, effect: HazardEffect) -> Vec3 {
        if effect.control_lockout || input.is_idle() {
            return Vec3::ZERO;
        }
        let speed = if input.run {
            self.config.run_speed
        } else {
            self.config.walk_speed
        };
        input.wish_direction() * speed * effect.speed_multiplier
    }

    /// Apply one tick of acceleration or deceleration to a planar velocity
    #[must_use]
    pub fn accelerate(&self, current: Vec3, wish: Vec3, dt: f32) -> Vec3 {
        let current = planar(current);
        let speed = current.length();
        let wish_speed = wish.length();

        if wish_speed > 0.0 && wish_speed >= speed {
            let delta = wish - current;
            let max_step = self.config.acceleration * dt;
            let next = if delta.length() <= max_step {
                wish
            } else {
                current + delta.normalize_or_zero() * max_step
            };
            return next.clamp_length_max(wish_speed);
        }

        if speed <= f32::EPSILON {
            return Vec3::ZERO;
        }
        let momentum =
            (speed / self.config.walk_speed * self.config.momentum_factor).max(MIN_MOMENTUM);
        let next_speed = (speed - self.config.deceleration / momentum * dt).max(0.0);
        current * (next_speed / speed)
    }

    /// Run one movement step for an avatar.
    ///
    /// `velocity` is the velocity carried over from the last tick. `motion`
    /// is updated with the new ground contact, jump edge and intended velocity.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &self,
        physics: &PhysicsWorld,
        capsule: &CollisionCapsule,
        proxy: Option<ColliderHandle>,
        position: Vec3,
        velocity: Vec3,
        motion: &mut MotionState,
        input: &MoveInput,
        effect: HazardEffect,
        dt: f32,
    ) -> MoveOutcome {
        let wish = self.wish_velocity(input, effect);
        let mut velocity = self.accelerate(velocity, wish, dt) + Vec3::Y * velocity.y;

        let jump_pressed = input.jump && !motion.jump_was_down;
        motion.jump_was_down = input.jump;
        if motion.is_grounded() {
            velocity.y = velocity.y.max(0.0);
            if jump_pressed && !effect.control_lockout {
                velocity.y += self.config.jump_impulse;
                motion.ground = None;
            }
        }
        if !motion.is_grounded() {
            velocity.y -= self.gravity * dt;
        }
        motion.intended_velocity = velocity;

        let mut filter = TraceFilter::movement();
        filter.ignore.extend(proxy);
        let mut helper = MoveHelper::new(physics, capsule.shape(), filter, position, velocity)
            .with_standable_angle(self.config.standable_angle);

        if motion.is_grounded() {
            helper.try_move_with_step(dt, self.config.step_height);
        } else {
            helper.try_move(dt);
        }
        if !helper.try_unstuck() {
            log::warn!("avatar still overlapping geometry at {}", helper.position);
        }

        // Only an upward launch skips the probe; landing clips velocity.y to ~0
        motion.ground = None;
        if velocity.y <= 0.0 {
            if let Some(hit) = helper.probe_ground() {
                helper.snap_to_ground(&hit);
                helper.velocity.y = 0.0;
                motion.ground = Some(GroundContact {
                    collider: Some(hit.collider),
                    normal: hit.normal,
                });
            }
        }

        MoveOutcome {
            position: helper.position,
            velocity: helper.velocity,
            ground: motion.ground,
        }
    }
}
