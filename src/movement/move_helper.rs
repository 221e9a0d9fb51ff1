//! Collide-and-slide for capsule movers
//!
//! Sweeps a capsule along its velocity, clipping the velocity against every
//! surface it touches, with an optional step-up pass and a depenetration
//! pass. All geometry comes from [`PhysicsWorld`] shape casts.

use glam::Vec3;
use rapier3d::parry::shape::Capsule;
use smallvec::SmallVec;

use crate::ecs::planar;
use crate::physics::{CAST_SKIN, PhysicsWorld, SweepHit, TraceFilter};

/// Height kept between the feet and the floor while grounded
pub const GROUND_GAP: f32 = 0.25;

/// How far below the feet the ground probe reaches
const GROUND_PROBE: f32 = GROUND_GAP + 2.0;

/// Sweep iterations per move
const MAX_BUMPS: usize = 4;

/// Depenetration iterations per unstuck pass
const MAX_UNSTUCK: usize = 3;

/// Slightly over-clip so the slide leaves the surface instead of grazing it
const OVERBOUNCE: f32 = 1.001;

/// Remove the part of `velocity` heading into a surface with `normal`
#[must_use]
pub fn clip_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    let into = velocity.dot(normal);
    if into >= 0.0 {
        return velocity;
    }
    velocity - normal * into * OVERBOUNCE
}

/// Moves one capsule through the collision world
pub struct MoveHelper<'a> {
    physics: &'a PhysicsWorld,
    shape: Capsule,
    filter: TraceFilter,
    /// Feet position
    pub position: Vec3,
    /// Velocity, clipped by every surface touched
    pub velocity: Vec3,
    /// Steepest surface, in degrees from up, that counts as floor
    pub max_standable_angle: f32,
}

impl<'a> MoveHelper<'a> {
    /// Create a helper for `shape` (local to the feet)
    #[must_use]
    pub fn new(
        physics: &'a PhysicsWorld,
        shape: Capsule,
        filter: TraceFilter,
        position: Vec3,
        velocity: Vec3,
    ) -> Self {
        Self {
            physics,
            shape,
            filter,
            position,
            velocity,
            max_standable_angle: 46.0,
        }
    }

    /// Set the steepest walkable slope
    #[must_use]
    pub fn with_standable_angle(mut self, degrees: f32) -> Self {
        self.max_standable_angle = degrees;
        self
    }

    /// Whether a surface with `normal` can be stood on
    #[must_use]
    pub fn is_standable(&self, normal: Vec3) -> bool {
        normal.angle_between(Vec3::Y).to_degrees() <= self.max_standable_angle
    }

    /// Sweep from the current position, without moving
    #[must_use]
    pub fn trace(&self, motion: Vec3) -> Option<SweepHit> {
        self.physics
            .cast_shape(&self.shape, self.position, motion, &self.filter)
    }

    /// Slide along surfaces for `dt` seconds. Returns the distance travelled.
    pub fn try_move(&mut self, dt: f32) -> f32 {
        let start = self.position;
        let mut remaining = dt;
        let mut planes: SmallVec<[Vec3; MAX_BUMPS]> = SmallVec::new();

        for _ in 0..MAX_BUMPS {
            if remaining <= 0.0 || self.velocity.length_squared() <= f32::EPSILON {
                break;
            }
            let motion = self.velocity * remaining;
            let Some(hit) = self.trace(motion) else {
                self.position += motion;
                break;
            };

            self.position += motion * hit.fraction;
            remaining *= 1.0 - hit.fraction;

            self.velocity = clip_velocity(self.velocity, hit.normal);
            for &plane in &planes {
                if self.velocity.dot(plane) < 0.0 {
                    // Wedged between two surfaces: slide along their crease
                    let crease = hit.normal.cross(plane).normalize_or_zero();
                    self.velocity = crease * self.velocity.dot(crease);
                }
            }
            planes.push(hit.normal);
        }

        self.position.distance(start)
    }

    /// Slide, and also try the same move lifted by `step_size`; keep whichever
    /// gets further across the floor.
    pub fn try_move_with_step(&mut self, dt: f32, step_size: f32) {
        let (start_position, start_velocity) = (self.position, self.velocity);

        self.try_move(dt);
        let (plain_position, plain_velocity) = (self.position, self.velocity);
        if step_size <= 0.0 || planar(start_velocity).length_squared() <= f32::EPSILON {
            return;
        }

        self.position = start_position;
        self.velocity = start_velocity;

        let up = Vec3::Y * step_size;
        let lift = self.trace(up).map_or(1.0, |hit| hit.fraction);
        self.position += up * lift;
        self.try_move(dt);

        let down = Vec3::NEG_Y * (step_size * lift + GROUND_GAP);
        let landed = match self.trace(down) {
            Some(hit) if self.is_standable(hit.normal) => {
                self.position += down * hit.fraction;
                true
            }
            _ => false,
        };

        let stepped = planar(self.position - start_position).length();
        let plain = planar(plain_position - start_position).length();
        if !landed || stepped <= plain + 1e-3 {
            self.position = plain_position;
            self.velocity = plain_velocity;
        } else {
            self.velocity.y = plain_velocity.y;
        }
    }

    /// Push the capsule out of anything it overlaps. Returns `false` if it is
    /// still stuck afterwards.
    pub fn try_unstuck(&mut self) -> bool {
        for _ in 0..MAX_UNSTUCK {
            let Some(push) = self
                .physics
                .penetration(&self.shape, self.position, &self.filter)
            else {
                return true;
            };
            self.position += push + push.normalize_or_zero() * CAST_SKIN;
        }
        self.physics
            .penetration(&self.shape, self.position, &self.filter)
            .is_none()
    }

    /// Probe for standable ground just below the feet
    #[must_use]
    pub fn probe_ground(&self) -> Option<SweepHit> {
        self.trace(Vec3::NEG_Y * GROUND_PROBE)
            .filter(|hit| self.is_standable(hit.normal))
    }

    /// Settle onto the ground found by [`probe_ground`](Self::probe_ground).
    ///
    /// The height comes from the contact itself: the lower sphere rests on
    /// the contact point along its normal, then the feet hover `GROUND_GAP`
    /// above where that leaves them.
    pub fn snap_to_ground(&mut self, hit: &SweepHit) {
        let radius = self.shape.radius;
        self.position.y = hit.point.y + radius * (hit.normal.y - 1.0) + GROUND_GAP;
    }
}
