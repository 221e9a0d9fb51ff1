//! Steering behaviors for agent locomotion
//!
//! Agents are kinematic: a behavior yields the velocity the agent should
//! move at this tick, and path following integrates it directly.

use glam::Vec3;

use super::NavRequest;
use crate::ecs::{Transform, planar};

/// Output from a steering behavior
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringOutput {
    /// Desired planar velocity
    pub linear: Vec3,
}

impl SteeringOutput {
    /// Zero steering
    pub const ZERO: Self = Self { linear: Vec3::ZERO };
}

/// Trait for steering behaviors
pub trait SteeringBehavior {
    /// Calculate steering for an agent at `position`
    fn calculate(&self, position: Vec3) -> SteeringOutput;
}

/// Seek behavior - move towards target at full speed
#[derive(Debug, Clone)]
pub struct Seek {
    /// Target position
    pub target: Vec3,
    /// Travel speed
    pub max_speed: f32,
}

impl Seek {
    /// Create a new seek behavior
    #[must_use]
    pub fn new(target: Vec3, max_speed: f32) -> Self {
        Self { target, max_speed }
    }
}

impl SteeringBehavior for Seek {
    fn calculate(&self, position: Vec3) -> SteeringOutput {
        SteeringOutput {
            linear: planar(self.target - position).normalize_or_zero() * self.max_speed,
        }
    }
}

/// Arrive behavior - move towards target and slow down
#[derive(Debug, Clone)]
pub struct Arrive {
    /// Target position
    pub target: Vec3,
    /// Maximum speed
    pub max_speed: f32,
    /// Slowing distance
    pub slow_radius: f32,
    /// Stopping distance
    pub target_radius: f32,
}

impl Arrive {
    /// Create a new arrive behavior
    #[must_use]
    pub fn new(target: Vec3, max_speed: f32) -> Self {
        Self {
            target,
            max_speed,
            slow_radius: 48.0,
            target_radius: 1.0,
        }
    }
}

impl SteeringBehavior for Arrive {
    fn calculate(&self, position: Vec3) -> SteeringOutput {
        let to_target = planar(self.target - position);
        let distance = to_target.length();

        if distance < self.target_radius {
            return SteeringOutput::ZERO;
        }

        let target_speed = if distance > self.slow_radius {
            self.max_speed
        } else {
            self.max_speed * distance / self.slow_radius
        };

        SteeringOutput {
            linear: to_target.normalize_or_zero() * target_speed,
        }
    }
}

/// Move along a navigation request for one tick.
///
/// Seeks intermediate waypoints, arrives at the last one, and skips any
/// waypoint within `tolerance`. Returns the velocity used.
pub fn follow_path(
    transform: &mut Transform,
    request: &mut NavRequest,
    speed: f32,
    tolerance: f32,
    dt: f32,
) -> Vec3 {
    let waypoint = loop {
        let Some(waypoint) = request.current_waypoint() else {
            return Vec3::ZERO;
        };
        if planar(waypoint - transform.position).length() > tolerance {
            break waypoint;
        }
        request.advance();
    };

    let steering = if request.is_last_waypoint() {
        Arrive::new(waypoint, speed).calculate(transform.position)
    } else {
        Seek::new(waypoint, speed).calculate(transform.position)
    };

    let remaining = planar(waypoint - transform.position);
    let mut step = steering.linear * dt;
    if step.length() > remaining.length() {
        step = remaining;
    }
    transform.translate(step);
    transform.face_planar(steering.linear);
    steering.linear
}
