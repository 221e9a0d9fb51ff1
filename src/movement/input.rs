//! Per-tick avatar input

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Stick deflection below this is treated as no input
const DEADZONE: f32 = 1e-3;

/// What the controlling player wants this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveInput {
    /// Move axes, x = right and y = forward, each within -1..=1
    pub direction: Vec2,
    /// View yaw in radians about +Y
    pub yaw: f32,
    /// Run button held
    pub run: bool,
    /// Jump button held
    pub jump: bool,
}

impl MoveInput {
    /// Input pushing along `direction` while looking at `yaw`
    #[must_use]
    pub fn new(direction: Vec2, yaw: f32) -> Self {
        Self {
            direction,
            yaw,
            ..Default::default()
        }
    }

    /// Hold the run button
    #[must_use]
    pub fn running(mut self) -> Self {
        self.run = true;
        self
    }

    /// Hold the jump button
    #[must_use]
    pub fn jumping(mut self) -> Self {
        self.jump = true;
        self
    }

    /// Whether the move axes are effectively centered
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.direction.length_squared() < DEADZONE * DEADZONE
    }

    /// World-space planar direction of travel, at most unit length
    #[must_use]
    pub fn wish_direction(&self) -> Vec3 {
        if self.is_idle() {
            return Vec3::ZERO;
        }
        let local = Vec3::new(self.direction.x, 0.0, -self.direction.y);
        (Quat::from_rotation_y(self.yaw) * local).clamp_length_max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_follows_yaw() {
        let input = MoveInput::new(Vec2::Y, std::f32::consts::FRAC_PI_2);
        assert!((input.wish_direction() - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_diagonal_is_clamped() {
        let input = MoveInput::new(Vec2::new(1.0, 1.0), 0.0);
        assert!((input.wish_direction().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_deadzone() {
        let input = MoveInput::new(Vec2::new(1e-4, 0.0), 0.0);
        assert!(input.is_idle());
        assert_eq!(input.wish_direction(), Vec3::ZERO);
    }
}
