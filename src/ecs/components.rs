//! Common ECS components
//!
//! The world is Y-up. Forward is -Z in local space, so a yaw of zero faces
//! down the negative Z axis and "planar" always means the XZ plane.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Drop the vertical component of a vector
#[inline]
#[must_use]
pub fn planar(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Transform component for position and orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world space (feet for capsule bodies)
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
}

impl Transform {
    /// Create a new transform at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform at `position` turned `yaw` radians about +Y
    pub fn from_position_yaw(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw),
        }
    }

    /// Get the forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Get the right direction (positive X in local space)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Express a world-space point in this transform's local frame
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.position)
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Turn to face `direction` on the XZ plane; ignores near-zero input
    pub fn face_planar(&mut self, direction: Vec3) {
        let flat = planar(direction);
        if flat.length_squared() > 1e-6 {
            self.rotation = Quat::from_rotation_y(f32::atan2(-flat.x, -flat.z));
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Velocity component
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// Units per second
    pub linear: Vec3,
}

impl Velocity {
    /// Horizontal speed
    pub fn planar_speed(&self) -> f32 {
        planar(self.linear).length()
    }
}

/// Upright collision capsule, measured from the feet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionCapsule {
    /// Capsule radius
    pub radius: f32,
    /// Total height, feet to crown
    pub height: f32,
}

impl CollisionCapsule {
    /// Create a capsule; height is clamped so the segment never inverts
    pub fn new(radius: f32, height: f32) -> Self {
        Self {
            radius,
            height: height.max(radius * 2.0),
        }
    }

    /// Height of the capsule's middle above the feet
    pub fn half_height(&self) -> f32 {
        self.height * 0.5
    }

    /// Shape in local space with the feet at the origin
    pub fn shape(&self) -> rapier3d::parry::shape::Capsule {
        self.segment_shape(self.radius, self.height - self.radius)
    }

    /// Capsule of the same radius between two heights above the feet
    pub fn segment_shape(&self, bottom: f32, top: f32) -> rapier3d::parry::shape::Capsule {
        rapier3d::parry::shape::Capsule::new(
            rapier3d::na::Point3::new(0.0, bottom, 0.0),
            rapier3d::na::Point3::new(0.0, top, 0.0),
            self.radius,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_follows_yaw() {
        let t = Transform::from_position_yaw(Vec3::ZERO, std::f32::consts::FRAC_PI_2);
        // Quarter turn left about +Y: -Z becomes -X
        assert!((t.forward() - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_to_local_in_front() {
        let t = Transform::from_position_yaw(Vec3::new(10.0, 0.0, 0.0), 0.0);
        let local = t.to_local(Vec3::new(10.0, 0.0, -5.0));
        assert!((local - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn test_face_planar_ignores_vertical() {
        let mut t = Transform::default();
        t.face_planar(Vec3::new(1.0, 5.0, 0.0));
        assert!((t.forward() - Vec3::X).length() < 1e-5);

        let before = t.rotation;
        t.face_planar(Vec3::Y);
        assert_eq!(t.rotation, before);
    }

    #[test]
    fn test_face_planar_backwards_stays_upright() {
        let mut t = Transform::default();
        t.face_planar(Vec3::Z);
        assert!((t.forward() - Vec3::Z).length() < 1e-5);
        assert!((t.right() - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_capsule_shape_spans_height() {
        let capsule = CollisionCapsule::new(16.0, 72.0);
        let shape = capsule.shape();
        assert!((shape.segment.a.y - 16.0).abs() < 1e-5);
        assert!((shape.segment.b.y - 56.0).abs() < 1e-5);
        assert!((shape.radius - 16.0).abs() < 1e-5);
    }
}
