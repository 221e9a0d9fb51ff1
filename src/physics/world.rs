//! Collision world using rapier3d
//!
//! Level geometry, door panels and hazard volumes are parentless colliders.
//! Avatars and agents are represented by parentless capsule proxies that the
//! simulation re-positions every tick; they exist so line-of-sight rays can
//! tell bodies from walls. Ejected loot is the only thing rapier integrates.

use glam::{Quat, Vec3};
use hecs::Entity;
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::parry::shape::Capsule;
use rapier3d::prelude::*;
use smallvec::SmallVec;

use super::tags;

/// Convert glam Quat to rapier3d UnitQuaternion
fn quat_to_rapier(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

#[inline]
fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[inline]
fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
fn from_point(p: &Point<Real>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

fn isometry_at(position: Vec3) -> Isometry<Real> {
    Isometry::translation(position.x, position.y, position.z)
}

/// Gap kept between a swept shape and whatever it hits
pub const CAST_SKIN: f32 = 0.05;

/// Collider and (optional) body standing in for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsProxy {
    /// The proxy collider
    pub collider: ColliderHandle,
    /// Rigid body, for simulated proxies such as loot
    pub body: Option<RigidBodyHandle>,
}

/// Which colliders a scene query may report
#[derive(Debug, Clone)]
pub struct TraceFilter {
    /// At least one of these tags must be present (empty = any)
    pub require: Group,
    /// None of these tags may be present
    pub exclude: Group,
    /// Specific colliders to skip
    pub ignore: SmallVec<[ColliderHandle; 2]>,
    /// Whether sensor volumes are reported
    pub include_sensors: bool,
}

impl Default for TraceFilter {
    fn default() -> Self {
        Self {
            require: Group::empty(),
            exclude: Group::empty(),
            ignore: SmallVec::new(),
            include_sensors: false,
        }
    }
}

impl TraceFilter {
    /// Filter for the avatar movement sweep
    #[must_use]
    pub fn movement() -> Self {
        Self {
            exclude: tags::MOVEMENT_IGNORED,
            ..Default::default()
        }
    }

    /// Filter for sight lines: everything solid, bodies included
    #[must_use]
    pub fn sight() -> Self {
        Self {
            exclude: tags::NO_COLLIDE.union(tags::LOOT),
            ..Default::default()
        }
    }

    /// Filter matching only colliders tagged with any of `tags`, sensors included
    #[must_use]
    pub fn only(tags: Group) -> Self {
        Self {
            require: tags,
            include_sensors: true,
            ..Default::default()
        }
    }

    /// Skip a specific collider
    #[must_use]
    pub fn ignoring(mut self, collider: ColliderHandle) -> Self {
        self.ignore.push(collider);
        self
    }

    fn accepts(&self, handle: ColliderHandle, collider: &Collider) -> bool {
        let surface = collider.collision_groups().memberships;
        !self.ignore.contains(&handle)
            && (self.include_sensors || !collider.is_sensor())
            && !surface.intersects(self.exclude)
            && (self.require.is_empty() || surface.intersects(self.require))
    }
}

/// First contact of a swept shape
#[derive(Debug, Clone, Copy)]
pub struct SweepHit {
    /// The collider that was hit
    pub collider: ColliderHandle,
    /// Fraction of the requested motion covered before contact (0..=1)
    pub fraction: f32,
    /// Surface normal at the contact, pointing back toward the swept shape
    pub normal: Vec3,
    /// Contact point on the hit surface
    pub point: Vec3,
    /// Surface tags of the hit collider
    pub tags: Group,
}

/// Result of a raycast
#[derive(Debug, Clone)]
pub struct RaycastHit {
    /// The collider that was hit
    pub collider: ColliderHandle,
    /// The point of intersection
    pub point: Vec3,
    /// Distance from ray origin
    pub distance: f32,
}

/// Collision world manager
pub struct PhysicsWorld {
    /// Gravity vector for simulated loot
    pub gravity: Vec3,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Query pipeline for sweeps and rays
    query_pipeline: QueryPipeline,
    integration_parameters: IntegrationParameters,
}

impl PhysicsWorld {
    /// Create a collision world with downward gravity of `gravity` units/s²
    pub fn new(gravity: f32) -> Self {
        Self::with_gravity(Vec3::new(0.0, -gravity, 0.0))
    }

    /// Create a collision world with a custom gravity vector
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
        }
    }

    /// Advance simulated bodies and refresh the query structure
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        self.pipeline.step(
            &to_vector(self.gravity),
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        self.refresh_queries();
    }

    /// Rebuild the query structure from current collider positions
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    /// Add a static box (walls, floors, furniture)
    pub fn add_static_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        surface: Group,
    ) -> ColliderHandle {
        let isometry = Isometry::from_parts(
            Translation3::new(center.x, center.y, center.z),
            quat_to_rapier(rotation),
        );
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .position(isometry)
            .collision_groups(tags::interaction_groups(surface))
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a non-blocking trigger volume (slippery floor patches)
    pub fn add_volume(&mut self, center: Vec3, half_extents: Vec3, surface: Group) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(to_vector(center))
            .sensor(true)
            .collision_groups(tags::interaction_groups(surface))
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a capsule proxy for an avatar or agent with its feet at `position`
    pub fn add_body_proxy(
        &mut self,
        owner: Entity,
        position: Vec3,
        radius: f32,
        height: f32,
        surface: Group,
    ) -> PhysicsProxy {
        let half_segment = (height * 0.5 - radius).max(0.0);
        let collider = ColliderBuilder::capsule_y(half_segment, radius)
            .translation(to_vector(position + Vec3::Y * height * 0.5))
            .collision_groups(tags::interaction_groups(surface))
            .user_data(u128::from(owner.to_bits().get()))
            .build();
        PhysicsProxy {
            collider: self.collider_set.insert(collider),
            body: None,
        }
    }

    /// Re-position a capsule proxy (feet at `position`)
    pub fn move_body_proxy(&mut self, proxy: PhysicsProxy, position: Vec3, height: f32) {
        if let Some(collider) = self.collider_set.get_mut(proxy.collider) {
            collider.set_translation(to_vector(position + Vec3::Y * height * 0.5));
        }
    }

    /// Spawn a dynamic loot cube launched with `velocity`
    pub fn spawn_loot(
        &mut self,
        owner: Entity,
        position: Vec3,
        half_extent: f32,
        velocity: Vec3,
    ) -> PhysicsProxy {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .linvel(to_vector(velocity))
            .ccd_enabled(true)
            .build();
        let body = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::cuboid(half_extent, half_extent, half_extent)
            .collision_groups(tags::interaction_groups(tags::LOOT))
            .user_data(u128::from(owner.to_bits().get()))
            .build();
        let collider =
            self.collider_set
                .insert_with_parent(collider, body, &mut self.rigid_body_set);
        PhysicsProxy {
            collider,
            body: Some(body),
        }
    }

    /// Add a resting loot cube that is not simulated
    pub fn add_static_loot(&mut self, owner: Entity, position: Vec3, half_extent: f32) -> PhysicsProxy {
        let collider = ColliderBuilder::cuboid(half_extent, half_extent, half_extent)
            .translation(to_vector(position))
            .collision_groups(tags::interaction_groups(tags::LOOT))
            .user_data(u128::from(owner.to_bits().get()))
            .build();
        PhysicsProxy {
            collider: self.collider_set.insert(collider),
            body: None,
        }
    }

    /// Enable or disable a collider (open doors stop blocking)
    pub fn set_collider_enabled(&mut self, handle: ColliderHandle, enabled: bool) {
        if let Some(collider) = self.collider_set.get_mut(handle) {
            collider.set_enabled(enabled);
        }
    }

    /// Whether a collider exists and is enabled
    #[must_use]
    pub fn is_collider_enabled(&self, handle: ColliderHandle) -> bool {
        self.collider_set
            .get(handle)
            .is_some_and(|collider| collider.is_enabled())
    }

    /// Surface tags of a collider
    #[must_use]
    pub fn surface_tags(&self, handle: ColliderHandle) -> Group {
        self.collider_set
            .get(handle)
            .map_or(Group::empty(), |collider| collider.collision_groups().memberships)
    }

    /// Position of a proxy (body translation when simulated)
    #[must_use]
    pub fn proxy_position(&self, proxy: PhysicsProxy) -> Option<Vec3> {
        match proxy.body {
            Some(body) => self
                .rigid_body_set
                .get(body)
                .map(|rb| from_vector(rb.translation())),
            None => self
                .collider_set
                .get(proxy.collider)
                .map(|collider| from_vector(collider.translation())),
        }
    }

    /// Remove a proxy and its body, if any
    pub fn remove_proxy(&mut self, proxy: PhysicsProxy) {
        match proxy.body {
            Some(body) => {
                self.rigid_body_set.remove(
                    body,
                    &mut self.island_manager,
                    &mut self.collider_set,
                    &mut self.impulse_joint_set,
                    &mut self.multibody_joint_set,
                    true,
                );
            }
            None => {
                self.collider_set.remove(
                    proxy.collider,
                    &mut self.island_manager,
                    &mut self.rigid_body_set,
                    false,
                );
            }
        }
    }

    /// Number of colliders in the world
    #[must_use]
    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Sweep `shape` (local to `position`) along `motion`.
    ///
    /// Hits closer than [`CAST_SKIN`] at the start are reported unless the
    /// motion moves away from the surface.
    #[must_use]
    pub fn cast_shape(
        &self,
        shape: &Capsule,
        position: Vec3,
        motion: Vec3,
        filter: &TraceFilter,
    ) -> Option<SweepHit> {
        if motion.length_squared() <= f32::EPSILON {
            return None;
        }

        let predicate = |handle: ColliderHandle, collider: &Collider| filter.accepts(handle, collider);
        let query = QueryFilter::default().predicate(&predicate);
        let options = ShapeCastOptions {
            max_time_of_impact: 1.0,
            target_distance: CAST_SKIN,
            stop_at_penetration: false,
            compute_impact_geometry_on_penetration: true,
        };

        self.query_pipeline
            .cast_shape(
                &self.rigid_body_set,
                &self.collider_set,
                &isometry_at(position),
                &to_vector(motion),
                shape,
                options,
                query,
            )
            .map(|(handle, hit)| SweepHit {
                collider: handle,
                fraction: hit.time_of_impact.clamp(0.0, 1.0),
                normal: from_vector(&hit.normal1),
                point: from_point(&hit.witness1),
                tags: self.surface_tags(handle),
            })
    }

    /// Cast a ray from `origin` toward `target`, stopping at the target
    #[must_use]
    pub fn raycast_between(&self, origin: Vec3, target: Vec3, filter: &TraceFilter) -> Option<RaycastHit> {
        let delta = target - origin;
        let distance = delta.length();
        if distance <= f32::EPSILON {
            return None;
        }
        self.raycast(origin, delta / distance, distance, filter)
    }

    /// Cast a ray and return the first hit
    #[must_use]
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &TraceFilter,
    ) -> Option<RaycastHit> {
        let ray = Ray::new(point![origin.x, origin.y, origin.z], to_vector(direction));
        let predicate = |handle: ColliderHandle, collider: &Collider| filter.accepts(handle, collider);
        let query = QueryFilter::default().predicate(&predicate);

        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                query,
            )
            .map(|(handle, distance)| RaycastHit {
                collider: handle,
                point: from_point(&ray.point_at(distance)),
                distance,
            })
    }

    /// First collider overlapping `shape` placed at `position`
    #[must_use]
    pub fn overlap(&self, shape: &Capsule, position: Vec3, filter: &TraceFilter) -> Option<ColliderHandle> {
        let predicate = |handle: ColliderHandle, collider: &Collider| filter.accepts(handle, collider);
        let query = QueryFilter::default().predicate(&predicate);
        self.query_pipeline.intersection_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &isometry_at(position),
            shape,
            query,
        )
    }

    /// Total push needed to move `shape` out of everything it overlaps
    #[must_use]
    pub fn penetration(&self, shape: &Capsule, position: Vec3, filter: &TraceFilter) -> Option<Vec3> {
        let shape_pos = isometry_at(position);
        let predicate = |handle: ColliderHandle, collider: &Collider| filter.accepts(handle, collider);
        let query = QueryFilter::default().predicate(&predicate);

        let mut overlapping: SmallVec<[ColliderHandle; 4]> = SmallVec::new();
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &shape_pos,
            shape,
            query,
            |handle| {
                overlapping.push(handle);
                true
            },
        );

        let mut push = Vec3::ZERO;
        for handle in overlapping {
            let Some(collider) = self.collider_set.get(handle) else {
                continue;
            };
            let contact = rapier3d::parry::query::contact(
                &shape_pos,
                shape,
                collider.position(),
                collider.shape(),
                0.0,
            );
            if let Ok(Some(contact)) = contact {
                if contact.dist < 0.0 {
                    // normal1 points from our shape toward the obstacle
                    push += from_vector(&contact.normal1) * contact.dist;
                }
            }
        }

        (push.length_squared() > 0.0).then_some(push)
    }
}
