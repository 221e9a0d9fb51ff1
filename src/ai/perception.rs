//! Agent perception
//!
//! Each agent keeps a short memory of avatars it has seen. An entry's
//! freshness counts seconds since the avatar was last visible: zero on any
//! tick it is seen, evicted once it exceeds the agent's memory window.
//!
//! Visibility is tested cheapest first: range, then view cone, then a
//! line-of-sight ray between eye points.

use glam::Vec3;
use hecs::Entity;
use smallvec::SmallVec;

use super::{AgentProfile, VisionCone};
use crate::ecs::Transform;
use crate::physics::{ColliderHandle, PhysicsWorld, TraceFilter};

/// One remembered avatar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryEntry {
    /// The remembered avatar
    pub avatar: Entity,
    /// Seconds since it was last visible
    pub freshness: f32,
}

/// Perception memory component
#[derive(Debug, Clone, Default)]
pub struct Perception {
    entries: SmallVec<[MemoryEntry; 4]>,
}

impl Perception {
    /// Remembered avatars in first-sighting order
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Freshness of an avatar, if remembered
    #[must_use]
    pub fn freshness(&self, avatar: Entity) -> Option<f32> {
        self.entries
            .iter()
            .find(|entry| entry.avatar == avatar)
            .map(|entry| entry.freshness)
    }

    /// Whether an avatar is remembered
    #[must_use]
    pub fn remembers(&self, avatar: Entity) -> bool {
        self.freshness(avatar).is_some()
    }

    /// Whether memory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of remembered avatars
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Mark an avatar as seen this tick. Returns `true` for a new entry.
    pub fn observe(&mut self, avatar: Entity) -> bool {
        match self.entries.iter_mut().find(|entry| entry.avatar == avatar) {
            Some(entry) => {
                entry.freshness = 0.0;
                false
            }
            None => {
                self.entries.push(MemoryEntry {
                    avatar,
                    freshness: 0.0,
                });
                true
            }
        }
    }
}

/// What perception needs to know about an avatar this tick
#[derive(Debug, Clone, Copy)]
pub struct AvatarView {
    /// The avatar
    pub entity: Entity,
    /// Feet position
    pub position: Vec3,
    /// Eye position
    pub eye: Vec3,
    /// Whether it can still be perceived
    pub alive: bool,
    /// Its collision proxy, skipped by sight rays
    pub collider: Option<ColliderHandle>,
}

/// The perceiving agent
#[derive(Debug, Clone, Copy)]
pub struct Observer<'a> {
    /// Agent pose
    pub transform: &'a Transform,
    /// Agent tuning
    pub profile: &'a AgentProfile,
    /// Currently selected target
    pub target: Option<Entity>,
    /// The agent's own collision proxy
    pub collider: Option<ColliderHandle>,
}

impl Observer<'_> {
    /// Eye point in world space
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.transform.position + Vec3::Y * self.profile.eye_height
    }

    /// Whether `avatar` lies within the vision cone, before line of sight
    #[must_use]
    pub fn in_cone(&self, avatar: &AvatarView, cone: VisionCone) -> bool {
        if self.transform.position.distance(avatar.position) > cone.range {
            return false;
        }
        let local = self.transform.to_local(avatar.position);
        if local.length_squared() <= f32::EPSILON {
            return true;
        }
        Vec3::NEG_Z.angle_between(local).to_degrees() <= cone.angle * 0.5
    }

    /// Full visibility test including line of sight
    #[must_use]
    pub fn can_see(&self, avatar: &AvatarView, physics: &PhysicsWorld) -> bool {
        let cone = self.profile.vision_for(self.target == Some(avatar.entity));
        if !self.in_cone(avatar, cone) {
            return false;
        }

        let mut filter = TraceFilter::sight();
        filter.ignore.extend(self.collider);
        filter.ignore.extend(avatar.collider);
        physics
            .raycast_between(self.eye(), avatar.eye, &filter)
            .is_none()
    }
}

/// Update one agent's memory against every avatar.
///
/// Returns avatars that entered memory this tick.
pub fn scan(
    perception: &mut Perception,
    observer: &Observer<'_>,
    avatars: &[AvatarView],
    physics: &PhysicsWorld,
    dt: f32,
) -> SmallVec<[Entity; 2]> {
    perception.entries.retain(|entry| {
        avatars
            .iter()
            .any(|avatar| avatar.entity == entry.avatar && avatar.alive)
    });
    for entry in &mut perception.entries {
        entry.freshness += dt;
    }

    let mut spotted = SmallVec::new();
    for avatar in avatars.iter().filter(|avatar| avatar.alive) {
        if observer.can_see(avatar, physics) && perception.observe(avatar.entity) {
            spotted.push(avatar.entity);
        }
    }

    let window = observer.profile.memory_window;
    perception.entries.retain(|entry| entry.freshness <= window);
    spotted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::tags;
    use glam::Quat;

    fn avatar_at(world: &mut hecs::World, position: Vec3) -> AvatarView {
        AvatarView {
            entity: world.spawn(()),
            position,
            eye: position + Vec3::Y * 64.0,
            alive: true,
            collider: None,
        }
    }

    fn open_world() -> PhysicsWorld {
        let mut physics = PhysicsWorld::new(800.0);
        physics.refresh_queries();
        physics
    }

    #[test]
    fn test_range_threshold() {
        let mut world = hecs::World::new();
        let physics = open_world();
        let profile = AgentProfile::stalker();
        let transform = Transform::default();
        let observer = Observer {
            transform: &transform,
            profile: &profile,
            target: None,
            collider: None,
        };

        let far = avatar_at(&mut world, Vec3::new(0.0, 0.0, -2000.0));
        let near = avatar_at(&mut world, Vec3::new(0.0, 0.0, -500.0));
        let mut perception = Perception::default();
        let spotted = scan(&mut perception, &observer, &[far, near], &physics, 1.0 / 60.0);

        assert_eq!(spotted.as_slice(), &[near.entity]);
        assert!(!perception.remembers(far.entity));
        assert_eq!(perception.freshness(near.entity), Some(0.0));
    }

    #[test]
    fn test_cone_angle_baseline_and_alert() {
        let mut world = hecs::World::new();
        let profile = AgentProfile::stalker();
        let transform = Transform::default();
        // 80° off forward: outside 120° baseline, inside 180° alert
        let angle = 80f32.to_radians();
        let side = avatar_at(&mut world, Vec3::new(angle.sin(), 0.0, -angle.cos()) * 300.0);

        let mut observer = Observer {
            transform: &transform,
            profile: &profile,
            target: None,
            collider: None,
        };
        assert!(!observer.in_cone(&side, profile.vision_for(false)));

        observer.target = Some(side.entity);
        assert!(observer.in_cone(&side, profile.vision_for(true)));

        let behind = avatar_at(&mut world, Vec3::new(0.0, 0.0, 300.0));
        assert!(!observer.in_cone(&behind, profile.vision_for(true)));
    }

    #[test]
    fn test_wall_blocks_sight() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(800.0);
        physics.add_static_box(
            Vec3::new(0.0, 50.0, -200.0),
            Vec3::new(100.0, 50.0, 5.0),
            Quat::IDENTITY,
            tags::SOLID,
        );
        physics.refresh_queries();

        let profile = AgentProfile::stalker();
        let transform = Transform::default();
        let observer = Observer {
            transform: &transform,
            profile: &profile,
            target: None,
            collider: None,
        };
        let hidden = avatar_at(&mut world, Vec3::new(0.0, 0.0, -400.0));
        assert!(!observer.can_see(&hidden, &physics));
    }

    #[test]
    fn test_own_proxies_do_not_block_sight() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(800.0);
        let agent = world.spawn(());
        let agent_proxy = physics.add_body_proxy(agent, Vec3::ZERO, 8.0, 72.0, tags::AGENT);
        let mut avatar = avatar_at(&mut world, Vec3::new(0.0, 0.0, -300.0));
        let avatar_proxy =
            physics.add_body_proxy(avatar.entity, avatar.position, 16.0, 72.0, tags::AVATAR);
        avatar.collider = Some(avatar_proxy.collider);
        physics.refresh_queries();

        let profile = AgentProfile::stalker();
        let transform = Transform::default();
        let observer = Observer {
            transform: &transform,
            profile: &profile,
            target: None,
            collider: Some(agent_proxy.collider),
        };
        assert!(observer.can_see(&avatar, &physics));
    }

    #[test]
    fn test_memory_decays_and_evicts() {
        let mut world = hecs::World::new();
        let physics = open_world();
        let profile = AgentProfile::stalker();
        let transform = Transform::default();
        let observer = Observer {
            transform: &transform,
            profile: &profile,
            target: None,
            collider: None,
        };
        let dt = 0.25;
        let mut avatar = avatar_at(&mut world, Vec3::new(0.0, 0.0, -100.0));
        let mut perception = Perception::default();
        scan(&mut perception, &observer, &[avatar], &physics, dt);
        assert_eq!(perception.freshness(avatar.entity), Some(0.0));

        // Step behind the agent
        avatar.position = Vec3::new(0.0, 0.0, 100.0);
        avatar.eye = avatar.position + Vec3::Y * 64.0;
        for tick in 1..=8 {
            scan(&mut perception, &observer, &[avatar], &physics, dt);
            let expected = tick as f32 * dt;
            assert_eq!(perception.freshness(avatar.entity), Some(expected));
        }
        // 2.25s > 2.0s window
        scan(&mut perception, &observer, &[avatar], &physics, dt);
        assert!(perception.is_empty());
    }

    #[test]
    fn test_dead_avatar_pruned() {
        let mut world = hecs::World::new();
        let physics = open_world();
        let profile = AgentProfile::stalker();
        let transform = Transform::default();
        let observer = Observer {
            transform: &transform,
            profile: &profile,
            target: None,
            collider: None,
        };
        let mut avatar = avatar_at(&mut world, Vec3::new(0.0, 0.0, -100.0));
        let mut perception = Perception::default();
        scan(&mut perception, &observer, &[avatar], &physics, 0.1);
        assert_eq!(perception.len(), 1);

        avatar.alive = false;
        scan(&mut perception, &observer, &[avatar], &physics, 0.1);
        assert!(perception.is_empty());

        // Despawned entirely
        let mut perception = Perception::default();
        perception.observe(avatar.entity);
        scan(&mut perception, &observer, &[], &physics, 0.1);
        assert!(perception.is_empty());
    }
}
