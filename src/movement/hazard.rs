//! Movement hazards: stun, trip and slip
//!
//! Detection runs after the avatar has moved. Each detector sweeps a capsule
//! ahead along the velocity the avatar *wanted* this tick (before collision
//! response ate it), starting from where it ended up. Only one hazard can be
//! active; the rest are ignored until it expires.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{AvatarConfig, HazardConfig, HazardTuning};
use crate::ecs::{CollisionCapsule, planar};
use crate::level::HazardSurfaces;
use crate::physics::{ColliderHandle, Group, PhysicsWorld, TraceFilter};

/// Kinds of movement hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    /// Ran into a wall too fast
    Stunned,
    /// Ran over loose loot
    Tripping,
    /// Ran over a slippery surface
    Slipping,
}

/// A hazard in effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveHazard {
    /// Which hazard
    pub kind: HazardKind,
    /// Seconds left
    pub remaining: f32,
}

/// What the active hazard does to movement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardEffect {
    /// Multiplier on desired speed
    pub speed_multiplier: f32,
    /// Input and jumping ignored
    pub control_lockout: bool,
}

impl Default for HazardEffect {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            control_lockout: false,
        }
    }
}

impl From<&HazardTuning> for HazardEffect {
    fn from(tuning: &HazardTuning) -> Self {
        Self {
            speed_multiplier: tuning.speed_multiplier,
            control_lockout: tuning.control_lockout,
        }
    }
}

/// Hazard component of an avatar
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HazardState {
    active: Option<ActiveHazard>,
}

impl HazardState {
    /// The hazard in effect, if any
    #[must_use]
    pub fn active(&self) -> Option<ActiveHazard> {
        self.active
    }

    /// Kind of the hazard in effect, if any
    #[must_use]
    pub fn kind(&self) -> Option<HazardKind> {
        self.active.map(|hazard| hazard.kind)
    }

    /// Whether `kind` is in effect
    #[must_use]
    pub fn is(&self, kind: HazardKind) -> bool {
        self.kind() == Some(kind)
    }

    /// Whether any hazard is in effect
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Enter a hazard. Fails while another one is active.
    pub fn try_enter(&mut self, kind: HazardKind, duration: f32) -> bool {
        if self.active.is_some() || duration <= 0.0 {
            return false;
        }
        self.active = Some(ActiveHazard {
            kind,
            remaining: duration,
        });
        true
    }

    /// Count down. Returns the kind that expired this tick.
    pub fn tick(&mut self, dt: f32) -> Option<HazardKind> {
        let hazard = self.active.as_mut()?;
        hazard.remaining -= dt;
        if hazard.remaining > 0.0 {
            return None;
        }
        let kind = hazard.kind;
        self.active = None;
        Some(kind)
    }

    /// Movement effect of the active hazard
    #[must_use]
    pub fn effect(&self, config: &HazardConfig) -> HazardEffect {
        self.kind()
            .map_or_else(HazardEffect::default, |kind| config.tuning(kind).into())
    }
}

/// Linear remap of `value` from `from..to` onto `0..1`, unclamped
fn remap(value: f32, from: f32, to: f32) -> f32 {
    if (to - from).abs() <= f32::EPSILON {
        return 1.0;
    }
    (value - from) / (to - from)
}

/// What the detector found for one avatar this tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HazardReport {
    /// Hazard entered and its duration
    pub entered: Option<(HazardKind, f32)>,
    /// Velocity to add (stun bounce)
    pub impulse: Vec3,
    /// Knock an item out of the inventory
    pub eject_item: bool,
}

/// Shared inputs for hazard detection
pub struct HazardDetector<'a> {
    /// Collision world
    pub physics: &'a PhysicsWorld,
    /// Avatar tuning
    pub avatar: &'a AvatarConfig,
    /// Hazard tuning
    pub hazards: &'a HazardConfig,
    /// Which surfaces trip and slip
    pub surfaces: HazardSurfaces,
    /// Whether item ejection may happen here
    pub can_eject: bool,
    /// Seconds per tick
    pub dt: f32,
}

impl HazardDetector<'_> {
    /// Run stun, trip and slip detection in that order and enter the first
    /// that triggers.
    pub fn detect(
        &self,
        hazard: &mut HazardState,
        capsule: &CollisionCapsule,
        position: Vec3,
        intended_velocity: Vec3,
        proxy: Option<ColliderHandle>,
        rng: &mut impl Rng,
    ) -> HazardReport {
        let mut report = HazardReport::default();
        let velocity = planar(intended_velocity);
        let speed = velocity.length();
        if hazard.is_active() || speed <= self.avatar.walk_speed {
            return report;
        }

        let motion = velocity * self.dt;
        if let Some((duration, normal)) = self.probe_stun(capsule, position, velocity, proxy) {
            if hazard.try_enter(HazardKind::Stunned, duration) {
                report.entered = Some((HazardKind::Stunned, duration));
                report.impulse = normal * (self.avatar.radius + self.avatar.stun_bounce);
                report.eject_item =
                    self.can_eject && rng.gen_bool(f64::from(self.avatar.drop_chance.clamp(0.0, 1.0)));
            }
            return report;
        }

        for (kind, surface) in [
            (HazardKind::Tripping, self.surfaces.trip),
            (HazardKind::Slipping, self.surfaces.slip),
        ] {
            if self.probe_surface(capsule, position, motion, surface, proxy) {
                let duration = self.hazards.tuning(kind).duration;
                if hazard.try_enter(kind, duration) {
                    report.entered = Some((kind, duration));
                }
                return report;
            }
        }
        report
    }

    /// Raised sweep ahead. Returns the stun duration and the wall normal.
    fn probe_stun(
        &self,
        capsule: &CollisionCapsule,
        position: Vec3,
        velocity: Vec3,
        proxy: Option<ColliderHandle>,
    ) -> Option<(f32, Vec3)> {
        let shape = capsule.segment_shape(
            capsule.radius + self.avatar.step_height,
            capsule.height - capsule.radius,
        );
        let mut filter = TraceFilter::movement();
        filter.ignore.extend(proxy);
        let hit = self
            .physics
            .cast_shape(&shape, position, velocity * self.dt, &filter)?;

        let normal = planar(hit.normal).try_normalize()?;
        let speed = velocity.length();
        let into_wall = velocity.normalize_or_zero().dot(normal).abs() * speed;
        if into_wall <= self.avatar.walk_speed {
            return None;
        }

        let scale = remap(into_wall, self.avatar.walk_speed, self.avatar.run_speed).clamp(0.0, 1.0);
        Some((self.hazards.stun.duration * scale, normal))
    }

    /// Lowered sweep (plus overlap at the end) against `surface`
    fn probe_surface(
        &self,
        capsule: &CollisionCapsule,
        position: Vec3,
        motion: Vec3,
        surface: Group,
        proxy: Option<ColliderHandle>,
    ) -> bool {
        if surface.is_empty() {
            return false;
        }
        let top = (self.avatar.step_height - capsule.radius).max(capsule.radius);
        let shape = capsule.segment_shape(capsule.radius, top);
        let mut filter = TraceFilter::only(surface);
        filter.ignore.extend(proxy);

        self.physics
            .cast_shape(&shape, position, motion, &filter)
            .is_some()
            || self
                .physics
                .overlap(&shape, position + motion, &filter)
                .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::tags;
    use glam::Quat;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> PhysicsWorld {
        let mut physics = PhysicsWorld::new(800.0);
        physics.add_static_box(
            Vec3::new(0.0, -8.0, 0.0),
            Vec3::new(1000.0, 8.0, 1000.0),
            Quat::IDENTITY,
            tags::SOLID,
        );
        // Wall face at x = 100
        physics.add_static_box(
            Vec3::new(110.0, 100.0, 0.0),
            Vec3::new(10.0, 100.0, 500.0),
            Quat::IDENTITY,
            tags::SOLID,
        );
        // Loot lying at x = -100
        let mut scratch = hecs::World::new();
        physics.add_static_loot(scratch.spawn(()), Vec3::new(-100.0, 4.0, 0.0), 4.0);
        // Slippery patch around z = 200
        physics.add_volume(Vec3::new(0.0, 0.5, 200.0), Vec3::new(50.0, 0.5, 50.0), tags::SLIP);
        physics.refresh_queries();
        physics
    }

    fn detector<'a>(
        physics: &'a PhysicsWorld,
        avatar: &'a AvatarConfig,
        hazards: &'a HazardConfig,
    ) -> HazardDetector<'a> {
        HazardDetector {
            physics,
            avatar,
            hazards,
            surfaces: HazardSurfaces::default(),
            can_eject: true,
            dt: DT,
        }
    }

    #[test]
    fn test_state_single_hazard_and_decay() {
        let mut state = HazardState::default();
        assert!(state.try_enter(HazardKind::Slipping, 0.5));
        assert!(!state.try_enter(HazardKind::Stunned, 2.0));
        assert!(state.is(HazardKind::Slipping));

        assert_eq!(state.tick(0.3), None);
        assert_eq!(state.tick(0.3), Some(HazardKind::Slipping));
        assert!(!state.is_active());
        assert!(state.try_enter(HazardKind::Stunned, 2.0));
    }

    #[test]
    fn test_effect_follows_tuning() {
        let config = HazardConfig::default();
        let mut state = HazardState::default();
        assert_eq!(state.effect(&config), HazardEffect::default());

        state.try_enter(HazardKind::Slipping, 1.0);
        let effect = state.effect(&config);
        assert!(!effect.control_lockout);
        assert!((effect.speed_multiplier - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_head_on_wall_stuns_with_scaled_duration() {
        let physics = world();
        let avatar = AvatarConfig::default();
        let hazards = HazardConfig::default();
        let capsule = CollisionCapsule::new(avatar.radius, avatar.height);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut state = HazardState::default();

        // Resting against the wall after collision response
        let position = Vec3::new(83.95, 0.25, 0.0);
        let velocity = Vec3::new(1.5 * avatar.walk_speed, 0.0, 0.0);
        let report = detector(&physics, &avatar, &hazards).detect(
            &mut state,
            &capsule,
            position,
            velocity,
            None,
            &mut rng,
        );

        let (kind, duration) = report.entered.expect("stunned");
        assert_eq!(kind, HazardKind::Stunned);
        // remap(300, 200, 350) = 2/3
        assert!((duration - hazards.stun.duration * 2.0 / 3.0).abs() < 1e-3);
        assert!(report.impulse.x < 0.0);
        assert!(state.is(HazardKind::Stunned));
    }

    #[test]
    fn test_glancing_hit_does_not_stun() {
        let physics = world();
        let avatar = AvatarConfig::default();
        let hazards = HazardConfig::default();
        let capsule = CollisionCapsule::new(avatar.radius, avatar.height);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut state = HazardState::default();

        let velocity = Vec3::new(100.0, 0.0, 320.0);
        let report = detector(&physics, &avatar, &hazards).detect(
            &mut state,
            &capsule,
            Vec3::new(83.95, 0.25, 0.0),
            velocity,
            None,
            &mut rng,
        );
        assert_eq!(report.entered, None);
        assert!(!state.is_active());
    }

    #[test]
    fn test_walking_never_triggers() {
        let physics = world();
        let avatar = AvatarConfig::default();
        let hazards = HazardConfig::default();
        let capsule = CollisionCapsule::new(avatar.radius, avatar.height);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut state = HazardState::default();

        let report = detector(&physics, &avatar, &hazards).detect(
            &mut state,
            &capsule,
            Vec3::new(83.95, 0.25, 0.0),
            Vec3::new(avatar.walk_speed, 0.0, 0.0),
            None,
            &mut rng,
        );
        assert_eq!(report, HazardReport::default());
    }

    #[test]
    fn test_running_over_loot_trips() {
        let physics = world();
        let avatar = AvatarConfig::default();
        let hazards = HazardConfig::default();
        let capsule = CollisionCapsule::new(avatar.radius, avatar.height);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut state = HazardState::default();

        let report = detector(&physics, &avatar, &hazards).detect(
            &mut state,
            &capsule,
            Vec3::new(-80.0, 0.25, 0.0),
            Vec3::new(-avatar.run_speed, 0.0, 0.0),
            None,
            &mut rng,
        );
        assert_eq!(report.entered, Some((HazardKind::Tripping, hazards.trip.duration)));
        assert_eq!(report.impulse, Vec3::ZERO);
    }

    #[test]
    fn test_running_on_slip_patch_slips_once() {
        let physics = world();
        let avatar = AvatarConfig::default();
        let hazards = HazardConfig::default();
        let capsule = CollisionCapsule::new(avatar.radius, avatar.height);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut state = HazardState::default();
        let detector = detector(&physics, &avatar, &hazards);

        let position = Vec3::new(0.0, 0.25, 200.0);
        let velocity = Vec3::new(0.0, 0.0, avatar.run_speed);
        let first = detector.detect(&mut state, &capsule, position, velocity, None, &mut rng);
        assert_eq!(first.entered.map(|(kind, _)| kind), Some(HazardKind::Slipping));

        let second = detector.detect(&mut state, &capsule, position, velocity, None, &mut rng);
        assert_eq!(second.entered, None);
    }

    #[test]
    fn test_client_never_ejects() {
        let physics = world();
        let mut avatar = AvatarConfig::default();
        avatar.drop_chance = 1.0;
        let hazards = HazardConfig::default();
        let capsule = CollisionCapsule::new(avatar.radius, avatar.height);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut server = detector(&physics, &avatar, &hazards);
        let mut state = HazardState::default();
        let report = server.detect(
            &mut state,
            &capsule,
            Vec3::new(83.95, 0.25, 0.0),
            Vec3::new(avatar.run_speed, 0.0, 0.0),
            None,
            &mut rng,
        );
        assert!(report.eject_item);

        server.can_eject = false;
        let mut state = HazardState::default();
        let report = server.detect(
            &mut state,
            &capsule,
            Vec3::new(83.95, 0.25, 0.0),
            Vec3::new(avatar.run_speed, 0.0, 0.0),
            None,
            &mut rng,
        );
        assert!(!report.eject_item);
        assert!(report.entered.is_some());
    }
}
