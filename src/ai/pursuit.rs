//! Pursuit state machine
//!
//! Per-agent controller deciding between wandering, chasing and catching.
//!
//! # States
//!
//! - **Idle**: no target. Once the idle timer runs out and no path is being
//!   followed, pick a random walkable cell in the level and go there.
//! - **Tracking**: a remembered avatar is the target. Chase it, re-pathing
//!   whenever it moves to a different cell.
//! - **Catching**: a catch sequence owns the agent; nothing here runs.
//!
//! Path following is orthogonal: a request may be active in Idle (wander or
//! last known position) or Tracking. An agent owns at most one request and a
//! new one replaces the old.

use glam::Vec3;
use hecs::Entity;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{
    AgentProfile, AvatarView, CellHandle, Locomotion, NavigationService, PathResult, Perception,
    follow_path,
};
use crate::core::{EventQueue, PursuitConfig, SimEvent};
use crate::ecs::{Transform, planar};
use crate::level::Bounds;

/// Targets closer together than this are treated as equally near
const TIE_EPSILON: f32 = 1e-3;

/// High-level pursuit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PursuitState {
    /// Wandering or standing still
    Idle,
    /// Chasing the current target
    Tracking,
    /// Holding a caught avatar
    Catching,
}

/// An outstanding navigation request and progress along its path
#[derive(Debug, Clone, PartialEq)]
pub struct NavRequest {
    /// Destination cell
    pub destination: CellHandle,
    /// Path returned by the navigation service
    pub path: PathResult,
    next: usize,
}

impl NavRequest {
    /// Start following `path` toward `destination`.
    ///
    /// The first waypoint is the center of the cell the agent stands in and
    /// may lie behind it, so it is skipped when the path goes anywhere else.
    #[must_use]
    pub fn new(destination: CellHandle, path: PathResult) -> Self {
        let next = usize::from(path.waypoints.len() > 1);
        Self {
            destination,
            path,
            next,
        }
    }

    /// Waypoint currently steered toward
    #[must_use]
    pub fn current_waypoint(&self) -> Option<Vec3> {
        self.path.waypoints.get(self.next).copied()
    }

    /// Move on to the next waypoint
    pub fn advance(&mut self) {
        self.next = (self.next + 1).min(self.path.waypoints.len());
    }

    /// Whether the current waypoint is the destination
    #[must_use]
    pub fn is_last_waypoint(&self) -> bool {
        self.next + 1 == self.path.waypoints.len()
    }

    /// Whether every waypoint has been reached
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.next >= self.path.waypoints.len()
    }
}

/// Teleport in progress (sink, relocate underground, rise)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Teleport {
    /// Seconds since the teleport began
    pub elapsed: f32,
    /// Where the agent stood when it began sinking
    pub origin: Vec3,
    /// Where it will rise
    pub destination: Vec3,
}

impl Teleport {
    /// Advance the teleport, moving `transform`. Returns `true` once risen.
    pub fn advance(
        &mut self,
        transform: &mut Transform,
        dt: f32,
        duration: f32,
        underground: f32,
        depth: f32,
    ) -> bool {
        self.elapsed += dt;
        let half = (duration * 0.5).max(f32::EPSILON);
        let t = self.elapsed;

        if t < half {
            transform.position = self.origin - Vec3::Y * depth * (t / half);
        } else if t < half + underground {
            transform.position = self.destination - Vec3::Y * depth;
        } else if t < duration + underground {
            let rise = (t - half - underground) / half;
            transform.position = self.destination - Vec3::Y * depth * (1.0 - rise);
        } else {
            transform.position = self.destination;
            return true;
        }
        false
    }
}

/// Pursuit component
#[derive(Debug, Clone, PartialEq)]
pub struct Pursuit {
    /// Current state
    pub state: PursuitState,
    /// Avatar being tracked (identity only; checked for liveness each tick)
    pub target: Option<Entity>,
    /// Most recent target, kept after it is lost
    pub last_target: Option<Entity>,
    /// Outstanding navigation request
    pub navigation: Option<NavRequest>,
    /// Seconds until the next wander
    pub idle_timer: f32,
    /// Teleport in progress
    pub teleport: Option<Teleport>,
}

impl Pursuit {
    /// A fresh idle controller that wanders after `idle_timer` seconds
    #[must_use]
    pub fn new(idle_timer: f32) -> Self {
        Self {
            state: PursuitState::Idle,
            target: None,
            last_target: None,
            navigation: None,
            idle_timer,
            teleport: None,
        }
    }

    /// Whether a navigation request is being followed
    #[must_use]
    pub fn is_following_path(&self) -> bool {
        self.navigation.is_some()
    }

    /// Whether a catch sequence owns this agent
    #[must_use]
    pub fn is_catching(&self) -> bool {
        self.state == PursuitState::Catching
    }

    /// Whether the agent is mid-teleport
    #[must_use]
    pub fn is_teleporting(&self) -> bool {
        self.teleport.is_some()
    }

    /// Return to Idle, dropping target and path
    pub fn reset(&mut self) {
        self.state = PursuitState::Idle;
        self.target = None;
        self.navigation = None;
    }
}

/// Shared inputs for one tick of pursuit decisions
pub struct PursuitContext<'a> {
    /// Pursuit tuning
    pub config: &'a PursuitConfig,
    /// Navigation backend
    pub nav: &'a dyn NavigationService,
    /// Wander bounds of the active level
    pub bounds: Bounds,
    /// Simulation random source
    pub rng: &'a mut ChaCha8Rng,
    /// Outgoing events
    pub events: &'a mut EventQueue,
    /// Seconds per tick
    pub dt: f32,
}

impl PursuitContext<'_> {
    /// Fresh random wander cooldown
    pub fn idle_interval(&mut self) -> f32 {
        roll_idle_interval(self.config, &mut *self.rng)
    }
}

/// Random wander cooldown within the configured range
pub fn roll_idle_interval(config: &PursuitConfig, rng: &mut impl Rng) -> f32 {
    let (min, max) = (config.idle_interval_min, config.idle_interval_max);
    if max > min { rng.gen_range(min..=max) } else { min }
}

/// What the caller must do after [`think`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Decision {
    /// Begin catching this avatar
    pub catch: Option<Entity>,
}

/// Pick the nearest remembered avatar.
///
/// Distances within a small epsilon tie; a tie keeps `previous` if it is
/// among the nearest, otherwise the earliest-remembered avatar wins.
#[must_use]
pub fn select_target(
    position: Vec3,
    memory: &Perception,
    avatars: &[AvatarView],
    previous: Option<Entity>,
) -> Option<Entity> {
    let candidates: Vec<(Entity, f32)> = memory
        .entries()
        .iter()
        .filter_map(|entry| {
            avatars
                .iter()
                .find(|view| view.entity == entry.avatar && view.alive)
                .map(|view| (view.entity, position.distance(view.position)))
        })
        .collect();

    let nearest = candidates
        .iter()
        .map(|(_, distance)| *distance)
        .fold(f32::INFINITY, f32::min);
    let mut tied = candidates
        .iter()
        .filter(|(_, distance)| *distance - nearest <= TIE_EPSILON)
        .map(|(entity, _)| *entity);

    match previous {
        Some(previous) if tied.clone().any(|entity| entity == previous) => Some(previous),
        _ => tied.next(),
    }
}

/// Issue a navigation request, superseding any outstanding one.
///
/// Returns `false` (and leaves the old request) when no path exists.
pub fn request_navigation(
    agent: Entity,
    position: Vec3,
    destination: CellHandle,
    pursuit: &mut Pursuit,
    ctx: &mut PursuitContext<'_>,
) -> bool {
    let path = ctx.nav.request_path(position, destination);
    if path.is_empty() {
        log::debug!("agent {agent:?}: no path to {destination:?}");
        return false;
    }
    log::debug!(
        "agent {agent:?}: navigating to {destination:?} ({} waypoints)",
        path.waypoints.len()
    );
    pursuit.navigation = Some(NavRequest::new(destination, path));
    ctx.events.push(SimEvent::NavigationRequested { agent, destination });
    true
}

/// One tick of decision-making for an agent
pub fn think(
    agent: Entity,
    transform: &Transform,
    profile: &AgentProfile,
    perception: &Perception,
    pursuit: &mut Pursuit,
    avatars: &[AvatarView],
    ctx: &mut PursuitContext<'_>,
) -> Decision {
    if pursuit.is_catching() || pursuit.is_teleporting() {
        return Decision::default();
    }

    let previous = pursuit.target;
    let selected = select_target(transform.position, perception, avatars, previous);
    if selected != previous {
        if let Some(target) = selected {
            log::debug!("agent {agent:?}: target acquired {target:?}");
            ctx.events.push(SimEvent::TargetAcquired { agent, target });
        } else if let Some(target) = previous {
            log::debug!("agent {agent:?}: target lost {target:?}");
            ctx.events.push(SimEvent::TargetLost { agent, target });
        }
    }
    pursuit.target = selected;

    let Some(target) = selected else {
        pursuit.state = PursuitState::Idle;
        idle(agent, transform, profile, pursuit, ctx);
        return Decision::default();
    };

    pursuit.last_target = Some(target);
    pursuit.state = PursuitState::Tracking;
    pursuit.idle_timer = ctx.idle_interval();

    let Some(view) = avatars.iter().find(|view| view.entity == target) else {
        return Decision::default();
    };
    if transform.position.distance(view.position) <= ctx.config.catch_radius {
        return Decision {
            catch: Some(target),
        };
    }

    if let Some(cell) = ctx.nav.cell_at(view.position, false) {
        let current = pursuit.navigation.as_ref().map(|request| request.destination);
        if current != Some(cell) {
            request_navigation(agent, transform.position, cell, pursuit, ctx);
        }
    }
    Decision::default()
}

fn idle(
    agent: Entity,
    transform: &Transform,
    profile: &AgentProfile,
    pursuit: &mut Pursuit,
    ctx: &mut PursuitContext<'_>,
) {
    pursuit.idle_timer -= ctx.dt;
    if pursuit.idle_timer > 0.0 || pursuit.is_following_path() {
        return;
    }
    pursuit.idle_timer = ctx.idle_interval();

    let point = ctx.bounds.random_point(&mut *ctx.rng);
    let Some(cell) = ctx.nav.cell_at(point, true) else {
        log::debug!("agent {agent:?}: wander point {point} is not walkable");
        return;
    };
    if !request_navigation(agent, transform.position, cell, pursuit, ctx) {
        return;
    }
    if let Locomotion::Teleport { .. } = profile.locomotion {
        let mut destination = ctx.nav.cell_center(cell);
        destination.y = transform.position.y;
        pursuit.teleport = Some(Teleport {
            elapsed: 0.0,
            origin: transform.position,
            destination,
        });
    }
}

/// Move an agent for one tick according to its pursuit state.
///
/// Returns the planar velocity used.
pub fn locomote(
    transform: &mut Transform,
    profile: &AgentProfile,
    pursuit: &mut Pursuit,
    config: &PursuitConfig,
    dt: f32,
) -> Vec3 {
    if pursuit.is_catching() {
        return Vec3::ZERO;
    }

    if let Some(teleport) = pursuit.teleport.as_mut() {
        let (duration, underground) = match profile.locomotion {
            Locomotion::Teleport {
                duration,
                underground,
            } => (duration, underground),
            Locomotion::Walk => (0.0, 0.0),
        };
        if teleport.advance(transform, dt, duration, underground, profile.height) {
            pursuit.teleport = None;
            pursuit.navigation = None;
        }
        return Vec3::ZERO;
    }

    let speed = match pursuit.state {
        PursuitState::Tracking => profile.run_speed,
        _ => profile.walk_speed,
    };
    let Some(request) = pursuit.navigation.as_mut() else {
        return Vec3::ZERO;
    };
    let velocity = follow_path(transform, request, speed, config.waypoint_tolerance, dt);
    if request.is_finished() {
        pursuit.navigation = None;
    }
    velocity
}

/// Whether a door at `door_position` is within an agent's forward probe
#[must_use]
pub fn door_in_probe(transform: &Transform, door_position: Vec3, probe_distance: f32) -> bool {
    let offset = planar(door_position - transform.position);
    offset.length() <= probe_distance && offset.dot(transform.forward()) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::NavGrid;
    use glam::Vec2;
    use rand::SeedableRng;

    struct Fixture {
        world: hecs::World,
        config: PursuitConfig,
        grid: NavGrid,
        rng: ChaCha8Rng,
        events: EventQueue,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: hecs::World::new(),
                config: PursuitConfig::default(),
                grid: NavGrid::new(32, 32, 32.0).with_origin(Vec2::new(-512.0, -512.0)),
                rng: ChaCha8Rng::seed_from_u64(1),
                events: EventQueue::new(),
            }
        }

        fn ctx(&mut self) -> PursuitContext<'_> {
            PursuitContext {
                config: &self.config,
                nav: &self.grid,
                bounds: Bounds::new(Vec3::new(-500.0, 0.0, -500.0), Vec3::new(500.0, 0.0, 500.0)),
                rng: &mut self.rng,
                events: &mut self.events,
                dt: 1.0 / 60.0,
            }
        }

        fn avatar(&mut self, position: Vec3) -> AvatarView {
            AvatarView {
                entity: self.world.spawn(()),
                position,
                eye: position + Vec3::Y * 64.0,
                alive: true,
                collider: None,
            }
        }
    }

    #[test]
    fn test_select_nearest() {
        let mut fx = Fixture::new();
        let far = fx.avatar(Vec3::new(300.0, 0.0, 0.0));
        let near = fx.avatar(Vec3::new(0.0, 0.0, 100.0));
        let mut memory = Perception::default();
        memory.observe(far.entity);
        memory.observe(near.entity);

        let target = select_target(Vec3::ZERO, &memory, &[far, near], None);
        assert_eq!(target, Some(near.entity));
    }

    #[test]
    fn test_tie_keeps_previous_target() {
        let mut fx = Fixture::new();
        let a = fx.avatar(Vec3::new(100.0, 0.0, 0.0));
        let b = fx.avatar(Vec3::new(-100.0, 0.0, 0.0));
        let mut memory = Perception::default();
        memory.observe(a.entity);
        memory.observe(b.entity);

        assert_eq!(select_target(Vec3::ZERO, &memory, &[a, b], None), Some(a.entity));
        assert_eq!(
            select_target(Vec3::ZERO, &memory, &[a, b], Some(b.entity)),
            Some(b.entity)
        );
        // Deterministic for identical inputs
        for _ in 0..10 {
            assert_eq!(select_target(Vec3::ZERO, &memory, &[a, b], None), Some(a.entity));
        }
    }

    #[test]
    fn test_idle_expiry_issues_one_request() {
        let mut fx = Fixture::new();
        let agent = fx.world.spawn(());
        let transform = Transform::default();
        let profile = AgentProfile::stalker();
        let memory = Perception::default();
        let mut pursuit = Pursuit::new(0.0);

        let mut ctx = fx.ctx();
        let decision = think(agent, &transform, &profile, &memory, &mut pursuit, &[], &mut ctx);

        assert_eq!(decision, Decision::default());
        assert!(pursuit.is_following_path());
        assert!((3.0..=6.0).contains(&pursuit.idle_timer));
        let requests = fx
            .events
            .pending()
            .filter(|event| matches!(event, SimEvent::NavigationRequested { .. }))
            .count();
        assert_eq!(requests, 1);
    }

    #[test]
    fn test_idle_waits_while_navigating() {
        let mut fx = Fixture::new();
        let agent = fx.world.spawn(());
        let transform = Transform::default();
        let profile = AgentProfile::stalker();
        let memory = Perception::default();
        let mut pursuit = Pursuit::new(0.0);

        let mut ctx = fx.ctx();
        think(agent, &transform, &profile, &memory, &mut pursuit, &[], &mut ctx);
        pursuit.idle_timer = 0.0;
        think(agent, &transform, &profile, &memory, &mut pursuit, &[], &mut ctx);
        assert_eq!(fx.events.pending_count(), 1);
    }

    #[test]
    fn test_unwalkable_wander_resets_timer() {
        let mut fx = Fixture::new();
        for z in 0..32 {
            for x in 0..32 {
                fx.grid.set_walkable(x, z, false);
            }
        }
        let agent = fx.world.spawn(());
        let transform = Transform::default();
        let profile = AgentProfile::stalker();
        let memory = Perception::default();
        let mut pursuit = Pursuit::new(0.0);

        let mut ctx = fx.ctx();
        think(agent, &transform, &profile, &memory, &mut pursuit, &[], &mut ctx);
        assert!(!pursuit.is_following_path());
        assert!(pursuit.idle_timer >= 3.0);
        assert_eq!(fx.events.pending_count(), 0);
    }

    #[test]
    fn test_catch_within_radius() {
        let mut fx = Fixture::new();
        let agent = fx.world.spawn(());
        let avatar = fx.avatar(Vec3::new(0.0, 0.0, -30.0));
        let transform = Transform::default();
        let profile = AgentProfile::stalker();
        let mut memory = Perception::default();
        memory.observe(avatar.entity);
        let mut pursuit = Pursuit::new(5.0);

        let mut ctx = fx.ctx();
        let decision = think(agent, &transform, &profile, &memory, &mut pursuit, &[avatar], &mut ctx);
        assert_eq!(decision.catch, Some(avatar.entity));
        assert_eq!(pursuit.state, PursuitState::Tracking);
        assert_eq!(pursuit.last_target, Some(avatar.entity));
    }

    #[test]
    fn test_tracking_repaths_on_cell_change() {
        let mut fx = Fixture::new();
        let agent = fx.world.spawn(());
        let mut avatar = fx.avatar(Vec3::new(200.0, 0.0, 0.0));
        let transform = Transform::default();
        let profile = AgentProfile::stalker();
        let mut memory = Perception::default();
        memory.observe(avatar.entity);
        let mut pursuit = Pursuit::new(5.0);

        let mut ctx = fx.ctx();
        think(agent, &transform, &profile, &memory, &mut pursuit, &[avatar], &mut ctx);
        let first = pursuit.navigation.as_ref().unwrap().destination;

        // Same cell: no new request
        avatar.position.x += 2.0;
        think(agent, &transform, &profile, &memory, &mut pursuit, &[avatar], &mut ctx);
        // Next cell over: superseded
        avatar.position.x += 64.0;
        think(agent, &transform, &profile, &memory, &mut pursuit, &[avatar], &mut ctx);

        let second = pursuit.navigation.as_ref().unwrap().destination;
        assert_ne!(first, second);
        let requests = fx
            .events
            .pending()
            .filter(|event| matches!(event, SimEvent::NavigationRequested { .. }))
            .count();
        assert_eq!(requests, 2);
    }

    #[test]
    fn test_first_step_heads_toward_target() {
        let mut fx = Fixture::new();
        let agent = fx.world.spawn(());
        let avatar = fx.avatar(Vec3::new(200.0, 0.0, -500.0));
        // Corner of a cell: its center lies behind the agent
        let mut transform = Transform::default();
        let profile = AgentProfile::stalker();
        let mut memory = Perception::default();
        memory.observe(avatar.entity);
        let mut pursuit = Pursuit::new(5.0);
        let config = fx.config.clone();

        let mut ctx = fx.ctx();
        think(agent, &transform, &profile, &memory, &mut pursuit, &[avatar], &mut ctx);
        assert!(pursuit.is_following_path());

        let to_target = planar(avatar.position - transform.position).normalize();
        let velocity = locomote(&mut transform, &profile, &mut pursuit, &config, 1.0 / 60.0);
        assert!(velocity.normalize().dot(to_target) > 0.0);
        assert!(transform.forward().dot(to_target) > 0.0);
        assert!(transform.position.z < 0.0 || transform.position.x > 0.0);
    }

    #[test]
    fn test_single_cell_path_keeps_its_waypoint() {
        let waypoint = Vec3::new(16.0, 0.0, 16.0);
        let request = NavRequest::new(
            CellHandle { x: 0, z: 0 },
            PathResult {
                length: 0.0,
                waypoints: vec![waypoint],
            },
        );
        assert_eq!(request.current_waypoint(), Some(waypoint));
        assert!(request.is_last_waypoint());
    }

    #[test]
    fn test_target_refreshes_idle_timer_and_loss_keeps_history() {
        let mut fx = Fixture::new();
        let agent = fx.world.spawn(());
        let avatar = fx.avatar(Vec3::new(300.0, 0.0, 0.0));
        let transform = Transform::default();
        let profile = AgentProfile::stalker();
        let mut memory = Perception::default();
        memory.observe(avatar.entity);
        let mut pursuit = Pursuit::new(0.5);

        let mut ctx = fx.ctx();
        think(agent, &transform, &profile, &memory, &mut pursuit, &[avatar], &mut ctx);
        assert!(pursuit.idle_timer >= 3.0);

        memory.clear();
        think(agent, &transform, &profile, &memory, &mut pursuit, &[avatar], &mut ctx);
        assert_eq!(pursuit.target, None);
        assert_eq!(pursuit.state, PursuitState::Idle);
        assert_eq!(pursuit.last_target, Some(avatar.entity));
        assert!(
            fx.events
                .pending()
                .any(|event| matches!(event, SimEvent::TargetLost { .. }))
        );
    }

    #[test]
    fn test_specter_teleports_to_wander_cell() {
        let mut fx = Fixture::new();
        let agent = fx.world.spawn(());
        let mut transform = Transform::default();
        let profile = AgentProfile::specter();
        let memory = Perception::default();
        let mut pursuit = Pursuit::new(0.0);
        let config = fx.config.clone();

        let mut ctx = fx.ctx();
        think(agent, &transform, &profile, &memory, &mut pursuit, &[], &mut ctx);
        let destination = pursuit.teleport.expect("teleport started").destination;

        let dt = 1.0 / 60.0;
        let mut lowest = 0.0f32;
        for _ in 0..(60 * 5) {
            locomote(&mut transform, &profile, &mut pursuit, &config, dt);
            lowest = lowest.min(transform.position.y);
            if !pursuit.is_teleporting() {
                break;
            }
        }
        assert!(!pursuit.is_teleporting());
        assert!(!pursuit.is_following_path());
        assert!(transform.position.distance(destination) < 1e-3);
        assert!(lowest <= -profile.height + 1e-3);
    }

    #[test]
    fn test_door_probe_is_forward_only() {
        let transform = Transform::default();
        assert!(door_in_probe(&transform, Vec3::new(0.0, 0.0, -50.0), 60.0));
        assert!(!door_in_probe(&transform, Vec3::new(0.0, 0.0, 50.0), 60.0));
        assert!(!door_in_probe(&transform, Vec3::new(0.0, 0.0, -80.0), 60.0));
    }
}
