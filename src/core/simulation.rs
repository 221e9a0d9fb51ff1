//! Simulation driver
//!
//! Owns every piece of simulation state and runs the fixed tick:
//!
//! 1. swap events, advance the clock
//! 2. sync capsule proxies, step loot dynamics
//! 3. resume due tasks (catch sequences, door auto-close)
//! 4. advance door swings
//! 5. perception for every agent
//! 6. pursuit decisions, catches, agent locomotion, door opening
//! 7. avatar movement
//! 8. hazard decay and detection
//!
//! Stages run for every agent/avatar in storage order, so a tick is a pure
//! function of the previous state, the inputs and the seeded random source.

use std::time::Instant;

use glam::{Quat, Vec3};
use hecs::Entity;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::snapshot::{AgentRecord, AvatarRecord, DoorRecord, SimSnapshot};
use super::stats::TickStats;
use crate::ai::{
    Agent, AgentKind, AvatarView, NavigationService, Observer, Perception, Pursuit, PursuitContext,
    begin_catch, door_in_probe, locomote, roll_idle_interval, scan, think,
};
use crate::core::{
    Authority, ConfigError, EventQueue, LevelError, Scheduler, SimClock, SimConfig, SimEvent,
    TaskContext,
};
use crate::ecs::{CollisionCapsule, Transform, Velocity, World};
use crate::level::{
    Door, DoorAutoClose, Inventory, LevelContext, LootId, eject_item, place_loot, settled_event,
    sync_loot,
};
use crate::movement::{
    AvatarState, HazardDetector, HazardState, MotionState, MoveInput, MovementController,
};
use crate::physics::{ColliderHandle, PhysicsProxy, PhysicsWorld, tags};

/// Simulated seconds between tick-cost log lines
const STATS_LOG_SECONDS: u64 = 10;

/// The pursuit and hazard simulation
pub struct Simulation {
    config: SimConfig,
    world: World,
    physics: PhysicsWorld,
    nav: Box<dyn NavigationService>,
    level: Option<LevelContext>,
    scheduler: Scheduler,
    clock: SimClock,
    rng: ChaCha8Rng,
    events: EventQueue,
    stats: TickStats,
}

impl Simulation {
    /// Create a simulation with an empty collision world.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation
    pub fn new(config: SimConfig, nav: Box<dyn NavigationService>) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "simulation created: {} Hz, seed {:#x}, {:?} authority",
            config.tick_rate,
            config.seed,
            config.authority
        );
        Ok(Self {
            physics: PhysicsWorld::new(config.gravity),
            clock: SimClock::new(config.tick_rate),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            world: World::new(),
            nav,
            level: None,
            scheduler: Scheduler::new(),
            events: EventQueue::new(),
            stats: TickStats::default(),
            config,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Entity storage
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable entity storage
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Collision world
    #[must_use]
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Mutable collision world, for building level geometry
    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    /// Events written during the previous tick
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// The running level, if any
    #[must_use]
    pub fn level(&self) -> Option<&LevelContext> {
        self.level.as_ref()
    }

    /// Simulation clock
    #[must_use]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Wall-clock tick cost
    #[must_use]
    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Number of deferred tasks still waiting
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    // ========================================================================
    // Level lifecycle
    // ========================================================================

    /// Make `level` the running level and spawn its agents.
    ///
    /// Every spawn entry is checked against the navigation service first; if
    /// any has no walkable cell nothing is spawned.
    ///
    /// # Errors
    ///
    /// Returns an error if a level is already running or a spawn entry has no
    /// walkable navigation cell
    pub fn activate_level(&mut self, level: LevelContext) -> Result<(), LevelError> {
        if let Some(active) = &self.level {
            log::error!(
                "cannot activate {:?}: {:?} is still running",
                level.kind,
                active.kind
            );
            return Err(LevelError::AlreadyActive);
        }

        for (index, spawn) in level.agent_spawns.iter().enumerate() {
            if self.nav.cell_at(spawn.position, true).is_none() {
                let err = LevelError::MissingSpawnCell {
                    index,
                    position: spawn.position,
                };
                log::error!("level {:?} activation aborted: {err}", level.kind);
                return Err(err);
            }
        }

        let kind = level.kind;
        let spawns: Vec<_> = level
            .agent_spawns
            .iter()
            .map(|spawn| (level.agent_kind(spawn), spawn.position, spawn.yaw))
            .collect();
        self.level = Some(level);
        for (agent_kind, position, yaw) in spawns {
            self.spawn_agent(agent_kind, position, yaw)?;
        }

        log::info!("level {kind:?} activated");
        self.events.push(SimEvent::LevelActivated { kind });
        Ok(())
    }

    /// End the running level, despawning every agent.
    ///
    /// # Errors
    ///
    /// Returns an error if no level is running
    pub fn end_level(&mut self) -> Result<LevelContext, LevelError> {
        let level = self.level.take().ok_or(LevelError::NoActiveLevel)?;
        for agent in self.world.entities_with::<Agent>() {
            self.despawn_agent(agent);
        }
        log::info!("level {:?} ended", level.kind);
        self.events.push(SimEvent::LevelEnded { kind: level.kind });
        Ok(level)
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Spawn an avatar standing at `position`
    pub fn spawn_avatar(&mut self, position: Vec3) -> Entity {
        let config = &self.config.avatar;
        let capsule = CollisionCapsule::new(config.radius, config.height);
        let entity = self.world.reserve();
        let proxy =
            self.physics
                .add_body_proxy(entity, position, capsule.radius, capsule.height, tags::AVATAR);
        self.world.spawn_at(
            entity,
            (
                Transform::from_position(position),
                Velocity::default(),
                capsule,
                AvatarState::default(),
                MotionState::default(),
                HazardState::default(),
                MoveInput::default(),
                Inventory::new(),
                proxy,
            ),
        );
        log::debug!("avatar {entity:?} spawned at {position}");
        entity
    }

    /// Remove an avatar. Returns `false` if it did not exist.
    pub fn despawn_avatar(&mut self, avatar: Entity) -> bool {
        if !self.world.has::<AvatarState>(avatar) {
            return false;
        }
        self.remove_entity(avatar);
        log::debug!("avatar {avatar:?} despawned");
        true
    }

    /// Spawn an agent into the running level.
    ///
    /// # Errors
    ///
    /// Returns an error if no level is running
    pub fn spawn_agent(
        &mut self,
        kind: AgentKind,
        position: Vec3,
        yaw: f32,
    ) -> Result<Entity, LevelError> {
        if self.level.is_none() {
            return Err(LevelError::NoActiveLevel);
        }

        let profile = self.config.agents.get(kind).clone();
        let capsule = CollisionCapsule::new(profile.radius, profile.height);
        let idle_timer = roll_idle_interval(&self.config.pursuit, &mut self.rng);
        let entity = self.world.reserve();
        let proxy =
            self.physics
                .add_body_proxy(entity, position, capsule.radius, capsule.height, tags::AGENT);
        self.world.spawn_at(
            entity,
            (
                Agent { kind, profile },
                Transform::from_position_yaw(position, yaw),
                capsule,
                Perception::default(),
                Pursuit::new(idle_timer),
                proxy,
            ),
        );

        log::info!("agent {entity:?} ({kind:?}) spawned at {position}");
        self.events.push(SimEvent::AgentSpawned {
            agent: entity,
            kind,
        });
        Ok(entity)
    }

    /// Remove an agent, releasing any avatar it holds. Returns `false` if it
    /// did not exist.
    pub fn despawn_agent(&mut self, agent: Entity) -> bool {
        if !self.world.has::<Agent>(agent) {
            return false;
        }
        for (_, state) in self.world.query_mut::<&mut AvatarState>() {
            if state.being_caught == Some(agent) {
                state.being_caught = None;
                state.movement_locked = false;
                state.camera_target = None;
            }
        }
        self.remove_entity(agent);

        log::info!("agent {agent:?} despawned");
        self.events.push(SimEvent::AgentDespawned { agent });
        true
    }

    /// Add a door. `panel` is the collider that blocks while the door is not
    /// fully open.
    pub fn spawn_door(&mut self, position: Vec3, panel: Option<ColliderHandle>) -> Entity {
        let door = Door::new(self.config.pursuit.door_transition_time);
        let transform = Transform::from_position(position);
        match panel {
            Some(collider) => self.world.spawn((
                door,
                transform,
                PhysicsProxy {
                    collider,
                    body: None,
                },
            )),
            None => self.world.spawn((door, transform)),
        }
    }

    /// Open a door from outside the simulation (an avatar using it)
    pub fn open_door(&mut self, door: Entity) -> bool {
        let opened = self
            .world
            .get_mut::<Door>(door)
            .is_ok_and(|mut door| door.open());
        if opened {
            self.events.push(SimEvent::DoorOpened { door, by: None });
        }
        opened
    }

    /// Place a resting loot pickup
    pub fn place_loot(&mut self, item: LootId, position: Vec3) -> Entity {
        place_loot(&mut self.world, &mut self.physics, item, position)
    }

    /// Set the input an avatar moves with from the next tick on
    pub fn set_input(&mut self, avatar: Entity, input: MoveInput) -> bool {
        match self.world.get_mut::<MoveInput>(avatar) {
            Ok(mut current) => {
                *current = input;
                true
            }
            Err(_) => false,
        }
    }

    fn remove_entity(&mut self, entity: Entity) {
        if let Some(proxy) = self.world.get_copied::<PhysicsProxy>(entity) {
            self.physics.remove_proxy(proxy);
        }
        let _ = self.world.despawn(entity);
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Run one fixed tick
    pub fn tick(&mut self) {
        let started = Instant::now();
        self.events.swap();
        self.clock.advance();
        let dt = self.clock.dt();

        self.sync_physics(dt);

        let mut ctx = TaskContext {
            world: &mut self.world,
            events: &mut self.events,
        };
        self.scheduler.run_due(&self.clock, &mut ctx);

        self.tick_doors(dt);

        let avatars = self.avatar_views();
        self.tick_perception(&avatars, dt);
        self.tick_pursuit(&avatars, dt);
        self.tick_movement(dt);
        self.tick_hazards(dt);

        self.stats.record(started.elapsed());
        if self.clock.tick() % (u64::from(self.config.tick_rate) * STATS_LOG_SECONDS) == 0 {
            log::debug!("{}", self.stats.format_stats());
        }
    }

    fn sync_physics(&mut self, dt: f32) {
        for (_, (transform, capsule, proxy)) in
            self.world
                .query_mut::<(&Transform, &CollisionCapsule, &PhysicsProxy)>()
        {
            if proxy.body.is_none() {
                self.physics
                    .move_body_proxy(*proxy, transform.position, capsule.height);
            }
        }
        self.physics.step(dt);
        sync_loot(&mut self.world, &self.physics);
    }

    fn tick_doors(&mut self, dt: f32) {
        let mut changed = false;
        for (entity, (door, proxy)) in self.world.query_mut::<(&mut Door, Option<&PhysicsProxy>)>() {
            if let Some(state) = door.advance(dt) {
                log::debug!("door {entity:?} {state:?}");
                if let Some(event) = settled_event(entity, state) {
                    self.events.push(event);
                }
            }
            if let Some(proxy) = proxy {
                let blocks = door.blocks();
                if self.physics.is_collider_enabled(proxy.collider) != blocks {
                    self.physics.set_collider_enabled(proxy.collider, blocks);
                    changed = true;
                }
            }
        }
        if changed {
            self.physics.refresh_queries();
        }
    }

    fn avatar_views(&self) -> Vec<AvatarView> {
        let eye_height = self.config.avatar.eye_height;
        self.world
            .query::<(&Transform, &AvatarState, Option<&PhysicsProxy>)>()
            .iter()
            .map(|(entity, (transform, state, proxy))| AvatarView {
                entity,
                position: transform.position,
                eye: transform.position + Vec3::Y * eye_height,
                alive: state.alive,
                collider: proxy.map(|proxy| proxy.collider),
            })
            .collect()
    }

    fn tick_perception(&mut self, avatars: &[AvatarView], dt: f32) {
        for (agent, (data, transform, perception, pursuit, proxy)) in self.world.query_mut::<(
            &Agent,
            &Transform,
            &mut Perception,
            &Pursuit,
            Option<&PhysicsProxy>,
        )>() {
            let observer = Observer {
                transform,
                profile: &data.profile,
                target: pursuit.target,
                collider: proxy.map(|proxy| proxy.collider),
            };
            for avatar in scan(perception, &observer, avatars, &self.physics, dt) {
                log::debug!("agent {agent:?} spotted avatar {avatar:?}");
                self.events.push(SimEvent::AvatarSpotted { agent, avatar });
            }
        }
    }

    fn tick_pursuit(&mut self, avatars: &[AvatarView], dt: f32) {
        let Some(bounds) = self.level.as_ref().map(|level| level.bounds) else {
            return;
        };

        for agent in self.world.entities_with::<Agent>() {
            let decision = {
                let Ok((data, transform, perception, pursuit)) = self
                    .world
                    .query_one_mut::<(&Agent, &Transform, &Perception, &mut Pursuit)>(agent)
                else {
                    continue;
                };
                let mut ctx = PursuitContext {
                    config: &self.config.pursuit,
                    nav: self.nav.as_ref(),
                    bounds,
                    rng: &mut self.rng,
                    events: &mut self.events,
                    dt,
                };
                think(
                    agent,
                    transform,
                    &data.profile,
                    perception,
                    pursuit,
                    avatars,
                    &mut ctx,
                )
            };

            if let Some(avatar) = decision.catch {
                begin_catch(
                    &mut self.world,
                    &mut self.scheduler,
                    &self.clock,
                    &mut self.events,
                    &self.config.pursuit,
                    agent,
                    avatar,
                );
            }

            let probe_from = {
                let Ok((data, transform, pursuit)) = self
                    .world
                    .query_one_mut::<(&Agent, &mut Transform, &mut Pursuit)>(agent)
                else {
                    continue;
                };
                locomote(transform, &data.profile, pursuit, &self.config.pursuit, dt);
                pursuit.is_following_path().then_some(*transform)
            };
            if let Some(transform) = probe_from {
                self.open_doors_ahead(agent, &transform);
            }
        }
    }

    fn open_doors_ahead(&mut self, agent: Entity, transform: &Transform) {
        let pursuit = &self.config.pursuit;
        for (door_entity, (door, door_transform)) in
            self.world.query_mut::<(&mut Door, &Transform)>()
        {
            if !door.is_closed_or_closing()
                || !door_in_probe(transform, door_transform.position, pursuit.door_probe_distance)
                || !door.open()
            {
                continue;
            }
            log::debug!("agent {agent:?} opened door {door_entity:?}");
            self.events.push(SimEvent::DoorOpened {
                door: door_entity,
                by: Some(agent),
            });
            self.scheduler.schedule(
                &self.clock,
                pursuit.door_close_delay,
                DoorAutoClose {
                    door: door_entity,
                    generation: door.generation,
                },
            );
        }
    }

    fn tick_movement(&mut self, dt: f32) {
        let controller = MovementController::new(&self.config.avatar, self.config.gravity);
        for (_, (state, transform, velocity, capsule, motion, hazard, input, proxy)) in
            self.world.query_mut::<(
                &AvatarState,
                &mut Transform,
                &mut Velocity,
                &CollisionCapsule,
                &mut MotionState,
                &HazardState,
                &MoveInput,
                Option<&PhysicsProxy>,
            )>()
        {
            if !state.can_move() {
                velocity.linear = Vec3::ZERO;
                motion.intended_velocity = Vec3::ZERO;
                continue;
            }

            let outcome = controller.step(
                &self.physics,
                capsule,
                proxy.map(|proxy| proxy.collider),
                transform.position,
                velocity.linear,
                motion,
                input,
                hazard.effect(&self.config.hazards),
                dt,
            );
            transform.position = outcome.position;
            transform.rotation = Quat::from_rotation_y(input.yaw);
            velocity.linear = outcome.velocity;
        }
    }

    fn tick_hazards(&mut self, dt: f32) {
        let detector = HazardDetector {
            physics: &self.physics,
            avatar: &self.config.avatar,
            hazards: &self.config.hazards,
            surfaces: self
                .level
                .as_ref()
                .map(|level| level.surfaces)
                .unwrap_or_default(),
            can_eject: self.config.authority == Authority::Server,
            dt,
        };

        let mut ejections = Vec::new();
        for (avatar, (state, transform, velocity, capsule, motion, hazard, proxy)) in
            self.world.query_mut::<(
                &AvatarState,
                &Transform,
                &mut Velocity,
                &CollisionCapsule,
                &MotionState,
                &mut HazardState,
                Option<&PhysicsProxy>,
            )>()
        {
            if let Some(kind) = hazard.tick(dt) {
                log::debug!("avatar {avatar:?} recovered from {kind:?}");
                self.events.push(SimEvent::HazardExpired { avatar, kind });
            }
            if !state.can_move() {
                continue;
            }

            let report = detector.detect(
                hazard,
                capsule,
                transform.position,
                motion.intended_velocity,
                proxy.map(|proxy| proxy.collider),
                &mut self.rng,
            );
            if let Some((kind, duration)) = report.entered {
                log::debug!("avatar {avatar:?} {kind:?} for {duration:.2}s");
                velocity.linear += report.impulse;
                self.events.push(SimEvent::HazardEntered {
                    avatar,
                    kind,
                    duration,
                });
            }
            if report.eject_item {
                ejections.push((avatar, transform.position + Vec3::Y * capsule.height * 0.5));
            }
        }

        for (avatar, origin) in ejections {
            self.eject_from(avatar, origin);
        }
    }

    fn eject_from(&mut self, avatar: Entity, origin: Vec3) {
        let mut inventory = match self.world.get_mut::<Inventory>(avatar) {
            Ok(mut inventory) => std::mem::take(&mut *inventory),
            Err(_) => return,
        };
        let ejected = eject_item(
            &mut self.world,
            &mut self.physics,
            &mut inventory,
            &mut self.rng,
            origin,
            self.config.avatar.eject_speed,
        );
        if let Ok(mut slot) = self.world.get_mut::<Inventory>(avatar) {
            *slot = inventory;
        }

        match ejected {
            Some((loot, item)) => {
                log::debug!("avatar {avatar:?} dropped {item:?}");
                self.events.push(SimEvent::ItemEjected {
                    avatar,
                    loot,
                    item,
                    position: origin,
                });
            }
            None => log::warn!("avatar {avatar:?} had nothing to drop"),
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Copy the replicated state out as plain values
    #[must_use]
    pub fn snapshot(&self) -> SimSnapshot {
        let id = |entity: Entity| entity.to_bits().get();

        let agents = self
            .world
            .query::<(&Agent, &Transform, &Pursuit, &Perception)>()
            .iter()
            .map(|(entity, (data, transform, pursuit, perception))| AgentRecord {
                id: id(entity),
                kind: data.kind,
                position: transform.position,
                forward: transform.forward(),
                state: pursuit.state,
                target: pursuit.target.map(id),
                navigating: pursuit.is_following_path(),
                teleporting: pursuit.is_teleporting(),
                remembered: perception.len(),
            })
            .collect();

        let avatars = self
            .world
            .query::<(
                &Transform,
                &Velocity,
                &AvatarState,
                &HazardState,
                &MotionState,
                &Inventory,
            )>()
            .iter()
            .map(
                |(entity, (transform, velocity, state, hazard, motion, inventory))| AvatarRecord {
                    id: id(entity),
                    position: transform.position,
                    velocity: velocity.linear,
                    alive: state.alive,
                    movement_locked: state.movement_locked,
                    being_caught: state.being_caught.map(id),
                    hazard: hazard.active(),
                    grounded: motion.is_grounded(),
                    items: inventory.len(),
                },
            )
            .collect();

        let doors = self
            .world
            .query::<&Door>()
            .iter()
            .map(|(entity, door)| DoorRecord {
                id: id(entity),
                state: door.state,
            })
            .collect();

        SimSnapshot {
            tick: self.clock.tick(),
            level: self.level.as_ref().map(|level| level.kind),
            agents,
            avatars,
            doors,
        }
    }
}
