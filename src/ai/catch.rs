//! Catch sequence
//!
//! A catch locks the avatar in front of the agent, waits out the kill delay,
//! kills, waits out the animation, then lets go. The hold is released on
//! every exit path, including either entity disappearing mid-sequence.

use glam::Vec3;
use hecs::Entity;

use super::{Pursuit, PursuitState};
use crate::core::{
    EventQueue, PursuitConfig, Scheduler, SimClock, SimEvent, Task, TaskContext, TaskStep,
};
use crate::ecs::{Transform, Velocity, World, planar};
use crate::movement::AvatarState;

/// Try to start catching `avatar`.
///
/// Silently returns `false` if the avatar is dead, already being caught, or
/// either entity is missing.
#[allow(clippy::too_many_arguments)]
pub fn begin_catch(
    world: &mut World,
    scheduler: &mut Scheduler,
    clock: &SimClock,
    events: &mut EventQueue,
    config: &PursuitConfig,
    agent: Entity,
    avatar: Entity,
) -> bool {
    let Some(agent_transform) = world.get_copied::<Transform>(agent) else {
        return false;
    };

    let approach = {
        let Ok((state, transform, velocity)) =
            world.query_one_mut::<(&mut AvatarState, &mut Transform, &mut Velocity)>(avatar)
        else {
            return false;
        };
        if !state.alive || state.being_caught.is_some() {
            return false;
        }
        state.being_caught = Some(agent);
        state.movement_locked = true;
        state.camera_target = Some(agent);

        let approach = planar(transform.position - agent_transform.position)
            .try_normalize()
            .unwrap_or_else(|| agent_transform.forward());
        let snapped = agent_transform.position + approach * config.catch_offset;
        transform.position = Vec3::new(snapped.x, transform.position.y, snapped.z);
        transform.face_planar(-approach);
        velocity.linear = Vec3::ZERO;
        approach
    };

    if let Ok((pursuit, transform)) = world.query_one_mut::<(&mut Pursuit, &mut Transform)>(agent) {
        pursuit.state = PursuitState::Catching;
        pursuit.target = Some(avatar);
        pursuit.navigation = None;
        transform.face_planar(approach);
    }

    log::info!("agent {agent:?} caught avatar {avatar:?}");
    events.push(SimEvent::CatchStarted { agent, avatar });
    scheduler.schedule(
        clock,
        config.kill_delay,
        CatchSequence {
            agent,
            avatar,
            phase: CatchPhase::Kill,
            animation_delay: config.animation_delay,
        },
    );
    true
}

/// Where a catch sequence is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchPhase {
    /// Waiting to apply the lethal effect
    Kill,
    /// Waiting for the kill animation before releasing
    Release,
}

/// Deferred part of a catch
#[derive(Debug)]
pub struct CatchSequence {
    /// Catching agent
    pub agent: Entity,
    /// Caught avatar
    pub avatar: Entity,
    /// Current phase
    pub phase: CatchPhase,
    /// Seconds between kill and release
    pub animation_delay: f32,
}

impl CatchSequence {
    fn release_avatar(&self, world: &mut World) {
        if let Ok(mut state) = world.get_mut::<AvatarState>(self.avatar) {
            if state.being_caught == Some(self.agent) {
                state.being_caught = None;
                state.movement_locked = false;
                state.camera_target = None;
            }
        }
    }

    fn release_agent(&self, world: &mut World) {
        if let Ok(mut pursuit) = world.get_mut::<Pursuit>(self.agent) {
            if pursuit.is_catching() {
                pursuit.reset();
            }
        }
    }

    fn finish(&self, ctx: &mut TaskContext<'_>) -> TaskStep {
        self.release_avatar(ctx.world);
        self.release_agent(ctx.world);
        ctx.events.push(SimEvent::CatchFinished {
            agent: self.agent,
            avatar: self.avatar,
        });
        log::info!("agent {:?} released avatar {:?}", self.agent, self.avatar);
        TaskStep::Done
    }
}

impl Task for CatchSequence {
    fn name(&self) -> &'static str {
        "catch_sequence"
    }

    fn resume(&mut self, ctx: &mut TaskContext<'_>) -> TaskStep {
        match self.phase {
            CatchPhase::Kill => {
                if !ctx.world.contains(self.agent) {
                    log::debug!("catch abandoned: agent {:?} is gone", self.agent);
                    return self.finish(ctx);
                }
                let killed = match ctx.world.get_mut::<AvatarState>(self.avatar) {
                    Ok(mut state) if state.being_caught == Some(self.agent) => {
                        state.alive = false;
                        true
                    }
                    _ => false,
                };
                if !killed {
                    log::debug!("catch abandoned: avatar {:?} is gone", self.avatar);
                    return self.finish(ctx);
                }

                log::info!("avatar {:?} killed by agent {:?}", self.avatar, self.agent);
                ctx.events.push(SimEvent::AvatarKilled {
                    avatar: self.avatar,
                    agent: self.agent,
                });
                self.phase = CatchPhase::Release;
                TaskStep::Wait(self.animation_delay)
            }
            CatchPhase::Release => self.finish(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        world: World,
        scheduler: Scheduler,
        clock: SimClock,
        events: EventQueue,
        config: PursuitConfig,
        agent: Entity,
        avatar: Entity,
    }

    impl Fixture {
        fn new() -> Self {
            let mut world = World::new();
            let agent = world.spawn((Transform::default(), Pursuit::new(3.0)));
            let avatar = world.spawn((
                Transform::from_position(Vec3::new(0.0, 0.0, -20.0)),
                Velocity {
                    linear: Vec3::new(0.0, 0.0, -300.0),
                },
                AvatarState::default(),
            ));
            Self {
                world,
                scheduler: Scheduler::new(),
                clock: SimClock::new(10),
                events: EventQueue::new(),
                config: PursuitConfig::default(),
                agent,
                avatar,
            }
        }

        fn begin(&mut self) -> bool {
            begin_catch(
                &mut self.world,
                &mut self.scheduler,
                &self.clock,
                &mut self.events,
                &self.config,
                self.agent,
                self.avatar,
            )
        }

        fn run(&mut self, ticks: u32) {
            for _ in 0..ticks {
                self.clock.advance();
                let mut ctx = TaskContext {
                    world: &mut self.world,
                    events: &mut self.events,
                };
                self.scheduler.run_due(&self.clock, &mut ctx);
            }
        }

        fn state(&self) -> AvatarState {
            *self.world.get::<AvatarState>(self.avatar).unwrap()
        }
    }

    #[test]
    fn test_catch_locks_and_snaps() {
        let mut fx = Fixture::new();
        assert!(fx.begin());

        let state = fx.state();
        assert!(state.movement_locked);
        assert_eq!(state.being_caught, Some(fx.agent));
        assert_eq!(state.camera_target, Some(fx.agent));

        let transform = fx.world.get_copied::<Transform>(fx.avatar).unwrap();
        assert!((transform.position - Vec3::new(0.0, 0.0, -50.0)).length() < 1e-4);
        assert_eq!(fx.world.get_copied::<Velocity>(fx.avatar).unwrap().linear, Vec3::ZERO);
        assert!(fx.world.get::<Pursuit>(fx.agent).unwrap().is_catching());
    }

    #[test]
    fn test_second_catch_is_noop() {
        let mut fx = Fixture::new();
        assert!(fx.begin());
        let other = fx.world.spawn((Transform::default(), Pursuit::new(3.0)));
        let second = begin_catch(
            &mut fx.world,
            &mut fx.scheduler,
            &fx.clock,
            &mut fx.events,
            &fx.config,
            other,
            fx.avatar,
        );
        assert!(!second);
        assert_eq!(fx.state().being_caught, Some(fx.agent));
        assert_eq!(fx.scheduler.len(), 1);
        assert!(!fx.world.get::<Pursuit>(other).unwrap().is_catching());
    }

    #[test]
    fn test_full_sequence_kills_then_releases() {
        let mut fx = Fixture::new();
        fx.begin();

        // Kill delay 1.0s at 10Hz
        fx.run(10);
        let state = fx.state();
        assert!(!state.alive);
        assert!(state.movement_locked);

        // Animation delay 1.5s
        fx.run(15);
        let state = fx.state();
        assert!(!state.movement_locked);
        assert_eq!(state.being_caught, None);
        assert_eq!(state.camera_target, None);
        assert!(fx.scheduler.is_empty());

        let pursuit = fx.world.get::<Pursuit>(fx.agent).unwrap();
        assert_eq!(pursuit.state, PursuitState::Idle);
        assert_eq!(pursuit.target, None);
    }

    #[test]
    fn test_agent_destroyed_mid_catch_releases_avatar() {
        let mut fx = Fixture::new();
        fx.begin();
        fx.world.despawn(fx.agent).unwrap();

        fx.run(10);
        let state = fx.state();
        assert!(state.alive);
        assert!(!state.movement_locked);
        assert_eq!(state.being_caught, None);
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn test_avatar_destroyed_mid_catch_frees_agent() {
        let mut fx = Fixture::new();
        fx.begin();
        fx.run(10);
        fx.world.despawn(fx.avatar).unwrap();

        fx.run(15);
        assert!(fx.scheduler.is_empty());
        assert!(!fx.world.get::<Pursuit>(fx.agent).unwrap().is_catching());
    }

    #[test]
    fn test_dead_avatar_cannot_be_caught() {
        let mut fx = Fixture::new();
        fx.world.get_mut::<AvatarState>(fx.avatar).unwrap().alive = false;
        assert!(!fx.begin());
        assert!(fx.scheduler.is_empty());
    }
}
