//! Deferred tasks resumed on the simulation clock
//!
//! Long-running behaviors (catch sequences, door auto-close) are written as
//! small state machines implementing [`Task`]. The scheduler wakes each task
//! on an exact tick; the task inspects the world, does one step of work and
//! either asks to sleep again or finishes.
//!
//! Tasks hold plain `Entity` ids, never borrows, so every resumption must
//! check that the entities it touches still exist.

use std::fmt;

use crate::core::{EventQueue, SimClock};
use crate::ecs::World;

/// Identifier returned by [`Scheduler::schedule`]
pub type TaskId = u64;

/// What a task wants after a resumption
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskStep {
    /// Sleep for this many seconds, then resume again
    Wait(f32),
    /// The task is complete and is dropped
    Done,
}

/// Mutable simulation state a task may touch while resumed
pub struct TaskContext<'a> {
    /// Entity storage
    pub world: &'a mut World,
    /// Outgoing events
    pub events: &'a mut EventQueue,
}

/// A resumable continuation
pub trait Task: fmt::Debug {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Run one step. Called on the tick the task is due.
    fn resume(&mut self, ctx: &mut TaskContext<'_>) -> TaskStep;
}

#[derive(Debug)]
struct Scheduled {
    id: TaskId,
    wake_tick: u64,
    task: Box<dyn Task>,
}

/// Tick-based task scheduler
#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<Scheduled>,
    next_id: TaskId,
}

impl Scheduler {
    /// Create an empty scheduler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to first resume `delay` seconds from now
    pub fn schedule(&mut self, clock: &SimClock, delay: f32, task: impl Task + 'static) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        log::trace!("scheduling task {} ({id}) in {delay:.2}s", task.name());
        self.pending.push(Scheduled {
            id,
            wake_tick: clock.tick() + clock.ticks_for(delay),
            task: Box::new(task),
        });
        id
    }

    /// Resume every task due on the current tick.
    ///
    /// Tasks run in wake order, ties broken by scheduling order. Returns the
    /// number of tasks resumed.
    pub fn run_due(&mut self, clock: &SimClock, ctx: &mut TaskContext<'_>) -> usize {
        let now = clock.tick();
        let (mut due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|s| s.wake_tick <= now);
        self.pending = waiting;
        due.sort_by_key(|s| (s.wake_tick, s.id));

        let resumed = due.len();
        for mut scheduled in due {
            match scheduled.task.resume(ctx) {
                TaskStep::Wait(delay) => {
                    scheduled.wake_tick = now + clock.ticks_for(delay);
                    self.pending.push(scheduled);
                }
                TaskStep::Done => {
                    log::trace!("task {} ({}) done", scheduled.task.name(), scheduled.id);
                }
            }
        }
        resumed
    }

    /// Number of waiting tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no task is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Velocity;

    #[derive(Debug)]
    struct Countdown {
        steps: u32,
    }

    impl Task for Countdown {
        fn name(&self) -> &'static str {
            "countdown"
        }

        fn resume(&mut self, ctx: &mut TaskContext<'_>) -> TaskStep {
            ctx.world.spawn((Velocity::default(),));
            if self.steps == 0 {
                TaskStep::Done
            } else {
                self.steps -= 1;
                TaskStep::Wait(0.5)
            }
        }
    }

    fn run_ticks(
        scheduler: &mut Scheduler,
        clock: &mut SimClock,
        world: &mut World,
        events: &mut EventQueue,
        ticks: u32,
    ) -> usize {
        let mut resumed = 0;
        for _ in 0..ticks {
            clock.advance();
            let mut ctx = TaskContext {
                world: &mut *world,
                events: &mut *events,
            };
            resumed += scheduler.run_due(clock, &mut ctx);
        }
        resumed
    }

    #[test]
    fn test_task_waits_exact_ticks() {
        let mut scheduler = Scheduler::new();
        let mut clock = SimClock::new(10);
        let mut world = World::new();
        let mut events = EventQueue::new();

        scheduler.schedule(&clock, 1.0, Countdown { steps: 0 });
        assert_eq!(run_ticks(&mut scheduler, &mut clock, &mut world, &mut events, 9), 0);
        assert_eq!(run_ticks(&mut scheduler, &mut clock, &mut world, &mut events, 1), 1);
        assert!(scheduler.is_empty());
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_task_rescheduled_on_wait() {
        let mut scheduler = Scheduler::new();
        let mut clock = SimClock::new(10);
        let mut world = World::new();
        let mut events = EventQueue::new();

        scheduler.schedule(&clock, 0.1, Countdown { steps: 2 });
        run_ticks(&mut scheduler, &mut clock, &mut world, &mut events, 20);
        assert_eq!(world.len(), 3);
        assert!(scheduler.is_empty());
    }
}
