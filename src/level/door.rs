//! Doors agents can open while navigating

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::core::{SimEvent, Task, TaskContext, TaskStep};

/// Door swing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorState {
    /// Shut and blocking
    Closed,
    /// Swinging open
    Opening,
    /// Fully open, no longer blocking
    Open,
    /// Swinging shut
    Closing,
}

/// Door component
///
/// The panel collider (if any) lives in the physics world; the simulation
/// disables it while the door is fully open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Door {
    /// Current state
    pub state: DoorState,
    /// Seconds for a full swing
    pub transition_time: f32,
    /// Swing progress 0..=1 toward the current target
    pub progress: f32,
    /// Bumped on every open; stale auto-close tasks compare against it
    pub generation: u32,
}

impl Door {
    /// A closed door that swings in `transition_time` seconds
    #[must_use]
    pub fn new(transition_time: f32) -> Self {
        Self {
            state: DoorState::Closed,
            transition_time,
            progress: 0.0,
            generation: 0,
        }
    }

    /// Whether the door is shut or on its way
    #[must_use]
    pub fn is_closed_or_closing(&self) -> bool {
        matches!(self.state, DoorState::Closed | DoorState::Closing)
    }

    /// Start opening. Returns `false` if already open or opening.
    pub fn open(&mut self) -> bool {
        if !self.is_closed_or_closing() {
            return false;
        }
        // A half-closed door only has the remaining swing to go
        self.progress = if self.state == DoorState::Closing {
            1.0 - self.progress
        } else {
            0.0
        };
        self.state = DoorState::Opening;
        self.generation = self.generation.wrapping_add(1);
        true
    }

    /// Start closing. Returns `false` if already closed or closing.
    pub fn close(&mut self) -> bool {
        if self.is_closed_or_closing() {
            return false;
        }
        self.progress = if self.state == DoorState::Opening {
            1.0 - self.progress
        } else {
            0.0
        };
        self.state = DoorState::Closing;
        true
    }

    /// Advance a swing in progress. Returns the state it settled into, if any.
    pub fn advance(&mut self, dt: f32) -> Option<DoorState> {
        if !matches!(self.state, DoorState::Opening | DoorState::Closing) {
            return None;
        }
        self.progress += if self.transition_time > 0.0 {
            dt / self.transition_time
        } else {
            1.0
        };
        if self.progress < 1.0 {
            return None;
        }
        self.progress = 0.0;
        self.state = match self.state {
            DoorState::Opening => DoorState::Open,
            _ => DoorState::Closed,
        };
        Some(self.state)
    }

    /// Whether the panel should block movement and sight
    #[must_use]
    pub fn blocks(&self) -> bool {
        self.state != DoorState::Open
    }
}

/// Closes a door some time after an agent opened it, unless it was reopened
#[derive(Debug)]
pub struct DoorAutoClose {
    /// The door to close
    pub door: Entity,
    /// Generation observed when the door was opened
    pub generation: u32,
}

impl Task for DoorAutoClose {
    fn name(&self) -> &'static str {
        "door_auto_close"
    }

    fn resume(&mut self, ctx: &mut TaskContext<'_>) -> TaskStep {
        let Ok(mut door) = ctx.world.get_mut::<Door>(self.door) else {
            return TaskStep::Done;
        };
        if door.generation == self.generation && door.close() {
            log::debug!("door {:?} closing", self.door);
        }
        TaskStep::Done
    }
}

/// Emit the event for a door that just settled
pub(crate) fn settled_event(door: Entity, state: DoorState) -> Option<SimEvent> {
    (state == DoorState::Closed).then_some(SimEvent::DoorClosed { door })
}
