//! Event Queue System for Decoupled Communication
//!
//! The simulation reports what happened each tick through a double-buffered
//! queue. Presentation layers (voice lines, screen effects, HUD) read the
//! previous tick's events without ever reaching into simulation state.
//!
//! # Design Principles
//!
//! - **Type Safety**: All events are strongly typed via the `SimEvent` enum
//! - **Double Buffering**: Events written in tick N are readable in tick N+1
//! - **Simplicity**: No pub/sub - just push and iterate
//!
//! # Example
//!
//! ```ignore
//! sim.tick();
//! for event in sim.events().iter() {
//!     if let SimEvent::HazardEntered { kind: HazardKind::Stunned, .. } = event {
//!         shake_camera();
//!     }
//! }
//! ```

use std::collections::VecDeque;

use glam::Vec3;
use hecs::Entity;

use crate::ai::{AgentKind, CellHandle};
use crate::level::{LevelKind, LootId};
use crate::movement::HazardKind;

// ============================================================================
// Event Types
// ============================================================================

/// Simulation events for presentation and bookkeeping layers.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SimEvent {
    // -------------------------------------------------------------------------
    // Perception & Pursuit
    // -------------------------------------------------------------------------
    /// An agent saw an avatar it had no memory of.
    AvatarSpotted {
        /// The perceiving agent
        agent: Entity,
        /// The avatar now in memory
        avatar: Entity,
    },

    /// An agent switched to a new target.
    TargetAcquired {
        /// The agent
        agent: Entity,
        /// The selected avatar
        target: Entity,
    },

    /// An agent's memory emptied and it dropped its target.
    TargetLost {
        /// The agent
        agent: Entity,
        /// The target it dropped
        target: Entity,
    },

    /// An agent asked the navigation service for a new path.
    NavigationRequested {
        /// The agent
        agent: Entity,
        /// Destination cell
        destination: CellHandle,
    },

    // -------------------------------------------------------------------------
    // Catch Sequence
    // -------------------------------------------------------------------------
    /// An agent grabbed an avatar.
    CatchStarted {
        /// Catching agent
        agent: Entity,
        /// Caught avatar
        avatar: Entity,
    },

    /// The lethal effect was applied.
    AvatarKilled {
        /// The avatar that died
        avatar: Entity,
        /// The agent responsible
        agent: Entity,
    },

    /// The catch sequence released its hold.
    CatchFinished {
        /// Catching agent
        agent: Entity,
        /// Released avatar
        avatar: Entity,
    },

    // -------------------------------------------------------------------------
    // Hazards
    // -------------------------------------------------------------------------
    /// An avatar entered a hazard state.
    HazardEntered {
        /// Affected avatar
        avatar: Entity,
        /// Which hazard
        kind: HazardKind,
        /// How long it lasts
        duration: f32,
    },

    /// A hazard timer ran out.
    HazardExpired {
        /// Affected avatar
        avatar: Entity,
        /// Which hazard ended
        kind: HazardKind,
    },

    /// A stun knocked an item out of an avatar's inventory.
    ItemEjected {
        /// Avatar that lost the item
        avatar: Entity,
        /// The new loot entity
        loot: Entity,
        /// Item kind
        item: LootId,
        /// Where it was launched from
        position: Vec3,
    },

    // -------------------------------------------------------------------------
    // Doors
    // -------------------------------------------------------------------------
    /// A door started opening.
    DoorOpened {
        /// The door
        door: Entity,
        /// Who opened it, if anyone
        by: Option<Entity>,
    },

    /// A door finished closing.
    DoorClosed {
        /// The door
        door: Entity,
    },

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------
    /// An agent entered the level.
    AgentSpawned {
        /// The new agent
        agent: Entity,
        /// Its variant
        kind: AgentKind,
    },

    /// An agent was removed.
    AgentDespawned {
        /// The removed agent
        agent: Entity,
    },

    /// A level became active.
    LevelActivated {
        /// Which level
        kind: LevelKind,
    },

    /// The active level ended.
    LevelEnded {
        /// Which level
        kind: LevelKind,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue for tick-consistent event processing.
///
/// Events pushed during tick N are available for reading during tick N+1.
/// This keeps event visibility independent of stage order within a tick.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<SimEvent>,
    /// Events from the previous tick, ready for processing
    processing: VecDeque<SimEvent>,
}

impl EventQueue {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be processed next tick.
    #[inline]
    pub fn push(&mut self, event: SimEvent) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues.
    ///
    /// Called once per tick, at the start of the tick.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the previous tick.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.processing.iter()
    }

    /// Iterate over events written so far this tick.
    #[inline]
    pub fn pending(&self) -> impl Iterator<Item = &SimEvent> {
        self.pending.iter()
    }

    /// Check if there are any events to process.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Get the number of events ready for processing.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Get the number of events pending for next tick.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_entity() -> Entity {
        let mut world = hecs::World::new();
        world.spawn(())
    }

    #[test]
    fn test_event_queue_push_and_swap() {
        let mut queue = EventQueue::new();
        let agent = test_entity();

        queue.push(SimEvent::AgentDespawned { agent });
        assert!(queue.is_empty(), "Events should not be visible before swap");
        assert_eq!(queue.pending_count(), 1);

        queue.swap();
        assert_eq!(queue.len(), 1);
        let events: Vec<_> = queue.iter().collect();
        assert!(matches!(events[0], SimEvent::AgentDespawned { .. }));
    }

    #[test]
    fn test_event_queue_double_buffer_isolation() {
        let mut queue = EventQueue::new();

        queue.push(SimEvent::LevelActivated {
            kind: LevelKind::Mansion,
        });
        queue.swap();

        queue.push(SimEvent::LevelEnded {
            kind: LevelKind::Mansion,
        });

        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SimEvent::LevelActivated { .. }));

        queue.swap();
        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SimEvent::LevelEnded { .. }));
    }

    #[test]
    fn test_event_queue_counts() {
        let mut queue = EventQueue::new();
        let door = test_entity();

        queue.push(SimEvent::DoorOpened { door, by: None });
        queue.push(SimEvent::DoorClosed { door });
        assert_eq!(queue.pending_count(), 2);
        assert!(queue.is_empty());

        queue.swap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pending_count(), 0);

        queue.swap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_hazard_event_fields() {
        let avatar = test_entity();
        let event = SimEvent::HazardEntered {
            avatar,
            kind: HazardKind::Stunned,
            duration: 1.25,
        };

        if let SimEvent::HazardEntered { kind, duration, .. } = event {
            assert_eq!(kind, HazardKind::Stunned);
            assert!((duration - 1.25).abs() < f32::EPSILON);
        } else {
            panic!("Wrong event type");
        }
    }
}
