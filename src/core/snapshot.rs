//! Serializable simulation snapshots
//!
//! A snapshot is a plain-value copy of everything a replication or debug
//! layer needs to show the simulation: agent and avatar poses, their states,
//! and door states. Entity ids are the raw `hecs` bits.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ai::{AgentKind, PursuitState};
use crate::core::SnapshotError;
use crate::level::{DoorState, LevelKind};
use crate::movement::ActiveHazard;

/// Snapshot of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Entity id
    pub id: u64,
    /// Variant
    pub kind: AgentKind,
    /// Feet position
    pub position: Vec3,
    /// Facing direction on the XZ plane
    pub forward: Vec3,
    /// Pursuit state
    pub state: PursuitState,
    /// Current target id
    pub target: Option<u64>,
    /// Following a path
    pub navigating: bool,
    /// Mid-teleport
    pub teleporting: bool,
    /// Avatars in memory
    pub remembered: usize,
}

/// Snapshot of one avatar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarRecord {
    /// Entity id
    pub id: u64,
    /// Feet position
    pub position: Vec3,
    /// Velocity
    pub velocity: Vec3,
    /// Still alive
    pub alive: bool,
    /// Movement suppressed
    pub movement_locked: bool,
    /// Id of the agent holding it
    pub being_caught: Option<u64>,
    /// Hazard in effect
    pub hazard: Option<ActiveHazard>,
    /// Standing on something
    pub grounded: bool,
    /// Items carried
    pub items: usize,
}

/// Snapshot of one door
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorRecord {
    /// Entity id
    pub id: u64,
    /// Swing state
    pub state: DoorState,
}

/// Whole-simulation snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimSnapshot {
    /// Tick index the snapshot was taken on
    pub tick: u64,
    /// Running level
    pub level: Option<LevelKind>,
    /// Agents in storage order
    pub agents: Vec<AgentRecord>,
    /// Avatars in storage order
    pub avatars: Vec<AvatarRecord>,
    /// Doors in storage order
    pub doors: Vec<DoorRecord>,
}

impl SimSnapshot {
    /// Find an agent record by id
    #[must_use]
    pub fn agent(&self, id: u64) -> Option<&AgentRecord> {
        self.agents.iter().find(|record| record.id == id)
    }

    /// Find an avatar record by id
    #[must_use]
    pub fn avatar(&self, id: u64) -> Option<&AvatarRecord> {
        self.avatars.iter().find(|record| record.id == id)
    }

    /// Render as pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, SnapshotError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Save the snapshot to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Load a snapshot from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }

    /// Save the snapshot to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load a snapshot from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
