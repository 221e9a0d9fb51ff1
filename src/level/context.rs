//! Current-level state handed to the simulation
//!
//! The orchestrator builds geometry in the [`PhysicsWorld`](crate::physics::PhysicsWorld)
//! and describes everything else the simulation needs here: bounds for
//! wandering, which surfaces count as hazards and where agents start.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::AgentKind;
use crate::physics::{Group, tags};

/// Level identity; decides the default agent variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelKind {
    /// The opening level
    Mansion,
    /// Cellars beneath the mansion
    Dungeon,
    /// Abandoned offices
    Office,
    /// Stacks and reading rooms
    Library,
}

impl LevelKind {
    /// All levels in play order
    pub const ALL: [LevelKind; 4] = [
        LevelKind::Mansion,
        LevelKind::Dungeon,
        LevelKind::Office,
        LevelKind::Library,
    ];

    /// Agent variant spawned when a spawn entry does not name one
    #[must_use]
    pub fn default_agent(self) -> AgentKind {
        match self {
            LevelKind::Mansion | LevelKind::Library => AgentKind::Stalker,
            LevelKind::Dungeon => AgentKind::Specter,
            LevelKind::Office => AgentKind::Nyobo,
        }
    }

    /// The level after this one, if any
    #[must_use]
    pub fn next(self) -> Option<LevelKind> {
        let index = Self::ALL.iter().position(|kind| *kind == self)?;
        Self::ALL.get(index + 1).copied()
    }
}

/// Axis-aligned level bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Bounds {
    /// Bounds spanning two corners in any order
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Whether a point lies inside (inclusive)
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Uniformly random point inside the bounds
    pub fn random_point(&self, rng: &mut impl Rng) -> Vec3 {
        Vec3::new(
            sample_span(rng, self.min.x, self.max.x),
            sample_span(rng, self.min.y, self.max.y),
            sample_span(rng, self.min.z, self.max.z),
        )
    }
}

fn sample_span(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.gen_range(lo..=hi) } else { lo }
}

/// Which surface tags the hazard detectors react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardSurfaces {
    /// Surfaces that trip a running avatar
    pub trip: Group,
    /// Surfaces that make a running avatar slip
    pub slip: Group,
}

impl Default for HazardSurfaces {
    fn default() -> Self {
        Self {
            trip: tags::LOOT,
            slip: tags::SLIP,
        }
    }
}

/// Where an agent enters the level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSpawn {
    /// Variant override; `None` uses the level default
    pub kind: Option<AgentKind>,
    /// Feet position
    pub position: Vec3,
    /// Initial facing in radians
    pub yaw: f32,
}

impl AgentSpawn {
    /// Spawn the level's default variant at `position`
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            kind: None,
            position,
            yaw: 0.0,
        }
    }

    /// Override the variant
    #[must_use]
    pub fn with_kind(mut self, kind: AgentKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Everything the simulation needs to know about the running level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelContext {
    /// Level identity
    pub kind: LevelKind,
    /// Wander bounds
    pub bounds: Bounds,
    /// Active hazard surface tags
    pub surfaces: HazardSurfaces,
    /// Agents spawned on activation
    pub agent_spawns: Vec<AgentSpawn>,
}

impl LevelContext {
    /// A level with default hazard surfaces and no agents
    #[must_use]
    pub fn new(kind: LevelKind, bounds: Bounds) -> Self {
        Self {
            kind,
            bounds,
            surfaces: HazardSurfaces::default(),
            agent_spawns: Vec::new(),
        }
    }

    /// Add an agent spawn entry
    #[must_use]
    pub fn with_spawn(mut self, spawn: AgentSpawn) -> Self {
        self.agent_spawns.push(spawn);
        self
    }

    /// Replace the hazard surfaces
    #[must_use]
    pub fn with_surfaces(mut self, surfaces: HazardSurfaces) -> Self {
        self.surfaces = surfaces;
        self
    }

    /// Variant for a spawn entry
    #[must_use]
    pub fn agent_kind(&self, spawn: &AgentSpawn) -> AgentKind {
        spawn.kind.unwrap_or_else(|| self.kind.default_agent())
    }
}
