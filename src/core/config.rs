//! Simulation configuration
//!
//! Every tunable the simulation reads lives here. Configs are plain serde
//! values so they can be authored in RON (or JSON) and validated once at
//! startup; nothing on the per-tick path re-checks ranges.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ai::AgentProfiles;
use crate::core::ConfigError;
use crate::movement::HazardKind;

/// Which side of the network this simulation runs on.
///
/// Only the server applies effects that spawn replicated entities
/// (item ejection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Authority {
    /// Authoritative simulation
    #[default]
    Server,
    /// Predicting client
    Client,
}

/// Avatar movement and collision tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Walking speed in units per second
    pub walk_speed: f32,
    /// Running speed in units per second
    pub run_speed: f32,
    /// Acceleration toward the desired velocity
    pub acceleration: f32,
    /// Base deceleration, divided by momentum while skidding
    pub deceleration: f32,
    /// Momentum multiplier applied to `planar_speed / walk_speed`
    pub momentum_factor: f32,
    /// Upward velocity applied on a jump
    pub jump_impulse: f32,
    /// Highest ledge the avatar walks up without jumping
    pub step_height: f32,
    /// Steepest walkable slope in degrees
    pub standable_angle: f32,
    /// Collision capsule radius
    pub radius: f32,
    /// Collision capsule height (feet to head)
    pub height: f32,
    /// Eye height used for line-of-sight checks
    pub eye_height: f32,
    /// Probability of ejecting an item when stunned
    pub drop_chance: f32,
    /// Extra bounce speed (on top of the radius) applied when stunned
    pub stun_bounce: f32,
    /// Launch speed of ejected loot
    pub eject_speed: f32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            walk_speed: 200.0,
            run_speed: 350.0,
            acceleration: 1200.0,
            deceleration: 400.0,
            momentum_factor: 1.2,
            jump_impulse: 300.0,
            step_height: 16.0,
            standable_angle: 46.0,
            radius: 16.0,
            height: 72.0,
            eye_height: 64.0,
            drop_chance: 0.5,
            stun_bounce: 100.0,
            eject_speed: 300.0,
        }
    }
}

/// Resolution of a single hazard kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardTuning {
    /// Seconds the hazard stays active (maximum for scaled hazards)
    pub duration: f32,
    /// Multiplier on desired speed while control is not locked out
    pub speed_multiplier: f32,
    /// Whether input and jumping are ignored while active
    pub control_lockout: bool,
}

/// Per-hazard tuning table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Running into a wall too fast
    pub stun: HazardTuning,
    /// Running over loose loot
    pub trip: HazardTuning,
    /// Running over a slippery surface
    pub slip: HazardTuning,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            stun: HazardTuning {
                duration: 2.0,
                speed_multiplier: 0.0,
                control_lockout: true,
            },
            trip: HazardTuning {
                duration: 1.0,
                speed_multiplier: 0.0,
                control_lockout: true,
            },
            slip: HazardTuning {
                duration: 1.5,
                speed_multiplier: 0.35,
                control_lockout: false,
            },
        }
    }
}

impl HazardConfig {
    /// Tuning for one hazard kind
    #[must_use]
    pub fn tuning(&self, kind: HazardKind) -> &HazardTuning {
        match kind {
            HazardKind::Stunned => &self.stun,
            HazardKind::Tripping => &self.trip,
            HazardKind::Slipping => &self.slip,
        }
    }
}

/// Agent decision-making tuning shared by all variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PursuitConfig {
    /// Shortest wander cooldown in seconds
    pub idle_interval_min: f32,
    /// Longest wander cooldown in seconds
    pub idle_interval_max: f32,
    /// Distance at which a tracked avatar is caught
    pub catch_radius: f32,
    /// Distance the caught avatar is held in front of the agent
    pub catch_offset: f32,
    /// Seconds between the catch and the kill
    pub kill_delay: f32,
    /// Seconds the kill animation holds the avatar
    pub animation_delay: f32,
    /// Forward probe distance for opening doors
    pub door_probe_distance: f32,
    /// Seconds before a door opened by an agent closes again
    pub door_close_delay: f32,
    /// Seconds a door takes to swing open or shut
    pub door_transition_time: f32,
    /// Distance at which a path waypoint counts as reached
    pub waypoint_tolerance: f32,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            idle_interval_min: 3.0,
            idle_interval_max: 6.0,
            catch_radius: 40.0,
            catch_offset: 50.0,
            kill_delay: 1.0,
            animation_delay: 1.5,
            door_probe_distance: 60.0,
            door_close_delay: 3.0,
            door_transition_time: 0.5,
            waypoint_tolerance: 8.0,
        }
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed ticks per second
    pub tick_rate: u32,
    /// Seed for every random decision
    pub seed: u64,
    /// Server or client side
    pub authority: Authority,
    /// Downward acceleration in units per second squared
    pub gravity: f32,
    /// Avatar movement tuning
    pub avatar: AvatarConfig,
    /// Hazard tuning
    pub hazards: HazardConfig,
    /// Agent decision tuning
    pub pursuit: PursuitConfig,
    /// Per-variant agent profiles
    pub agents: AgentProfiles,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            seed: 0x5EED,
            authority: Authority::Server,
            gravity: 800.0,
            avatar: AvatarConfig::default(),
            hazards: HazardConfig::default(),
            pursuit: PursuitConfig::default(),
            agents: AgentProfiles::default(),
        }
    }
}

impl SimConfig {
    /// Set the tick rate
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Set the random seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the network authority
    #[must_use]
    pub fn with_authority(mut self, authority: Authority) -> Self {
        self.authority = authority;
        self
    }

    /// Replace the avatar tuning
    #[must_use]
    pub fn with_avatar(mut self, avatar: AvatarConfig) -> Self {
        self.avatar = avatar;
        self
    }

    /// Replace the hazard tuning
    #[must_use]
    pub fn with_hazards(mut self, hazards: HazardConfig) -> Self {
        self.hazards = hazards;
        self
    }

    /// Replace the pursuit tuning
    #[must_use]
    pub fn with_pursuit(mut self, pursuit: PursuitConfig) -> Self {
        self.pursuit = pursuit;
        self
    }

    /// Seconds per tick
    #[must_use]
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Check every value the simulation relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.tick_rate == 0 {
            return Err(invalid("tick_rate", "must be positive"));
        }
        if self.gravity < 0.0 {
            return Err(invalid("gravity", "must not be negative"));
        }

        let avatar = &self.avatar;
        if avatar.walk_speed <= 0.0 || avatar.run_speed < avatar.walk_speed {
            return Err(invalid(
                "avatar.run_speed",
                "speeds must satisfy 0 < walk_speed <= run_speed",
            ));
        }
        if avatar.acceleration <= 0.0 || avatar.deceleration <= 0.0 {
            return Err(invalid("avatar.acceleration", "rates must be positive"));
        }
        if avatar.radius <= 0.0 || avatar.height < avatar.radius * 2.0 {
            return Err(invalid(
                "avatar.height",
                "capsule needs a positive radius and height >= 2 * radius",
            ));
        }
        if !(0.0..=1.0).contains(&avatar.drop_chance) {
            return Err(invalid("avatar.drop_chance", "must be within 0..=1"));
        }
        if !(0.0..90.0).contains(&avatar.standable_angle) {
            return Err(invalid("avatar.standable_angle", "must be within 0..90"));
        }

        for (field, tuning) in [
            ("hazards.stun", &self.hazards.stun),
            ("hazards.trip", &self.hazards.trip),
            ("hazards.slip", &self.hazards.slip),
        ] {
            if tuning.duration <= 0.0 {
                return Err(invalid(field, "duration must be positive"));
            }
            if tuning.speed_multiplier < 0.0 {
                return Err(invalid(field, "speed multiplier must not be negative"));
            }
        }

        let pursuit = &self.pursuit;
        if pursuit.idle_interval_min < 0.0 || pursuit.idle_interval_max < pursuit.idle_interval_min
        {
            return Err(invalid(
                "pursuit.idle_interval_max",
                "interval must satisfy 0 <= min <= max",
            ));
        }
        if pursuit.catch_radius <= 0.0 {
            return Err(invalid("pursuit.catch_radius", "must be positive"));
        }
        if pursuit.kill_delay < 0.0 || pursuit.animation_delay < 0.0 {
            return Err(invalid("pursuit.kill_delay", "delays must not be negative"));
        }

        self.agents.validate()
    }

    /// Parse a config from a RON string and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from a JSON string and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load a config from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Save the config to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Load a config from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
