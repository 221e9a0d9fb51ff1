//! Agent variants
//!
//! Variants differ only in data: speeds, body size, vision and a locomotion
//! capability. Everything that reads a variant goes through its
//! [`AgentProfile`].

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;

/// Pursuer variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    /// Baseline walker
    Stalker,
    /// Taller, faster walker
    Nyobo,
    /// Teleports between wander destinations
    Specter,
}

/// How an agent reaches wander destinations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Locomotion {
    /// Follows the path on foot
    Walk,
    /// Sinks into the floor and rises at the destination
    Teleport {
        /// Seconds spent sinking plus rising
        duration: f32,
        /// Seconds spent underground while relocating
        underground: f32,
    },
}

/// Vision cone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionCone {
    /// Maximum sight distance
    pub range: f32,
    /// Full cone angle in degrees, centered on the forward axis
    pub angle: f32,
}

/// Per-variant agent tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Wandering speed
    pub walk_speed: f32,
    /// Chasing speed
    pub run_speed: f32,
    /// Collision capsule radius
    pub radius: f32,
    /// Collision capsule height
    pub height: f32,
    /// Height of the eyes above the feet
    pub eye_height: f32,
    /// Vision for avatars that are not the current target
    pub vision: VisionCone,
    /// Vision for the current target
    pub alert_vision: VisionCone,
    /// Seconds an unseen avatar stays in memory
    pub memory_window: f32,
    /// Wander locomotion capability
    pub locomotion: Locomotion,
}

impl AgentProfile {
    /// The baseline pursuer
    #[must_use]
    pub fn stalker() -> Self {
        Self {
            walk_speed: 100.0,
            run_speed: 300.0,
            radius: 8.0,
            height: 72.0,
            eye_height: 64.0,
            vision: VisionCone {
                range: 1024.0,
                angle: 120.0,
            },
            alert_vision: VisionCone {
                range: 2048.0,
                angle: 180.0,
            },
            memory_window: 2.0,
            locomotion: Locomotion::Walk,
        }
    }

    /// A larger and faster pursuer
    #[must_use]
    pub fn nyobo() -> Self {
        let base = Self::stalker();
        Self {
            walk_speed: 120.0,
            run_speed: 380.0,
            radius: base.radius * 1.1,
            height: base.height * 1.1,
            eye_height: base.eye_height * 1.1,
            ..base
        }
    }

    /// A pursuer that teleports between wander destinations
    #[must_use]
    pub fn specter() -> Self {
        Self {
            run_speed: 320.0,
            locomotion: Locomotion::Teleport {
                duration: 3.0,
                underground: 1.0,
            },
            ..Self::stalker()
        }
    }

    /// Vision cone to use against an avatar
    #[must_use]
    pub fn vision_for(&self, is_target: bool) -> VisionCone {
        if is_target {
            self.alert_vision
        } else {
            self.vision
        }
    }
}

/// Profiles for every variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentProfiles {
    /// Stalker profile
    pub stalker: AgentProfile,
    /// Nyobo profile
    pub nyobo: AgentProfile,
    /// Specter profile
    pub specter: AgentProfile,
}

impl Default for AgentProfiles {
    fn default() -> Self {
        Self {
            stalker: AgentProfile::stalker(),
            nyobo: AgentProfile::nyobo(),
            specter: AgentProfile::specter(),
        }
    }
}

impl AgentProfiles {
    /// Profile of a variant
    #[must_use]
    pub fn get(&self, kind: AgentKind) -> &AgentProfile {
        match kind {
            AgentKind::Stalker => &self.stalker,
            AgentKind::Nyobo => &self.nyobo,
            AgentKind::Specter => &self.specter,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, profile) in [
            ("agents.stalker", &self.stalker),
            ("agents.nyobo", &self.nyobo),
            ("agents.specter", &self.specter),
        ] {
            let reason = if profile.walk_speed <= 0.0 || profile.run_speed < profile.walk_speed {
                Some("speeds must satisfy 0 < walk_speed <= run_speed")
            } else if profile.memory_window <= 0.0 {
                Some("memory window must be positive")
            } else if [profile.vision, profile.alert_vision]
                .iter()
                .any(|cone| cone.range <= 0.0 || cone.angle <= 0.0 || cone.angle > 360.0)
            {
                Some("vision needs a positive range and an angle within (0, 360]")
            } else if matches!(profile.locomotion, Locomotion::Teleport { duration, underground } if duration <= 0.0 || underground < 0.0)
            {
                Some("teleport timings must be positive")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ConfigError::Invalid {
                    field,
                    reason: reason.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Agent component: which variant, with its profile resolved at spawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Variant
    pub kind: AgentKind,
    /// Tuning copied from the config when spawned
    pub profile: AgentProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_stats() {
        let profiles = AgentProfiles::default();
        assert!((profiles.get(AgentKind::Stalker).run_speed - 300.0).abs() < f32::EPSILON);
        assert!((profiles.get(AgentKind::Nyobo).walk_speed - 120.0).abs() < f32::EPSILON);
        assert!(profiles.get(AgentKind::Nyobo).height > profiles.get(AgentKind::Stalker).height);
        assert!(matches!(
            profiles.get(AgentKind::Specter).locomotion,
            Locomotion::Teleport { .. }
        ));
        assert!(profiles.validate().is_ok());
    }

    #[test]
    fn test_alert_vision_for_target() {
        let profile = AgentProfile::stalker();
        assert!((profile.vision_for(false).range - 1024.0).abs() < f32::EPSILON);
        assert!((profile.vision_for(true).range - 2048.0).abs() < f32::EPSILON);
        assert!((profile.vision_for(true).angle - 180.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rejects_bad_vision() {
        let mut profiles = AgentProfiles::default();
        profiles.specter.alert_vision.angle = 400.0;
        assert!(profiles.validate().is_err());
    }
}
