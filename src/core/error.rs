//! Error types for fallible simulation operations
//!
//! Per-tick paths never fail; only configuration loading and level
//! lifecycle calls surface errors to the caller.

use glam::Vec3;
use thiserror::Error;

/// Errors that can occur while loading, saving or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// RON deserialization error
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// JSON deserialization error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// Serialization error
    #[error("serialization error: {0}")]
    Serialize(String),
    /// A value is outside its accepted range
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors that can occur while saving or loading snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// RON deserialization error
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// RON serialization error
    #[error("serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Errors raised by level activation and teardown
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LevelError {
    /// A required agent spawn point does not resolve to a walkable cell
    #[error("spawn entry {index} at {position} has no walkable navigation cell")]
    MissingSpawnCell {
        /// Index of the spawn entry in the level context
        index: usize,
        /// Requested spawn position
        position: Vec3,
    },
    /// A level is already running
    #[error("a level is already active")]
    AlreadyActive,
    /// The operation needs an active level
    #[error("no level is active")]
    NoActiveLevel,
}
