//! Error types for the bout_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for bout_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A block definition or block patch failed validation
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// A structural edit addressed a block that does not exist
    #[error("Block index {index} out of range (sequence has {len} blocks)")]
    IndexOutOfRange { index: usize, len: usize },

    /// No saved workout with this name
    #[error("Workout not found: {0}")]
    WorkoutNotFound(String),

    /// A saved workout with this name already exists
    #[error("Workout already exists: {0}")]
    WorkoutExists(String),

    /// Workout store error
    #[error("Store error: {0}")]
    Store(String),

    /// Cue renderer failure (never propagated into the engine)
    #[error("Render error: {0}")]
    Render(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
