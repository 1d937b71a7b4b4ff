#![forbid(unsafe_code)]

//! Core engine for the Bout interval-workout trainer.
//!
//! This crate provides:
//! - Block definitions, presets and per-kind defaults
//! - The phase/round state machine and session controller
//! - The cue policy and the cue content pack
//! - A renderer seam for cue output
//! - Configuration and the saved workout library

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod content;
pub mod events;
pub mod cue_policy;
pub mod machine;
pub mod session;
pub mod render;
pub mod store;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{preset, presets, sequence_seconds, Preset};
pub use config::Config;
pub use content::ContentPack;
pub use events::{CueClass, Event, Multiplier, SpokenCue};
pub use machine::{ResetToken, SessionStatus};
pub use session::{Phase, Session, SessionSnapshot};
pub use render::{dispatch, CueRenderer};
pub use store::{SavedWorkout, WorkoutStore};
