//! Events emitted by the session engine.
//!
//! Every engine operation returns its events in emission order. `Signal`
//! and `Spoken` are cues for the renderer; the remaining variants describe
//! transitions for the presentation layer.

use serde::{Deserialize, Serialize};

use crate::{BlockKind, Exercise};

/// Category of a spoken cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueClass {
    Countdown,
    Rest,
    Round,
    Exercise,
    Block,
    Complete,
    Pacing,
    Technique,
    Motivation,
    RepCount,
}

/// Emphasis word prefixed to a single heavy-bag technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplier {
    Double,
    Triple,
}

/// Text to be spoken. `text` already carries the multiplier word when
/// `multiplier` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpokenCue {
    pub class: CueClass,
    pub text: String,
    #[serde(default)]
    pub multiplier: Option<Multiplier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Audible bell
    Signal,
    Spoken(SpokenCue),
    Started {
        block_index: usize,
    },
    Resumed {
        remaining_seconds: u32,
    },
    Paused {
        remaining_seconds: u32,
    },
    BlockStarted {
        block_index: usize,
        kind: BlockKind,
        duration_seconds: u32,
    },
    RoundStarted {
        round: u32,
        total_rounds: u32,
        duration_seconds: u32,
    },
    RestStarted {
        round: u32,
        duration_seconds: u32,
    },
    ExerciseStarted {
        number: u32,
        exercise: Exercise,
        reps: u32,
        duration_seconds: u32,
    },
    Completed,
    Reset,
}

impl Event {
    pub fn spoken(class: CueClass, text: impl Into<String>) -> Self {
        Event::Spoken(SpokenCue {
            class,
            text: text.into(),
            multiplier: None,
        })
    }

    /// True for events the cue renderer consumes
    pub fn is_cue(&self) -> bool {
        matches!(self, Event::Signal | Event::Spoken(_))
    }

    pub fn as_spoken(&self) -> Option<&SpokenCue> {
        match self {
            Event::Spoken(cue) => Some(cue),
            _ => None,
        }
    }
}

/// Collects events for one operation, dropping spoken cues while the
/// active block is of a silent kind
#[derive(Debug, Default)]
pub(crate) struct EventBuffer {
    events: Vec<Event>,
    silent: bool,
}

impl EventBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Set whether spoken cues are suppressed for the block now active
    pub(crate) fn silence(&mut self, silent: bool) {
        self.silent = silent;
    }

    pub(crate) fn push(&mut self, event: Event) {
        if self.silent && matches!(event, Event::Spoken(_)) {
            return;
        }
        self.events.push(event);
    }

    /// Spoken cue that bypasses silencing
    pub(crate) fn push_always(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.push(event);
        }
    }

    pub(crate) fn into_vec(self) -> Vec<Event> {
        self.events
    }
}
