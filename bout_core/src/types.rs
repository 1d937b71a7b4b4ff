//! Core domain types for the Bout workout engine.
//!
//! This module defines the configuration data the engine runs on:
//! - Block kinds and their transition rule
//! - Cue frequencies, technique categories and sparring sports
//! - Strength exercises and their repetition targets
//! - Block definitions and partial block updates

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed seconds allotted to one strength repetition
pub const SECONDS_PER_REP: u32 = 2;

/// Rest between strength exercises when the block does not set one
pub const DEFAULT_STRENGTH_REST_SECS: u32 = 60;

// ============================================================================
// Block Kinds
// ============================================================================

/// Kind of exercise segment
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Warmup,
    JumpRope,
    Strength,
    HeavyBag,
    ShadowBoxing,
    Sparring,
    Cooldown,
}

/// Which phase-completion table a block kind runs on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseRule {
    /// Work, rest, next round
    Timed,
    /// Exercise, rest, next exercise (round advances at the end of work)
    Strength,
}

impl BlockKind {
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Warmup,
        BlockKind::JumpRope,
        BlockKind::Strength,
        BlockKind::HeavyBag,
        BlockKind::ShadowBoxing,
        BlockKind::Sparring,
        BlockKind::Cooldown,
    ];

    /// Silent kinds never produce spoken cues, only audible signals
    pub fn is_silent(self) -> bool {
        matches!(
            self,
            BlockKind::Warmup | BlockKind::ShadowBoxing | BlockKind::Cooldown
        )
    }

    pub fn phase_rule(self) -> PhaseRule {
        match self {
            BlockKind::Strength => PhaseRule::Strength,
            BlockKind::Warmup
            | BlockKind::JumpRope
            | BlockKind::HeavyBag
            | BlockKind::ShadowBoxing
            | BlockKind::Sparring
            | BlockKind::Cooldown => PhaseRule::Timed,
        }
    }

    /// Stable identifier, also used as the content-pack key
    pub fn key(self) -> &'static str {
        match self {
            BlockKind::Warmup => "warmup",
            BlockKind::JumpRope => "jump_rope",
            BlockKind::Strength => "strength",
            BlockKind::HeavyBag => "heavy_bag",
            BlockKind::ShadowBoxing => "shadow_boxing",
            BlockKind::Sparring => "sparring",
            BlockKind::Cooldown => "cooldown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|k| k.key() == normalized)
    }
}

// ============================================================================
// Cue Settings
// ============================================================================

/// Minimum spacing between throttled technique/motivation cues
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CueFrequency {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl CueFrequency {
    pub fn interval_ms(self) -> u64 {
        match self {
            CueFrequency::Slow => 7000,
            CueFrequency::Normal => 5000,
            CueFrequency::Fast => 3000,
        }
    }
}

/// Technique pool selector for heavy-bag blocks
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueCategory {
    Punches,
    Kicks,
    Knees,
    Elbows,
    Combos,
}

impl TechniqueCategory {
    pub const ALL: [TechniqueCategory; 5] = [
        TechniqueCategory::Punches,
        TechniqueCategory::Kicks,
        TechniqueCategory::Knees,
        TechniqueCategory::Elbows,
        TechniqueCategory::Combos,
    ];

    /// Combos are announced as-is, never with a multiplier
    pub fn is_combo(self) -> bool {
        self == TechniqueCategory::Combos
    }
}

/// Combat sport whose round structure a sparring block follows
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SparringSport {
    MuayThai,
    KarateWkf,
    Boxing,
    FullContact,
    Kickboxing,
}

// ============================================================================
// Strength Exercises
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Exercise {
    Plank,
    Abs,
    Pushups,
    Burpees,
    Squats,
    JumpingJacks,
}

impl Exercise {
    pub fn key(self) -> &'static str {
        match self {
            Exercise::Plank => "plank",
            Exercise::Abs => "abs",
            Exercise::Pushups => "pushups",
            Exercise::Burpees => "burpees",
            Exercise::Squats => "squats",
            Exercise::JumpingJacks => "jumping_jacks",
        }
    }
}

/// One entry of a strength block: an exercise and its target repetitions
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseTarget {
    pub exercise: Exercise,
    pub reps: u32,
}

impl ExerciseTarget {
    pub fn new(exercise: Exercise, reps: u32) -> Self {
        Self { exercise, reps }
    }

    /// Work-phase length for this exercise
    pub fn duration_seconds(&self) -> u32 {
        self.reps.saturating_mul(SECONDS_PER_REP)
    }
}

// ============================================================================
// Block Definition
// ============================================================================

/// Configuration for one segment of a workout
///
/// Immutable for the duration of a run except through the session's
/// structural edit operations.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockDefinition {
    pub id: String,
    pub kind: BlockKind,
    pub rounds: u32,
    #[serde(default)]
    pub work_seconds: u32,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub cue_frequency: CueFrequency,
    #[serde(default)]
    pub technique_categories: Vec<TechniqueCategory>,
    #[serde(default)]
    pub sparring_sport: Option<SparringSport>,
    /// Ordered: strength rounds cycle through this list by index
    #[serde(default)]
    pub exercises: Vec<ExerciseTarget>,
}

impl BlockDefinition {
    /// A block of the given kind with that kind's default parameters
    pub fn new(kind: BlockKind) -> Self {
        crate::catalog::default_block(kind)
    }

    pub fn new_id(kind: BlockKind) -> String {
        format!("{}-{}", kind.key(), Uuid::new_v4())
    }

    /// Copy of this block under a fresh id
    pub fn duplicate(&self) -> Self {
        Self {
            id: Self::new_id(self.kind),
            ..self.clone()
        }
    }

    /// Rest-phase length, with the strength default applied
    pub fn rest_duration(&self) -> u32 {
        match self.kind.phase_rule() {
            PhaseRule::Strength => self.rest_seconds.unwrap_or(DEFAULT_STRENGTH_REST_SECS),
            PhaseRule::Timed => self.rest_seconds.unwrap_or(0),
        }
    }

    /// Length of the first work phase, or None for a strength block with
    /// no exercises (such a block is skipped)
    pub fn opening_duration(&self) -> Option<u32> {
        match self.kind.phase_rule() {
            PhaseRule::Timed => Some(self.work_seconds),
            PhaseRule::Strength => self.exercises.first().map(ExerciseTarget::duration_seconds),
        }
    }

    /// Exercise for a 1-based strength round, cycling through the list
    pub fn exercise_for_round(&self, round: u32) -> Option<(usize, ExerciseTarget)> {
        if self.exercises.is_empty() {
            return None;
        }
        let index = (round.saturating_sub(1) as usize) % self.exercises.len();
        Some((index, self.exercises[index]))
    }

    /// Nominal length of the whole block in seconds (rests included)
    pub fn total_seconds(&self) -> u32 {
        match self.kind.phase_rule() {
            PhaseRule::Timed => self
                .rounds
                .saturating_mul(self.work_seconds.saturating_add(self.rest_duration())),
            PhaseRule::Strength => {
                let work = self.strength_work_seconds();
                let rests = self.rounds.saturating_sub(1).saturating_mul(self.rest_duration());
                work.saturating_add(rests)
            }
        }
    }

    /// Exercise time over all rounds. The exercise list repeats every
    /// `exercises.len()` rounds, so whole cycles are multiplied out.
    fn strength_work_seconds(&self) -> u32 {
        let count = self.exercises.len() as u32;
        if count == 0 {
            return 0;
        }
        let cycle = self
            .exercises
            .iter()
            .fold(0u32, |acc, ex| acc.saturating_add(ex.duration_seconds()));
        let partial = self
            .exercises
            .iter()
            .take((self.rounds % count) as usize)
            .fold(0u32, |acc, ex| acc.saturating_add(ex.duration_seconds()));
        (self.rounds / count)
            .saturating_mul(cycle)
            .saturating_add(partial)
    }

    /// Validate the block, returning a list of problems (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.is_empty() {
            errors.push("Block has empty ID".to_string());
        }
        if self.rounds == 0 {
            errors.push(format!("Block '{}' must have at least one round", self.id));
        }
        if self.kind == BlockKind::Strength {
            for target in &self.exercises {
                if target.reps == 0 {
                    errors.push(format!(
                        "Block '{}': exercise {:?} has zero reps",
                        self.id, target.exercise
                    ));
                }
            }
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Partial update for a block (`editBlock(index, partialUpdate)`)
///
/// Unset fields are left untouched. Selecting a sparring sport applies
/// that sport's round structure before explicit fields are applied.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockPatch {
    #[serde(default)]
    pub rounds: Option<u32>,
    #[serde(default)]
    pub work_seconds: Option<u32>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub cue_frequency: Option<CueFrequency>,
    #[serde(default)]
    pub technique_categories: Option<Vec<TechniqueCategory>>,
    #[serde(default)]
    pub sparring_sport: Option<SparringSport>,
    #[serde(default)]
    pub exercises: Option<Vec<ExerciseTarget>>,
}

impl BlockPatch {
    /// Return the patched copy of `block`; `block` itself is untouched
    pub fn applied_to(&self, block: &BlockDefinition) -> BlockDefinition {
        let mut next = block.clone();

        if let Some(sport) = self.sparring_sport {
            let profile = crate::catalog::sparring_profile(sport);
            next.sparring_sport = Some(sport);
            next.rounds = profile.rounds;
            next.work_seconds = profile.work_seconds;
            next.rest_seconds = Some(profile.rest_seconds);
        }
        if let Some(rounds) = self.rounds {
            next.rounds = rounds;
        }
        if let Some(work) = self.work_seconds {
            next.work_seconds = work;
        }
        if let Some(rest) = self.rest_seconds {
            next.rest_seconds = Some(rest);
        }
        if let Some(freq) = self.cue_frequency {
            next.cue_frequency = freq;
        }
        if let Some(ref categories) = self.technique_categories {
            // Categories behave as a set
            let mut unique = Vec::with_capacity(categories.len());
            for c in categories {
                if !unique.contains(c) {
                    unique.push(*c);
                }
            }
            next.technique_categories = unique;
        }
        if let Some(ref exercises) = self.exercises {
            next.exercises = exercises.clone();
        }

        next
    }
}
