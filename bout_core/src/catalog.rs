//! Built-in workout catalog: preset sequences, sparring profiles and
//! per-kind block defaults.

use crate::types::*;
use once_cell::sync::Lazy;

/// Cached preset workouts - built once and reused
static PRESETS: Lazy<Vec<Preset>> = Lazy::new(build_presets);

/// A built-in workout of a nominal length
#[derive(Clone, Debug)]
pub struct Preset {
    pub minutes: u32,
    pub name: &'static str,
    pub blocks: Vec<BlockDefinition>,
}

/// Round structure of a combat sport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SparringProfile {
    pub rounds: u32,
    pub work_seconds: u32,
    pub rest_seconds: u32,
}

pub fn sparring_profile(sport: SparringSport) -> SparringProfile {
    let (rounds, work_seconds, rest_seconds) = match sport {
        SparringSport::MuayThai => (5, 180, 60),
        SparringSport::KarateWkf => (3, 90, 60),
        SparringSport::Boxing => (12, 180, 60),
        SparringSport::FullContact => (5, 120, 60),
        SparringSport::Kickboxing => (5, 180, 60),
    };
    SparringProfile {
        rounds,
        work_seconds,
        rest_seconds,
    }
}

/// Parameters a freshly added block of `kind` starts with
pub fn default_block(kind: BlockKind) -> BlockDefinition {
    let mut block = BlockDefinition {
        id: BlockDefinition::new_id(kind),
        kind,
        rounds: 2,
        work_seconds: 120,
        rest_seconds: Some(30),
        cue_frequency: CueFrequency::Normal,
        technique_categories: Vec::new(),
        sparring_sport: None,
        exercises: Vec::new(),
    };

    match kind {
        BlockKind::Warmup | BlockKind::ShadowBoxing | BlockKind::Cooldown => {}
        BlockKind::JumpRope => {
            block.rounds = 3;
            block.work_seconds = 180;
            block.rest_seconds = Some(60);
        }
        BlockKind::HeavyBag => {
            block.rounds = 3;
            block.work_seconds = 180;
            block.rest_seconds = Some(60);
            block.technique_categories =
                vec![TechniqueCategory::Punches, TechniqueCategory::Kicks];
        }
        BlockKind::Strength => {
            block.rounds = 3;
            block.work_seconds = 0;
            block.rest_seconds = Some(DEFAULT_STRENGTH_REST_SECS);
            block.exercises = vec![
                ExerciseTarget::new(Exercise::Pushups, 15),
                ExerciseTarget::new(Exercise::Squats, 20),
                ExerciseTarget::new(Exercise::Abs, 25),
            ];
        }
        BlockKind::Sparring => {
            let profile = sparring_profile(SparringSport::Kickboxing);
            block.rounds = profile.rounds;
            block.work_seconds = profile.work_seconds;
            block.rest_seconds = Some(profile.rest_seconds);
            block.sparring_sport = Some(SparringSport::Kickboxing);
        }
    }

    block
}

/// All built-in presets, shortest first
pub fn presets() -> &'static [Preset] {
    &PRESETS
}

/// Block sequence of the preset with this nominal length, or an empty
/// sequence for an unknown length. Every call hands out fresh block ids.
pub fn preset(minutes: u32) -> Vec<BlockDefinition> {
    PRESETS
        .iter()
        .find(|p| p.minutes == minutes)
        .map(|p| p.blocks.iter().map(BlockDefinition::duplicate).collect())
        .unwrap_or_default()
}

/// Nominal length of a sequence in seconds, saturating at `u32::MAX`
pub fn sequence_seconds(blocks: &[BlockDefinition]) -> u32 {
    blocks
        .iter()
        .fold(0u32, |acc, b| acc.saturating_add(b.total_seconds()))
}

/// Validate a whole sequence, returning a list of problems
pub fn validate_sequence(blocks: &[BlockDefinition]) -> Vec<String> {
    let mut errors = Vec::new();
    if blocks.is_empty() {
        errors.push("Sequence has no blocks".to_string());
    }
    for (index, block) in blocks.iter().enumerate() {
        for e in block.validate() {
            errors.push(format!("Block {}: {}", index, e));
        }
    }
    errors
}

fn timed(
    kind: BlockKind,
    rounds: u32,
    work_seconds: u32,
    rest_seconds: u32,
    techniques: &[TechniqueCategory],
) -> BlockDefinition {
    BlockDefinition {
        id: BlockDefinition::new_id(kind),
        kind,
        rounds,
        work_seconds,
        rest_seconds: Some(rest_seconds),
        cue_frequency: CueFrequency::Normal,
        technique_categories: techniques.to_vec(),
        sparring_sport: None,
        exercises: Vec::new(),
    }
}

fn strength(rounds: u32, exercises: &[(Exercise, u32)]) -> BlockDefinition {
    BlockDefinition {
        id: BlockDefinition::new_id(BlockKind::Strength),
        kind: BlockKind::Strength,
        rounds,
        work_seconds: 0,
        rest_seconds: None,
        cue_frequency: CueFrequency::Normal,
        technique_categories: Vec::new(),
        sparring_sport: None,
        exercises: exercises
            .iter()
            .map(|&(exercise, reps)| ExerciseTarget::new(exercise, reps))
            .collect(),
    }
}

fn build_presets() -> Vec<Preset> {
    use BlockKind::*;
    use Exercise::*;
    use TechniqueCategory::*;

    vec![
        Preset {
            minutes: 30,
            name: "30-minute session",
            blocks: vec![
                timed(Warmup, 2, 120, 30, &[]),
                timed(JumpRope, 2, 180, 60, &[]),
                strength(2, &[(Pushups, 15), (Squats, 20)]),
                timed(HeavyBag, 3, 120, 60, &[Punches, Kicks, Combos]),
                timed(ShadowBoxing, 2, 60, 30, &[]),
                timed(Cooldown, 1, 60, 0, &[]),
            ],
        },
        Preset {
            minutes: 60,
            name: "1-hour session",
            blocks: vec![
                timed(Warmup, 2, 180, 60, &[]),
                timed(JumpRope, 4, 180, 60, &[]),
                strength(3, &[(Pushups, 20), (Squats, 25), (Burpees, 10)]),
                timed(HeavyBag, 5, 180, 60, &[Punches, Kicks, Knees, Combos]),
                timed(ShadowBoxing, 3, 120, 60, &[]),
                timed(Cooldown, 2, 60, 30, &[]),
            ],
        },
        Preset {
            minutes: 90,
            name: "90-minute session",
            blocks: vec![
                timed(Warmup, 3, 180, 60, &[]),
                timed(JumpRope, 6, 180, 60, &[]),
                strength(4, &[(Pushups, 25), (Squats, 30), (Burpees, 15), (Abs, 30)]),
                timed(
                    HeavyBag,
                    8,
                    180,
                    60,
                    &[Punches, Kicks, Knees, Elbows, Combos],
                ),
                timed(ShadowBoxing, 4, 120, 60, &[]),
                timed(Cooldown, 2, 90, 30, &[]),
            ],
        },
    ]
}
