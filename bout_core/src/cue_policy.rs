//! Cue policy: which cues to emit on a tick.
//!
//! Rules are evaluated independently and several can fire on the same
//! tick:
//! - Countdown at 10 (work phase only), 3 (with a bell), 2 and 1 seconds
//! - Jump-rope pacing calls at a random 20-40s spacing
//! - Heavy-bag technique calls at the block's cue frequency, sometimes
//!   doubled or tripled
//! - Sparring motivation at the block's cue frequency
//! - Strength repetition counting, one number per tick up to the target
//!
//! Throttled classes keep their own last-emission time in `CueThrottle`.
//! All randomness comes from the caller's RNG so a seeded source gives a
//! reproducible cue stream.

use rand::Rng;

use crate::content::ContentPack;
use crate::events::{CueClass, Event, EventBuffer, Multiplier, SpokenCue};
use crate::{BlockDefinition, BlockKind, ExerciseTarget};

pub const PACING_MIN_INTERVAL_MS: u64 = 20_000;
pub const PACING_MAX_INTERVAL_MS: u64 = 40_000;
pub const MULTIPLIER_PROBABILITY: f64 = 0.3;

/// Per-class emission times for the throttled cue classes (engine clock ms)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CueThrottle {
    last_pacing_ms: Option<u64>,
    pacing_interval_ms: Option<u64>,
    last_technique_ms: Option<u64>,
    last_motivation_ms: Option<u64>,
}

impl CueThrottle {
    pub fn last_pacing_ms(&self) -> Option<u64> {
        self.last_pacing_ms
    }

    pub fn last_technique_ms(&self) -> Option<u64> {
        self.last_technique_ms
    }

    pub fn last_motivation_ms(&self) -> Option<u64> {
        self.last_motivation_ms
    }
}

/// A class that never fired is due at once
fn is_due(last_ms: Option<u64>, now_ms: u64, interval_ms: u64) -> bool {
    last_ms.map_or(true, |last| now_ms.saturating_sub(last) >= interval_ms)
}

/// Everything the policy reads about the current tick
#[derive(Clone, Copy, Debug)]
pub struct CueInput<'a> {
    pub block: &'a BlockDefinition,
    pub is_work_phase: bool,
    /// Value after this tick's decrement
    pub remaining_seconds: u32,
    pub now_ms: u64,
    /// Strength exercise being performed, if any
    pub active_exercise: Option<ExerciseTarget>,
    pub content: &'a ContentPack,
}

/// Decide the cues for one tick
///
/// `throttle` and `rep_counter` are updated in place; spoken cues are
/// dropped at the source for silent block kinds.
pub fn evaluate<R: Rng + ?Sized>(
    input: &CueInput<'_>,
    throttle: &mut CueThrottle,
    rep_counter: &mut u32,
    rng: &mut R,
) -> Vec<Event> {
    let mut out = EventBuffer::new();
    out.silence(input.block.kind.is_silent());

    if input.is_work_phase {
        match input.block.kind {
            BlockKind::JumpRope => pacing_cue(input, throttle, rng, &mut out),
            BlockKind::HeavyBag => technique_cue(input, throttle, rng, &mut out),
            BlockKind::Sparring => motivation_cue(input, throttle, rng, &mut out),
            BlockKind::Strength => rep_count_cue(input, rep_counter, &mut out),
            BlockKind::Warmup | BlockKind::ShadowBoxing | BlockKind::Cooldown => {}
        }
    }

    countdown_cues(input, &mut out);
    out.into_vec()
}

fn pacing_cue<R: Rng + ?Sized>(
    input: &CueInput<'_>,
    throttle: &mut CueThrottle,
    rng: &mut R,
    out: &mut EventBuffer,
) {
    let interval = *throttle
        .pacing_interval_ms
        .get_or_insert_with(|| rng.gen_range(PACING_MIN_INTERVAL_MS..PACING_MAX_INTERVAL_MS));

    if !is_due(throttle.last_pacing_ms, input.now_ms, interval) {
        return;
    }

    let labels = &input.content.labels;
    let text = if rng.gen_bool(0.5) {
        &labels.speed_up
    } else {
        &labels.normal_pace
    };
    out.push(Event::spoken(CueClass::Pacing, text.clone()));

    throttle.last_pacing_ms = Some(input.now_ms);
    throttle.pacing_interval_ms =
        Some(rng.gen_range(PACING_MIN_INTERVAL_MS..PACING_MAX_INTERVAL_MS));
}

fn technique_cue<R: Rng + ?Sized>(
    input: &CueInput<'_>,
    throttle: &mut CueThrottle,
    rng: &mut R,
    out: &mut EventBuffer,
) {
    let interval = input.block.cue_frequency.interval_ms();
    if !is_due(throttle.last_technique_ms, input.now_ms, interval) {
        return;
    }

    let pool = input.content.technique_pool(&input.block.technique_categories);
    if pool.is_empty() {
        return;
    }

    let technique = pool[rng.gen_range(0..pool.len())];
    let multiplier = if !technique.is_combo && rng.gen_bool(MULTIPLIER_PROBABILITY) {
        Some(if rng.gen_bool(0.5) {
            Multiplier::Double
        } else {
            Multiplier::Triple
        })
    } else {
        None
    };

    let labels = &input.content.labels;
    let text = match multiplier {
        Some(Multiplier::Double) => format!("{} {}", labels.double, technique.text),
        Some(Multiplier::Triple) => format!("{} {}", labels.triple, technique.text),
        None => technique.text.to_string(),
    };

    out.push(Event::Spoken(SpokenCue {
        class: CueClass::Technique,
        text,
        multiplier,
    }));
    throttle.last_technique_ms = Some(input.now_ms);
}

fn motivation_cue<R: Rng + ?Sized>(
    input: &CueInput<'_>,
    throttle: &mut CueThrottle,
    rng: &mut R,
    out: &mut EventBuffer,
) {
    let interval = input.block.cue_frequency.interval_ms();
    if !is_due(throttle.last_motivation_ms, input.now_ms, interval) {
        return;
    }

    let phrases = &input.content.motivation;
    if phrases.is_empty() {
        return;
    }

    let phrase = &phrases[rng.gen_range(0..phrases.len())];
    out.push(Event::spoken(CueClass::Motivation, phrase.clone()));
    throttle.last_motivation_ms = Some(input.now_ms);
}

fn rep_count_cue(input: &CueInput<'_>, rep_counter: &mut u32, out: &mut EventBuffer) {
    let Some(target) = input.active_exercise else {
        return;
    };
    // Past the target the counter goes quiet; the phase ends on its timer
    if *rep_counter <= target.reps {
        out.push(Event::spoken(CueClass::RepCount, rep_counter.to_string()));
        *rep_counter += 1;
    }
}

fn countdown_cues(input: &CueInput<'_>, out: &mut EventBuffer) {
    match input.remaining_seconds {
        10 if input.is_work_phase => out.push(Event::spoken(CueClass::Countdown, "10")),
        3 => {
            out.push(Event::Signal);
            out.push(Event::spoken(CueClass::Countdown, "3"));
        }
        2 => out.push(Event::spoken(CueClass::Countdown, "2")),
        1 => out.push(Event::spoken(CueClass::Countdown, "1")),
        _ => {}
    }
}
