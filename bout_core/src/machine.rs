//! Phase/round state machine.
//!
//! `SessionState` is the single mutable aggregate of a run. It is advanced
//! one tick at a time and decides phase, round and block transitions:
//!
//! ```text
//! Idle -> Work(block, round) <-> Rest(block, round) -> ... -> Completed
//! ```
//!
//! Timed kinds go work -> rest -> next round. Strength blocks advance the
//! round at the end of each exercise, rest, then start the exercise picked
//! by `(round - 1) % exercise_count`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::content::ContentPack;
use crate::cue_policy::{self, CueInput, CueThrottle};
use crate::events::{CueClass, Event, EventBuffer};
use crate::{BlockDefinition, BlockKind, ExerciseTarget, PhaseRule};

/// Engine clock advance per tick
pub const TICK_MS: u64 = 1000;

/// Transport status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Loaded, positioned at the start of the first block, never started
    Idle,
    Running,
    Paused,
    /// Finished; an auto-reset is pending until it fires or is superseded
    Completed,
}

/// Handle for the delayed post-completion reset. Only the token issued by
/// the most recent completion is honored, and any control operation
/// revokes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResetToken {
    generation: u64,
}

/// Blocks and content the state machine runs against
#[derive(Clone, Copy)]
pub(crate) struct Sequence<'a> {
    pub blocks: &'a [BlockDefinition],
    pub content: &'a ContentPack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub(crate) status: SessionStatus,
    pub(crate) block_index: usize,
    /// 1-based
    pub(crate) round: u32,
    pub(crate) is_work_phase: bool,
    pub(crate) remaining_seconds: u32,
    pub(crate) exercise_index: usize,
    pub(crate) rep_counter: u32,
    pub(crate) throttle: CueThrottle,
    /// Monotonic engine time, advanced by every running tick
    pub(crate) clock_ms: u64,
    pub(crate) pending_reset: Option<ResetToken>,
    generation: u64,
}

impl SessionState {
    /// State positioned at the start of the first block
    pub(crate) fn initial(blocks: &[BlockDefinition]) -> Self {
        let remaining_seconds = blocks
            .first()
            .and_then(BlockDefinition::opening_duration)
            .unwrap_or(0);

        Self {
            status: SessionStatus::Idle,
            block_index: 0,
            round: 1,
            is_work_phase: true,
            remaining_seconds,
            exercise_index: 0,
            rep_counter: 1,
            throttle: CueThrottle::default(),
            clock_ms: 0,
            pending_reset: None,
            generation: 0,
        }
    }

    /// Return to the initial state, keeping the engine clock and token
    /// generation so stale tokens stay stale
    pub(crate) fn restore_initial(&mut self, blocks: &[BlockDefinition]) {
        let clock_ms = self.clock_ms;
        let generation = self.generation;
        *self = Self::initial(blocks);
        self.clock_ms = clock_ms;
        self.generation = generation;
    }

    pub(crate) fn current_block<'a>(&self, seq: &Sequence<'a>) -> Option<&'a BlockDefinition> {
        seq.blocks.get(self.block_index)
    }

    /// Strength exercise currently being performed
    pub(crate) fn active_exercise(&self, seq: &Sequence<'_>) -> Option<ExerciseTarget> {
        let block = self.current_block(seq)?;
        if block.kind.phase_rule() == PhaseRule::Strength && self.is_work_phase {
            block.exercises.get(self.exercise_index).copied()
        } else {
            None
        }
    }

    pub(crate) fn revoke_reset(&mut self) {
        if self.pending_reset.take().is_some() {
            tracing::debug!("Pending auto-reset revoked");
        }
    }

    /// One second of running time: decrement, consult the cue policy, and
    /// complete the phase when the countdown reaches zero
    pub(crate) fn tick<R: Rng + ?Sized>(&mut self, seq: &Sequence<'_>, rng: &mut R) -> Vec<Event> {
        if self.status != SessionStatus::Running {
            return Vec::new();
        }
        let Some(block) = self.current_block(seq) else {
            return Vec::new();
        };

        self.clock_ms += TICK_MS;
        let mut out = EventBuffer::new();
        out.silence(block.kind.is_silent());

        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
            let input = CueInput {
                block,
                is_work_phase: self.is_work_phase,
                remaining_seconds: self.remaining_seconds,
                now_ms: self.clock_ms,
                active_exercise: self.active_exercise(seq),
                content: seq.content,
            };
            out.extend(cue_policy::evaluate(
                &input,
                &mut self.throttle,
                &mut self.rep_counter,
                rng,
            ));
        }

        // A zero-length phase completes on the first tick that sees it
        if self.remaining_seconds == 0 {
            self.complete_phase(seq, &mut out);
        }

        out.into_vec()
    }

    /// Phase completion; always rings the bell first
    pub(crate) fn complete_phase(&mut self, seq: &Sequence<'_>, out: &mut EventBuffer) {
        let Some(block) = self.current_block(seq) else {
            return;
        };
        out.silence(block.kind.is_silent());
        out.push(Event::Signal);

        match block.kind.phase_rule() {
            PhaseRule::Timed => {
                if self.is_work_phase {
                    self.enter_rest(block, seq, out);
                } else if self.round < block.rounds {
                    self.round += 1;
                    self.enter_round(block, seq, out);
                } else {
                    self.advance_block(seq, out);
                }
            }
            PhaseRule::Strength => {
                if self.is_work_phase {
                    if self.round < block.rounds {
                        self.round += 1;
                        self.rep_counter = 1;
                        self.enter_rest(block, seq, out);
                    } else {
                        self.advance_block(seq, out);
                    }
                } else if self.round > block.rounds || !self.enter_exercise(block, seq, out) {
                    // Rounds cut by an edit during this rest end the block
                    self.advance_block(seq, out);
                }
            }
        }
    }

    fn enter_rest(&mut self, block: &BlockDefinition, seq: &Sequence<'_>, out: &mut EventBuffer) {
        self.is_work_phase = false;
        self.remaining_seconds = block.rest_duration();
        tracing::debug!(
            "Block {} round {}: rest for {}s",
            self.block_index,
            self.round,
            self.remaining_seconds
        );
        out.push(Event::RestStarted {
            round: self.round,
            duration_seconds: self.remaining_seconds,
        });
        out.push(Event::spoken(CueClass::Rest, seq.content.labels.rest.clone()));
    }

    /// Work phase of a timed block for the current round
    fn enter_round(&mut self, block: &BlockDefinition, seq: &Sequence<'_>, out: &mut EventBuffer) {
        self.is_work_phase = true;
        self.remaining_seconds = block.work_seconds;
        tracing::debug!(
            "Block {} round {}/{}",
            self.block_index,
            self.round,
            block.rounds
        );
        out.push(Event::RoundStarted {
            round: self.round,
            total_rounds: block.rounds,
            duration_seconds: self.remaining_seconds,
        });
        out.push(Event::spoken(
            CueClass::Round,
            format!("{} {}", seq.content.labels.round, self.round),
        ));
    }

    /// Work phase of a strength block for the current round. Returns false
    /// when the block has no exercises.
    fn enter_exercise(
        &mut self,
        block: &BlockDefinition,
        seq: &Sequence<'_>,
        out: &mut EventBuffer,
    ) -> bool {
        let Some((index, target)) = block.exercise_for_round(self.round) else {
            return false;
        };

        self.is_work_phase = true;
        self.exercise_index = index;
        self.rep_counter = 1;
        self.remaining_seconds = target.duration_seconds();
        tracing::debug!(
            "Block {} exercise {}: {:?} x{}",
            self.block_index,
            self.round,
            target.exercise,
            target.reps
        );
        out.push(Event::ExerciseStarted {
            number: self.round,
            exercise: target.exercise,
            reps: target.reps,
            duration_seconds: self.remaining_seconds,
        });
        out.push(Event::spoken(
            CueClass::Exercise,
            format!(
                "{} {} - {}",
                seq.content.labels.exercise,
                self.round,
                seq.content.exercise_name(target.exercise)
            ),
        ));
        true
    }

    /// Position at the start of block `index`. Returns false (leaving the
    /// state untouched) when the block has nothing to run.
    pub(crate) fn begin_block(&mut self, index: usize, seq: &Sequence<'_>, out: &mut EventBuffer) -> bool {
        let Some(block) = seq.blocks.get(index) else {
            return false;
        };
        let Some(duration) = block.opening_duration() else {
            tracing::warn!(
                "Skipping block {} ({:?}): no exercises configured",
                index,
                block.kind
            );
            return false;
        };

        self.block_index = index;
        self.round = 1;
        self.is_work_phase = true;
        self.exercise_index = 0;
        self.rep_counter = 1;
        self.remaining_seconds = duration;
        tracing::info!("Starting block {} ({:?})", index, block.kind);

        out.silence(block.kind.is_silent());
        out.push(Event::BlockStarted {
            block_index: index,
            kind: block.kind,
            duration_seconds: duration,
        });
        out.push(Event::spoken(CueClass::Block, seq.content.block_name(block.kind)));
        let first_exercise = match block.kind {
            BlockKind::Strength => block.exercises.first(),
            _ => None,
        };
        if let Some(first) = first_exercise {
            out.push(Event::ExerciseStarted {
                number: 1,
                exercise: first.exercise,
                reps: first.reps,
                duration_seconds: duration,
            });
        }
        true
    }

    /// Begin the first runnable block at or after `index`, completing the
    /// session when none is left
    pub(crate) fn begin_from(&mut self, index: usize, seq: &Sequence<'_>, out: &mut EventBuffer) {
        for candidate in index..seq.blocks.len() {
            if self.begin_block(candidate, seq, out) {
                return;
            }
        }
        self.complete(seq, out);
    }

    pub(crate) fn advance_block(&mut self, seq: &Sequence<'_>, out: &mut EventBuffer) {
        self.begin_from(self.block_index + 1, seq, out);
    }

    /// Manual round advance; falls through to a block advance on the last
    /// round
    pub(crate) fn skip_round(&mut self, seq: &Sequence<'_>, out: &mut EventBuffer) {
        let Some(block) = self.current_block(seq) else {
            return;
        };
        if self.round >= block.rounds {
            self.skip_block(seq, out);
            return;
        }

        self.round += 1;
        out.silence(block.kind.is_silent());
        let entered = match block.kind.phase_rule() {
            PhaseRule::Timed => {
                self.enter_round(block, seq, out);
                true
            }
            PhaseRule::Strength => self.enter_exercise(block, seq, out),
        };
        if entered {
            out.push(Event::Signal);
        } else {
            self.skip_block(seq, out);
        }
    }

    pub(crate) fn skip_block(&mut self, seq: &Sequence<'_>, out: &mut EventBuffer) {
        if let Some(block) = self.current_block(seq) {
            out.silence(block.kind.is_silent());
        }
        out.push(Event::Signal);
        self.advance_block(seq, out);
    }

    fn complete(&mut self, seq: &Sequence<'_>, out: &mut EventBuffer) {
        self.status = SessionStatus::Completed;
        self.remaining_seconds = 0;
        self.generation += 1;
        self.pending_reset = Some(ResetToken {
            generation: self.generation,
        });
        tracing::info!("Training complete");

        out.push(Event::Completed);
        // Not tied to a block kind, so never silenced
        out.push_always(Event::spoken(
            CueClass::Complete,
            seq.content.labels.training_complete.clone(),
        ));
    }
}
