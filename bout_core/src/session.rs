//! Session controller.
//!
//! `Session` owns the block sequence and the live `SessionState` and is
//! the only thing that mutates them. Every operation returns the events it
//! produced, in order, for the renderer and the presentation layer.
//!
//! The controller is single-threaded: the driver calls `tick()` once per
//! second while running and feeds user intents in between ticks.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::catalog::validate_sequence;
use crate::content::ContentPack;
use crate::events::{Event, EventBuffer};
use crate::machine::{ResetToken, Sequence, SessionState, SessionStatus};
use crate::{
    BlockDefinition, BlockKind, BlockPatch, Config, Error, ExerciseTarget, PhaseRule, Result,
};

/// Coarse phase of the session as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Work,
    Rest,
    Completed,
}

/// Read-only view of the session for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub phase: Phase,
    pub block_index: usize,
    pub block_count: usize,
    pub block_kind: Option<BlockKind>,
    pub round: u32,
    pub total_rounds: u32,
    pub remaining_seconds: u32,
    /// Strength exercise currently being performed
    pub exercise: Option<ExerciseTarget>,
    pub elapsed_ms: u64,
}

pub struct Session<R = Pcg64> {
    blocks: Vec<BlockDefinition>,
    state: SessionState,
    content: ContentPack,
    rng: R,
}

impl Session<Pcg64> {
    /// Session with an entropy-seeded RNG
    pub fn new(content: ContentPack) -> Self {
        Self::with_rng(content, Pcg64::from_entropy())
    }

    /// Session whose cue stream is reproducible for a given seed
    pub fn with_seed(content: ContentPack, seed: u64) -> Self {
        Self::with_rng(content, Pcg64::seed_from_u64(seed))
    }

    /// Session using the configured content pack and seed
    pub fn from_config(config: &Config) -> Result<Self> {
        let content = ContentPack::from_config(config)?;
        Ok(match config.session.seed {
            Some(seed) => Self::with_seed(content, seed),
            None => Self::new(content),
        })
    }
}

impl<R: Rng> Session<R> {
    pub fn with_rng(content: ContentPack, rng: R) -> Self {
        Self {
            blocks: Vec::new(),
            state: SessionState::initial(&[]),
            content,
            rng,
        }
    }

    pub fn blocks(&self) -> &[BlockDefinition] {
        &self.blocks
    }

    pub fn content(&self) -> &ContentPack {
        &self.content
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let seq = Sequence {
            blocks: &self.blocks,
            content: &self.content,
        };
        let block = self.state.current_block(&seq);
        let phase = match self.state.status {
            SessionStatus::Idle => Phase::Idle,
            SessionStatus::Completed => Phase::Completed,
            SessionStatus::Running | SessionStatus::Paused if self.state.is_work_phase => {
                Phase::Work
            }
            SessionStatus::Running | SessionStatus::Paused => Phase::Rest,
        };

        SessionSnapshot {
            status: self.state.status,
            phase,
            block_index: self.state.block_index,
            block_count: self.blocks.len(),
            block_kind: block.map(|b| b.kind),
            round: self.state.round,
            total_rounds: block.map_or(0, |b| b.rounds),
            remaining_seconds: self.state.remaining_seconds,
            exercise: self.state.active_exercise(&seq),
            elapsed_ms: self.state.clock_ms,
        }
    }

    /// Replace the block sequence and return to the initial state
    pub fn load(&mut self, blocks: Vec<BlockDefinition>) -> Vec<Event> {
        let problems = validate_sequence(&blocks);
        if !problems.is_empty() {
            tracing::warn!("Loaded sequence is not runnable: {}", problems.join("; "));
        }
        tracing::info!("Loaded sequence of {} blocks", blocks.len());

        self.blocks = blocks;
        self.state.revoke_reset();
        self.rewind();
        vec![Event::Reset]
    }

    /// Start a fresh run or resume a paused one. No-op while running.
    ///
    /// A countdown already armed by `reset_to_initial_state` just starts
    /// ticking; otherwise the first block is entered and announced.
    pub fn start(&mut self) -> Vec<Event> {
        let mut out = EventBuffer::new();
        self.supersede_completion(&mut out);

        match self.state.status {
            SessionStatus::Paused => {
                self.state.status = SessionStatus::Running;
                tracing::info!("Resumed with {}s remaining", self.state.remaining_seconds);
                out.push(Event::Resumed {
                    remaining_seconds: self.state.remaining_seconds,
                });
            }
            SessionStatus::Idle => {
                let problems = validate_sequence(&self.blocks);
                if !problems.is_empty() {
                    tracing::warn!("Cannot start: {}", problems.join("; "));
                    return out.into_vec();
                }

                self.state.status = SessionStatus::Running;
                tracing::info!("Session started");
                out.push(Event::Started {
                    block_index: self.state.block_index,
                });
                if self.state.remaining_seconds == 0 {
                    let seq = Sequence {
                        blocks: &self.blocks,
                        content: &self.content,
                    };
                    self.state.begin_from(self.state.block_index, &seq, &mut out);
                }
            }
            SessionStatus::Running | SessionStatus::Completed => {}
        }

        out.into_vec()
    }

    /// Pause a running session, keeping the remaining time. No-op otherwise.
    pub fn pause(&mut self) -> Vec<Event> {
        let mut out = EventBuffer::new();
        self.supersede_completion(&mut out);

        if self.state.status == SessionStatus::Running {
            self.state.status = SessionStatus::Paused;
            tracing::info!("Paused with {}s remaining", self.state.remaining_seconds);
            out.push(Event::Paused {
                remaining_seconds: self.state.remaining_seconds,
            });
        }

        out.into_vec()
    }

    pub fn reset_to_initial_state(&mut self) -> Vec<Event> {
        self.state.revoke_reset();
        self.state.restore_initial(&self.blocks);
        tracing::info!("Session reset");
        vec![Event::Reset]
    }

    /// Jump to the next round of the active block, or to the next block
    /// when already on the last round
    pub fn skip_to_next_round(&mut self) -> Vec<Event> {
        let mut out = EventBuffer::new();
        if self.supersede_completion(&mut out) {
            return out.into_vec();
        }

        if self.is_active() {
            let seq = Sequence {
                blocks: &self.blocks,
                content: &self.content,
            };
            self.state.skip_round(&seq, &mut out);
        }

        out.into_vec()
    }

    pub fn skip_to_next_block(&mut self) -> Vec<Event> {
        let mut out = EventBuffer::new();
        if self.supersede_completion(&mut out) {
            return out.into_vec();
        }

        if self.is_active() {
            let seq = Sequence {
                blocks: &self.blocks,
                content: &self.content,
            };
            self.state.skip_block(&seq, &mut out);
        }

        out.into_vec()
    }

    /// Advance one second. Does nothing unless running.
    pub fn tick(&mut self) -> Vec<Event> {
        let seq = Sequence {
            blocks: &self.blocks,
            content: &self.content,
        };
        self.state.tick(&seq, &mut self.rng)
    }

    /// Token for the pending post-completion reset, if any
    pub fn completion_token(&self) -> Option<ResetToken> {
        self.state.pending_reset
    }

    /// Perform the delayed post-completion reset. Stale or revoked tokens
    /// are ignored and produce no events.
    pub fn fire_auto_reset(&mut self, token: ResetToken) -> Vec<Event> {
        if self.state.status != SessionStatus::Completed
            || self.state.pending_reset != Some(token)
        {
            tracing::debug!("Ignoring stale auto-reset {:?}", token);
            return Vec::new();
        }

        self.state.pending_reset = None;
        self.rewind();
        tracing::info!("Auto-reset after completion");
        vec![Event::Reset]
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Insert a block at `index` (0..=len)
    pub fn insert_block(&mut self, index: usize, block: BlockDefinition) -> Result<Vec<Event>> {
        if index > self.blocks.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.blocks.len(),
            });
        }
        check_block(&block)?;

        tracing::info!("Inserting {:?} block at {}", block.kind, index);
        self.blocks.insert(index, block);
        Ok(self.follow_edit(|current| if index <= current { current + 1 } else { current }))
    }

    /// Append a block of `kind` with that kind's defaults
    pub fn add_block(&mut self, kind: BlockKind) -> Result<Vec<Event>> {
        self.insert_block(self.blocks.len(), BlockDefinition::new(kind))
    }

    pub fn delete_block(&mut self, index: usize) -> Result<Vec<Event>> {
        self.check_index(index)?;

        let removed = self.blocks.remove(index);
        tracing::info!("Deleted {:?} block at {}", removed.kind, index);

        if self.blocks.is_empty() {
            return Ok(self.reset_to_initial_state());
        }

        let current = self.state.block_index;
        if !self.is_active() || index != current {
            return Ok(self.follow_edit(|current| if index < current { current - 1 } else { current }));
        }

        // The active block is gone: re-enter whatever now occupies its slot
        self.state.revoke_reset();
        let paused = self.state.status == SessionStatus::Paused;
        let mut out = EventBuffer::new();
        let seq = Sequence {
            blocks: &self.blocks,
            content: &self.content,
        };
        self.state
            .begin_from(current.min(self.blocks.len() - 1), &seq, &mut out);

        let mut events = out.into_vec();
        if paused {
            events.retain(|e| !e.is_cue());
        }
        Ok(events)
    }

    /// Insert a copy of the block at `index` right after it
    pub fn duplicate_block(&mut self, index: usize) -> Result<Vec<Event>> {
        self.check_index(index)?;

        let copy = self.blocks[index].duplicate();
        tracing::info!("Duplicating block {} as {}", index, copy.id);
        self.blocks.insert(index + 1, copy);
        Ok(self.follow_edit(|current| if index < current { current + 1 } else { current }))
    }

    /// Move the block at `from` so that it ends up at `to`
    pub fn reorder_blocks(&mut self, from: usize, to: usize) -> Result<Vec<Event>> {
        self.check_index(from)?;
        self.check_index(to)?;

        let block = self.blocks.remove(from);
        self.blocks.insert(to, block);
        tracing::info!("Moved block {} to {}", from, to);

        Ok(self.follow_edit(|current| {
            if current == from {
                to
            } else if from < current && current <= to {
                current - 1
            } else if to <= current && current < from {
                current + 1
            } else {
                current
            }
        }))
    }

    /// Apply a partial update to the block at `index`
    ///
    /// Editing the active block leaves the running countdown alone; the
    /// new parameters take effect at the next transition.
    pub fn update_block(&mut self, index: usize, patch: &BlockPatch) -> Result<Vec<Event>> {
        self.check_index(index)?;

        let next = patch.applied_to(&self.blocks[index]);
        check_block(&next)?;
        self.blocks[index] = next;
        tracing::info!("Updated block {}", index);

        let events = self.follow_edit(|current| current);
        if self.is_active() && index == self.state.block_index {
            let block = &self.blocks[index];
            // A strength rest already points at the next exercise's round;
            // if that round was cut, the block ends when the rest does
            let strength_rest =
                block.kind.phase_rule() == PhaseRule::Strength && !self.state.is_work_phase;
            if !strength_rest {
                self.state.round = self.state.round.min(block.rounds);
            }
            if self.state.exercise_index >= block.exercises.len() {
                self.state.exercise_index = 0;
            }
        }
        Ok(events)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.blocks.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.blocks.len(),
            });
        }
        Ok(())
    }

    /// True while a run is in progress (running or paused)
    fn is_active(&self) -> bool {
        matches!(
            self.state.status,
            SessionStatus::Running | SessionStatus::Paused
        )
    }

    /// Bookkeeping after a structural edit. An idle or completed session is
    /// re-derived from the new sequence (an armed countdown stays armed);
    /// an active one keeps pointing at the same block via `follow`.
    fn follow_edit(&mut self, follow: impl FnOnce(usize) -> usize) -> Vec<Event> {
        self.state.revoke_reset();
        match self.state.status {
            SessionStatus::Idle => {
                if self.state.remaining_seconds > 0 {
                    self.state.restore_initial(&self.blocks);
                } else {
                    self.rewind();
                }
                Vec::new()
            }
            SessionStatus::Completed => {
                self.rewind();
                vec![Event::Reset]
            }
            SessionStatus::Running | SessionStatus::Paused => {
                self.state.block_index = follow(self.state.block_index);
                Vec::new()
            }
        }
    }

    /// Back at block 0 with no countdown armed; the next start enters and
    /// announces the first block
    fn rewind(&mut self) {
        self.state.restore_initial(&self.blocks);
        self.state.remaining_seconds = 0;
    }

    /// A control action during the post-completion grace window applies
    /// the pending reset right away. Returns true if it did.
    fn supersede_completion(&mut self, out: &mut EventBuffer) -> bool {
        if self.state.status != SessionStatus::Completed {
            return false;
        }
        self.state.revoke_reset();
        self.rewind();
        tracing::debug!("Completion superseded by a control action");
        out.push(Event::Reset);
        true
    }
}

fn check_block(block: &BlockDefinition) -> Result<()> {
    let problems = block.validate();
    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidBlock(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CueClass;
    use crate::{CueFrequency, Exercise, TechniqueCategory};
    use rand::rngs::mock::StepRng;

    fn session(blocks: Vec<BlockDefinition>) -> Session<StepRng> {
        crate::logging::init_test();
        let mut session = Session::with_rng(ContentPack::default(), StepRng::new(0, 0));
        session.load(blocks);
        session
    }

    fn timed(kind: BlockKind, rounds: u32, work: u32, rest: u32) -> BlockDefinition {
        let mut block = BlockDefinition::new(kind);
        block.rounds = rounds;
        block.work_seconds = work;
        block.rest_seconds = Some(rest);
        block
    }

    fn tick_n<R: Rng>(session: &mut Session<R>, n: usize) -> Vec<Event> {
        (0..n).flat_map(|_| session.tick()).collect()
    }

    fn position(s: &SessionSnapshot) -> (usize, u32, Phase, u32) {
        (s.block_index, s.round, s.phase, s.remaining_seconds)
    }

    fn spoken_texts(events: &[Event], class: CueClass) -> Vec<String> {
        events
            .iter()
            .filter_map(Event::as_spoken)
            .filter(|c| c.class == class)
            .map(|c| c.text.clone())
            .collect()
    }

    #[test]
    fn test_warmup_runs_silently_into_rest() {
        let mut s = session(vec![timed(BlockKind::Warmup, 2, 120, 30)]);
        let events = s.start();
        assert_eq!(events[0], Event::Started { block_index: 0 });
        assert!(events.iter().all(|e| e.as_spoken().is_none()));
        assert_eq!(position(&s.snapshot()), (0, 1, Phase::Work, 120));

        let events = tick_n(&mut s, 120);
        assert_eq!(position(&s.snapshot()), (0, 1, Phase::Rest, 30));
        assert!(events.contains(&Event::RestStarted {
            round: 1,
            duration_seconds: 30
        }));
        assert!(events.iter().all(|e| e.as_spoken().is_none()));

        let _ = tick_n(&mut s, 30);
        assert_eq!(position(&s.snapshot()), (0, 2, Phase::Work, 120));
    }

    #[test]
    fn test_strength_opening_exercise() {
        let mut strength = BlockDefinition::new(BlockKind::Strength);
        strength.rounds = 2;
        strength.exercises = vec![
            ExerciseTarget::new(Exercise::Pushups, 15),
            ExerciseTarget::new(Exercise::Squats, 20),
        ];
        let mut s = session(vec![strength]);
        let events = s.start();

        let snap = s.snapshot();
        assert_eq!(snap.remaining_seconds, 30);
        assert_eq!(snap.exercise, Some(ExerciseTarget::new(Exercise::Pushups, 15)));
        assert_eq!(spoken_texts(&events, CueClass::Block), vec!["Strength"]);
    }

    #[test]
    fn test_fast_heavy_bag_technique_stream() {
        let mut bag = timed(BlockKind::HeavyBag, 1, 30, 0);
        bag.cue_frequency = CueFrequency::Fast;
        bag.technique_categories = vec![TechniqueCategory::Punches];
        let mut s = session(vec![bag]);
        s.start();

        let events = tick_n(&mut s, 30);
        let techniques = spoken_texts(&events, CueClass::Technique);
        assert_eq!(techniques.len(), 10);
        assert!(techniques.iter().all(|t| t == "Double Jab"));
    }

    #[test]
    fn test_skip_on_last_round_matches_natural_completion() {
        let blocks = vec![
            timed(BlockKind::JumpRope, 2, 10, 5),
            BlockDefinition::new(BlockKind::HeavyBag),
        ];

        let mut skipped = session(blocks.clone());
        skipped.start();
        let to_round_two = skipped.skip_to_next_round();
        assert_eq!(spoken_texts(&to_round_two, CueClass::Round), vec!["Round 2"]);
        assert_eq!(to_round_two.last(), Some(&Event::Signal));
        let skip_events = skipped.skip_to_next_round();

        let mut natural = session(blocks);
        natural.start();
        let _ = tick_n(&mut natural, 29);
        assert_eq!(natural.snapshot().block_index, 0);
        let natural_events = natural.tick();

        assert_eq!(skip_events, natural_events);
        assert_eq!(skip_events[0], Event::Signal);
        assert_eq!(
            position(&skipped.snapshot()),
            position(&natural.snapshot())
        );
        assert_eq!(position(&natural.snapshot()), (1, 1, Phase::Work, 180));
    }

    #[test]
    fn test_strength_skip_on_last_exercise_matches_natural_completion() {
        let mut strength = BlockDefinition::new(BlockKind::Strength);
        strength.rounds = 2;
        strength.rest_seconds = Some(5);
        strength.exercises = vec![
            ExerciseTarget::new(Exercise::Pushups, 5),
            ExerciseTarget::new(Exercise::Squats, 5),
        ];
        let blocks = vec![strength, BlockDefinition::new(BlockKind::HeavyBag)];

        let mut skipped = session(blocks.clone());
        skipped.start();
        let to_second = skipped.skip_to_next_round();
        assert_eq!(
            spoken_texts(&to_second, CueClass::Exercise),
            vec!["Exercise 2 - Squats"]
        );
        let skip_events = skipped.skip_to_next_round();

        let mut natural = session(blocks);
        natural.start();
        let _ = tick_n(&mut natural, 10 + 5 + 9);
        assert_eq!(natural.snapshot().block_index, 0);
        let natural_events = natural.tick();

        assert_eq!(skip_events, natural_events);
        assert_eq!(skip_events[0], Event::Signal);
        assert_eq!(
            position(&skipped.snapshot()),
            position(&natural.snapshot())
        );
        assert_eq!(position(&natural.snapshot()), (1, 1, Phase::Work, 180));
    }

    #[test]
    fn test_load_reads_back_the_same_sequence() {
        let blocks = crate::catalog::preset(60);
        let mut s = session(blocks.clone());
        assert_eq!(s.blocks(), blocks.as_slice());

        // Running never touches the stored sequence
        s.start();
        let _ = tick_n(&mut s, 400);
        s.skip_to_next_block();
        assert_eq!(s.blocks(), blocks.as_slice());
    }

    #[test]
    fn test_start_after_reset_keeps_armed_countdown() {
        let mut s = session(vec![BlockDefinition::new(BlockKind::JumpRope)]);
        assert_eq!(s.snapshot().remaining_seconds, 0);

        s.reset_to_initial_state();
        assert_eq!(s.snapshot().remaining_seconds, 180);

        let events = s.start();
        assert_eq!(events, vec![Event::Started { block_index: 0 }]);
        assert!(spoken_texts(&events, CueClass::Block).is_empty());
        assert_eq!(s.status(), SessionStatus::Running);

        let _ = s.tick();
        assert_eq!(position(&s.snapshot()), (0, 1, Phase::Work, 179));
    }

    #[test]
    fn test_start_and_pause_are_idempotent() {
        let mut s = session(catalog_preset());
        assert!(!s.start().is_empty());
        let before = s.snapshot();
        assert!(s.start().is_empty());
        assert_eq!(s.snapshot(), before);

        let _ = tick_n(&mut s, 5);
        let paused = s.pause();
        assert_eq!(paused, vec![Event::Paused { remaining_seconds: 115 }]);
        assert!(s.pause().is_empty());

        // Ticks are ignored while paused
        assert!(tick_n(&mut s, 3).is_empty());
        assert_eq!(s.snapshot().remaining_seconds, 115);
    }

    #[test]
    fn test_pause_resume_round_trip() {
        let mut s = session(catalog_preset());
        s.start();
        let _ = tick_n(&mut s, 42);
        let running = s.snapshot();

        s.pause();
        let resumed = s.start();
        assert_eq!(resumed, vec![Event::Resumed { remaining_seconds: running.remaining_seconds }]);
        assert_eq!(s.snapshot(), running);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut s = session(catalog_preset());
        s.start();
        let _ = tick_n(&mut s, 300);

        s.reset_to_initial_state();
        let once = s.snapshot();
        s.reset_to_initial_state();
        assert_eq!(s.snapshot(), once);
        assert_eq!(position(&once), (0, 1, Phase::Idle, 120));
    }

    #[test]
    fn test_start_without_blocks_is_a_noop() {
        let mut s = session(Vec::new());
        assert!(s.start().is_empty());
        assert_eq!(s.status(), SessionStatus::Idle);

        let mut bad = BlockDefinition::new(BlockKind::JumpRope);
        bad.rounds = 0;
        s.load(vec![bad]);
        assert!(s.start().is_empty());
        assert_eq!(s.status(), SessionStatus::Idle);
    }

    fn short_session() -> Session<StepRng> {
        let mut s = session(vec![timed(BlockKind::Cooldown, 1, 2, 0)]);
        s.start();
        let events = tick_n(&mut s, 3);
        assert_eq!(s.status(), SessionStatus::Completed);
        assert_eq!(
            spoken_texts(&events, CueClass::Complete),
            vec!["Training complete!"]
        );
        s
    }

    #[test]
    fn test_auto_reset_fires_once() {
        let mut s = short_session();
        let token = s.completion_token().unwrap();

        assert_eq!(s.fire_auto_reset(token), vec![Event::Reset]);
        assert_eq!(position(&s.snapshot()), (0, 1, Phase::Idle, 0));
        assert!(s.completion_token().is_none());
        assert!(s.fire_auto_reset(token).is_empty());
    }

    #[test]
    fn test_control_action_supersedes_pending_reset() {
        let mut s = short_session();
        let token = s.completion_token().unwrap();

        let events = s.start();
        assert_eq!(events[0], Event::Reset);
        assert_eq!(s.status(), SessionStatus::Running);
        assert_eq!(s.snapshot().remaining_seconds, 2);

        // The old timer firing now must not disturb the new run
        assert!(s.fire_auto_reset(token).is_empty());
        assert_eq!(s.status(), SessionStatus::Running);

        // A later completion issues a fresh token; the old one stays stale
        let _ = tick_n(&mut s, 3);
        let fresh = s.completion_token().unwrap();
        assert_ne!(fresh, token);
        assert!(s.fire_auto_reset(token).is_empty());
        assert_eq!(s.fire_auto_reset(fresh), vec![Event::Reset]);
    }

    #[test]
    fn test_skip_while_completed_applies_reset() {
        let mut s = short_session();
        assert_eq!(s.skip_to_next_block(), vec![Event::Reset]);
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(s.skip_to_next_block().is_empty());
    }

    #[test]
    fn test_skip_block_from_last_block_completes() {
        let mut s = session(vec![BlockDefinition::new(BlockKind::JumpRope)]);
        s.start();
        let events = s.skip_to_next_block();
        assert_eq!(events[0], Event::Signal);
        assert!(events.contains(&Event::Completed));
        assert_eq!(s.snapshot().phase, Phase::Completed);
    }

    #[test]
    fn test_edits_follow_the_active_block() {
        let mut s = session(catalog_preset());
        s.start();
        s.skip_to_next_block();
        let active = s.blocks()[1].id.clone();
        let active_id = |s: &Session<StepRng>| s.blocks()[s.snapshot().block_index].id.clone();

        s.insert_block(0, BlockDefinition::new(BlockKind::Sparring)).unwrap();
        assert_eq!(s.snapshot().block_index, 2);
        assert_eq!(active_id(&s), active);

        s.duplicate_block(0).unwrap();
        assert_eq!(s.snapshot().block_index, 3);

        s.reorder_blocks(3, 0).unwrap();
        assert_eq!(s.snapshot().block_index, 0);
        assert_eq!(active_id(&s), active);

        s.reorder_blocks(1, 4).unwrap();
        assert_eq!(active_id(&s), active);

        s.delete_block(1).unwrap();
        assert_eq!(active_id(&s), active);
        assert_eq!(s.status(), SessionStatus::Running);
    }

    #[test]
    fn test_deleting_active_block_enters_its_successor() {
        let mut s = session(catalog_preset());
        s.start();
        let _ = tick_n(&mut s, 10);

        let events = s.delete_block(0).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.block_index, 0);
        assert_eq!(snap.block_kind, Some(BlockKind::JumpRope));
        assert_eq!(snap.remaining_seconds, 180);
        assert_eq!(
            events[0],
            Event::BlockStarted {
                block_index: 0,
                kind: BlockKind::JumpRope,
                duration_seconds: 180
            }
        );
    }

    #[test]
    fn test_deleting_last_active_block_clamps() {
        let mut s = session(vec![
            BlockDefinition::new(BlockKind::JumpRope),
            BlockDefinition::new(BlockKind::HeavyBag),
        ]);
        s.start();
        s.skip_to_next_block();
        s.pause();

        let events = s.delete_block(1).unwrap();
        assert!(events.iter().all(|e| !e.is_cue()));
        let snap = s.snapshot();
        assert_eq!(snap.block_index, 0);
        assert_eq!(snap.status, SessionStatus::Paused);
    }

    #[test]
    fn test_update_active_block_clamps_round() {
        let mut s = session(vec![timed(BlockKind::JumpRope, 4, 60, 30)]);
        s.start();
        s.skip_to_next_round();
        s.skip_to_next_round();
        assert_eq!(s.snapshot().round, 3);
        let remaining = s.snapshot().remaining_seconds;

        let patch = BlockPatch {
            rounds: Some(2),
            work_seconds: Some(90),
            ..Default::default()
        };
        s.update_block(0, &patch).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.round, 2);
        assert_eq!(snap.total_rounds, 2);
        // In-flight countdown untouched
        assert_eq!(snap.remaining_seconds, remaining);
    }

    #[test]
    fn test_update_idle_session_rederives_start() {
        let mut s = session(catalog_preset());
        let patch = BlockPatch {
            work_seconds: Some(45),
            ..Default::default()
        };
        // Freshly loaded: nothing armed, and an edit does not arm it
        s.update_block(0, &patch).unwrap();
        assert_eq!(position(&s.snapshot()), (0, 1, Phase::Idle, 0));

        s.reset_to_initial_state();
        let patch = BlockPatch {
            work_seconds: Some(50),
            ..Default::default()
        };
        s.update_block(0, &patch).unwrap();
        assert_eq!(position(&s.snapshot()), (0, 1, Phase::Idle, 50));
    }

    #[test]
    fn test_strength_rounds_cut_during_rest_end_the_block() {
        let mut strength = BlockDefinition::new(BlockKind::Strength);
        strength.rounds = 3;
        strength.rest_seconds = Some(5);
        strength.exercises = vec![
            ExerciseTarget::new(Exercise::Pushups, 5),
            ExerciseTarget::new(Exercise::Squats, 5),
        ];
        let mut s = session(vec![strength, BlockDefinition::new(BlockKind::HeavyBag)]);
        s.start();
        let _ = tick_n(&mut s, 10 + 5 + 10);
        assert_eq!(position(&s.snapshot()), (0, 3, Phase::Rest, 5));

        let patch = BlockPatch {
            rounds: Some(2),
            ..Default::default()
        };
        s.update_block(0, &patch).unwrap();
        assert_eq!(s.snapshot().remaining_seconds, 5);

        let events = tick_n(&mut s, 5);
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::ExerciseStarted { .. })));
        assert_eq!(position(&s.snapshot()), (1, 1, Phase::Work, 180));
    }

    #[test]
    fn test_edit_errors() {
        let mut s = session(catalog_preset());
        let len = s.blocks().len();

        assert!(matches!(
            s.delete_block(len),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            s.insert_block(len + 1, BlockDefinition::new(BlockKind::Warmup)),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(s.reorder_blocks(0, len).is_err());

        let zero_rounds = BlockPatch {
            rounds: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            s.update_block(0, &zero_rounds),
            Err(Error::InvalidBlock(_))
        ));
        assert_eq!(s.blocks()[0].rounds, 2);

        s.add_block(BlockKind::Sparring).unwrap();
        assert_eq!(s.blocks().len(), len + 1);
    }

    #[test]
    fn test_seeded_sessions_repeat() {
        let run = |seed| {
            let mut s = Session::with_seed(ContentPack::default(), seed);
            s.load(crate::catalog::preset(60));
            s.start();
            (0..900).flat_map(|_| s.tick()).collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn test_from_config_uses_configured_seed() {
        let mut config = Config::default();
        config.session.seed = Some(5);
        let run = |config: &Config| {
            let mut s = Session::from_config(config).unwrap();
            s.load(crate::catalog::preset(30));
            s.start();
            (0..600).flat_map(|_| s.tick()).collect::<Vec<_>>()
        };
        assert_eq!(run(&config), run(&config));
    }

    #[test]
    fn test_snapshot_serializes() {
        let s = session(catalog_preset());
        let json = serde_json::to_string(&s.snapshot()).unwrap();
        assert!(json.contains(r#""phase":"idle""#));
        let parsed: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, s.snapshot());
    }

    fn catalog_preset() -> Vec<BlockDefinition> {
        crate::catalog::preset(30)
    }
}
