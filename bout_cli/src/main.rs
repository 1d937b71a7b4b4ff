use bout_core::*;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "bout")]
#[command(about = "Interval workout trainer for combat sports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in presets
    Presets,

    /// Run a workout
    Run {
        /// Built-in preset length in minutes (30, 60, 90)
        #[arg(long, conflicts_with = "workout")]
        preset: Option<u32>,

        /// Saved workout name
        #[arg(long)]
        workout: Option<String>,

        /// Milliseconds per engine tick (0 runs as fast as possible)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Do not read intents from stdin (for scripting)
        #[arg(long)]
        no_input: bool,

        /// Seed for a reproducible cue stream
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Manage saved workouts
    Workouts {
        #[command(subcommand)]
        action: WorkoutAction,
    },
}

#[derive(Subcommand)]
enum WorkoutAction {
    /// List saved workouts
    List,
    /// Show the blocks of a saved workout
    Show { name: String },
    /// Save a preset under a name
    Save {
        name: String,
        #[arg(long)]
        preset: u32,
    },
    /// Rename a saved workout
    Rename { from: String, to: String },
    /// Delete a saved workout
    Delete { name: String },
    /// Append a block with default parameters
    AddBlock { name: String, kind: String },
    /// Remove the block at INDEX (0-based)
    RemoveBlock { name: String, index: usize },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    bout_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }

    match cli.command {
        Commands::Presets => cmd_presets(),
        Commands::Run {
            preset,
            workout,
            tick_ms,
            no_input,
            seed,
        } => cmd_run(&config, preset, workout, tick_ms, no_input, seed),
        Commands::Workouts { action } => cmd_workouts(&config, action),
    }
}

fn cmd_presets() -> Result<()> {
    for p in presets() {
        let total = sequence_seconds(&p.blocks);
        println!(
            "{:>3}  {:<20} {} blocks, {} min",
            p.minutes,
            p.name,
            p.blocks.len(),
            total / 60
        );
    }
    Ok(())
}

fn load_blocks(
    config: &Config,
    preset_minutes: Option<u32>,
    workout: Option<String>,
) -> Result<Vec<BlockDefinition>> {
    match (preset_minutes, workout) {
        (_, Some(name)) => {
            let store = WorkoutStore::new(config.data.workouts_path());
            Ok(store.get(&name)?.blocks)
        }
        (Some(minutes), None) => {
            let blocks = preset(minutes);
            if blocks.is_empty() {
                return Err(Error::Other(format!("Unknown preset: {} minutes", minutes)));
            }
            Ok(blocks)
        }
        (None, None) => Err(Error::Other("Choose --preset or --workout".into())),
    }
}

fn cmd_run(
    config: &Config,
    preset_minutes: Option<u32>,
    workout: Option<String>,
    tick_ms: Option<u64>,
    no_input: bool,
    seed: Option<u64>,
) -> Result<()> {
    let blocks = load_blocks(config, preset_minutes, workout)?;
    let mut config = config.clone();
    if seed.is_some() {
        config.session.seed = seed;
    }
    let mut session = Session::from_config(&config)?;
    session.load(blocks);

    let tick = Duration::from_millis(tick_ms.unwrap_or(config.session.tick_millis));
    let grace_ticks = config.session.auto_reset_grace_secs;
    tracing::debug!(
        "Running {} blocks, {:?} per tick, auto-reset after {} ticks",
        session.blocks().len(),
        tick,
        grace_ticks
    );
    let mut console = ConsoleRenderer::new(io::stdout(), session.content().clone());
    let mut intents = if no_input { None } else { Some(spawn_intent_reader()) };

    if !no_input {
        print_controls();
    }
    dispatch(&mut console, &session.start());
    if session.status() != SessionStatus::Running {
        return Err(Error::Other("Workout has nothing to run".into()));
    }

    let mut deadline = Instant::now() + tick;
    let mut completed_ticks = 0;

    loop {
        if let Some(rx) = intents.as_ref() {
            let wait = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(wait) {
                Ok(Intent::Quit) => break,
                Ok(intent) => {
                    let events = apply_intent(&mut session, intent);
                    dispatch(&mut console, &events);
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("Input closed");
                    intents = None;
                }
            }
        } else {
            std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
        }
        deadline += tick;

        dispatch(&mut console, &session.tick());

        match session.completion_token() {
            Some(token) => {
                completed_ticks += 1;
                if completed_ticks > grace_ticks {
                    dispatch(&mut console, &session.fire_auto_reset(token));
                    break;
                }
            }
            None => completed_ticks = 0,
        }

        // Nothing can resume a stopped session once input is gone
        if intents.is_none()
            && matches!(session.status(), SessionStatus::Idle | SessionStatus::Paused)
        {
            break;
        }
    }

    Ok(())
}

fn cmd_workouts(config: &Config, action: WorkoutAction) -> Result<()> {
    let store = WorkoutStore::new(config.data.workouts_path());

    match action {
        WorkoutAction::List => {
            let workouts = store.list()?;
            if workouts.is_empty() {
                println!("No saved workouts.");
            }
            for w in workouts {
                let total = sequence_seconds(&w.blocks);
                println!(
                    "{:<24} {} blocks, {} min  (saved {})",
                    w.name,
                    w.blocks.len(),
                    total / 60,
                    w.created_at.format("%Y-%m-%d")
                );
            }
        }
        WorkoutAction::Show { name } => {
            let workout = store.get(&name)?;
            let content = ContentPack::from_config(config)?;
            println!("{}", workout.name);
            for (i, block) in workout.blocks.iter().enumerate() {
                println!("  {}. {}", i, describe_block(block, &content));
            }
        }
        WorkoutAction::Save { name, preset: minutes } => {
            let blocks = load_blocks(config, Some(minutes), None)?;
            let saved = store.save(&name, blocks)?;
            println!("✓ Saved '{}' ({} blocks)", saved.name, saved.blocks.len());
        }
        WorkoutAction::Rename { from, to } => {
            store.rename(&from, &to)?;
            println!("✓ Renamed '{}' to '{}'", from, to);
        }
        WorkoutAction::Delete { name } => {
            store.delete(&name)?;
            println!("✓ Deleted '{}'", name);
        }
        WorkoutAction::AddBlock { name, kind } => {
            let kind = BlockKind::parse(&kind)
                .ok_or_else(|| Error::InvalidBlock(format!("Unknown block kind: {}", kind)))?;
            let saved = store.modify_blocks(&name, |blocks| {
                blocks.push(BlockDefinition::new(kind));
                Ok(())
            })?;
            println!(
                "✓ Added {} block to '{}' ({} blocks)",
                kind.key(),
                saved.name,
                saved.blocks.len()
            );
        }
        WorkoutAction::RemoveBlock { name, index } => {
            let saved = store.modify_blocks(&name, |blocks| {
                if index >= blocks.len() {
                    return Err(Error::IndexOutOfRange {
                        index,
                        len: blocks.len(),
                    });
                }
                blocks.remove(index);
                Ok(())
            })?;
            println!(
                "✓ Removed block {} from '{}' ({} blocks)",
                index,
                saved.name,
                saved.blocks.len()
            );
        }
    }

    Ok(())
}

fn describe_block(block: &BlockDefinition, content: &ContentPack) -> String {
    let name = content.block_name(block.kind);
    match block.kind.phase_rule() {
        PhaseRule::Strength => {
            let exercises: Vec<String> = block
                .exercises
                .iter()
                .map(|e| format!("{} x{}", content.exercise_name(e.exercise), e.reps))
                .collect();
            format!(
                "{}: {} rounds, rest {}s [{}]",
                name,
                block.rounds,
                block.rest_duration(),
                exercises.join(", ")
            )
        }
        PhaseRule::Timed => format!(
            "{}: {} x {} / rest {}",
            name,
            block.rounds,
            clock(block.work_seconds),
            clock(block.rest_duration())
        ),
    }
}

fn clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

// ----------------------------------------------------------------------
// Live session
// ----------------------------------------------------------------------

enum Intent {
    StartResume,
    Pause,
    Reset,
    SkipRound,
    SkipBlock,
    Quit,
    Unknown(String),
}

fn parse_intent(line: &str) -> Intent {
    match line.trim().to_lowercase().as_str() {
        "" | "s" => Intent::StartResume,
        "p" => Intent::Pause,
        "r" => Intent::Reset,
        "n" => Intent::SkipRound,
        "b" => Intent::SkipBlock,
        "q" => Intent::Quit,
        other => Intent::Unknown(other.to_string()),
    }
}

fn apply_intent(session: &mut Session, intent: Intent) -> Vec<Event> {
    match intent {
        Intent::StartResume => session.start(),
        Intent::Pause => session.pause(),
        Intent::Reset => session.reset_to_initial_state(),
        Intent::SkipRound => session.skip_to_next_round(),
        Intent::SkipBlock => session.skip_to_next_block(),
        Intent::Quit => Vec::new(),
        Intent::Unknown(input) => {
            println!("Unknown command '{}'", input);
            print_controls();
            Vec::new()
        }
    }
}

/// Stdin lines arrive on a channel so the tick loop can wait on both
fn spawn_intent_reader() -> Receiver<Intent> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(parse_intent(&line)).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_controls() {
    println!("─────────────────────────────────────────");
    println!("  Enter/'s' start or resume   'p' pause   'r' reset");
    println!("  'n' next round   'b' next block   'q' quit");
    println!("─────────────────────────────────────────");
}

/// Text renderer for the terminal
struct ConsoleRenderer<W: Write> {
    out: W,
    content: ContentPack,
}

impl<W: Write> ConsoleRenderer<W> {
    fn new(out: W, content: ContentPack) -> Self {
        Self { out, content }
    }
}

impl<W: Write> CueRenderer for ConsoleRenderer<W> {
    fn render(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Signal => writeln!(self.out, "  * bell *")?,
            Event::Spoken(cue) => writeln!(self.out, "  » {}", cue.text)?,
            Event::Started { .. } => writeln!(self.out, "▶ Started")?,
            Event::Resumed { remaining_seconds } => {
                writeln!(self.out, "▶ Resumed ({} left)", clock(*remaining_seconds))?
            }
            Event::Paused { remaining_seconds } => {
                writeln!(self.out, "⏸ Paused ({} left)", clock(*remaining_seconds))?
            }
            Event::BlockStarted {
                block_index,
                kind,
                duration_seconds,
            } => {
                writeln!(self.out)?;
                writeln!(
                    self.out,
                    "╭─ Block {}: {} ({})",
                    block_index + 1,
                    self.content.block_name(*kind),
                    clock(*duration_seconds)
                )?
            }
            Event::RoundStarted {
                round,
                total_rounds,
                duration_seconds,
            } => writeln!(
                self.out,
                "│  Round {}/{} ({})",
                round,
                total_rounds,
                clock(*duration_seconds)
            )?,
            Event::RestStarted {
                duration_seconds, ..
            } => writeln!(self.out, "│  Rest ({})", clock(*duration_seconds))?,
            Event::ExerciseStarted {
                number,
                exercise,
                reps,
                ..
            } => writeln!(
                self.out,
                "│  Exercise {}: {} x{}",
                number,
                self.content.exercise_name(*exercise),
                reps
            )?,
            Event::Completed => writeln!(self.out, "╰─ ✓ Session complete")?,
            Event::Reset => writeln!(self.out, "Session reset.")?,
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intent() {
        assert!(matches!(parse_intent(""), Intent::StartResume));
        assert!(matches!(parse_intent(" P "), Intent::Pause));
        assert!(matches!(parse_intent("b"), Intent::SkipBlock));
        assert!(matches!(parse_intent("x"), Intent::Unknown(_)));
    }

    #[test]
    fn test_console_renderer_output() {
        let mut console = ConsoleRenderer::new(Vec::new(), ContentPack::default());
        dispatch(
            &mut console,
            &[
                Event::BlockStarted {
                    block_index: 0,
                    kind: BlockKind::HeavyBag,
                    duration_seconds: 180,
                },
                Event::spoken(CueClass::Technique, "Double Jab"),
            ],
        );
        let text = String::from_utf8(console.out).unwrap();
        assert!(text.contains("Block 1: Heavy bag (3:00)"));
        assert!(text.contains("» Double Jab"));
    }

    #[test]
    fn test_clock_format() {
        assert_eq!(clock(0), "0:00");
        assert_eq!(clock(95), "1:35");
    }
}
