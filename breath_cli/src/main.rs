use breath_core::generator::budget_seconds;
use breath_core::*;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "breathe")]
#[command(about = "Guided breathing session timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override config file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a breathing plan and print it
    Plan {
        /// Session length in minutes, at most one day (defaults to the configured length)
        #[arg(
            long,
            allow_negative_numbers = true,
            value_parser = clap::value_parser!(i64).range(..=MAX_DURATION_MINUTES)
        )]
        minutes: Option<i64>,

        /// Seed for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a breathing session (default)
    Run {
        /// Session length in minutes, at most one day (defaults to the configured length)
        #[arg(
            long,
            allow_negative_numbers = true,
            value_parser = clap::value_parser!(i64).range(..=MAX_DURATION_MINUTES)
        )]
        minutes: Option<i64>,

        /// Seed for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,

        /// Tick length in milliseconds (for testing)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Ignore keyboard controls on stdin
        #[arg(long)]
        no_input: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    breath_core::logging::init_with_level(breath_core::logging::level_for_verbosity(cli.verbose));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Plan {
            minutes,
            seed,
            json,
        }) => cmd_plan(&config, minutes, seed, json),
        Some(Commands::Run {
            minutes,
            seed,
            tick_ms,
            no_input,
        }) => cmd_run(config, minutes, seed, tick_ms, no_input).await,
        None => {
            // Default to an interactive run
            cmd_run(config, None, None, None, false).await
        }
    }
}

fn cmd_plan(config: &Config, minutes: Option<i64>, seed: Option<u64>, json: bool) -> Result<()> {
    let minutes = minutes.unwrap_or(config.session.default_duration_minutes);
    let mut generator = match seed {
        Some(seed) => SequenceGenerator::seeded(config.generator, seed)?,
        None => SequenceGenerator::from_os_rng(config.generator)?,
    };
    let sequence = generator.generate(minutes);

    if json {
        let plan = serde_json::json!({
            "minutes": minutes,
            "budget_seconds": budget_seconds(minutes),
            "total_seconds": sequence.total_seconds(),
            "exercises": sequence,
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    display_plan(minutes, &sequence);
    Ok(())
}

async fn cmd_run(
    mut config: Config,
    minutes: Option<i64>,
    seed: Option<u64>,
    tick_ms: Option<u64>,
    no_input: bool,
) -> Result<()> {
    if let Some(tick_ms) = tick_ms {
        config.session.tick_millis = tick_ms;
    }
    let minutes = minutes.unwrap_or(config.session.default_duration_minutes);

    let controller = Arc::new(match seed {
        Some(seed) => SessionController::seeded(&config, seed)?,
        None => SessionController::new(&config)?,
    });
    controller.generate(minutes);

    let sequence = controller.snapshot().sequence;
    display_plan(minutes, &sequence);
    if !no_input {
        println!("Controls: 'p' pause, 'r' resume, 's' skip, 'q' quit (+ Enter)");
    }

    // Completion may be reported by any start call, including restarts after a skip
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();
    let notify = |tx: &mpsc::UnboundedSender<()>| {
        let tx = tx.clone();
        move || {
            let _ = tx.send(());
        }
    };

    let mut updates = controller.subscribe();
    controller.start(notify(&done_tx))?;

    let mut input = (!no_input).then(|| BufReader::new(tokio::io::stdin()).lines());
    let mut last_shown = None;

    loop {
        tokio::select! {
            _ = done_rx.recv() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                render(&snapshot, &mut last_shown);
            }
            line = next_line(&mut input) => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed, continuing without controls");
                    input = None;
                    continue;
                };
                tracing::debug!("Control input: {:?}", line);
                match parse_control(&line) {
                    Some(Control::Pause) => {
                        controller.pause();
                        println!("  ⏸ Paused");
                    }
                    Some(Control::Resume) => {
                        controller.resume();
                        println!("  ▶ Resumed");
                    }
                    Some(Control::Skip) => {
                        controller.skip_exercise();
                        let snapshot = controller.snapshot();
                        println!(
                            "  ⏭ Skipped to exercise {} of {}",
                            (snapshot.current_index + 1).min(snapshot.sequence.len()),
                            snapshot.sequence.len()
                        );
                        controller.start(notify(&done_tx))?;
                    }
                    Some(Control::Quit) => {
                        controller.dispose();
                        println!("\nSession abandoned.");
                        return Ok(());
                    }
                    None => {
                        eprintln!("Unknown command: {:?} (use p, r, s or q)", line.trim());
                    }
                }
            }
        }
    }

    println!("\n✓ Session complete");
    Ok(())
}

async fn next_line(input: &mut Option<Lines<BufReader<Stdin>>>) -> std::io::Result<Option<String>> {
    match input {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

enum Control {
    Pause,
    Resume,
    Skip,
    Quit,
}

fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_lowercase().as_str() {
        "p" | "pause" => Some(Control::Pause),
        "r" | "resume" => Some(Control::Resume),
        "s" | "skip" => Some(Control::Skip),
        "q" | "quit" => Some(Control::Quit),
        _ => None,
    }
}

fn render(snapshot: &SessionSnapshot, last_shown: &mut Option<(usize, Phase, u32)>) {
    if !snapshot.is_running || snapshot.is_completed() {
        return;
    }
    let key = (snapshot.current_index, snapshot.current_phase, snapshot.time_left);
    if *last_shown == Some(key) {
        return;
    }
    *last_shown = Some(key);

    println!(
        "  [{}/{}] {:<6} {:>2}s",
        snapshot.current_index + 1,
        snapshot.sequence.len(),
        snapshot.current_phase,
        snapshot.time_left
    );
}

fn display_plan(minutes: i64, sequence: &Sequence) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  BREATHING PLAN · {} min", minutes);
    println!("╰─────────────────────────────────────────╯");
    println!();

    if sequence.is_empty() {
        println!("  No exercises fit in a {}-minute budget.", minutes);
        println!();
        return;
    }

    println!("    #  Inhale  Hold  Exhale  Total");
    for (i, exercise) in sequence.iter().enumerate() {
        println!(
            "  {:>3}  {:>5}s {:>4}s {:>6}s {:>5}s",
            i + 1,
            exercise.inhale_seconds(),
            exercise.hold_seconds(),
            exercise.exhale_seconds(),
            exercise.total_seconds()
        );
    }
    println!();
    println!(
        "  Total: {}s of {}s budget ({} exercises)",
        sequence.total_seconds(),
        budget_seconds(minutes),
        sequence.len()
    );
    println!();
}
