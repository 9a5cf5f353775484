//! `board` CLI -- conflict detection and recurrence expansion from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Conflict map for a board snapshot (stdin → stdout)
//! cat board.json | board conflicts
//!
//! # Would this block conflict with what is already scheduled?
//! board check -i board.json --block new-block.json --strict
//!
//! # Dates produced by a stored rule
//! board expand --date 2024-01-01 --rule '{"type":"daily","interval":2}' --max-dates 3
//!
//! # Label for a rule
//! board describe --rule '{"type":"custom","daysOfWeek":[1,3,5]}'
//!
//! # One block per occurrence of a recurring template block
//! board materialize -i template.json --rule '{"type":"weekly","maxOccurrences":4}'
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use board_engine::{Board, RecurrenceRule, TimeBlock, DEFAULT_MAX_DATES};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Read};
use std::process;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "board",
    version,
    about = "Schedule board conflict detection and recurrence expansion"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the conflict map of a board snapshot
    Conflicts {
        /// Board JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List the conflicts a new or edited block would introduce
    Check {
        /// Board JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Candidate block JSON file
        #[arg(long)]
        block: String,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Exit with status 1 when the candidate has conflicts
        #[arg(long)]
        strict: bool,
    },
    /// Expand a recurrence rule into dates
    Expand {
        /// Base date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Stored rule JSON; unreadable rules are treated as non-repeating
        #[arg(long, default_value = "none")]
        rule: String,
        /// Safety cap on the number of dates produced
        #[arg(long, env = "BOARD_MAX_DATES", default_value_t = DEFAULT_MAX_DATES)]
        max_dates: usize,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the human-readable label of a recurrence rule
    Describe {
        /// Stored rule JSON
        #[arg(long)]
        rule: String,
    },
    /// Create one block per occurrence of a template block
    Materialize {
        /// Template block JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Stored rule JSON; unreadable rules are treated as non-repeating
        #[arg(long, default_value = "none")]
        rule: String,
        /// Safety cap on the number of blocks produced
        #[arg(long, env = "BOARD_MAX_DATES", default_value_t = DEFAULT_MAX_DATES)]
        max_dates: usize,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let pretty = cli.pretty;

    match cli.command {
        Commands::Conflicts { input, output } => {
            let json = read_input(input.as_deref())?;
            let board = Board::from_json(&json).context("Invalid board snapshot")?;
            let map = board.detect_conflicts();
            debug!(conflicted_blocks = map.len(), "conflicts computed");
            write_json(output.as_deref(), &map, pretty)?;
        }
        Commands::Check {
            input,
            block,
            output,
            strict,
        } => {
            let json = read_input(input.as_deref())?;
            let board = Board::from_json(&json).context("Invalid board snapshot")?;
            let candidate = read_block(&block)?;
            let pairs = board_engine::check_candidate(
                &candidate,
                &board.blocks,
                &board.students,
                &board.aides,
            );
            write_json(output.as_deref(), &pairs, pretty)?;
            if strict && !pairs.is_empty() {
                warn!(
                    block_id = %candidate.id,
                    conflicts = pairs.len(),
                    "candidate block has conflicts"
                );
                process::exit(1);
            }
        }
        Commands::Expand {
            date,
            rule,
            max_dates,
            output,
        } => {
            let base = board_engine::parse_date(&date).context("Invalid --date")?;
            let rule = RecurrenceRule::parse(&rule);
            let dates = board_engine::expand(base, &rule, max_dates);
            write_json(output.as_deref(), &dates, pretty)?;
        }
        Commands::Describe { rule } => {
            println!("{}", RecurrenceRule::parse(&rule).display_text());
        }
        Commands::Materialize {
            input,
            rule,
            max_dates,
            output,
        } => {
            let json = read_input(input.as_deref())?;
            let template: TimeBlock =
                serde_json::from_str(&json).context("Invalid template block")?;
            template.validate().context("Invalid template block")?;
            let rule = RecurrenceRule::parse(&rule);
            let blocks = board_engine::materialize(&template, &rule, max_dates);
            write_json(output.as_deref(), &blocks, pretty)?;
        }
    }

    Ok(())
}

fn read_block(path: &str) -> Result<TimeBlock> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read block file: {}", path))?;
    let block: TimeBlock = serde_json::from_str(&json).context("Invalid candidate block")?;
    block.validate().context("Invalid candidate block")?;
    Ok(block)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json<T: Serialize>(path: Option<&str>, value: &T, pretty: bool) -> Result<()> {
    let mut content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    content.push('\n');

    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
