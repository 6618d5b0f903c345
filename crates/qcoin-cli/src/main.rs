//! qcoin command-line interface
//!
//! Plays the coin-flip cheater detection game on the local QVM, in
//! parallel or driven by classical control flow.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::EnvFilter;

use qcoin_games::GameKind;

mod commands;

use commands::{compare, control, demo, parallel, version};

/// qcoin - quantum cheater detection on a local QVM
#[derive(Parser)]
#[command(name = "qcoin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game on a pool of worker threads
    Parallel {
        /// Game to play (fair, cheater, counterattack)
        #[arg(short, long, default_value = "fair")]
        game: GameKind,

        /// Number of worker threads
        #[arg(short, long, default_value = "4")]
        threads: usize,

        /// Shots per worker
        #[arg(short, long, default_value = "50")]
        shots: u32,

        /// Seed for the simulator
        #[arg(long, env = "QCOIN_SEED")]
        seed: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Compare one sequential run with a parallel one of the same size
    Compare {
        /// Number of worker threads
        #[arg(short, long, default_value = "4")]
        threads: usize,

        /// Total shots, split evenly across workers
        #[arg(long, default_value = "200")]
        total_shots: u32,

        /// Seed for the simulator
        #[arg(long, env = "QCOIN_SEED")]
        seed: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Run the classical control-flow scenarios
    Control {
        /// Scenario to run
        #[arg(short, long, value_enum, default_value_t = ControlPart::All)]
        part: ControlPart,

        /// Attempt budget of the retry loop
        #[arg(long, default_value = "1")]
        max_attempts: u32,

        /// Shots per part (defaults per part)
        #[arg(short, long)]
        shots: Option<u32>,

        /// Seed for the simulator
        #[arg(long, env = "QCOIN_SEED")]
        seed: Option<u64>,
    },

    /// Run every game, the speedup comparison and all control scenarios
    Demo {
        /// Seed for the simulator
        #[arg(long, env = "QCOIN_SEED")]
        seed: Option<u64>,
    },

    /// Show version information
    Version,
}

/// Report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Control-flow scenario selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ControlPart {
    /// IF/ELSE cheat detection
    #[value(name = "1")]
    IfElse,
    /// WHILE retry until the coins differ
    #[value(name = "2")]
    While,
    /// Conditional penalty
    #[value(name = "3")]
    Penalty,
    /// Nested multilevel detection
    #[value(name = "4")]
    Multilevel,
    /// All four, then the summary
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Parallel {
            game,
            threads,
            shots,
            seed,
            format,
        } => parallel::execute(game, threads, shots, seed, format).await,

        Commands::Compare {
            threads,
            total_shots,
            seed,
            format,
        } => compare::execute(threads, total_shots, seed, format).await,

        Commands::Control {
            part,
            max_attempts,
            shots,
            seed,
        } => control::execute(part, max_attempts, shots, seed).await,

        Commands::Demo { seed } => demo::execute(seed).await,

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
