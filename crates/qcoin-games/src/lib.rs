//! qcoin games
//!
//! The coin-flip cheater detection game, played on the local QVM:
//!
//! - [`game`]: fair, cheater and counterattack circuits
//! - [`analysis`]: win/tie statistics over readout rows
//! - [`parallel`]: many shots on a pool of worker threads sharing one backend
//! - [`control`]: if/else, while and nested conditionals driven by
//!   mid-circuit measurements
//!
//! # Example
//!
//! ```ignore
//! use qcoin_games::game::GameKind;
//! use qcoin_games::parallel::{ParallelConfig, run_parallel};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let report = run_parallel(&ParallelConfig::for_game(GameKind::Cheater)).await?;
//!     assert_eq!(report.stats.player2_wins, 0);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod control;
pub mod game;
pub mod parallel;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub use analysis::{GameStats, analyze_game};
pub use game::{GameKind, UnknownGameError, game_program};
pub use parallel::{
    ComparisonReport, ParallelConfig, ParallelReport, ThreadRun, compare_sequential_parallel,
    run_parallel, run_parallel_with, run_simulation_single,
};

/// Create a spinner that ticks on its own.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print a header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", style("═".repeat(70)).cyan());
    println!("{}", style(format!("  {title}")).cyan().bold());
    println!("{}", style("═".repeat(70)).cyan());
    println!();
}

/// Print a section title.
pub fn print_section(title: &str) {
    println!();
    println!("{}", style(format!("▶ {title}")).green().bold());
    println!("{}", style("─".repeat(40)).dim());
}

/// Print a result line.
pub fn print_result(label: &str, value: impl std::fmt::Display) {
    println!("  {} {}", style(format!("{label}:")).dim(), value);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print a failure message.
pub fn print_failure(message: &str) {
    println!("{} {}", style("✗").red().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}
