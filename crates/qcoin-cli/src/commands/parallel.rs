//! Parallel command implementation.

use anyhow::Result;

use qcoin_games::{GameKind, ParallelConfig, run_parallel};

use super::common::print_json;
use crate::OutputFormat;

/// Execute the parallel command.
pub async fn execute(
    game: GameKind,
    threads: usize,
    shots: u32,
    seed: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let config = ParallelConfig {
        game,
        threads,
        shots_per_thread: shots,
        seed,
        quiet: format == OutputFormat::Json,
    };

    let report = run_parallel(&config).await?;

    if format == OutputFormat::Json {
        print_json(&report)?;
    }

    Ok(())
}
