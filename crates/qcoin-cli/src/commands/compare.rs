//! Compare command implementation.

use anyhow::Result;

use qcoin_games::compare_sequential_parallel;

use super::common::print_json;
use crate::OutputFormat;

/// Execute the compare command.
pub async fn execute(
    threads: usize,
    total_shots: u32,
    seed: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let quiet = format == OutputFormat::Json;
    let report = compare_sequential_parallel(threads, total_shots, seed, quiet).await?;

    if quiet {
        print_json(&report)?;
    }

    Ok(())
}
