//! Demo command implementation.
//!
//! Plays every game in parallel, compares against a sequential run, then
//! walks through the control-flow scenarios.

use anyhow::Result;
use console::style;

use qcoin_games::control::run_all_control;
use qcoin_games::{
    GameKind, ParallelConfig, compare_sequential_parallel, print_header, print_success,
    run_parallel,
};

use super::common::blocking;

const DEMO_THREADS: usize = 4;
const DEMO_TOTAL_SHOTS: u32 = 200;

/// Execute the demo command.
pub async fn execute(seed: Option<u64>) -> Result<()> {
    print_header("Quantum coin game: parallel shots and classical control");

    for game in GameKind::ALL {
        run_parallel(&ParallelConfig {
            seed,
            ..ParallelConfig::for_game(game)
        })
        .await?;
    }

    compare_sequential_parallel(DEMO_THREADS, DEMO_TOTAL_SHOTS, seed, false).await?;

    print_header("Conclusions");
    print_success("One quantum computer object is shared by every worker thread");
    print_success("Worker threads run many simulations in parallel");
    print_success("Large batches finish noticeably faster");
    print_success("Useful for statistics and parameter sweeps");

    blocking(move || run_all_control(1, None, seed)).await?;

    println!();
    println!("{}", style("Demo complete.").green().bold());
    Ok(())
}
