//! Parallel shot execution over a shared QVM.
//!
//! One [`QvmBackend`] and one [`Program`] are shared by every worker through
//! an `Arc`; each worker wraps its own copy of the program in a shot count,
//! compiles it and runs it on a blocking thread. Results are consumed in
//! completion order.

use anyhow::{Context, bail};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};

use qcoin_adapter_qvm::{QvmBackend, QvmConfig, get_qc_with};
use qcoin_hal::{ExecutionResult, HalResult};
use qcoin_ir::Program;

use crate::analysis::{GameStats, analyze_game};
use crate::game::{GameKind, game_program};
use crate::{create_spinner, print_failure, print_header, print_result, print_section, print_success};

/// Settings of one parallel run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Game to play.
    pub game: GameKind,
    /// Number of worker threads.
    pub threads: usize,
    /// Shots each worker executes.
    pub shots_per_thread: u32,
    /// Seed for the shared backend.
    pub seed: Option<u64>,
    /// Suppress console output.
    pub quiet: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            game: GameKind::Fair,
            threads: 4,
            shots_per_thread: 50,
            seed: None,
            quiet: false,
        }
    }
}

impl ParallelConfig {
    /// Config for `game` with default pool size.
    pub fn for_game(game: GameKind) -> Self {
        Self {
            game,
            ..Self::default()
        }
    }

    /// Total simulations requested.
    pub fn total_shots(&self) -> u64 {
        self.threads as u64 * u64::from(self.shots_per_thread)
    }
}

/// Output of one worker.
#[derive(Debug, Clone)]
pub struct ThreadRun {
    /// Worker index.
    pub thread_id: usize,
    /// Readout of the worker's shots.
    pub result: ExecutionResult,
    /// Wall time of compile plus run.
    pub execution_time: Duration,
    /// Shots executed.
    pub num_shots: u32,
}

/// Run `program` for `shots` shots on `qc`, timing the call.
///
/// `program` is copied before the shot count is set, so one program can be
/// shared by many callers.
pub fn run_simulation_single(
    qc: &QvmBackend,
    program: &Program,
    shots: u32,
    thread_id: usize,
) -> HalResult<ThreadRun> {
    let start = Instant::now();

    let mut wrapped = program.clone();
    wrapped.wrap_in_numshots_loop(shots);
    let executable = qc.compile(&wrapped)?;
    let result = qc.run(&executable)?;

    let execution_time = start.elapsed();
    debug!(thread_id, shots, ?execution_time, "worker finished");

    Ok(ThreadRun {
        thread_id,
        result,
        execution_time,
        num_shots: shots,
    })
}

/// Timing of one successful worker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreadTiming {
    /// Worker index.
    pub thread_id: usize,
    /// Seconds the worker took.
    pub seconds: f64,
}

/// Aggregated result of [`run_parallel`].
#[derive(Debug, Clone, Serialize)]
pub struct ParallelReport {
    /// Game played.
    pub game: GameKind,
    /// Machine the game ran on.
    pub backend: String,
    /// Workers started.
    pub threads: usize,
    /// Shots per worker.
    pub shots_per_thread: u32,
    /// Statistics over every successful worker's rows.
    pub stats: GameStats,
    /// Per-worker timings, in completion order.
    pub thread_times: Vec<ThreadTiming>,
    /// Workers that failed, sorted.
    pub failed_threads: Vec<usize>,
    /// Wall time of the whole pool.
    pub total_time_secs: f64,
    /// Mean worker time.
    pub mean_thread_time_secs: f64,
    /// Throughput of the pool.
    pub simulations_per_second: f64,
    /// Raw worker outputs.
    #[serde(skip)]
    pub runs: Vec<ThreadRun>,
}

impl ParallelReport {
    /// Print the analysis and performance blocks.
    pub fn print(&self) {
        print_section("Analysis of results");
        self.stats.print();

        println!();
        println!("Performance:");
        print_result("Total time", format!("{:.3}s", self.total_time_secs));
        print_result(
            "Mean time per thread",
            format!("{:.3}s", self.mean_thread_time_secs),
        );
        print_result(
            "Simulations per second",
            format!("{:.1}", self.simulations_per_second),
        );
        if !self.failed_threads.is_empty() {
            print_result("Failed threads", format!("{:?}", self.failed_threads));
        }
    }
}

fn shared_backend(qc_name: &str, seed: Option<u64>) -> anyhow::Result<QvmBackend> {
    let config = QvmConfig {
        seed,
        ..QvmConfig::default()
    };
    get_qc_with(qc_name, config).with_context(|| format!("Failed to create {qc_name}"))
}

/// Play `config.game` on a pool of `config.threads` workers.
///
/// A worker that fails or panics is reported and left out of the
/// statistics; the run only fails when no worker succeeds.
pub async fn run_parallel(config: &ParallelConfig) -> anyhow::Result<ParallelReport> {
    check_pool(config)?;

    let game = config.game;
    let qc_name = game.qc_name();

    let qc = Arc::new(shared_backend(&qc_name, config.seed)?);
    let program =
        Arc::new(game_program(game, game.num_qubits()).context("Failed to build game program")?);

    if !config.quiet {
        print_header(&format!("Parallel execution: {}", game.name().to_uppercase()));
        println!("Configuration:");
        print_result("Threads", config.threads);
        print_result("Shots per thread", config.shots_per_thread);
        print_result("Total simulations", config.total_shots());
        println!();
        println!("Program:");
        print!("{program}");
        println!();
    }

    let shots = config.shots_per_thread;
    run_parallel_with(config, move |thread_id| {
        run_simulation_single(&qc, &program, shots, thread_id)
    })
    .await
}

/// Run `worker` once per thread id on a pool of `config.threads` blocking
/// tasks and aggregate the `ro` rows of every worker that succeeds.
///
/// Rows are analysed as `config.game`; failed and panicked workers are
/// listed in [`ParallelReport::failed_threads`].
pub async fn run_parallel_with<F>(
    config: &ParallelConfig,
    worker: F,
) -> anyhow::Result<ParallelReport>
where
    F: Fn(usize) -> HalResult<ThreadRun> + Send + Sync + 'static,
{
    check_pool(config)?;

    let game = config.game;
    let qc_name = game.qc_name();

    info!(
        game = %game,
        backend = %qc_name,
        threads = config.threads,
        shots_per_thread = config.shots_per_thread,
        "Starting parallel run"
    );

    let spinner = (!config.quiet).then(|| create_spinner("Running workers..."));
    let start = Instant::now();

    let worker = Arc::new(worker);
    let mut workers = JoinSet::new();
    let mut task_threads: FxHashMap<task::Id, usize> = FxHashMap::default();
    for thread_id in 0..config.threads {
        let worker = Arc::clone(&worker);
        let handle = workers.spawn_blocking(move || worker(thread_id));
        task_threads.insert(handle.id(), thread_id);
    }

    let mut runs = Vec::with_capacity(config.threads);
    let mut failed = Vec::new();

    while let Some(joined) = workers.join_next_with_id().await {
        let line = match joined {
            Ok((_, Ok(run))) => {
                let line = format!(
                    "Thread {} completed in {:.3}s",
                    run.thread_id,
                    run.execution_time.as_secs_f64()
                );
                runs.push(run);
                Ok(line)
            }
            Ok((id, Err(e))) => {
                let thread_id = task_threads.get(&id).copied().unwrap_or_default();
                failed.push(thread_id);
                warn!(thread_id, error = %e, "Worker failed");
                Err(failure_line(thread_id, &e))
            }
            Err(e) => {
                let thread_id = task_threads.get(&e.id()).copied().unwrap_or_default();
                failed.push(thread_id);
                warn!(thread_id, error = %e, "Worker task aborted");
                Err(failure_line(thread_id, &e))
            }
        };
        if !config.quiet {
            emit(spinner.as_ref(), line);
        }
    }

    let total_time = start.elapsed();
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    failed.sort_unstable();

    if runs.is_empty() {
        bail!("all {} worker threads failed", config.threads);
    }

    let rows: Vec<Vec<i64>> = runs
        .iter()
        .flat_map(|run| run.result.readout("ro").iter().cloned())
        .collect();
    let stats = analyze_game(&rows, game.num_qubits() as usize);

    let thread_times: Vec<ThreadTiming> = runs
        .iter()
        .map(|run| ThreadTiming {
            thread_id: run.thread_id,
            seconds: run.execution_time.as_secs_f64(),
        })
        .collect();
    let mean_thread_time_secs =
        thread_times.iter().map(|t| t.seconds).sum::<f64>() / thread_times.len() as f64;
    let total_time_secs = total_time.as_secs_f64();
    let simulations_per_second = if total_time_secs > 0.0 {
        stats.total as f64 / total_time_secs
    } else {
        0.0
    };

    info!(
        total = stats.total,
        failed = failed.len(),
        elapsed = ?total_time,
        "Parallel run finished"
    );

    let report = ParallelReport {
        game,
        backend: qc_name,
        threads: config.threads,
        shots_per_thread: config.shots_per_thread,
        stats,
        thread_times,
        failed_threads: failed,
        total_time_secs,
        mean_thread_time_secs,
        simulations_per_second,
        runs,
    };

    if !config.quiet {
        report.print();
    }

    Ok(report)
}

fn failure_line(thread_id: usize, error: &dyn std::fmt::Display) -> String {
    format!("Thread {thread_id} failed: {error}")
}

fn check_pool(config: &ParallelConfig) -> anyhow::Result<()> {
    if config.threads == 0 {
        bail!("at least one thread is required");
    }
    if config.shots_per_thread == 0 {
        bail!("shots per thread must be at least 1");
    }
    Ok(())
}

fn emit(spinner: Option<&ProgressBar>, line: Result<String, String>) {
    let show = || match &line {
        Ok(msg) => print_success(msg),
        Err(msg) => print_failure(msg),
    };
    match spinner {
        Some(spinner) => spinner.suspend(show),
        None => show(),
    }
}

/// Sequential versus parallel timing of the fair game.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    /// Workers used for the parallel leg.
    pub threads: usize,
    /// Shots in each leg.
    pub total_shots: u32,
    /// Wall time of the single-call leg.
    pub sequential_secs: f64,
    /// Wall time of the parallel leg.
    pub parallel_secs: f64,
    /// `sequential_secs / parallel_secs`.
    pub speedup: f64,
    /// `(speedup - 1) * 100`.
    pub improvement_percent: f64,
    /// The parallel leg.
    pub parallel: ParallelReport,
}

impl ComparisonReport {
    /// Print the comparison block.
    pub fn print(&self) {
        print_section("Comparison result");
        print_result("Sequential time", format!("{:.3}s", self.sequential_secs));
        print_result("Parallel time", format!("{:.3}s", self.parallel_secs));
        print_result("Speedup", format!("{:.2}x", self.speedup));
        print_result("Improvement", format!("{:.1}%", self.improvement_percent));
    }
}

/// Run the fair game once with `total_shots` shots in one call, then
/// spread across `threads` workers, and compare wall times.
pub async fn compare_sequential_parallel(
    threads: usize,
    total_shots: u32,
    seed: Option<u64>,
    quiet: bool,
) -> anyhow::Result<ComparisonReport> {
    if threads == 0 {
        bail!("at least one thread is required");
    }
    let shots_per_thread = total_shots / threads as u32;
    if shots_per_thread == 0 {
        bail!("{total_shots} shots cannot be split across {threads} threads");
    }

    if !quiet {
        print_header("Comparison: sequential vs parallel");
        println!("Running sequential version...");
    }

    let start = Instant::now();
    let qc_name = GameKind::Fair.qc_name();
    let qc = shared_backend(&qc_name, seed)?;
    let program = game_program(GameKind::Fair, GameKind::Fair.num_qubits())
        .context("Failed to build game program")?;
    tokio::task::spawn_blocking(move || run_simulation_single(&qc, &program, total_shots, 0))
        .await
        .context("Sequential run aborted")?
        .context("Sequential run failed")?;
    let sequential = start.elapsed();

    if !quiet {
        println!("Sequential time: {:.3}s", sequential.as_secs_f64());
        println!();
        println!("Running parallel version...");
    }

    let start = Instant::now();
    let parallel_report = run_parallel(&ParallelConfig {
        game: GameKind::Fair,
        threads,
        shots_per_thread,
        seed,
        quiet,
    })
    .await?;
    let parallel = start.elapsed();

    let sequential_secs = sequential.as_secs_f64();
    let parallel_secs = parallel.as_secs_f64();
    let speedup = if parallel_secs > 0.0 {
        sequential_secs / parallel_secs
    } else {
        1.0
    };

    let report = ComparisonReport {
        threads,
        total_shots,
        sequential_secs,
        parallel_secs,
        speedup,
        improvement_percent: (speedup - 1.0) * 100.0,
        parallel: parallel_report,
    };

    if !quiet {
        report.print();
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(game: GameKind, threads: usize, shots_per_thread: u32) -> ParallelConfig {
        ParallelConfig {
            game,
            threads,
            shots_per_thread,
            seed: Some(2024),
            quiet: true,
        }
    }

    #[test]
    fn test_default_config() {
        let config = ParallelConfig::default();
        assert_eq!(config.threads, 4);
        assert_eq!(config.shots_per_thread, 50);
        assert_eq!(config.total_shots(), 200);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ParallelConfig =
            serde_json::from_str(r#"{"game":"cheater","threads":2}"#).unwrap();
        assert_eq!(config.game, GameKind::Cheater);
        assert_eq!(config.threads, 2);
        assert_eq!(config.shots_per_thread, 50);
    }

    #[test]
    fn test_run_simulation_single() {
        let qc = QvmBackend::new(2).with_seed(5);
        let program = game_program(GameKind::Fair, 2).unwrap();
        let run = run_simulation_single(&qc, &program, 30, 7).unwrap();

        assert_eq!(run.thread_id, 7);
        assert_eq!(run.num_shots, 30);
        assert_eq!(run.result.readout("ro").len(), 30);
        // The shared program keeps its own shot count.
        assert_eq!(program.num_shots(), 1);
    }

    #[tokio::test]
    async fn test_run_parallel_totals() {
        let report = run_parallel(&quiet(GameKind::Fair, 4, 25)).await.unwrap();

        assert_eq!(report.stats.total, 100);
        assert_eq!(report.runs.len(), 4);
        assert!(report.failed_threads.is_empty());
        assert_eq!(
            report.stats.player1_wins + report.stats.player2_wins + report.stats.ties,
            100
        );
    }

    #[tokio::test]
    async fn test_cheater_never_loses() {
        let report = run_parallel(&quiet(GameKind::Cheater, 3, 40)).await.unwrap();
        assert_eq!(report.stats.player2_wins, 0);
        assert_eq!(report.stats.total, 120);
    }

    #[tokio::test]
    async fn test_counterattack_player_three() {
        let report = run_parallel(&quiet(GameKind::Counterattack, 2, 20))
            .await
            .unwrap();
        assert_eq!(report.backend, "3q-qvm");
        assert_eq!(report.stats.player3_always_one, Some(true));
    }

    #[tokio::test]
    async fn test_rejects_empty_pool() {
        assert!(run_parallel(&quiet(GameKind::Fair, 0, 10)).await.is_err());
        assert!(run_parallel(&quiet(GameKind::Fair, 2, 0)).await.is_err());
    }

    fn failing_pool(
        fail: usize,
        panic: Option<usize>,
    ) -> impl Fn(usize) -> HalResult<ThreadRun> + Send + Sync + 'static {
        let qc = QvmBackend::new(2).with_seed(9);
        let program = game_program(GameKind::Cheater, 2).unwrap();
        move |thread_id| {
            if thread_id == fail {
                return Err(qcoin_hal::HalError::Execution("detector offline".into()));
            }
            if Some(thread_id) == panic {
                panic!("worker {thread_id} crashed");
            }
            run_simulation_single(&qc, &program, 20, thread_id)
        }
    }

    #[tokio::test]
    async fn test_failed_worker_is_excluded() {
        let config = quiet(GameKind::Cheater, 4, 20);
        let report = run_parallel_with(&config, failing_pool(2, None)).await.unwrap();

        assert_eq!(report.failed_threads, vec![2]);
        assert_eq!(report.runs.len(), 3);
        assert_eq!(report.stats.total, 3 * 20);
        assert!(report.thread_times.iter().all(|t| t.thread_id != 2));
    }

    #[tokio::test]
    async fn test_panicked_worker_is_excluded() {
        let config = quiet(GameKind::Cheater, 4, 20);
        let report = run_parallel_with(&config, failing_pool(0, Some(3)))
            .await
            .unwrap();

        assert_eq!(report.failed_threads, vec![0, 3]);
        assert_eq!(report.stats.total, 2 * 20);
        assert_eq!(report.stats.player2_wins, 0);
    }

    #[tokio::test]
    async fn test_all_workers_failing_is_error() {
        let config = quiet(GameKind::Cheater, 1, 20);
        let err = run_parallel_with(&config, failing_pool(0, None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("all 1 worker threads failed"));
    }

    #[test]
    fn test_failure_line_names_thread() {
        let err = qcoin_hal::HalError::Execution("detector offline".into());
        let line = failure_line(5, &err);
        assert!(line.starts_with("Thread 5 failed: "));
        assert!(line.contains("detector offline"));
    }

    #[tokio::test]
    async fn test_comparison() {
        let report = compare_sequential_parallel(4, 80, Some(1), true).await.unwrap();
        assert_eq!(report.parallel.stats.total, 80);
        assert!(report.speedup > 0.0);
        assert!((report.improvement_percent - (report.speedup - 1.0) * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_comparison_rejects_bad_split() {
        assert!(compare_sequential_parallel(8, 4, None, true).await.is_err());
    }

    #[test]
    fn test_report_json_skips_runs() {
        let report = ParallelReport {
            game: GameKind::Fair,
            backend: "2q-qvm".into(),
            threads: 1,
            shots_per_thread: 1,
            stats: GameStats::default(),
            thread_times: vec![],
            failed_threads: vec![],
            total_time_secs: 0.0,
            mean_thread_time_secs: 0.0,
            simulations_per_second: 0.0,
            runs: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("runs").is_none());
        assert_eq!(json["backend"], "2q-qvm");
    }
}
