//! Classical control flow on the coin game: branching on measurements,
//! bounded retry loops and nested conditionals.
//!
//! Every scenario builds its program, prints it, runs it on a fresh QVM and
//! returns a report that tests can inspect.

use anyhow::{Context, bail};
use serde::Serialize;
use tracing::info;

use qcoin_adapter_qvm::{QvmBackend, QvmConfig, get_qc_with};
use qcoin_hal::Readout;
use qcoin_ir::{IrResult, MemoryType, Program};

use crate::{print_header, print_info, print_result, print_success};

/// Upper bound accepted for the retry loop.
pub const MAX_RETRY_ATTEMPTS: u32 = 1_000;

fn machine(name: &str, seed: Option<u64>) -> anyhow::Result<QvmBackend> {
    let config = QvmConfig {
        seed,
        ..QvmConfig::default()
    };
    get_qc_with(name, config).with_context(|| format!("Failed to create {name}"))
}

fn execute(qc: &QvmBackend, program: &Program, shots: u32) -> anyhow::Result<qcoin_hal::ExecutionResult> {
    let mut wrapped = program.clone();
    wrapped.wrap_in_numshots_loop(shots);
    let executable = qc.compile(&wrapped).context("Compilation failed")?;
    qc.run(&executable).context("Execution failed")
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "YES" } else { "NO" }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

// =============================================================================
// Part 1: cheat detection with if/else
// =============================================================================

/// One round of the two-throw check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheatRound {
    /// Player 1, first throw.
    pub p1_first: i64,
    /// Player 2, first throw.
    pub p2_first: i64,
    /// Player 1, second throw.
    pub p1_second: i64,
    /// Player 2, second throw.
    pub p2_second: i64,
    /// Player 1 repeated their result.
    pub penalized: bool,
}

/// Result of [`cheat_detection_if_else`].
#[derive(Debug, Clone, Serialize)]
pub struct CheatDetectionReport {
    /// Round-by-round comparison.
    pub rounds: Vec<CheatRound>,
    /// Rounds in which player 1 was penalised.
    pub penalized: usize,
}

/// One throw of the cheater game: player 1 idles, player 2 flips.
pub fn throw_program() -> IrResult<Program> {
    let mut program = Program::new();
    let ro = program.declare("ro", MemoryType::Bit, 2)?;
    program.h(1)?;
    program.measure_all(&ro);
    Ok(program)
}

/// Throw twice per round and penalise player 1 whenever both throws agree.
pub fn cheat_detection_if_else(rounds: u32, seed: Option<u64>) -> anyhow::Result<CheatDetectionReport> {
    print_header("Part 1: cheat detection with if/else");
    println!("Player 1 is measured in two consecutive throws.");
    println!("Repeating the same result is penalised.");
    println!();

    let qc = machine("2q-qvm", seed)?;
    let first = throw_program()?;
    let second = throw_program()?;

    println!("First throw:");
    print!("{first}");
    println!();
    println!("Second throw:");
    print!("{second}");
    println!();

    let first_result = execute(&qc, &first, rounds)?;
    let second_result = execute(&qc, &second, rounds)?;

    let rounds: Vec<CheatRound> = first_result
        .readout("ro")
        .iter()
        .zip(second_result.readout("ro"))
        .map(|(a, b)| CheatRound {
            p1_first: a[0],
            p2_first: a[1],
            p1_second: b[0],
            p2_second: b[1],
            penalized: a[0] == b[0],
        })
        .collect();
    let penalized = rounds.iter().filter(|r| r.penalized).count();

    println!("Measurements and penalties:");
    println!(
        "{:<8} {:<8} {:<8} {:<8} {:<8} {:<10}",
        "Round", "P1-1", "P2-1", "P1-2", "P2-2", "Penalized"
    );
    println!("{}", "-".repeat(56));
    for (i, r) in rounds.iter().enumerate() {
        println!(
            "{:<8} {:<8} {:<8} {:<8} {:<8} {:<10}",
            i + 1,
            r.p1_first,
            r.p2_first,
            r.p1_second,
            r.p2_second,
            yes_no(r.penalized)
        );
    }
    println!();

    info!(rounds = rounds.len(), penalized, "Cheat detection finished");
    Ok(CheatDetectionReport { rounds, penalized })
}

// =============================================================================
// Part 2: retries with while
// =============================================================================

/// Final state of one retry shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryShot {
    /// Coins of the last attempt.
    pub coins: [i64; 2],
    /// Attempts made.
    pub attempts: i64,
    /// The last attempt was still a tie.
    pub tie: bool,
}

/// Result of [`retry_while`].
#[derive(Debug, Clone, Serialize)]
pub struct RetryReport {
    /// Attempt budget per shot.
    pub max_attempts: u32,
    /// Every shot.
    pub shots: Vec<RetryShot>,
    /// Shots that ended with a winner.
    pub no_ties: usize,
    /// Shots that ran out of attempts on a tie.
    pub ties: usize,
    /// Mean attempts per shot.
    pub mean_attempts: f64,
}

impl RetryReport {
    /// Share of shots that ended with a winner.
    pub fn success_percent(&self) -> f64 {
        rate(self.no_ties, self.shots.len())
    }
}

/// Flip both coins until they differ, at most `max_attempts` times.
///
/// ```text
/// MOVE attempts[0] 0; MOVE tie[0] 1; MOVE go[0] 1
/// while go[0]:
///     RESET 0; RESET 1; H 0; H 1; MEASURE
///     EQ tie[0] ro[0] ro[1]
///     ADD attempts[0] 1
///     LT below[0] attempts[0] max_attempts
///     go[0] := below[0] ? tie[0] : 0
/// ```
pub fn retry_program(max_attempts: u32) -> IrResult<Program> {
    let mut program = Program::new();
    let ro = program.declare("ro", MemoryType::Bit, 2)?;
    let attempts = program.declare("attempts", MemoryType::Integer, 1)?;
    let tie = program.declare("tie", MemoryType::Bit, 1)?;
    let below = program.declare("below", MemoryType::Bit, 1)?;
    let go = program.declare("go", MemoryType::Bit, 1)?;

    program
        .mov(attempts.at(0), 0)
        .mov(tie.at(0), 1)
        .mov(go.at(0), 1);

    let mut body = Program::new();
    body.reset(0).reset(1);
    body.h(0)?.h(1)?;
    body.measure_all(&ro);
    body.equal(tie.at(0), ro.at(0), ro.at(1));
    body.add(attempts.at(0), 1);
    body.less_than(below.at(0), attempts.at(0), i64::from(max_attempts));

    let mut keep_going = Program::new();
    keep_going.mov(go.at(0), tie.at(0));
    let mut stop = Program::new();
    stop.mov(go.at(0), 0);
    body.if_then(below.at(0), keep_going, stop)?;

    program.while_do(go.at(0), body)?;
    Ok(program)
}

/// Retry tied rounds until somebody wins or the budget runs out.
pub fn retry_while(shots: u32, max_attempts: u32, seed: Option<u64>) -> anyhow::Result<RetryReport> {
    if !(1..=MAX_RETRY_ATTEMPTS).contains(&max_attempts) {
        bail!("max attempts must be between 1 and {MAX_RETRY_ATTEMPTS}, got {max_attempts}");
    }

    print_header("Part 2: retries with while");
    println!("Both coins are flipped again while they agree,");
    println!("up to {max_attempts} attempt(s) per shot.");
    println!();

    let qc = machine("2q-qvm", seed)?;
    let program = retry_program(max_attempts)?;

    println!("Program:");
    print!("{program}");
    println!();

    let result = execute(&qc, &program, shots)?;
    let shots: Vec<RetryShot> = result
        .readout("ro")
        .iter()
        .zip(result.readout("attempts"))
        .zip(result.readout("tie"))
        .map(|((ro, attempts), tie)| RetryShot {
            coins: [ro[0], ro[1]],
            attempts: attempts[0],
            tie: tie[0] == 1,
        })
        .collect();

    let ties = shots.iter().filter(|s| s.tie).count();
    let no_ties = shots.len() - ties;
    let mean_attempts = if shots.is_empty() {
        0.0
    } else {
        shots.iter().map(|s| s.attempts as f64).sum::<f64>() / shots.len() as f64
    };

    let report = RetryReport {
        max_attempts,
        shots,
        no_ties,
        ties,
        mean_attempts,
    };

    println!("Results after {} executions:", report.shots.len());
    print_result("Executions without tie", report.no_ties);
    print_result("Executions still tied", report.ties);
    print_result("Success rate", format!("{:.1}%", report.success_percent()));
    print_result("Mean attempts", format!("{:.2}", report.mean_attempts));
    println!();

    Ok(report)
}

// =============================================================================
// Part 3: conditional penalty
// =============================================================================

/// Result of [`conditional_penalty`].
#[derive(Debug, Clone, Serialize)]
pub struct PenaltyReport {
    /// `ro` rows: player 1, player 2, penalty marker.
    pub rows: Readout,
    /// Shots where the penalty marker is set.
    pub penalties: usize,
    /// Shots where player 1 reads 1.
    pub player1_inverted: usize,
}

impl PenaltyReport {
    /// Share of shots in which player 1 was inverted.
    pub fn effectiveness_percent(&self) -> f64 {
        rate(self.player1_inverted, self.rows.len())
    }
}

/// Measure player 1; when the coin reads 0 flip it and mark qubit 2.
pub fn penalty_program() -> IrResult<Program> {
    let mut program = Program::new();
    let ro = program.declare("ro", MemoryType::Bit, 3)?;
    let verif = program.declare("verif", MemoryType::Bit, 1)?;

    program.h(1)?;
    program.measure(0, verif.at(0));

    let mut penalty = Program::new();
    penalty.x(0)?.x(2)?;
    program.if_then(verif.at(0), Program::new(), penalty)?;

    program.measure_all(&ro);
    Ok(program)
}

/// Penalise the cheater with an `X` when the check catches them.
pub fn conditional_penalty(shots: u32, seed: Option<u64>) -> anyhow::Result<PenaltyReport> {
    print_header("Part 3: conditional penalty");
    println!("A detected cheater gets an X gate, inverting their result.");
    println!();

    let qc = machine("3q-qvm", seed)?;
    let program = penalty_program()?;

    println!("Program with conditional penalty:");
    print!("{program}");
    println!();

    let result = execute(&qc, &program, shots)?;
    let rows = result.readout("ro").to_vec();
    let penalties = rows.iter().filter(|r| r[2] == 1).count();
    let player1_inverted = rows.iter().filter(|r| r[0] == 1).count();

    let report = PenaltyReport {
        rows,
        penalties,
        player1_inverted,
    };

    let total = report.rows.len();
    println!("Results:");
    print_result("Penalties applied", format!("{}/{total}", report.penalties));
    print_result(
        "Player 1 inverted",
        format!("{}/{total}", report.player1_inverted),
    );
    print_result(
        "Penalty effectiveness",
        format!("{:.1}%", report.effectiveness_percent()),
    );

    println!();
    println!("First 10 executions:");
    println!("{:<4} {:<6} {:<6} {:<10}", "#", "P1", "P2", "Penalized");
    println!("{}", "-".repeat(30));
    for (i, row) in report.rows.iter().take(10).enumerate() {
        println!(
            "{:<4} {:<6} {:<6} {:<10}",
            i + 1,
            row[0],
            row[1],
            yes_no(row[2] == 1)
        );
    }
    println!();

    Ok(report)
}

// =============================================================================
// Part 4: nested conditionals
// =============================================================================

/// Result of [`adaptive_multilevel`].
#[derive(Debug, Clone, Serialize)]
pub struct MultilevelReport {
    /// `ro` rows.
    pub rows: Readout,
    /// Shots where the detection marker is set.
    pub detections: usize,
}

impl MultilevelReport {
    /// Share of shots with a detection.
    pub fn detection_rate(&self) -> f64 {
        rate(self.detections, self.rows.len())
    }
}

/// Two-level check: a first 0 on player 1 marks qubit 2, resets and
/// re-measures player 1, and a second 0 confirms the cheat with an `X`.
pub fn multilevel_program() -> IrResult<Program> {
    let mut program = Program::new();
    let ro = program.declare("ro", MemoryType::Bit, 3)?;
    let test1 = program.declare("test1", MemoryType::Bit, 1)?;
    let test2 = program.declare("test2", MemoryType::Bit, 1)?;
    let level = program.declare("level", MemoryType::Bit, 1)?;

    program.h(1)?;
    program.measure(0, test1.at(0));

    let mut confirm = Program::new();
    confirm.x(0)?;

    let mut on_zero = Program::new();
    on_zero.x(2)?;
    on_zero.measure(2, level.at(0));
    on_zero.reset(0);
    on_zero.measure(0, test2.at(0));
    on_zero.if_then(test2.at(0), Program::new(), confirm)?;

    program.if_then(test1.at(0), Program::new(), on_zero)?;
    program.measure_all(&ro);
    Ok(program)
}

/// Run the nested detection scheme.
pub fn adaptive_multilevel(shots: u32, seed: Option<u64>) -> anyhow::Result<MultilevelReport> {
    print_header("Part 4: multilevel control (nested if)");
    println!("Decision levels:");
    println!("  1. Check whether player 1 cheats");
    println!("  2. If so, check again after a reset");
    println!("  3. Apply the matching penalty");
    println!();

    let qc = machine("3q-qvm", seed)?;
    let program = multilevel_program()?;

    println!("Program:");
    print!("{program}");
    println!();

    let result = execute(&qc, &program, shots)?;
    let rows = result.readout("ro").to_vec();
    let detections = rows.iter().filter(|r| r[2] == 1).count();
    let report = MultilevelReport { rows, detections };

    println!("Adaptive system results:");
    print_result(
        "Cheats detected",
        format!("{}/{}", report.detections, report.rows.len()),
    );
    print_result("Detection rate", format!("{:.1}%", report.detection_rate()));
    println!();

    Ok(report)
}

// =============================================================================
// All parts
// =============================================================================

/// Default shots per part, in part order.
pub const DEFAULT_SHOTS: [u32; 4] = [20, 30, 30, 25];

/// Reports of the four scenarios, in part order.
#[derive(Debug, Clone, Serialize)]
pub struct ControlReports {
    /// Part 1.
    pub cheat_detection: CheatDetectionReport,
    /// Part 2.
    pub retry: RetryReport,
    /// Part 3.
    pub penalty: PenaltyReport,
    /// Part 4.
    pub multilevel: MultilevelReport,
}

/// Run the four scenarios and print what they demonstrate.
///
/// `shots` overrides [`DEFAULT_SHOTS`] for every part.
pub fn run_all_control(
    max_attempts: u32,
    shots: Option<u32>,
    seed: Option<u64>,
) -> anyhow::Result<ControlReports> {
    let shots_for = |part: usize| shots.unwrap_or(DEFAULT_SHOTS[part]);
    print_header("Classical control flow on the QVM");

    let reports = ControlReports {
        cheat_detection: cheat_detection_if_else(shots_for(0), seed)?,
        retry: retry_while(shots_for(1), max_attempts, seed)?,
        penalty: conditional_penalty(shots_for(2), seed)?,
        multilevel: adaptive_multilevel(shots_for(3), seed)?,
    };

    print_control_summary();
    Ok(reports)
}

/// Print the list of control-flow concepts the scenarios cover.
pub fn print_control_summary() {
    print_header("Concepts covered");
    print_success("IF/THEN: conditional execution on measured bits");
    print_success("IF/THEN/ELSE: alternative branches");
    print_success("Nested IF: several decision levels");
    print_success("WHILE: loop with an attempt budget");
    print_success("RESET: reusing qubits mid-program");
    print_success("Mid-circuit measurement: classical feedback");
    println!();
    print_info("Applications: error correction, verification protocols,");
    print_info("adaptive algorithms, detection and response systems");
}
