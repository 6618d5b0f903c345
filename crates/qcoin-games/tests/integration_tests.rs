//! Integration tests for the coin games.
//!
//! Statistical checks only assert outcomes that hold with certainty, so they
//! pass for any seed.

use std::sync::Arc;

use qcoin_adapter_qvm::{QvmBackend, get_qc};
use qcoin_games::control::{multilevel_program, penalty_program, retry_program};
use qcoin_games::{
    GameKind, ParallelConfig, analyze_game, game_program, run_parallel, run_simulation_single,
};
use qcoin_hal::{Backend, HalError};

/// Every game runs on the machine its name maps to.
#[test]
fn test_games_run_on_their_machines() {
    for game in GameKind::ALL {
        let qc = get_qc(&game.qc_name()).unwrap();
        let program = game_program(game, game.num_qubits()).unwrap();
        let run = run_simulation_single(&qc, &program, 40, 0).unwrap();

        let rows = run.result.readout("ro");
        assert_eq!(rows.len(), 40);
        assert!(rows.iter().all(|r| r.len() == game.num_qubits() as usize));
    }
}

/// The cheater's coin never reads 1, so player 2 can never win.
#[test]
fn test_cheater_statistics() {
    let qc = QvmBackend::new(2);
    let program = game_program(GameKind::Cheater, 2).unwrap();
    let run = run_simulation_single(&qc, &program, 200, 0).unwrap();

    let stats = analyze_game(run.result.readout("ro"), 2);
    assert_eq!(stats.total, 200);
    assert_eq!(stats.player2_wins, 0);
    assert_eq!(stats.player1_wins + stats.ties, 200);
}

/// Counterattack needs the third qubit.
#[test]
fn test_counterattack_needs_three_qubits() {
    let qc = get_qc("2q-qvm").unwrap();
    let program = game_program(GameKind::Counterattack, 3).unwrap();
    let err = run_simulation_single(&qc, &program, 10, 0).unwrap_err();
    assert!(matches!(err, HalError::ProgramTooLarge(_)));
}

/// Workers sharing one backend and one program all finish.
#[test]
fn test_shared_backend_across_threads() {
    let qc = Arc::new(QvmBackend::new(2).with_seed(17));
    let program = Arc::new(game_program(GameKind::Fair, 2).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let qc = Arc::clone(&qc);
            let program = Arc::clone(&program);
            std::thread::spawn(move || run_simulation_single(&qc, &program, 25, i))
        })
        .collect();

    let total: usize = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap().result.readout("ro").len())
        .sum();
    assert_eq!(total, 100);
}

/// Parallel totals match threads × shots.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_cheater_game() {
    let config = ParallelConfig {
        game: GameKind::Cheater,
        threads: 4,
        shots_per_thread: 50,
        seed: None,
        quiet: true,
    };
    let report = run_parallel(&config).await.unwrap();

    assert_eq!(report.stats.total, 200);
    assert_eq!(report.stats.player2_wins, 0);
    assert_eq!(report.thread_times.len(), 4);
    assert!(report.mean_thread_time_secs >= 0.0);
}

/// The control-flow programs go through the async job interface too.
#[tokio::test]
async fn test_control_programs_via_jobs() {
    let qc = get_qc("3q-qvm").unwrap();

    let job = qc.submit(&penalty_program().unwrap(), 30).await.unwrap();
    let result = qc.wait(&job).await.unwrap();
    assert!(result.readout("ro").iter().all(|r| r[0] == 1 && r[2] == 1));

    let job = qc.submit(&multilevel_program().unwrap(), 25).await.unwrap();
    let result = qc.wait(&job).await.unwrap();
    assert!(result.readout("level").iter().all(|r| r[0] == 1));
    assert!(result.readout("test2").iter().all(|r| r[0] == 0));
}

/// Validation accepts branching programs on the QVM.
#[tokio::test]
async fn test_retry_program_validates() {
    let qc = get_qc("2q-qvm").unwrap();
    let program = retry_program(10).unwrap();
    assert!(qc.validate(&program).await.unwrap().is_valid());

    let job = qc.submit(&program, 50).await.unwrap();
    let result = qc.wait(&job).await.unwrap();
    for (attempts, tie) in result.readout("attempts").iter().zip(result.readout("tie")) {
        assert!(attempts[0] >= 1 && attempts[0] <= 10);
        if tie[0] == 1 {
            assert_eq!(attempts[0], 10);
        }
    }
}
