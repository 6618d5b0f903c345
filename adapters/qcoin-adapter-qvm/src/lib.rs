//! qcoin Quantum Virtual Machine
//!
//! A local backend for [`qcoin_ir::Program`]s with classical control flow.
//! Every shot runs on a fresh statevector and zeroed classical memory;
//! measurements collapse the state mid-program, so `JUMP-WHEN` and
//! `JUMP-UNLESS` can branch on the bits just read.
//!
//! # Pipeline
//!
//! ```text
//!   Program ──compile──→ Executable ──run──→ ExecutionResult
//!            (labels,      (flat ops)   (one memory row
//!             memory)                    per region per shot)
//! ```
//!
//! # Limits
//!
//! | Qubits | Statevector memory |
//! |--------|--------------------|
//! | 10 | ~16 KB |
//! | 15 | ~512 KB |
//! | 20 | ~16 MB |
//!
//! Each shot is bounded by a step budget (default 100 000 instructions) so a
//! loop that never clears its condition fails the job instead of hanging.
//!
//! # Example
//!
//! ```
//! use qcoin_adapter_qvm::get_qc;
//! use qcoin_ir::{MemoryType, Program};
//!
//! let qc = get_qc("2q-qvm").unwrap().with_seed(1);
//!
//! let mut program = Program::new();
//! let ro = program.declare("ro", MemoryType::Bit, 2).unwrap();
//! program.h(1).unwrap();
//! program.measure_all(&ro);
//! program.wrap_in_numshots_loop(10);
//!
//! let exe = qc.compile(&program).unwrap();
//! let result = qc.run(&exe).unwrap();
//! // Player 1 never flips the coin.
//! assert!(result.readout("ro").iter().all(|row| row[0] == 0));
//! ```

mod executable;
mod interpreter;
mod qvm;
mod statevector;

pub use executable::Executable;
pub use interpreter::DEFAULT_MAX_STEPS_PER_SHOT;
pub use qvm::{DEFAULT_MAX_QUBITS, MAX_SIMULATED_QUBITS, QvmBackend, QvmConfig, get_qc, get_qc_with};
pub use statevector::Statevector;
