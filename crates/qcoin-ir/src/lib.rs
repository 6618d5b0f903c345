//! qcoin Program Intermediate Representation
//!
//! This crate provides the data structures for quantum programs that mix
//! gates, mid-circuit measurement and classical control flow. Programs render
//! as Quil text and are executed by a backend from `qcoin-hal`.
//!
//! # Core Components
//!
//! - **Qubits**: [`QubitId`] addresses a qubit on the target machine
//! - **Classical memory**: [`MemoryRegion`] declarations (`BIT`, `INTEGER`)
//!   and [`MemoryReference`]s into them
//! - **Gates**: [`StandardGate`] for built-in gates (H, X, CNOT, ...)
//! - **Instructions**: [`Instruction`] covering gates, `MEASURE`, `RESET`,
//!   labels, jumps and classical arithmetic
//! - **Program**: [`Program`] builder with `if_then` / `while_do` helpers
//!
//! # Example: Conditional Penalty
//!
//! ```rust
//! use qcoin_ir::{MemoryType, Program};
//!
//! let mut program = Program::new();
//! let ro = program.declare("ro", MemoryType::Bit, 3).unwrap();
//! let verif = program.declare("verif", MemoryType::Bit, 1).unwrap();
//!
//! program.h(1).unwrap();
//! program.measure(0, verif.at(0));
//!
//! // When player 1 reads 0, flip it and mark the auxiliary qubit.
//! let mut penalty = Program::new();
//! penalty.x(0).unwrap().x(2).unwrap();
//! program.if_then(verif.at(0), Program::new(), penalty).unwrap();
//!
//! program.measure_all(&ro);
//! program.wrap_in_numshots_loop(30);
//!
//! assert_eq!(program.num_qubits(), 3);
//! assert!(program.to_string().contains("JUMP-WHEN"));
//! ```

pub mod error;
pub mod gate;
pub mod instruction;
pub mod memory;
pub mod program;
pub mod qubit;

pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{ClassicalOperand, Instruction, Label};
pub use memory::{MemoryReference, MemoryRegion, MemoryType};
pub use program::Program;
pub use qubit::QubitId;
