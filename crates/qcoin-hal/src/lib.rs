//! qcoin Hardware Abstraction Layer
//!
//! A uniform interface for running [`qcoin_ir::Program`]s on a quantum
//! backend. The workspace ships one implementation, the local quantum
//! virtual machine in `qcoin-adapter-qvm`.
//!
//! # Overview
//!
//! - [`Backend`]: async job lifecycle (validate, submit, status, result, cancel, wait)
//! - [`Capabilities`]: qubit count, gate set and feature flags
//! - [`ExecutionResult`]: per-shot memory contents as a [`RegisterMap`],
//!   plus [`Counts`] histograms
//!
//! # Example
//!
//! ```ignore
//! use qcoin_adapter_qvm::get_qc;
//! use qcoin_hal::Backend;
//! use qcoin_ir::{MemoryType, Program};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let qc = get_qc("2q-qvm")?;
//!
//!     let mut program = Program::new();
//!     let ro = program.declare("ro", MemoryType::Bit, 2)?;
//!     program.h(0)?.h(1)?;
//!     program.measure_all(&ro);
//!
//!     let job_id = qc.submit(&program, 100).await?;
//!     let result = qc.wait(&job_id).await?;
//!     println!("{:?}", result.counts("ro"));
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod capability;
pub mod error;
pub mod job;
pub mod result;

pub use backend::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, ValidationResult,
    validate_against,
};
pub use capability::{Capabilities, GateSet};
pub use error::{HalError, HalResult};
pub use job::{Job, JobId, JobStatus};
pub use result::{Counts, ExecutionResult, Readout, RegisterMap};
