//! Error types for the HAL crate.

use thiserror::Error;

use qcoin_ir::IrError;

/// Errors that can occur in HAL operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Backend is not available.
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// Program could not be built.
    #[error("Invalid program: {0}")]
    InvalidProgram(#[from] IrError),

    /// Program does not fit the backend.
    #[error("Program exceeds backend capabilities: {0}")]
    ProgramTooLarge(String),

    /// Program failed to compile (unresolved label, undeclared memory, ...).
    #[error("Compilation failed: {0}")]
    Compilation(String),

    /// Runtime failure while executing a shot.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Job execution failed.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Job was cancelled.
    #[error("Job cancelled")]
    JobCancelled,

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout waiting for job.
    #[error("Timeout waiting for job {0}")]
    Timeout(String),

    /// Unsupported feature.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Invalid number of shots.
    #[error("Invalid shots: {0}")]
    InvalidShots(String),

    /// Generic backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
