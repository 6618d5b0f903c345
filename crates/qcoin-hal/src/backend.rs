//! Backend trait and configuration.
//!
//! A backend goes through the job lifecycle
//!
//! ```text
//!   capabilities() ──→ validate() ──→ submit() ──→ status() ──→ result()
//!    (sync, &ref)       (async)       (async)      (async)      (async)
//! ```
//!
//! Implementations are `Send + Sync` so one instance can be shared by every
//! worker of a pool through an `Arc`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use qcoin_ir::{Instruction, Program};

use crate::capability::{Capabilities, FEATURE_DYNAMIC_CIRCUITS};
use crate::error::{HalError, HalResult};
use crate::job::{JobId, JobStatus};
use crate::result::ExecutionResult;

/// Polling interval used by [`Backend::wait`].
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Upper bound on the time [`Backend::wait`] blocks for.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for a backend instance.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name of the backend, e.g. `2q-qvm`.
    pub name: String,
    /// Backend-specific settings.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Create a new backend configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Add a backend-specific setting.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("name", &self.name)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Trait for quantum backends.
///
/// - `capabilities()` is synchronous and infallible; implementations cache
///   it at construction time.
/// - `submit()` returns a job that starts `Queued`.
/// - `result()` is only meaningful once `status()` reports `Completed`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Check whether the backend accepts jobs right now.
    async fn availability(&self) -> HalResult<BackendAvailability>;

    /// Validate a program against the backend's capabilities.
    ///
    /// The default checks qubit count, gate support and whether the backend
    /// can branch on measured values.
    async fn validate(&self, program: &Program) -> HalResult<ValidationResult> {
        Ok(validate_against(self.capabilities(), program))
    }

    /// Submit a program for `shots` executions.
    async fn submit(&self, program: &Program, shots: u32) -> HalResult<JobId>;

    /// Get the status of a job.
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Get the result of a completed job.
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult>;

    /// Cancel a job that has not finished.
    async fn cancel(&self, job_id: &JobId) -> HalResult<()>;

    /// Wait for a job to complete and return its result.
    ///
    /// Polls every [`WAIT_POLL_INTERVAL`] for up to [`WAIT_TIMEOUT`].
    async fn wait(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let max_polls = WAIT_TIMEOUT.as_millis() / WAIT_POLL_INTERVAL.as_millis();

        for _ in 0..max_polls {
            match self.status(job_id).await? {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(msg) => return Err(HalError::JobFailed(msg)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {
                    tokio::time::sleep(WAIT_POLL_INTERVAL).await;
                }
            }
        }

        Err(HalError::Timeout(job_id.0.clone()))
    }
}

/// Check a program against a capability descriptor.
pub fn validate_against(caps: &Capabilities, program: &Program) -> ValidationResult {
    let mut reasons = vec![];

    let needed = program.num_qubits();
    if needed > caps.num_qubits as usize {
        reasons.push(format!(
            "program uses {needed} qubits but {} has {}",
            caps.name, caps.num_qubits
        ));
    }

    for inst in program.instructions() {
        if let Instruction::Gate { gate, .. } = inst {
            if !caps.gate_set.contains(gate) {
                reasons.push(format!("gate {gate} is not supported"));
            }
        }
    }

    let branches = program
        .instructions()
        .iter()
        .any(|i| i.jump_target().is_some());
    if branches && !caps.has_feature(FEATURE_DYNAMIC_CIRCUITS) {
        reasons.push("classical control flow is not supported".to_string());
    }

    if reasons.is_empty() {
        ValidationResult::Valid
    } else {
        debug!(count = reasons.len(), "program failed validation");
        ValidationResult::Invalid { reasons }
    }
}

/// Backend availability information.
#[derive(Debug, Clone)]
pub struct BackendAvailability {
    /// Whether the backend is currently accepting jobs.
    pub is_available: bool,
    /// Number of jobs currently in queue (if known).
    pub queue_depth: Option<u32>,
    /// Human-readable status message.
    pub status_message: Option<String>,
}

impl BackendAvailability {
    /// A backend that is always ready, such as a local simulator.
    pub fn always_available() -> Self {
        Self {
            is_available: true,
            queue_depth: Some(0),
            status_message: None,
        }
    }

    /// An offline backend.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_available: false,
            queue_depth: None,
            status_message: Some(reason.into()),
        }
    }
}

/// Outcome of [`Backend::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The program can be submitted as-is.
    Valid,
    /// The program cannot run on this backend.
    Invalid {
        /// Reasons the program is invalid.
        reasons: Vec<String>,
    },
}

impl ValidationResult {
    /// Check if the program is valid.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Trait for creating backends from configuration.
pub trait BackendFactory: Backend + Sized {
    /// Create a backend from configuration.
    fn from_config(config: BackendConfig) -> HalResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::GateSet;
    use qcoin_ir::MemoryType;

    #[test]
    fn test_backend_config() {
        let config =
            BackendConfig::new("3q-qvm").with_extra("seed", serde_json::json!(7));
        assert_eq!(config.name, "3q-qvm");
        assert_eq!(config.extra.get("seed"), Some(&serde_json::json!(7)));
    }

    #[test]
    fn test_backend_config_flattened_json() {
        let config: BackendConfig =
            serde_json::from_str(r#"{"name":"2q-qvm","max_qubits":4}"#).unwrap();
        assert_eq!(config.name, "2q-qvm");
        assert!(config.extra.contains_key("max_qubits"));
    }

    #[test]
    fn test_backend_availability() {
        assert!(BackendAvailability::always_available().is_available);
        let down = BackendAvailability::unavailable("maintenance");
        assert!(!down.is_available);
        assert_eq!(down.status_message.as_deref(), Some("maintenance"));
    }

    #[test]
    fn test_validate_qubit_count() {
        let caps = Capabilities::qvm("2q-qvm", 2);
        let mut program = Program::new();
        program.x(2).unwrap();

        let result = validate_against(&caps, &program);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_validate_gate_set_and_branching() {
        let mut caps = Capabilities::qvm("2q-qvm", 2);
        caps.gate_set = GateSet {
            gates: vec!["H".into()],
        };
        caps.features.clear();

        let mut program = Program::new();
        let c = program.declare("c", MemoryType::Bit, 1).unwrap();
        program.x(0).unwrap();
        program
            .if_then(c.at(0), Program::new(), Program::new())
            .unwrap();

        match validate_against(&caps, &program) {
            ValidationResult::Invalid { reasons } => assert_eq!(reasons.len(), 2),
            ValidationResult::Valid => panic!("expected invalid program"),
        }
    }

    #[test]
    fn test_validate_accepts_game_program() {
        let caps = Capabilities::qvm("2q-qvm", 2);
        let mut program = Program::new();
        let ro = program.declare("ro", MemoryType::Bit, 2).unwrap();
        program.h(0).unwrap().h(1).unwrap();
        program.measure_all(&ro);
        assert_eq!(validate_against(&caps, &program), ValidationResult::Valid);
    }
}
