//! Quantum virtual machine backend.

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use qcoin_hal::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, Capabilities, ExecutionResult,
    HalError, HalResult, Job, JobId, JobStatus,
};
use qcoin_ir::Program;

use crate::executable::Executable;
use crate::interpreter::{self, DEFAULT_MAX_STEPS_PER_SHOT};

/// Largest machine `get_qc` hands out unless configured otherwise.
pub const DEFAULT_MAX_QUBITS: u32 = 20;

/// Hard ceiling on simulated qubits; a 28-qubit statevector takes 4 GiB.
pub const MAX_SIMULATED_QUBITS: u32 = 28;

/// Settings read from [`BackendConfig::extra`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QvmConfig {
    /// Upper bound on `N` in `"<N>q-qvm"`.
    pub max_qubits: u32,
    /// Seed for reproducible sampling.
    pub seed: Option<u64>,
    /// Instructions a single shot may execute before it is aborted.
    pub max_steps_per_shot: u64,
}

impl Default for QvmConfig {
    fn default() -> Self {
        Self {
            max_qubits: DEFAULT_MAX_QUBITS,
            seed: None,
            max_steps_per_shot: DEFAULT_MAX_STEPS_PER_SHOT,
        }
    }
}

impl QvmConfig {
    fn validate(&self) -> HalResult<()> {
        if self.max_qubits == 0 {
            return Err(HalError::Configuration("max_qubits must be at least 1".into()));
        }
        if self.max_qubits > MAX_SIMULATED_QUBITS {
            return Err(HalError::Configuration(format!(
                "max_qubits must be at most {MAX_SIMULATED_QUBITS}, got {}",
                self.max_qubits
            )));
        }
        if self.max_steps_per_shot == 0 {
            return Err(HalError::Configuration(
                "max_steps_per_shot must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

struct QvmJob {
    job: Job,
    result: Option<ExecutionResult>,
}

type JobTable = Arc<Mutex<FxHashMap<String, QvmJob>>>;

fn lock_jobs(jobs: &Mutex<FxHashMap<String, QvmJob>>) -> MutexGuard<'_, FxHashMap<String, QvmJob>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Local quantum virtual machine.
///
/// Shots run on a statevector with mid-circuit measurement, so programs may
/// branch on measured bits. One instance can be shared by many threads:
/// [`QvmBackend::run`] only takes `&self`.
pub struct QvmBackend {
    capabilities: Capabilities,
    config: QvmConfig,
    jobs: JobTable,
    /// Executions started so far; mixed into the seed.
    runs: AtomicU64,
}

impl QvmBackend {
    /// Create a machine with `num_qubits` qubits and default settings.
    pub fn new(num_qubits: u32) -> Self {
        Self::with_config(num_qubits, QvmConfig::default())
    }

    /// Create a machine with `num_qubits` qubits.
    pub fn with_config(num_qubits: u32, config: QvmConfig) -> Self {
        Self {
            capabilities: Capabilities::qvm(format!("{num_qubits}q-qvm"), num_qubits),
            config,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
            runs: AtomicU64::new(0),
        }
    }

    /// Make sampling reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.capabilities.num_qubits
    }

    /// Active settings.
    pub fn config(&self) -> &QvmConfig {
        &self.config
    }

    /// Resolve labels and memory of `program` for this machine.
    pub fn compile(&self, program: &Program) -> HalResult<Executable> {
        Executable::compile(program, self.capabilities.num_qubits as usize)
    }

    /// Execute every shot of `exe` on the calling thread.
    #[instrument(skip(self, exe), fields(backend = %self.capabilities.name, shots = exe.num_shots()))]
    pub fn run(&self, exe: &Executable) -> HalResult<ExecutionResult> {
        check_shots(exe.num_shots(), self.capabilities.max_shots)?;
        run_executable(
            exe,
            self.next_rng(),
            self.config.max_steps_per_shot,
            &self.capabilities.name,
        )
    }

    fn next_rng(&self) -> StdRng {
        let run = self.runs.fetch_add(1, Ordering::Relaxed);
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ run),
            None => StdRng::from_entropy(),
        }
    }
}

fn check_shots(shots: u32, max_shots: u32) -> HalResult<()> {
    if shots == 0 {
        return Err(HalError::InvalidShots("shots must be at least 1".into()));
    }
    if shots > max_shots {
        return Err(HalError::InvalidShots(format!(
            "{shots} shots requested, limit is {max_shots}"
        )));
    }
    Ok(())
}

fn run_executable(
    exe: &Executable,
    mut rng: StdRng,
    max_steps: u64,
    backend: &str,
) -> HalResult<ExecutionResult> {
    let start = Instant::now();
    debug!(
        "Starting execution: {} qubits, {} instructions, {} shots",
        exe.num_qubits(),
        exe.len(),
        exe.num_shots()
    );

    let registers = interpreter::execute(exe, &mut rng, max_steps)?;

    let elapsed = start.elapsed();
    debug!("Execution completed in {:?}", elapsed);

    Ok(ExecutionResult::new(registers, exe.num_shots())
        .with_execution_time(elapsed.as_millis() as u64)
        .with_metadata("backend", serde_json::Value::from(backend)))
}

#[async_trait]
impl Backend for QvmBackend {
    fn name(&self) -> &str {
        &self.capabilities.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::always_available())
    }

    #[instrument(skip(self, program), fields(backend = %self.capabilities.name))]
    async fn submit(&self, program: &Program, shots: u32) -> HalResult<JobId> {
        check_shots(shots, self.capabilities.max_shots)?;

        let mut program = program.clone();
        program.wrap_in_numshots_loop(shots);
        let exe = self.compile(&program)?;

        let job_id = JobId::new(Uuid::new_v4().to_string());
        lock_jobs(&self.jobs).insert(
            job_id.0.clone(),
            QvmJob {
                job: Job::new(job_id.clone(), shots, self.name()),
                result: None,
            },
        );
        debug!("Submitted job: {}", job_id);

        let jobs = Arc::clone(&self.jobs);
        let id = job_id.0.clone();
        let rng = self.next_rng();
        let max_steps = self.config.max_steps_per_shot;
        let backend = self.capabilities.name.clone();

        tokio::task::spawn_blocking(move || {
            let started = lock_jobs(&jobs)
                .get_mut(&id)
                .is_some_and(|entry| entry.job.transition(JobStatus::Running));
            if !started {
                debug!("Job {} was cancelled before it started", id);
                return;
            }

            let outcome = run_executable(&exe, rng, max_steps, &backend);

            let mut jobs = lock_jobs(&jobs);
            let Some(entry) = jobs.get_mut(&id) else {
                return;
            };
            match outcome {
                Ok(result) => {
                    if entry.job.transition(JobStatus::Completed) {
                        entry.result = Some(result);
                    }
                }
                Err(e) => {
                    warn!("Job {} failed: {}", id, e);
                    entry.job.transition(JobStatus::Failed(e.to_string()));
                }
            }
        });

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        lock_jobs(&self.jobs)
            .get(&job_id.0)
            .map(|j| j.job.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let jobs = lock_jobs(&self.jobs);
        let entry = jobs
            .get(&job_id.0)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;

        if let Some(result) = &entry.result {
            return Ok(result.clone());
        }
        match &entry.job.status {
            JobStatus::Failed(msg) => Err(HalError::JobFailed(msg.clone())),
            JobStatus::Cancelled => Err(HalError::JobCancelled),
            status => Err(HalError::Backend(format!(
                "job {job_id} has no result yet ({status})"
            ))),
        }
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        let mut jobs = lock_jobs(&self.jobs);
        let entry = jobs
            .get_mut(&job_id.0)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        if !entry.job.transition(JobStatus::Cancelled) {
            debug!("Job {} already {}", job_id, entry.job.status);
        }
        Ok(())
    }
}

impl BackendFactory for QvmBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let qvm: QvmConfig = serde_json::from_value(serde_json::Value::Object(config.extra))?;
        qvm.validate()?;
        let num_qubits = parse_qvm_name(&config.name, qvm.max_qubits)?;
        Ok(Self::with_config(num_qubits, qvm))
    }
}

/// Look up a quantum computer by name.
///
/// Accepts `"<N>q-qvm"` with `N` between 1 and [`DEFAULT_MAX_QUBITS`].
pub fn get_qc(name: &str) -> HalResult<QvmBackend> {
    get_qc_with(name, QvmConfig::default())
}

/// [`get_qc`] with explicit settings.
pub fn get_qc_with(name: &str, config: QvmConfig) -> HalResult<QvmBackend> {
    config.validate()?;
    let num_qubits = parse_qvm_name(name, config.max_qubits)?;
    debug!("Created {} (seed: {:?})", name, config.seed);
    Ok(QvmBackend::with_config(num_qubits, config))
}

fn parse_qvm_name(name: &str, max_qubits: u32) -> HalResult<u32> {
    name.strip_suffix("q-qvm")
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|n| (1..=max_qubits).contains(n))
        .ok_or_else(|| {
            HalError::BackendUnavailable(format!(
                "unknown quantum computer '{name}' (expected <N>q-qvm with N in 1..={max_qubits})"
            ))
        })
}
