use crate::core::job::{JobExecution, JobParameters, JobState};
use crate::utils::error::{BatchError, Result};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Completed run tokens remembered per job for `JobAlreadyComplete` checks.
pub const COMPLETED_TOKENS_KEPT: usize = 256;

#[derive(Debug, Default)]
struct RegistryState {
    next_execution_id: u64,
    active: HashMap<String, JobExecution>,
    completed_tokens: HashMap<String, VecDeque<i64>>,
    latest: HashMap<String, JobExecution>,
}

impl RegistryState {
    fn remember_completed(&mut self, job_name: &str, run_token: i64) {
        let tokens = self.completed_tokens.entry(job_name.to_string()).or_default();
        tokens.push_back(run_token);
        while tokens.len() > COMPLETED_TOKENS_KEPT {
            tokens.pop_front();
        }
    }

    fn has_completed(&self, job_name: &str, run_token: i64) -> bool {
        self.completed_tokens
            .get(job_name)
            .is_some_and(|tokens| tokens.contains(&run_token))
    }
}

/// 記錄每個 job 的執行狀態，避免同一 job 同時執行
///
/// A job may have at most one active execution. A run token that recently
/// completed successfully cannot be started again; a failed token can.
///
/// The lock is never held across an `.await`, which lets [`ActiveRun`]
/// release its slot from `Drop`.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    state: Arc<Mutex<RegistryState>>,
}

/// Claim on a job's single active slot, handed out by [`RunRegistry::begin`].
///
/// Dropping it without calling [`finish`](Self::finish) marks the execution
/// failed and frees the slot, so a cancelled run never blocks later ones.
#[derive(Debug)]
pub struct ActiveRun {
    registry: RunRegistry,
    job_name: String,
    released: bool,
}

impl ActiveRun {
    pub fn finish(mut self, execution: &JobExecution) {
        self.released = true;
        let mut state = self.registry.lock();
        state.active.remove(&execution.job_name);
        if execution.state == JobState::Completed {
            state.remember_completed(&execution.job_name, execution.parameters.run_token);
        }
        state
            .latest
            .insert(execution.job_name.clone(), execution.clone());
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let mut state = self.registry.lock();
        if let Some(mut execution) = state.active.remove(&self.job_name) {
            if !execution.state.is_terminal() {
                execution.state = JobState::Failed;
                execution.failure = Some("run was cancelled before it finished".to_string());
                execution.finished_at = Some(Utc::now());
            }
            tracing::warn!(
                "⚠️ Job '{}' execution {} abandoned in {:?}",
                self.job_name,
                execution.execution_id,
                execution.state
            );
            state.latest.insert(self.job_name.clone(), execution);
        }
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin(&self, job_name: &str, parameters: JobParameters) -> Result<(JobExecution, ActiveRun)> {
        let mut state = self.lock();

        if state.active.contains_key(job_name) {
            return Err(BatchError::DuplicateRun {
                job_name: job_name.to_string(),
            });
        }
        if state.has_completed(job_name, parameters.run_token) {
            return Err(BatchError::JobAlreadyComplete {
                job_name: job_name.to_string(),
                run_token: parameters.run_token,
            });
        }

        state.next_execution_id += 1;
        let execution = JobExecution {
            execution_id: state.next_execution_id,
            job_name: job_name.to_string(),
            parameters,
            state: JobState::Idle,
            steps: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            failure: None,
        };

        state.active.insert(job_name.to_string(), execution.clone());
        state.latest.insert(job_name.to_string(), execution.clone());

        let guard = ActiveRun {
            registry: self.clone(),
            job_name: job_name.to_string(),
            released: false,
        };
        Ok((execution, guard))
    }

    /// Stores an in-flight snapshot so status queries see progress.
    pub fn record(&self, execution: &JobExecution) {
        let mut state = self.lock();
        if state.active.contains_key(&execution.job_name) {
            state
                .active
                .insert(execution.job_name.clone(), execution.clone());
        }
        state
            .latest
            .insert(execution.job_name.clone(), execution.clone());
    }

    pub fn is_running(&self, job_name: &str) -> bool {
        self.lock().active.contains_key(job_name)
    }

    pub fn latest(&self, job_name: &str) -> Option<JobExecution> {
        self.lock().latest.get(job_name).cloned()
    }
}
