use crate::core::registry::RunRegistry;
use crate::core::step::StepReport;
use crate::utils::error::{BatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which half of the transfer a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobPhase {
    Load,
    Export,
}

impl JobPhase {
    pub fn running_state(self) -> JobState {
        match self {
            JobPhase::Load => JobState::LoadRunning,
            JobPhase::Export => JobState::ExportRunning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Idle,
    LoadRunning,
    ExportRunning,
    Completed,
    Failed,
}

impl JobState {
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Idle, JobState::LoadRunning)
                | (JobState::LoadRunning, JobState::ExportRunning)
                | (JobState::LoadRunning, JobState::Failed)
                | (JobState::ExportRunning, JobState::Completed)
                | (JobState::ExportRunning, JobState::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Distinguishes one launch from another. The token carries no meaning for
/// the steps themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters {
    pub run_token: i64,
}

impl JobParameters {
    pub fn new(run_token: i64) -> Self {
        Self { run_token }
    }

    /// Uses the current epoch milliseconds as the token.
    pub fn now() -> Self {
        Self::new(Utc::now().timestamp_millis())
    }
}

/// Job 執行紀錄
#[derive(Debug, Clone, Serialize)]
pub struct JobExecution {
    pub execution_id: u64,
    pub job_name: String,
    pub parameters: JobParameters,
    pub state: JobState,
    pub steps: Vec<StepReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure: Option<String>,
}

impl JobExecution {
    fn advance(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(BatchError::ConfigError {
                message: format!(
                    "job '{}' cannot move from {:?} to {:?}",
                    self.job_name, self.state, next
                ),
            });
        }
        tracing::debug!("🔀 Job '{}': {:?} -> {:?}", self.job_name, self.state, next);
        self.state = next;
        Ok(())
    }

    /// 獲取執行摘要
    pub fn summary(&self) -> serde_json::Value {
        let total_read: usize = self.steps.iter().map(|s| s.read_count).sum();
        let total_written: usize = self.steps.iter().map(|s| s.write_count).sum();
        let total_duration_ms: u64 = self.steps.iter().map(|s| s.duration_ms).sum();
        let executed_steps: Vec<&str> = self.steps.iter().map(|s| s.step_name.as_str()).collect();

        serde_json::json!({
            "execution_id": self.execution_id,
            "job_name": self.job_name,
            "run_token": self.parameters.run_token,
            "state": self.state,
            "total_steps": self.steps.len(),
            "total_read": total_read,
            "total_written": total_written,
            "total_duration_ms": total_duration_ms,
            "executed_steps": executed_steps,
        })
    }
}

/// One phase of a sequenced run.
#[async_trait::async_trait]
pub trait JobStep: Send + Sync {
    fn name(&self) -> &str;

    fn phase(&self) -> JobPhase;

    async fn execute(&self) -> Result<StepReport>;
}

/// Runs its steps strictly one after another; the first failure ends the run.
pub struct JobSequence {
    name: String,
    steps: Vec<Box<dyn JobStep>>,
    registry: RunRegistry,
}

impl JobSequence {
    pub fn new(name: impl Into<String>, registry: RunRegistry) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            registry,
        }
    }

    pub fn add_step(&mut self, step: Box<dyn JobStep>) {
        self.steps.push(step);
    }

    pub fn with_step(mut self, step: Box<dyn JobStep>) -> Self {
        self.add_step(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Starts a run. Rejected up front with [`BatchError::DuplicateRun`] or
    /// [`BatchError::JobAlreadyComplete`]; otherwise returns the completed
    /// execution or the error that aborted it.
    ///
    /// If the returned future is dropped mid-run, the execution is recorded
    /// as failed and the job becomes available again.
    pub async fn run(&self, parameters: JobParameters) -> Result<JobExecution> {
        let (mut execution, active) = self.registry.begin(&self.name, parameters).map_err(|e| {
            tracing::warn!("⛔ Job '{}' rejected: {}", self.name, e);
            e
        })?;

        tracing::info!(
            "🚀 Job '{}' started (execution {}, run token {})",
            self.name,
            execution.execution_id,
            parameters.run_token
        );

        let outcome = self.run_steps(&mut execution).await;
        execution.finished_at = Some(Utc::now());

        match outcome {
            Ok(()) => {
                active.finish(&execution);
                tracing::info!("🏁 Job '{}' completed: {}", self.name, execution.summary());
                Ok(execution)
            }
            Err(e) => {
                execution.state = JobState::Failed;
                execution.failure = Some(e.to_string());
                active.finish(&execution);
                tracing::error!("❌ Job '{}' failed: {}", self.name, e);
                Err(e)
            }
        }
    }

    async fn run_steps(&self, execution: &mut JobExecution) -> Result<()> {
        for step in &self.steps {
            execution.advance(step.phase().running_state())?;
            self.registry.record(execution);

            match step.execute().await {
                Ok(report) => {
                    execution.steps.push(report);
                    self.registry.record(execution);
                }
                Err(e) => {
                    return Err(BatchError::StepFailed {
                        step: step.name().to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }

        execution.advance(JobState::Completed)
    }
}
