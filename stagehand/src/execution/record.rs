//! Execution records: one run of a pipeline and its per-stage, per-job and
//! per-step state.

use crate::core::{ApprovalStatus, ExecutionId, ExecutionStatus, JobStatus, StageStatus, StepStatus};
use crate::pipeline::{JobConfig, PipelineConfig, StageConfig, StepAction, StepConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a caller passes to `trigger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TriggerContext {
    /// Branch being built.
    pub branch: String,
    /// Commit sha.
    pub commit: String,
    /// What triggered the run (`manual`, `push`, ...).
    pub trigger: String,
    /// Who triggered the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl TriggerContext {
    /// Creates a context.
    #[must_use]
    pub fn new(
        branch: impl Into<String>,
        commit: impl Into<String>,
        trigger: impl Into<String>,
    ) -> Self {
        Self {
            branch: branch.into(),
            commit: commit.into(),
            trigger: trigger.into(),
            author: None,
        }
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Short version tag derived from the commit (first 8 characters).
    #[must_use]
    pub fn version(&self) -> String {
        self.commit.chars().take(8).collect()
    }
}

/// A timestamped job log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the line was written.
    pub timestamp: DateTime<Utc>,
    /// The line.
    pub message: String,
}

impl LogEntry {
    /// Creates a log line stamped now.
    #[must_use]
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

fn elapsed_ms(start: Option<DateTime<Utc>>, end: DateTime<Utc>) -> Option<i64> {
    start.map(|s| (end - s).num_milliseconds())
}

/// State of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecution {
    /// Step name.
    pub name: String,
    /// Step action.
    pub action: StepAction,
    /// Current status.
    pub status: StepStatus,
    /// When the step started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the step finished.
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepExecution {
    fn seed(config: &StepConfig) -> Self {
        Self {
            name: config.name.clone(),
            action: config.action,
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn finish(&mut self, status: StepStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

/// State of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecution {
    /// Job name.
    pub name: String,
    /// Current status.
    pub status: JobStatus,
    /// When the job started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall time in milliseconds.
    pub duration_ms: Option<i64>,
    /// Job log.
    pub logs: Vec<LogEntry>,
    /// Artifacts published by the job.
    pub artifacts: Vec<String>,
    /// Steps in declaration order.
    pub steps: Vec<StepExecution>,
}

impl JobExecution {
    fn seed(config: &JobConfig) -> Self {
        Self {
            name: config.name.clone(),
            status: JobStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            logs: Vec::new(),
            artifacts: Vec::new(),
            steps: config.steps.iter().map(StepExecution::seed).collect(),
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn finish(&mut self, status: JobStatus) {
        let now = Utc::now();
        self.status = status;
        self.finished_at = Some(now);
        self.duration_ms = elapsed_ms(self.started_at, now);
    }

    pub(crate) fn log(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry::now(message));
    }

    /// Marks the job and its steps skipped.
    pub(crate) fn skip(&mut self) {
        self.status = JobStatus::Skipped;
        for step in &mut self.steps {
            step.status = StepStatus::Skipped;
        }
    }

    /// Timestamp of the first log line matching `message`.
    #[must_use]
    pub fn logged_at(&self, message: &str) -> Option<DateTime<Utc>> {
        self.logs
            .iter()
            .find(|entry| entry.message == message)
            .map(|entry| entry.timestamp)
    }
}

/// State of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageExecution {
    /// Stage name.
    pub name: String,
    /// Current status.
    pub status: StageStatus,
    /// When the stage started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the stage finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall time in milliseconds.
    pub duration_ms: Option<i64>,
    /// Jobs in declaration order.
    pub jobs: Vec<JobExecution>,
    /// Approval state for gated stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalStatus>,
}

impl StageExecution {
    fn seed(config: &StageConfig) -> Self {
        Self {
            name: config.name.clone(),
            status: StageStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            jobs: config.jobs.iter().map(JobExecution::seed).collect(),
            approval: None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = StageStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn finish(&mut self, status: StageStatus) {
        let now = Utc::now();
        self.status = status;
        self.finished_at = Some(now);
        self.duration_ms = elapsed_ms(self.started_at, now);
    }

    /// Marks the stage and everything under it skipped.
    pub(crate) fn skip(&mut self) {
        self.status = StageStatus::Skipped;
        for job in &mut self.jobs {
            job.skip();
        }
    }

    /// Looks up a job by name.
    #[must_use]
    pub fn job(&self, name: &str) -> Option<&JobExecution> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

/// One run of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineExecution {
    /// Execution id.
    pub id: ExecutionId,
    /// Id of the pipeline this run belongs to.
    pub pipeline_id: String,
    /// Current status.
    pub status: ExecutionStatus,
    /// What triggered the run.
    pub trigger: String,
    /// Branch being built.
    pub branch: String,
    /// Commit being built.
    pub commit: String,
    /// Who triggered the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall time in milliseconds.
    pub duration_ms: Option<i64>,
    /// Stages in declaration order.
    pub stages: Vec<StageExecution>,
    /// Deployment handed off after a successful run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    /// Failure message for failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineExecution {
    /// Seeds a pending execution with every stage, job and step pending.
    #[must_use]
    pub fn seed(id: ExecutionId, config: &PipelineConfig, context: &TriggerContext) -> Self {
        Self {
            id,
            pipeline_id: config.id.clone(),
            status: ExecutionStatus::Pending,
            trigger: context.trigger.clone(),
            branch: context.branch.clone(),
            commit: context.commit.clone(),
            author: context.author.clone(),
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
            stages: config.stages.iter().map(StageExecution::seed).collect(),
            deployment_id: None,
            error: None,
        }
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageExecution> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Sets a terminal status and stamps the end time.
    pub(crate) fn finish(&mut self, status: ExecutionStatus) {
        let now = Utc::now();
        self.status = status;
        self.finished_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
    }

    /// Returns true if every dependency of `stage` has succeeded.
    #[must_use]
    pub fn dependencies_met(&self, stage: &StageConfig) -> bool {
        stage.dependencies.iter().all(|dep| {
            self.stage(dep)
                .is_some_and(|s| s.status == StageStatus::Success)
        })
    }
}
