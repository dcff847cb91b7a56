//! The background run of one execution.
//!
//! Stages run in declaration order. A stage runs only when every declared
//! dependency has status `success`; otherwise it is skipped. The first failing
//! stage halts the run and every later stage is skipped.

use super::steps::{StepContext, StepExecutor};
use crate::approval::{ApprovalDecision, ApprovalGate};
use crate::config::CancelMode;
use crate::core::{ApprovalStatus, ExecutionId, ExecutionStatus, StageStatus, StepStatus};
use crate::errors::{RunError, StepError};
use crate::execution::{ExecutionTracker, JobExecution, TrackedExecution};
use crate::integrations::{
    DeploymentInvoker, DeploymentRequest, Metric, MetricUnit, MetricsRecorder,
};
use crate::notify::Notifier;
use crate::pipeline::{Environment, JobConfig, LifecycleEvent, PipelineConfig, StageConfig};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Everything a run hands work off to.
#[derive(Clone)]
pub struct Collaborators {
    /// Runs steps.
    pub steps: Arc<dyn StepExecutor>,
    /// Decides gated stages.
    pub approvals: Arc<dyn ApprovalGate>,
    /// Sends lifecycle notifications.
    pub notifier: Notifier,
    /// Deploys successful staging/production runs.
    pub deployer: Arc<dyn DeploymentInvoker>,
    /// Records run metrics.
    pub metrics: Arc<dyn MetricsRecorder>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

pub(crate) struct ExecutionRun {
    pub(crate) id: ExecutionId,
    pub(crate) config: Arc<PipelineConfig>,
    pub(crate) tracked: Arc<TrackedExecution>,
    pub(crate) tracker: Arc<ExecutionTracker>,
    pub(crate) collaborators: Collaborators,
    pub(crate) cancel_mode: CancelMode,
    pub(crate) branch: String,
    pub(crate) version: String,
}

impl ExecutionRun {
    /// Drives the execution to a terminal state.
    pub(crate) async fn run(self) {
        self.tracked.update(|exec| {
            if exec.status == ExecutionStatus::Pending {
                exec.status = ExecutionStatus::Running;
            }
        });
        info!(pipeline = %self.config.name, "Pipeline execution started");

        self.collaborators
            .notifier
            .notify(&self.config, &self.id, LifecycleEvent::Start)
            .await;

        let outcome = match AssertUnwindSafe(self.run_to_deployment()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(RunError::Internal(panic_message(panic.as_ref()))),
        };

        let status = match outcome {
            Ok(deployment_id) => self.tracker.complete(&self.tracked, self.cancel_mode, |exec| {
                exec.deployment_id = deployment_id;
                exec.finish(ExecutionStatus::Success);
            }),
            Err(err) => {
                error!(error = %err, "Pipeline execution failed");
                if self.config.rollback_on_failure
                    && self.config.environment == Environment::Production
                {
                    warn!("Initiating rollback due to pipeline failure");
                }
                let message = error_chain(&err);
                self.tracker.complete(&self.tracked, self.cancel_mode, |exec| {
                    exec.error = Some(message);
                    exec.finish(ExecutionStatus::Failure);
                })
            }
        };

        match status {
            ExecutionStatus::Success => {
                self.collaborators
                    .notifier
                    .notify(&self.config, &self.id, LifecycleEvent::Success)
                    .await;
            }
            ExecutionStatus::Failure => {
                self.collaborators
                    .notifier
                    .notify(&self.config, &self.id, LifecycleEvent::Failure)
                    .await;
            }
            _ => debug!(status = %status, "No completion notification for status"),
        }

        self.record_metrics(status);
        info!(status = %status, "Pipeline execution finished");
        self.tracked.mark_done();
    }

    async fn run_to_deployment(&self) -> Result<Option<String>, RunError> {
        self.run_stages().await?;

        if !self.config.environment.is_deployable() {
            return Ok(None);
        }

        let request = DeploymentRequest {
            environment: self.config.environment,
            version: self.version.clone(),
            branch: self.branch.clone(),
            features: vec!["ci-cd-deployment".to_string()],
        };
        let receipt = self
            .collaborators
            .deployer
            .deploy(&request)
            .await
            .map_err(RunError::Deployment)?;
        info!(deployment_id = %receipt.deployment_id, "Deployment handed off");
        Ok(Some(receipt.deployment_id))
    }

    async fn run_stages(&self) -> Result<(), RunError> {
        for (index, stage) in self.config.stages.iter().enumerate() {
            if !self.tracked.update(|exec| exec.dependencies_met(stage)) {
                info!(stage = %stage.name, "Dependencies not met; skipping stage");
                self.tracked.update(|exec| exec.stages[index].skip());
                continue;
            }

            if stage.approval_required && !self.await_approval(index, stage).await {
                continue;
            }

            if let Err(err) = self.run_stage(index, stage).await {
                self.tracked.update(|exec| {
                    for later in exec.stages.iter_mut().skip(index + 1) {
                        later.skip();
                    }
                });
                return Err(err);
            }
        }
        Ok(())
    }

    /// Returns true if the stage may run. A rejected stage is marked skipped.
    async fn await_approval(&self, index: usize, stage: &StageConfig) -> bool {
        self.tracked
            .update(|exec| exec.stages[index].approval = Some(ApprovalStatus::Pending));
        self.collaborators
            .notifier
            .notify(&self.config, &self.id, LifecycleEvent::ApprovalRequired)
            .await;

        match self.collaborators.approvals.request(&self.id, &stage.name).await {
            ApprovalDecision::Approved => {
                self.tracked
                    .update(|exec| exec.stages[index].approval = Some(ApprovalStatus::Approved));
                true
            }
            ApprovalDecision::Rejected => {
                let reason = RunError::ApprovalRejected {
                    stage: stage.name.clone(),
                };
                warn!(stage = %stage.name, "{reason}; skipping stage");
                self.tracked.update(|exec| {
                    let record = &mut exec.stages[index];
                    record.approval = Some(ApprovalStatus::Rejected);
                    record.skip();
                });
                false
            }
        }
    }

    async fn run_stage(&self, index: usize, stage: &StageConfig) -> Result<(), RunError> {
        self.tracked.update(|exec| exec.stages[index].start());
        info!(stage = %stage.name, parallel = stage.parallel, "Executing stage");

        let outcome = if stage.parallel {
            let jobs = stage
                .jobs
                .iter()
                .enumerate()
                .map(|(job_index, job)| self.run_job(index, job_index, stage, job));
            join_all(jobs).await.into_iter().find_map(Result::err)
        } else {
            let mut failure = None;
            for (job_index, job) in stage.jobs.iter().enumerate() {
                if let Err(err) = self.run_job(index, job_index, stage, job).await {
                    self.tracked.update(|exec| {
                        for later in exec.stages[index].jobs.iter_mut().skip(job_index + 1) {
                            later.skip();
                        }
                    });
                    failure = Some(err);
                    break;
                }
            }
            failure
        };

        let status = if outcome.is_some() {
            StageStatus::Failure
        } else {
            StageStatus::Success
        };
        self.tracked.update(|exec| exec.stages[index].finish(status));
        info!(stage = %stage.name, status = %status, "Stage finished");

        match outcome {
            None => Ok(()),
            Some(source) => Err(RunError::StageFailed {
                stage: stage.name.clone(),
                source: Box::new(source),
            }),
        }
    }

    fn with_job<R>(
        &self,
        stage_index: usize,
        job_index: usize,
        f: impl FnOnce(&mut JobExecution) -> R,
    ) -> R {
        self.tracked
            .update(|exec| f(&mut exec.stages[stage_index].jobs[job_index]))
    }

    async fn run_job(
        &self,
        stage_index: usize,
        job_index: usize,
        stage: &StageConfig,
        job: &JobConfig,
    ) -> Result<(), RunError> {
        self.with_job(stage_index, job_index, JobExecution::start);
        debug!(stage = %stage.name, job = %job.name, "Executing job");

        let ctx = StepContext {
            execution_id: self.id.clone(),
            pipeline_id: self.config.id.clone(),
            stage: stage.name.clone(),
            job: job.name.clone(),
        };

        for (step_index, step) in job.steps.iter().enumerate() {
            self.with_job(stage_index, job_index, |record| {
                record.steps[step_index].start();
                record.log(format!("Starting: {}", step.name));
            });

            let result = AssertUnwindSafe(self.collaborators.steps.execute(step, &ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(StepError::new(
                        &step.name,
                        format!("panicked: {}", panic_message(panic.as_ref())),
                    ))
                });

            match result {
                Ok(()) => self.with_job(stage_index, job_index, |record| {
                    record.steps[step_index].finish(StepStatus::Success);
                    record.log(format!("Completed: {}", step.name));
                }),
                Err(err) => {
                    self.with_job(stage_index, job_index, |record| {
                        record.steps[step_index].finish(StepStatus::Failure);
                        record.log(format!("Failed: {}", step.name));
                    });

                    if step.continue_on_error {
                        warn!(job = %job.name, step = %step.name, error = %err, "Step failed; continuing");
                        continue;
                    }

                    self.with_job(stage_index, job_index, |record| {
                        for later in record.steps.iter_mut().skip(step_index + 1) {
                            later.status = StepStatus::Skipped;
                        }
                        record.log(format!("ERROR: {err}"));
                        record.finish(StageStatus::Failure);
                    });
                    error!(stage = %stage.name, job = %job.name, error = %err, "Job failed");
                    return Err(RunError::JobFailed {
                        job: job.name.clone(),
                        source: err,
                    });
                }
            }
        }

        self.with_job(stage_index, job_index, |record| {
            record.artifacts = job.artifacts.clone();
            record.finish(StageStatus::Success);
        });
        debug!(stage = %stage.name, job = %job.name, "Job succeeded");
        Ok(())
    }

    fn record_metrics(&self, status: ExecutionStatus) {
        let duration_ms = self.tracked.snapshot().duration_ms.unwrap_or_default();
        let metrics = &self.collaborators.metrics;

        metrics.record(
            Metric::new("pipeline.execution", 1.0, MetricUnit::Count)
                .with_tag("pipeline", &self.config.id)
                .with_tag("status", status)
                .with_tag("environment", self.config.environment),
        );
        #[allow(clippy::cast_precision_loss)]
        metrics.record(
            Metric::new("pipeline.duration", duration_ms as f64, MetricUnit::Milliseconds)
                .with_tag("pipeline", &self.config.id)
                .with_tag("environment", self.config.environment),
        );
    }
}

fn error_chain(err: &RunError) -> String {
    match err.step_error() {
        Some(step) => format!("{err}: {step}"),
        None => err.to_string(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
