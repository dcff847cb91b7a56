//! The in-process entry point: registry, tracker and runner behind one handle.

use super::executor::{Collaborators, ExecutionRun};
use super::steps::{SimulatedStepExecutor, StepExecutor};
use crate::approval::{ApprovalGate, AutoApprovalGate};
use crate::config::{CancelMode, RunnerConfig};
use crate::core::ExecutionId;
use crate::errors::{Result, StagehandError};
use crate::execution::{ExecutionTracker, PipelineExecution, TriggerContext};
use crate::integrations::{
    DeploymentInvoker, MetricsRecorder, SimulatedDeployer, TracingMetricsRecorder,
};
use crate::notify::{LoggingNotificationSink, NotificationSink, Notifier};
use crate::pipeline::{default_pipelines, load_pipelines, PipelineConfig, PipelineRegistry};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// Registers pipelines, triggers executions and answers status queries.
///
/// Cloning is cheap; clones share the same registry and tracker.
///
/// # Example
///
/// ```rust,no_run
/// use stagehand::prelude::*;
///
/// # async fn demo() -> stagehand::errors::Result<()> {
/// let service = PipelineService::new(RunnerConfig::default()).with_default_pipelines();
/// let id = service.trigger("development", TriggerContext::new("develop", "a1b2c3d4e5", "manual"))?;
/// let finished = service.wait_for_completion(&id).await?;
/// println!("{}", finished.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PipelineService {
    registry: Arc<PipelineRegistry>,
    tracker: Arc<ExecutionTracker>,
    collaborators: Collaborators,
    cancel_mode: CancelMode,
}

impl PipelineService {
    /// Creates a service with the simulated collaborators driven by `config`.
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        let timings = config.timings;
        Self {
            registry: Arc::new(PipelineRegistry::new()),
            tracker: Arc::new(ExecutionTracker::new()),
            collaborators: Collaborators {
                steps: Arc::new(SimulatedStepExecutor::new(timings.clone())),
                approvals: Arc::new(AutoApprovalGate::new(timings.approval_delay())),
                notifier: Notifier::new(Arc::new(LoggingNotificationSink::new(
                    timings.notification_delay(),
                ))),
                deployer: Arc::new(SimulatedDeployer),
                metrics: Arc::new(TracingMetricsRecorder),
            },
            cancel_mode: config.cancel_mode,
        }
    }

    /// Replaces the step executor.
    #[must_use]
    pub fn with_step_executor(mut self, executor: Arc<dyn StepExecutor>) -> Self {
        self.collaborators.steps = executor;
        self
    }

    /// Replaces the approval gate.
    #[must_use]
    pub fn with_approval_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.collaborators.approvals = gate;
        self
    }

    /// Replaces the notification sink.
    #[must_use]
    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.collaborators.notifier = Notifier::new(sink);
        self
    }

    /// Replaces the deployment invoker.
    #[must_use]
    pub fn with_deployer(mut self, deployer: Arc<dyn DeploymentInvoker>) -> Self {
        self.collaborators.deployer = deployer;
        self
    }

    /// Replaces the metrics recorder.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.collaborators.metrics = metrics;
        self
    }

    /// Registers the built-in `development`, `staging`, `production` and
    /// `hotfix` pipelines.
    #[must_use]
    pub fn with_default_pipelines(self) -> Self {
        for config in default_pipelines() {
            self.registry.register(config);
        }
        self
    }

    /// Registers every pipeline in a JSON catalog file. Returns how many
    /// were registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn register_from_file(&self, path: impl AsRef<std::path::Path>) -> Result<usize> {
        let configs = load_pipelines(path)?;
        let count = configs.len();
        for config in configs {
            self.registry.register(config);
        }
        Ok(count)
    }

    /// Registers a pipeline, replacing any pipeline with the same id.
    pub fn register(&self, config: PipelineConfig) -> Arc<PipelineConfig> {
        self.registry.register(config)
    }

    /// Looks up a pipeline.
    #[must_use]
    pub fn pipeline(&self, id: &str) -> Option<Arc<PipelineConfig>> {
        self.registry.get(id)
    }

    /// Lists pipelines in registration order.
    #[must_use]
    pub fn pipelines(&self) -> Vec<Arc<PipelineConfig>> {
        self.registry.list()
    }

    /// Starts an execution of `pipeline_id` and returns its id immediately.
    ///
    /// The run happens on a spawned task of the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `PipelineNotFound` for an unknown pipeline, or `Runtime` when
    /// called outside a tokio runtime.
    pub fn trigger(&self, pipeline_id: &str, context: TriggerContext) -> Result<ExecutionId> {
        let config = self
            .registry
            .get(pipeline_id)
            .ok_or_else(|| StagehandError::PipelineNotFound(pipeline_id.to_string()))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| StagehandError::Runtime(err.to_string()))?;

        let id = ExecutionId::generate();
        let record = PipelineExecution::seed(id.clone(), &config, &context);
        let tracked = self.tracker.insert(record);

        info!(
            pipeline_id = %config.id,
            execution_id = %id,
            branch = %context.branch,
            trigger = %context.trigger,
            "Triggered pipeline"
        );

        let span = info_span!(
            "pipeline_execution",
            pipeline_id = %config.id,
            execution_id = %id,
        );
        let run = ExecutionRun {
            id: id.clone(),
            version: context.version(),
            branch: context.branch,
            config,
            tracked,
            tracker: Arc::clone(&self.tracker),
            collaborators: self.collaborators.clone(),
            cancel_mode: self.cancel_mode,
        };
        runtime.spawn(run.run().instrument(span));

        Ok(id)
    }

    /// Returns a snapshot of an execution.
    #[must_use]
    pub fn execution(&self, id: &ExecutionId) -> Option<PipelineExecution> {
        self.tracker.get(id)
    }

    /// Lists executions, optionally only those of one pipeline.
    #[must_use]
    pub fn executions(&self, pipeline_id: Option<&str>) -> Vec<PipelineExecution> {
        self.tracker.list(pipeline_id)
    }

    /// Lists executions still running.
    #[must_use]
    pub fn active_executions(&self) -> Vec<PipelineExecution> {
        self.tracker.active()
    }

    /// Cancels an active execution. Returns false if it is unknown or has
    /// already finished.
    ///
    /// In-flight work keeps running. Under [`CancelMode::Overwrite`] the
    /// run's final outcome later replaces `cancelled`; under
    /// [`CancelMode::Sticky`] it does not.
    pub fn cancel(&self, id: &ExecutionId) -> bool {
        self.tracker.cancel(id)
    }

    /// Waits until the background run of an execution has returned.
    ///
    /// A cancelled execution is only reported once its in-flight work has
    /// drained, so its status here depends on the configured [`CancelMode`]. Wrap in `tokio::time::timeout` to bound the wait.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionNotFound` for unknown ids.
    pub async fn wait_for_completion(&self, id: &ExecutionId) -> Result<PipelineExecution> {
        self.tracker.wait(id).await
    }
}

impl Default for PipelineService {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}
