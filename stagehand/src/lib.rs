//! # Stagehand
//!
//! A simulated CI/CD pipeline executor.
//!
//! Stagehand keeps a registry of named pipeline definitions and runs them as
//! background executions:
//!
//! - **Pipelines**: ordered stages of jobs of steps, with stage dependencies,
//!   parallel jobs and approval gates
//! - **Executions**: tracked in memory, queried while they run, cancellable
//! - **Collaborators**: step execution, approvals, notifications, deployments
//!   and metrics all sit behind traits with simulated defaults
//!
//! No command is ever run; steps sleep a configurable per-action delay.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stagehand::prelude::*;
//!
//! # async fn demo() -> stagehand::errors::Result<()> {
//! let service = PipelineService::new(RunnerConfig::default()).with_default_pipelines();
//!
//! let id = service.trigger("staging", TriggerContext::new("staging", "9f8e7d6c5b4a", "push"))?;
//! let finished = service.wait_for_completion(&id).await?;
//! assert_eq!(finished.status, ExecutionStatus::Success);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod approval;
pub mod config;
pub mod core;
pub mod errors;
pub mod execution;
pub mod integrations;
pub mod notify;
pub mod pipeline;
pub mod runner;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::approval::{
        ApprovalDecision, ApprovalGate, AutoApprovalGate, ManualApprovalGate, PendingApproval,
    };
    pub use crate::config::{CancelMode, RunnerConfig, SimulationTimings};
    pub use crate::core::{ApprovalStatus, ExecutionId, ExecutionStatus, StageStatus};
    pub use crate::errors::{
        CycleDetectedError, PipelineValidationError, RunError, StagehandError, StepError,
    };
    pub use crate::execution::{PipelineExecution, TriggerContext};
    pub use crate::integrations::{DeploymentInvoker, MetricsRecorder};
    pub use crate::notify::{LoggingNotificationSink, NotificationSink};
    pub use crate::pipeline::{
        Environment, JobConfig, PipelineBuilder, PipelineConfig, StageConfig, StageGraph,
        StepConfig,
    };
    pub use crate::runner::{PipelineService, StepExecutor};
}
