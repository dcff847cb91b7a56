//! Error types for the stagehand pipeline executor.
//!
//! Two families live here:
//! - [`StagehandError`] for the public service surface (lookups, validation,
//!   configuration loading).
//! - [`StepError`] and [`RunError`] for failures raised while an execution is
//!   running. These never escape `trigger`; they are recorded on the execution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = StagehandError> = std::result::Result<T, E>;

/// The main error type for stagehand operations.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// No pipeline is registered under the requested id.
    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    /// No execution is tracked under the requested id.
    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    /// A pipeline definition failed validation.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A cycle was detected between stage dependencies.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// `trigger` was called outside a tokio runtime.
    #[error("No async runtime available: {0}")]
    Runtime(String),

    /// Configuration could not be read or was invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata about a validation failure for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationErrorInfo {
    /// Error code (e.g., "PIPELINE-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ValidationErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a pipeline definition is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ValidationErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ValidationErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the diagnostic code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when stage dependencies form a cycle.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The stages forming the cycle, first stage repeated at the end.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

impl From<CycleDetectedError> for PipelineValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self {
            message: err.to_string(),
            stages: err.cycle_path.clone(),
            error_info: Some(
                ValidationErrorInfo::new(
                    "PIPELINE-CYCLE",
                    format!("Stage dependencies form a cycle: {}", err.cycle_path.join(" -> ")),
                )
                .with_fix_hint("Remove one of the dependencies in the cycle to break it."),
            ),
        }
    }
}

/// A single step failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Step '{step}' failed: {message}")]
pub struct StepError {
    /// The step name.
    pub step: String,
    /// What went wrong.
    pub message: String,
}

impl StepError {
    /// Creates a new step error.
    #[must_use]
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Failures raised while an execution runs.
///
/// Step failures bubble up as `JobFailed`, then `StageFailed`, and end the
/// execution with status `failure`.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// A job stopped on a failing step.
    #[error("Job failed: {job}")]
    JobFailed {
        /// The job name.
        job: String,
        /// The failing step.
        #[source]
        source: StepError,
    },

    /// A stage stopped on a failing job.
    #[error("Stage failed: {stage}")]
    StageFailed {
        /// The stage name.
        stage: String,
        /// The failing job.
        #[source]
        source: Box<RunError>,
    },

    /// An approval gate rejected a stage.
    #[error("Approval rejected for stage: {stage}")]
    ApprovalRejected {
        /// The gated stage.
        stage: String,
    },

    /// The deployment invoked after a successful run failed.
    #[error("Deployment failed: {0}")]
    Deployment(String),

    /// A collaborator panicked while the execution was running.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RunError {
    /// Returns the innermost step error, if this failure originated in a step.
    #[must_use]
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            Self::JobFailed { source, .. } => Some(source),
            Self::StageFailed { source, .. } => source.step_error(),
            Self::ApprovalRejected { .. } | Self::Deployment(_) | Self::Internal(_) => None,
        }
    }
}
