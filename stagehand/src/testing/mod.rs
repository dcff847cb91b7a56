//! Testing utilities for stagehand pipelines.
//!
//! This module provides:
//! - Fake step executors and deployers
//! - Assertions over execution records
//! - Pipeline fixtures and a zero-delay service

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_execution_status, assert_job_logged, assert_stage_skipped, assert_stage_status,
};
pub use fixtures::{
    gated_pipeline, instant_service, instant_service_with, parallel_pipeline, push_context,
    two_stage_pipeline, STEP_DELAY,
};
pub use mocks::{RecordingDeploymentInvoker, RecordingStepExecutor, ScriptedStepExecutor, StepSpan};

pub use crate::integrations::InMemoryMetricsRecorder;
pub use crate::notify::CollectingNotificationSink;
