//! Execution state.
//!
//! This module provides:
//! - Execution records mirroring the pipeline definition shape
//! - The in-memory execution tracker with its active set

mod record;
mod tracker;

pub use record::{
    JobExecution, LogEntry, PipelineExecution, StageExecution, StepExecution, TriggerContext,
};
pub use tracker::{ExecutionTracker, TrackedExecution};
