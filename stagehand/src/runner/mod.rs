//! Pipeline execution.
//!
//! This module provides:
//! - The [`PipelineService`] facade (trigger, query, cancel, wait)
//! - The per-execution runner walking stages, jobs and steps
//! - The [`StepExecutor`] seam and its simulated implementation

mod executor;
mod service;
mod steps;

#[cfg(test)]
mod integration_tests;

pub use executor::Collaborators;
pub use service::PipelineService;
pub use steps::{SimulatedStepExecutor, StepContext, StepExecutor};
