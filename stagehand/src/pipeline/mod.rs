//! Pipeline definitions.
//!
//! This module provides:
//! - Pipeline, stage, job and step definitions
//! - A validating builder and the stage dependency graph
//! - The pipeline registry
//! - The built-in pipeline catalog

mod builder;
mod catalog;
mod dag;
mod registry;
mod spec;

pub use builder::{validate, PipelineBuilder};
pub use catalog::{default_pipelines, development, hotfix, load_pipelines, production, staging};
pub use dag::StageGraph;
pub use registry::PipelineRegistry;
pub use spec::{
    CacheConfig, Environment, JobConfig, LifecycleEvent, NotificationChannel, NotificationRule,
    PipelineConfig, StageConfig, StepAction, StepConfig, Trigger,
};
