//! Pipeline fixtures for tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{CancelMode, RunnerConfig, SimulationTimings};
use crate::execution::TriggerContext;
use crate::notify::NoOpNotificationSink;
use crate::pipeline::{
    Environment, JobConfig, PipelineBuilder, PipelineConfig, StageConfig, StepConfig,
};
use crate::runner::PipelineService;

/// `two-stage`: stage `A` (one step `a-step`) then stage `B` depending on `A`.
#[must_use]
pub fn two_stage_pipeline() -> PipelineConfig {
    PipelineConfig {
        stages: vec![
            StageConfig::new("A", vec![JobConfig::new("a-job", vec![StepConfig::run("a-step", "make a")])]),
            StageConfig::new("B", vec![JobConfig::new("b-job", vec![StepConfig::run("b-step", "make b")])])
                .with_dependency("A"),
        ],
        ..PipelineConfig::new("two-stage", "Two Stage")
    }
}

/// `parallel`: one parallel stage `Test` with jobs `job-a` and `job-b`.
#[must_use]
pub fn parallel_pipeline() -> PipelineConfig {
    PipelineConfig {
        stages: vec![StageConfig::new(
            "Test",
            vec![
                JobConfig::new("job-a", vec![StepConfig::test("a-tests", "npm test -- a")]),
                JobConfig::new("job-b", vec![StepConfig::test("b-tests", "npm test -- b")]),
            ],
        )
        .parallel()],
        ..PipelineConfig::new("parallel", "Parallel")
    }
}

/// `gated`: `Build`, then an approval-gated `Deploy`, then `Verify` which
/// depends on `Deploy`.
#[must_use]
pub fn gated_pipeline(environment: Environment) -> PipelineConfig {
    let built = PipelineBuilder::new("gated", "Gated")
        .environment(environment)
        .stage(StageConfig::new(
            "Build",
            vec![JobConfig::new("build", vec![StepConfig::run("compile", "make")])],
        ))
        .stage(
            StageConfig::new(
                "Deploy",
                vec![JobConfig::new("deploy", vec![StepConfig::deploy("ship", "staging")])],
            )
            .with_dependency("Build")
            .requires_approval(),
        )
        .stage(
            StageConfig::new(
                "Verify",
                vec![JobConfig::new("verify", vec![StepConfig::test("smoke", "npm run smoke")])],
            )
            .with_dependency("Deploy"),
        )
        .build();
    match built {
        Ok(config) => config,
        Err(err) => panic!("gated fixture is invalid: {err}"),
    }
}

/// A context with a fixed commit, as a push to `branch`.
#[must_use]
pub fn push_context(branch: &str) -> TriggerContext {
    TriggerContext::new(branch, "0123456789abcdef", "push").with_author("ci-bot")
}

/// A service with zero simulated delays and a silent notification sink.
#[must_use]
pub fn instant_service() -> PipelineService {
    instant_service_with(CancelMode::default())
}

/// Like [`instant_service`], with the given cancellation semantics.
#[must_use]
pub fn instant_service_with(cancel_mode: CancelMode) -> PipelineService {
    let config = RunnerConfig::new()
        .with_timings(SimulationTimings::instant())
        .with_cancel_mode(cancel_mode);
    PipelineService::new(config).with_notification_sink(Arc::new(NoOpNotificationSink))
}

/// Default per-step delay used by timing-sensitive tests.
pub const STEP_DELAY: Duration = Duration::from_millis(50);
