//! Step execution.

use crate::config::SimulationTimings;
use crate::core::ExecutionId;
use crate::errors::StepError;
use crate::pipeline::StepConfig;
use async_trait::async_trait;
use tracing::debug;

/// Where a step is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepContext {
    /// Execution id.
    pub execution_id: ExecutionId,
    /// Pipeline id.
    pub pipeline_id: String,
    /// Stage name.
    pub stage: String,
    /// Job name.
    pub job: String,
}

/// Runs one step.
///
/// The runner never executes commands itself; everything a step does goes
/// through this trait, so tests can swap in deterministic fakes.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Executes `step`.
    ///
    /// # Errors
    ///
    /// Returns a [`StepError`] if the step failed.
    async fn execute(&self, step: &StepConfig, ctx: &StepContext) -> Result<(), StepError>;
}

/// Sleeps a per-action delay and succeeds. Runs no commands.
#[derive(Debug, Clone, Default)]
pub struct SimulatedStepExecutor {
    timings: SimulationTimings,
}

impl SimulatedStepExecutor {
    /// Creates an executor with the given timings.
    #[must_use]
    pub fn new(timings: SimulationTimings) -> Self {
        Self { timings }
    }
}

#[async_trait]
impl StepExecutor for SimulatedStepExecutor {
    async fn execute(&self, step: &StepConfig, ctx: &StepContext) -> Result<(), StepError> {
        let delay = self.timings.step_delay(step.action);
        debug!(
            execution_id = %ctx.execution_id,
            stage = %ctx.stage,
            job = %ctx.job,
            step = %step.name,
            delay_ms = delay.as_millis(),
            "{}",
            step.describe()
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn ctx() -> StepContext {
        StepContext {
            execution_id: ExecutionId::from("exec-1"),
            pipeline_id: "dev".to_string(),
            stage: "Build".to_string(),
            job: "Build Application".to_string(),
        }
    }

    #[tokio::test]
    async fn test_simulated_step_succeeds() {
        let executor = SimulatedStepExecutor::new(SimulationTimings::instant());
        let result = executor.execute(&StepConfig::run("Build", "npm run build"), &ctx()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_simulated_step_waits_for_action_delay() {
        let mut timings = SimulationTimings::instant();
        timings.test_ms = 30;
        let executor = SimulatedStepExecutor::new(timings);

        let start = Instant::now();
        executor
            .execute(&StepConfig::test("Unit", "npm test"), &ctx())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));

        let start = Instant::now();
        executor.execute(&StepConfig::checkout("Checkout"), &ctx()).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(30));
    }
}
