//! Fake collaborators for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::errors::StepError;
use crate::integrations::{DeploymentInvoker, DeploymentReceipt, DeploymentRequest};
use crate::pipeline::StepConfig;
use crate::runner::{StepContext, StepExecutor};

/// A step executor that fails the steps it is told to and succeeds the rest.
#[derive(Debug, Default)]
pub struct ScriptedStepExecutor {
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl ScriptedStepExecutor {
    /// Creates an executor where every step succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the named step fail.
    #[must_use]
    pub fn fail_step(mut self, step: impl Into<String>) -> Self {
        self.failing.insert(step.into());
        self
    }

    /// Makes the named step panic.
    #[must_use]
    pub fn panic_on(mut self, step: impl Into<String>) -> Self {
        self.panicking.insert(step.into());
        self
    }

    /// Sleeps `delay` inside every step.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the names of executed steps, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Returns the number of executed steps.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl StepExecutor for ScriptedStepExecutor {
    async fn execute(&self, step: &StepConfig, _ctx: &StepContext) -> Result<(), StepError> {
        self.calls.lock().push(step.name.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panicking.contains(&step.name) {
            panic!("scripted panic in {}", step.name);
        }
        if self.failing.contains(&step.name) {
            return Err(StepError::new(&step.name, "scripted failure"));
        }
        Ok(())
    }
}

/// Start and end instants of one step call.
#[derive(Debug, Clone)]
pub struct StepSpan {
    /// Job the step ran in.
    pub job: String,
    /// Step name.
    pub step: String,
    /// When the call began.
    pub started: Instant,
    /// When the call returned.
    pub finished: Instant,
}

/// A step executor that sleeps a fixed delay and records when each step ran.
#[derive(Debug)]
pub struct RecordingStepExecutor {
    delay: Duration,
    spans: Mutex<Vec<StepSpan>>,
}

impl RecordingStepExecutor {
    /// Creates an executor sleeping `delay` per step.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            spans: Mutex::new(Vec::new()),
        }
    }

    /// Returns the recorded spans in completion order.
    #[must_use]
    pub fn spans(&self) -> Vec<StepSpan> {
        self.spans.lock().clone()
    }

    /// Returns the span of the first call of the named job.
    #[must_use]
    pub fn job_span(&self, job: &str) -> Option<StepSpan> {
        self.spans.lock().iter().find(|s| s.job == job).cloned()
    }
}

#[async_trait]
impl StepExecutor for RecordingStepExecutor {
    async fn execute(&self, step: &StepConfig, ctx: &StepContext) -> Result<(), StepError> {
        let started = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.spans.lock().push(StepSpan {
            job: ctx.job.clone(),
            step: step.name.clone(),
            started,
            finished: Instant::now(),
        });
        Ok(())
    }
}

/// A deployer that records requests and either succeeds or fails.
#[derive(Debug, Default)]
pub struct RecordingDeploymentInvoker {
    failure: Option<String>,
    requests: Mutex<Vec<DeploymentRequest>>,
}

impl RecordingDeploymentInvoker {
    /// Creates a deployer that succeeds with ids `deploy-1`, `deploy-2`, ...
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a deployer that always fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns every request received.
    #[must_use]
    pub fn requests(&self) -> Vec<DeploymentRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl DeploymentInvoker for RecordingDeploymentInvoker {
    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentReceipt, String> {
        let mut requests = self.requests.lock();
        requests.push(request.clone());
        match &self.failure {
            Some(message) => Err(message.clone()),
            None => Ok(DeploymentReceipt {
                deployment_id: format!("deploy-{}", requests.len()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExecutionId;

    fn ctx(job: &str) -> StepContext {
        StepContext {
            execution_id: ExecutionId::from("exec-1"),
            pipeline_id: "dev".to_string(),
            stage: "Build".to_string(),
            job: job.to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_executor() {
        let executor = ScriptedStepExecutor::new().fail_step("Lint");

        assert!(executor.execute(&StepConfig::checkout("Checkout"), &ctx("a")).await.is_ok());
        let err = executor
            .execute(&StepConfig::run("Lint", "npm run lint"), &ctx("a"))
            .await
            .unwrap_err();

        assert_eq!(err.step, "Lint");
        assert_eq!(executor.calls(), vec!["Checkout", "Lint"]);
    }

    #[tokio::test]
    async fn test_recording_executor() {
        let executor = RecordingStepExecutor::new(Duration::from_millis(5));
        executor.execute(&StepConfig::checkout("Checkout"), &ctx("job-a")).await.unwrap();

        let span = executor.job_span("job-a").unwrap();
        assert_eq!(span.step, "Checkout");
        assert!(span.finished >= span.started + Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_recording_deployer() {
        let request = DeploymentRequest {
            environment: crate::pipeline::Environment::Staging,
            version: "abc".to_string(),
            branch: "staging".to_string(),
            features: Vec::new(),
        };

        let ok = RecordingDeploymentInvoker::new();
        assert_eq!(ok.deploy(&request).await.unwrap().deployment_id, "deploy-1");
        assert_eq!(ok.requests().len(), 1);

        let failing = RecordingDeploymentInvoker::failing("cluster unreachable");
        assert_eq!(failing.deploy(&request).await.unwrap_err(), "cluster unreachable");
    }
}
