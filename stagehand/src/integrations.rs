//! Collaborators the runner hands off to: deployments and metrics.
//!
//! Both are opaque to the runner. The defaults here only log.

use crate::pipeline::Environment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// What the runner asks to deploy after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// Target environment.
    pub environment: Environment,
    /// Version tag (short commit).
    pub version: String,
    /// Source branch.
    pub branch: String,
    /// Feature flags attached to the deployment.
    pub features: Vec<String>,
}

/// Handle returned by a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReceipt {
    /// Deployment id recorded on the execution.
    pub deployment_id: String,
}

/// Deploys a built version.
#[async_trait]
pub trait DeploymentInvoker: Send + Sync {
    /// Starts a deployment.
    ///
    /// # Errors
    ///
    /// Returns a message describing why the deployment failed.
    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentReceipt, String>;
}

/// Logs the deployment and returns a fresh id.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedDeployer;

#[async_trait]
impl DeploymentInvoker for SimulatedDeployer {
    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentReceipt, String> {
        let deployment_id = format!("deploy-{}", Uuid::now_v7().simple());
        info!(
            deployment_id = %deployment_id,
            environment = %request.environment,
            version = %request.version,
            branch = %request.branch,
            "Starting deployment"
        );
        Ok(DeploymentReceipt { deployment_id })
    }
}

/// Unit of a recorded metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    /// A count.
    Count,
    /// A duration in milliseconds.
    Milliseconds,
}

/// One metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name (e.g. `pipeline.duration`).
    pub name: String,
    /// Sample value.
    pub value: f64,
    /// Unit.
    pub unit: MetricUnit,
    /// When the sample was taken.
    pub timestamp: DateTime<Utc>,
    /// Tags.
    pub tags: BTreeMap<String, String>,
}

impl Metric {
    /// Creates a sample stamped now.
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64, unit: MetricUnit) -> Self {
        Self {
            name: name.into(),
            value,
            unit,
            timestamp: Utc::now(),
            tags: BTreeMap::new(),
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.tags.insert(key.into(), value.to_string());
        self
    }
}

/// Records metric samples.
#[cfg_attr(test, mockall::automock)]
pub trait MetricsRecorder: Send + Sync {
    /// Records one sample.
    fn record(&self, metric: Metric);
}

/// Emits each sample as a debug-level tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricsRecorder;

impl MetricsRecorder for TracingMetricsRecorder {
    fn record(&self, metric: Metric) {
        tracing::debug!(
            metric = %metric.name,
            value = metric.value,
            unit = ?metric.unit,
            tags = ?metric.tags,
            "Recorded metric"
        );
    }
}

/// Keeps samples in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetricsRecorder {
    samples: RwLock<Vec<Metric>>,
}

impl InMemoryMetricsRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded sample.
    #[must_use]
    pub fn samples(&self) -> Vec<Metric> {
        self.samples.read().clone()
    }

    /// Returns samples with the given name.
    #[must_use]
    pub fn named(&self, name: &str) -> Vec<Metric> {
        self.samples
            .read()
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }
}

impl MetricsRecorder for InMemoryMetricsRecorder {
    fn record(&self, metric: Metric) {
        self.samples.write().push(metric);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_deployer() {
        let receipt = SimulatedDeployer
            .deploy(&DeploymentRequest {
                environment: Environment::Staging,
                version: "abcd1234".to_string(),
                branch: "staging".to_string(),
                features: vec!["ci-cd-deployment".to_string()],
            })
            .await
            .unwrap();

        assert!(receipt.deployment_id.starts_with("deploy-"));
    }

    #[test]
    fn test_in_memory_recorder() {
        let recorder = InMemoryMetricsRecorder::new();
        recorder.record(
            Metric::new("pipeline.execution", 1.0, MetricUnit::Count)
                .with_tag("pipeline", "dev")
                .with_tag("status", "success"),
        );
        recorder.record(Metric::new("pipeline.duration", 12.0, MetricUnit::Milliseconds));

        assert_eq!(recorder.samples().len(), 2);
        let executions = recorder.named("pipeline.execution");
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].tags["status"], "success");
    }

    #[test]
    fn test_tracing_recorder() {
        TracingMetricsRecorder.record(Metric::new("pipeline.execution", 1.0, MetricUnit::Count));
    }
}
