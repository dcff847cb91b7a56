//! Pipeline, stage, job and step definitions.
//!
//! Definitions are plain serde structs. JSON keys use camel case so catalogs
//! written for other CI front-ends (`approvalRequired`, `continueOnError`,
//! `rollbackOnFailure`) load unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// What starts a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Started by hand.
    #[default]
    Manual,
    /// Started by a branch push.
    Push,
    /// Started by a pull request.
    PullRequest,
    /// Started on a schedule.
    Schedule,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Push => write!(f, "push"),
            Self::PullRequest => write!(f, "pull_request"),
            Self::Schedule => write!(f, "schedule"),
        }
    }
}

/// Target environment of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Development builds; never deployed.
    #[default]
    Development,
    /// Staging.
    Staging,
    /// Production.
    Production,
}

impl Environment {
    /// Returns true if a successful run of a pipeline in this environment
    /// hands off to the deployment invoker.
    #[must_use]
    pub fn is_deployable(&self) -> bool {
        matches!(self, Self::Staging | Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// The kind of work a step simulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Check out sources.
    Checkout,
    /// Set up a toolchain.
    Setup,
    /// Run a script.
    Run,
    /// Run a test suite.
    Test,
    /// Deploy somewhere.
    Deploy,
    /// Send a notification.
    Notify,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkout => write!(f, "checkout"),
            Self::Setup => write!(f, "setup"),
            Self::Run => write!(f, "run"),
            Self::Test => write!(f, "test"),
            Self::Deploy => write!(f, "deploy"),
            Self::Notify => write!(f, "notify"),
        }
    }
}

/// Smallest unit of simulated work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepConfig {
    /// Step name, used in job logs.
    pub name: String,
    /// What the step does.
    pub action: StepAction,
    /// Script for `run` and `test` steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Tool reference for `setup` steps (e.g. `node@18`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    /// Free-form parameters.
    #[serde(default, rename = "with", skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, serde_json::Value>,
    /// Keep the job going when this step fails.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub continue_on_error: bool,
}

impl StepConfig {
    /// Creates a step with no script or parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            action,
            script: None,
            uses: None,
            params: HashMap::new(),
            continue_on_error: false,
        }
    }

    /// Creates a `checkout` step.
    #[must_use]
    pub fn checkout(name: impl Into<String>) -> Self {
        Self::new(name, StepAction::Checkout)
    }

    /// Creates a `setup` step using the given tool.
    #[must_use]
    pub fn setup(name: impl Into<String>, uses: impl Into<String>) -> Self {
        Self::new(name, StepAction::Setup).with_uses(uses)
    }

    /// Creates a `run` step.
    #[must_use]
    pub fn run(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self::new(name, StepAction::Run).with_script(script)
    }

    /// Creates a `test` step.
    #[must_use]
    pub fn test(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self::new(name, StepAction::Test).with_script(script)
    }

    /// Creates a `deploy` step targeting an environment.
    #[must_use]
    pub fn deploy(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self::new(name, StepAction::Deploy)
            .with_param("environment", serde_json::Value::String(environment.into()))
    }

    /// Creates a `notify` step.
    #[must_use]
    pub fn notify(name: impl Into<String>) -> Self {
        Self::new(name, StepAction::Notify)
    }

    /// Sets the script.
    #[must_use]
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Sets the tool reference.
    #[must_use]
    pub fn with_uses(mut self, uses: impl Into<String>) -> Self {
        self.uses = Some(uses.into());
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Lets the job continue past a failure of this step.
    #[must_use]
    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    /// Human-readable description of the simulated work.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.action {
            StepAction::Checkout => "Checking out code".to_string(),
            StepAction::Setup => format!("Setting up {}", self.uses.as_deref().unwrap_or("toolchain")),
            StepAction::Run => format!("Running: {}", self.script.as_deref().unwrap_or_default()),
            StepAction::Test => format!("Testing: {}", self.script.as_deref().unwrap_or_default()),
            StepAction::Deploy => format!(
                "Deploying to {}",
                self.params
                    .get("environment")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown")
            ),
            StepAction::Notify => "Sending notification".to_string(),
        }
    }
}

/// Build cache description attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Cache key template.
    pub key: String,
    /// Cached paths.
    pub paths: Vec<String>,
    /// Fallback keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restore_keys: Vec<String>,
}

/// An ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    /// Job name.
    pub name: String,
    /// Steps, run in order.
    pub steps: Vec<StepConfig>,
    /// Environment variables exposed to steps.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
    /// Paths published as artifacts on success.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    /// Optional build cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
}

impl JobConfig {
    /// Creates a job with the given steps.
    #[must_use]
    pub fn new(name: impl Into<String>, steps: Vec<StepConfig>) -> Self {
        Self {
            name: name.into(),
            steps,
            environment: HashMap::new(),
            artifacts: Vec::new(),
            cache: None,
        }
    }

    /// Adds artifact paths.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.artifacts.extend(artifacts.into_iter().map(Into::into));
        self
    }

    /// Sets the cache.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

/// A named group of jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    /// Stage name, unique within a pipeline.
    pub name: String,
    /// Stages that must succeed before this one runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Run jobs concurrently.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub parallel: bool,
    /// Jobs in this stage.
    pub jobs: Vec<JobConfig>,
    /// Block on the approval gate before running.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub approval_required: bool,
    /// Advisory timeout in seconds. Not enforced by the runner.
    #[serde(default, rename = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl StageConfig {
    /// Creates a sequential, ungated stage with no dependencies.
    #[must_use]
    pub fn new(name: impl Into<String>, jobs: Vec<JobConfig>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            parallel: false,
            jobs,
            approval_required: false,
            timeout_secs: None,
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Runs jobs concurrently.
    #[must_use]
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Requires approval before running.
    #[must_use]
    pub fn requires_approval(mut self) -> Self {
        self.approval_required = true;
        self
    }

    /// Sets the advisory timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// Notification transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    /// Slack channel.
    Slack,
    /// Email address.
    Email,
    /// Webhook URL.
    Webhook,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slack => write!(f, "slack"),
            Self::Email => write!(f, "email"),
            Self::Webhook => write!(f, "webhook"),
        }
    }
}

/// Execution lifecycle events that can trigger notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Execution started.
    Start,
    /// Execution succeeded.
    Success,
    /// Execution failed.
    Failure,
    /// A stage is waiting on approval.
    ApprovalRequired,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::ApprovalRequired => write!(f, "approval_required"),
        }
    }
}

/// Routes lifecycle events to a channel target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRule {
    /// Transport.
    #[serde(rename = "type")]
    pub channel: NotificationChannel,
    /// Events this rule fires on.
    pub on: Vec<LifecycleEvent>,
    /// Channel name, address or URL.
    pub target: String,
}

impl NotificationRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(
        channel: NotificationChannel,
        on: impl IntoIterator<Item = LifecycleEvent>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            on: on.into_iter().collect(),
            target: target.into(),
        }
    }

    /// Returns true if the rule fires on `event`.
    #[must_use]
    pub fn matches(&self, event: LifecycleEvent) -> bool {
        self.on.contains(&event)
    }
}

/// A named, reusable pipeline definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Registry key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What starts the pipeline.
    #[serde(default)]
    pub trigger: Trigger,
    /// Branch filter (e.g. `hotfix/*`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Target environment.
    #[serde(default)]
    pub environment: Environment,
    /// Stages in declaration order.
    pub stages: Vec<StageConfig>,
    /// Notification routing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<NotificationRule>,
    /// Informational; approval gating is per stage.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_approval: bool,
    /// Log a rollback on failure for production pipelines.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rollback_on_failure: bool,
}

impl PipelineConfig {
    /// Creates a manual development pipeline with no stages.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            trigger: Trigger::Manual,
            branch: None,
            environment: Environment::Development,
            stages: Vec::new(),
            notifications: Vec::new(),
            auto_approval: false,
            rollback_on_failure: false,
        }
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageConfig> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Rules that fire on `event`.
    pub fn rules_for(&self, event: LifecycleEvent) -> impl Iterator<Item = &NotificationRule> {
        self.notifications.iter().filter(move |rule| rule.matches(event))
    }
}
