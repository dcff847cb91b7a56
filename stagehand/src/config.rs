//! Runner configuration.
//!
//! Timings default to the delays the storefront's simulated pipelines have
//! always used. Tests use [`SimulationTimings::instant`].

use crate::errors::{Result, StagehandError};
use crate::pipeline::StepAction;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_ENV: &str = "STAGEHAND_CONFIG";

/// Environment variable holding a multiplier applied to every delay.
pub const TIME_SCALE_ENV: &str = "STAGEHAND_TIME_SCALE";

/// Simulated durations, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationTimings {
    /// `checkout` steps.
    #[serde(default = "default_checkout_ms")]
    pub checkout_ms: u64,
    /// `setup` steps.
    #[serde(default = "default_setup_ms")]
    pub setup_ms: u64,
    /// `run` steps.
    #[serde(default = "default_run_ms")]
    pub run_ms: u64,
    /// `test` steps.
    #[serde(default = "default_test_ms")]
    pub test_ms: u64,
    /// `deploy` steps.
    #[serde(default = "default_deploy_ms")]
    pub deploy_ms: u64,
    /// `notify` steps.
    #[serde(default = "default_notify_ms")]
    pub notify_ms: u64,
    /// Auto-approval wait.
    #[serde(default = "default_approval_ms")]
    pub approval_delay_ms: u64,
    /// Per-message notification send.
    #[serde(default = "default_notification_ms")]
    pub notification_delay_ms: u64,
}

fn default_checkout_ms() -> u64 {
    2_000
}

fn default_setup_ms() -> u64 {
    3_000
}

fn default_run_ms() -> u64 {
    5_000
}

fn default_test_ms() -> u64 {
    10_000
}

fn default_deploy_ms() -> u64 {
    15_000
}

fn default_notify_ms() -> u64 {
    1_000
}

fn default_approval_ms() -> u64 {
    3_000
}

fn default_notification_ms() -> u64 {
    1_000
}

impl Default for SimulationTimings {
    fn default() -> Self {
        Self {
            checkout_ms: default_checkout_ms(),
            setup_ms: default_setup_ms(),
            run_ms: default_run_ms(),
            test_ms: default_test_ms(),
            deploy_ms: default_deploy_ms(),
            notify_ms: default_notify_ms(),
            approval_delay_ms: default_approval_ms(),
            notification_delay_ms: default_notification_ms(),
        }
    }
}

impl SimulationTimings {
    /// All delays zero.
    #[must_use]
    pub fn instant() -> Self {
        Self::default().scaled(0.0)
    }

    /// Multiplies every delay by `factor` (negative factors clamp to zero).
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let scale = |ms: u64| (ms as f64 * factor).round() as u64;
        Self {
            checkout_ms: scale(self.checkout_ms),
            setup_ms: scale(self.setup_ms),
            run_ms: scale(self.run_ms),
            test_ms: scale(self.test_ms),
            deploy_ms: scale(self.deploy_ms),
            notify_ms: scale(self.notify_ms),
            approval_delay_ms: scale(self.approval_delay_ms),
            notification_delay_ms: scale(self.notification_delay_ms),
        }
    }

    /// Delay for a step action.
    #[must_use]
    pub fn step_delay(&self, action: StepAction) -> Duration {
        let ms = match action {
            StepAction::Checkout => self.checkout_ms,
            StepAction::Setup => self.setup_ms,
            StepAction::Run => self.run_ms,
            StepAction::Test => self.test_ms,
            StepAction::Deploy => self.deploy_ms,
            StepAction::Notify => self.notify_ms,
        };
        Duration::from_millis(ms)
    }

    /// Auto-approval wait.
    #[must_use]
    pub fn approval_delay(&self) -> Duration {
        Duration::from_millis(self.approval_delay_ms)
    }

    /// Per-message notification delay.
    #[must_use]
    pub fn notification_delay(&self) -> Duration {
        Duration::from_millis(self.notification_delay_ms)
    }
}

/// What happens to a cancelled execution when its background run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelMode {
    /// The run's own outcome replaces `cancelled`: final status, deployment
    /// id and the completion notification all apply.
    #[default]
    Overwrite,
    /// `cancelled` stays; the run's outcome and completion notification are
    /// dropped.
    Sticky,
}

/// Top-level runner configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Simulated durations.
    #[serde(default)]
    pub timings: SimulationTimings,
    /// Cancellation semantics.
    #[serde(default)]
    pub cancel_mode: CancelMode,
    /// Optional JSON catalog of extra pipelines registered at start-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipelines_file: Option<String>,
}

impl RunnerConfig {
    /// Creates a configuration with default timings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timings.
    #[must_use]
    pub fn with_timings(mut self, timings: SimulationTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Sets the cancellation semantics.
    #[must_use]
    pub fn with_cancel_mode(mut self, mode: CancelMode) -> Self {
        self.cancel_mode = mode;
        self
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Builds a configuration from the process environment.
    ///
    /// Reads the file named by `STAGEHAND_CONFIG` if set, then applies
    /// `STAGEHAND_TIME_SCALE` to every delay.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or the time scale
    /// is not a number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RunnerConfig::from_env`] with an injectable lookup.
    ///
    /// # Errors
    ///
    /// See [`RunnerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };

        if let Some(raw) = lookup(TIME_SCALE_ENV) {
            let factor: f64 = raw.trim().parse().map_err(|_| {
                StagehandError::Config(format!("{TIME_SCALE_ENV} must be a number, got '{raw}'"))
            })?;
            config.timings = config.timings.scaled(factor);
        }

        Ok(config)
    }
}
