//! Built-in pipeline catalog and JSON catalog loading.

use super::{
    CacheConfig, Environment, JobConfig, LifecycleEvent, NotificationChannel, NotificationRule,
    PipelineConfig, StageConfig, StepConfig, Trigger,
};
use crate::errors::Result;
use std::path::Path;

/// Loads pipeline definitions from a JSON file holding an array of pipelines.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_pipelines(path: impl AsRef<Path>) -> Result<Vec<PipelineConfig>> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let pipelines = serde_json::from_str(&raw)?;
    Ok(pipelines)
}

fn node_setup() -> [StepConfig; 3] {
    [
        StepConfig::checkout("Checkout"),
        StepConfig::setup("Setup Node.js", "node@18"),
        StepConfig::run("Install Dependencies", "npm ci"),
    ]
}

fn with_setup(rest: impl IntoIterator<Item = StepConfig>) -> Vec<StepConfig> {
    node_setup().into_iter().chain(rest).collect()
}

fn notify_with(name: &str, key: &str, value: &str) -> StepConfig {
    StepConfig::notify(name).with_param(key, serde_json::Value::String(value.to_string()))
}

/// The storefront's default pipelines: `development`, `staging`,
/// `production` and `hotfix`.
#[must_use]
pub fn default_pipelines() -> Vec<PipelineConfig> {
    vec![development(), staging(), production(), hotfix()]
}

/// Lint, test and build on pushes to `develop`.
#[must_use]
pub fn development() -> PipelineConfig {
    PipelineConfig {
        id: "development".to_string(),
        name: "Development Build & Test".to_string(),
        trigger: Trigger::Push,
        branch: Some("develop".to_string()),
        environment: Environment::Development,
        stages: vec![
            StageConfig::new(
                "Code Quality",
                vec![JobConfig::new(
                    "Lint & Format",
                    with_setup([
                        StepConfig::run("Run Linting", "npm run lint"),
                        StepConfig::run("Check Formatting", "npm run format:check"),
                    ]),
                )
                .with_cache(CacheConfig {
                    key: "node-modules-${{ hashFiles('package-lock.json') }}".to_string(),
                    paths: vec!["node_modules".to_string()],
                    restore_keys: Vec::new(),
                })],
            ),
            StageConfig::new(
                "Test Suite",
                vec![
                    JobConfig::new(
                        "Unit Tests",
                        vec![
                            StepConfig::run("Run Unit Tests", "npm run test:unit"),
                            StepConfig::run("Generate Coverage", "npm run test:coverage"),
                        ],
                    )
                    .with_artifacts(["coverage/"]),
                    JobConfig::new(
                        "Integration Tests",
                        vec![StepConfig::run("Run Integration Tests", "npm run test:integration")],
                    ),
                ],
            )
            .with_dependency("Code Quality")
            .parallel(),
            StageConfig::new(
                "Build",
                vec![JobConfig::new(
                    "Build Application",
                    vec![
                        StepConfig::run("Build Next.js App", "npm run build"),
                        StepConfig::run("Verify Build", "npm run build:analyze"),
                    ],
                )
                .with_artifacts([".next/", "out/"])],
            )
            .with_dependency("Test Suite"),
        ],
        notifications: vec![NotificationRule::new(
            NotificationChannel::Slack,
            [LifecycleEvent::Failure],
            "#dev-notifications",
        )],
        auto_approval: false,
        rollback_on_failure: false,
    }
}

/// Quality gate, deploy and verify on pushes to `staging`.
#[must_use]
pub fn staging() -> PipelineConfig {
    PipelineConfig {
        id: "staging".to_string(),
        name: "Staging Deployment".to_string(),
        trigger: Trigger::Push,
        branch: Some("staging".to_string()),
        environment: Environment::Staging,
        stages: vec![
            StageConfig::new(
                "Pre-Deployment",
                vec![JobConfig::new(
                    "Quality Gate",
                    with_setup([
                        StepConfig::test("Run Full Test Suite", "npm run test:all"),
                        StepConfig::run("Security Scan", "npm audit --audit-level moderate"),
                        StepConfig::run("Build Application", "npm run build"),
                    ]),
                )],
            ),
            StageConfig::new(
                "Deploy to Staging",
                vec![JobConfig::new(
                    "Deploy Application",
                    vec![
                        StepConfig::deploy("Deploy to Staging", "staging"),
                        StepConfig::test("Run Smoke Tests", "npm run test:smoke"),
                        StepConfig::test("Performance Tests", "npm run test:performance"),
                    ],
                )],
            )
            .with_dependency("Pre-Deployment"),
            StageConfig::new(
                "Post-Deployment",
                vec![JobConfig::new(
                    "Verify Deployment",
                    vec![
                        StepConfig::run("Health Check", "curl -f $STAGING_URL/api/health"),
                        notify_with("Update Monitoring", "deployment", "staging"),
                    ],
                )],
            )
            .with_dependency("Deploy to Staging"),
        ],
        notifications: vec![NotificationRule::new(
            NotificationChannel::Slack,
            [LifecycleEvent::Success, LifecycleEvent::Failure],
            "#deployments",
        )],
        auto_approval: true,
        rollback_on_failure: false,
    }
}

/// Manually triggered blue-green production release behind an approval.
#[must_use]
pub fn production() -> PipelineConfig {
    PipelineConfig {
        id: "production".to_string(),
        name: "Production Deployment".to_string(),
        trigger: Trigger::Manual,
        branch: Some("main".to_string()),
        environment: Environment::Production,
        stages: vec![
            StageConfig::new(
                "Pre-Production Validation",
                vec![JobConfig::new(
                    "Final Quality Check",
                    with_setup([
                        StepConfig::test("Run Complete Test Suite", "npm run test:all"),
                        StepConfig::run("Security Audit", "npm audit --audit-level high"),
                        StepConfig::run("Build Production", "npm run build:production"),
                        StepConfig::run("Bundle Analysis", "npm run analyze:bundle"),
                    ]),
                )],
            ),
            StageConfig::new(
                "Production Approval",
                vec![JobConfig::new(
                    "Deployment Approval",
                    vec![notify_with("Request Approval", "type", "approval_required")],
                )],
            )
            .with_dependency("Pre-Production Validation")
            .requires_approval(),
            StageConfig::new(
                "Production Deployment",
                vec![JobConfig::new(
                    "Blue-Green Deploy",
                    vec![
                        StepConfig::run("Create Database Backup", "npm run db:backup"),
                        StepConfig::deploy("Deploy to Production", "production").with_param(
                            "strategy",
                            serde_json::Value::String("blue-green".to_string()),
                        ),
                        StepConfig::run("Health Verification", "npm run health:verify"),
                        StepConfig::run("Switch Traffic", "npm run traffic:switch"),
                    ],
                )],
            )
            .with_dependency("Production Approval")
            .with_timeout_secs(1800),
            StageConfig::new(
                "Post-Production",
                vec![JobConfig::new(
                    "Monitoring & Alerts",
                    vec![
                        notify_with("Update Monitoring", "deployment", "production"),
                        notify_with("Send Success Notification", "type", "success"),
                        StepConfig::run("Archive Artifacts", "npm run artifacts:archive"),
                    ],
                )],
            )
            .with_dependency("Production Deployment"),
        ],
        notifications: vec![
            NotificationRule::new(
                NotificationChannel::Slack,
                [
                    LifecycleEvent::Start,
                    LifecycleEvent::Success,
                    LifecycleEvent::Failure,
                    LifecycleEvent::ApprovalRequired,
                ],
                "#production-deployments",
            ),
            NotificationRule::new(
                NotificationChannel::Email,
                [LifecycleEvent::Success, LifecycleEvent::Failure],
                "team@fashun.co",
            ),
        ],
        auto_approval: false,
        rollback_on_failure: true,
    }
}

/// Emergency production fix on pushes to `hotfix/*`.
#[must_use]
pub fn hotfix() -> PipelineConfig {
    PipelineConfig {
        id: "hotfix".to_string(),
        name: "Hotfix Deployment".to_string(),
        trigger: Trigger::Push,
        branch: Some("hotfix/*".to_string()),
        environment: Environment::Production,
        stages: vec![
            StageConfig::new(
                "Emergency Validation",
                vec![JobConfig::new(
                    "Critical Tests",
                    with_setup([
                        StepConfig::test("Run Critical Tests", "npm run test:critical"),
                        StepConfig::run("Security Quick Scan", "npm run security:quick"),
                        StepConfig::run("Build Hotfix", "npm run build"),
                    ]),
                )],
            ),
            StageConfig::new(
                "Hotfix Approval",
                vec![JobConfig::new(
                    "Emergency Approval",
                    vec![notify_with("Request Emergency Approval", "type", "emergency_approval")],
                )],
            )
            .with_dependency("Emergency Validation")
            .requires_approval(),
            StageConfig::new(
                "Emergency Deploy",
                vec![JobConfig::new(
                    "Hotfix Deployment",
                    vec![
                        StepConfig::run("Create Emergency Backup", "npm run db:emergency-backup"),
                        StepConfig::deploy("Deploy Hotfix", "production").with_param(
                            "strategy",
                            serde_json::Value::String("hotfix".to_string()),
                        ),
                        StepConfig::run("Immediate Health Check", "npm run health:immediate"),
                        StepConfig::test("Critical Path Tests", "npm run test:critical-path"),
                    ],
                )],
            )
            .with_dependency("Hotfix Approval")
            .with_timeout_secs(900),
        ],
        notifications: vec![
            NotificationRule::new(
                NotificationChannel::Slack,
                [
                    LifecycleEvent::Start,
                    LifecycleEvent::Success,
                    LifecycleEvent::Failure,
                    LifecycleEvent::ApprovalRequired,
                ],
                "#emergency-deployments",
            ),
            NotificationRule::new(
                NotificationChannel::Email,
                [LifecycleEvent::Start, LifecycleEvent::Success, LifecycleEvent::Failure],
                "oncall@fashun.co",
            ),
        ],
        auto_approval: false,
        rollback_on_failure: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validate;
    use std::io::Write;

    #[test]
    fn test_default_pipelines_valid() {
        let pipelines = default_pipelines();
        let ids: Vec<_> = pipelines.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["development", "staging", "production", "hotfix"]);

        for pipeline in &pipelines {
            validate(pipeline).unwrap();
        }
    }

    #[test]
    fn test_production_gated() {
        let production = production();
        let gate = production.stage("Production Approval").unwrap();
        assert!(gate.approval_required);
        assert!(production.rollback_on_failure);
        assert_eq!(production.environment, Environment::Production);
    }

    #[test]
    fn test_development_parallel_tests() {
        let dev = development();
        let tests = dev.stage("Test Suite").unwrap();
        assert!(tests.parallel);
        assert_eq!(tests.jobs.len(), 2);
    }

    #[test]
    fn test_load_pipelines_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&default_pipelines()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = load_pipelines(file.path()).unwrap();
        assert_eq!(loaded, default_pipelines());
    }

    #[test]
    fn test_load_pipelines_missing_file() {
        assert!(load_pipelines("/definitely/not/here.json").is_err());
    }
}
