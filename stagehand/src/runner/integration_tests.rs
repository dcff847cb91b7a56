//! Scenario tests for pipeline execution.

#[cfg(test)]
mod tests {
    use crate::approval::ManualApprovalGate;
    use crate::config::CancelMode;
    use crate::core::{ApprovalStatus, ExecutionId, ExecutionStatus, StageStatus, StepStatus};
    use crate::errors::StagehandError;
    use crate::integrations::MockMetricsRecorder;
    use crate::notify::CollectingNotificationSink;
    use crate::pipeline::{
        Environment, JobConfig, LifecycleEvent, NotificationChannel, NotificationRule,
        PipelineConfig, StageConfig, StepConfig,
    };
    use crate::testing::{
        assert_execution_status, assert_job_logged, assert_stage_skipped, assert_stage_status,
        gated_pipeline, instant_service, instant_service_with, parallel_pipeline, push_context,
        two_stage_pipeline,
        InMemoryMetricsRecorder, RecordingDeploymentInvoker, RecordingStepExecutor,
        ScriptedStepExecutor, STEP_DELAY,
    };
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn all_events() -> [LifecycleEvent; 4] {
        [
            LifecycleEvent::Start,
            LifecycleEvent::Success,
            LifecycleEvent::Failure,
            LifecycleEvent::ApprovalRequired,
        ]
    }

    fn with_slack(mut config: PipelineConfig) -> PipelineConfig {
        config.notifications.push(NotificationRule::new(
            NotificationChannel::Slack,
            all_events(),
            "#deployments",
        ));
        config
    }

    #[tokio::test]
    async fn test_trigger_returns_retrievable_id() {
        let service = instant_service()
            .with_step_executor(Arc::new(ScriptedStepExecutor::new().with_delay(STEP_DELAY)));
        service.register(two_stage_pipeline());

        let id = service.trigger("two-stage", push_context("main")).unwrap();
        let execution = service.execution(&id).unwrap();

        assert!(id.as_str().starts_with("exec-"));
        assert!(matches!(
            execution.status,
            ExecutionStatus::Pending | ExecutionStatus::Running
        ));
        assert_eq!(execution.pipeline_id, "two-stage");
        assert_eq!(execution.author.as_deref(), Some("ci-bot"));
        assert_eq!(service.active_executions().len(), 1);

        let finished = service.wait_for_completion(&id).await.unwrap();
        assert_execution_status(&finished, ExecutionStatus::Success);
        assert!(finished.finished_at.is_some());
        assert!(finished.duration_ms.is_some());
        assert!(service.active_executions().is_empty());
    }

    #[tokio::test]
    async fn test_trigger_unknown_pipeline() {
        let service = instant_service();
        let result = service.trigger("missing", push_context("main"));
        assert!(matches!(result, Err(StagehandError::PipelineNotFound(_))));
        assert!(service.executions(None).is_empty());
    }

    #[tokio::test]
    async fn test_failed_dependency_skips_dependent_stage() {
        let executor = Arc::new(ScriptedStepExecutor::new().fail_step("a-step"));
        let service = instant_service().with_step_executor(executor.clone());
        service.register(two_stage_pipeline());

        let id = service.trigger("two-stage", push_context("main")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Failure);
        assert_stage_status(&finished, "A", StageStatus::Failure);
        assert_stage_skipped(&finished, "B");
        assert_eq!(executor.calls(), vec!["a-step"]);

        let error = finished.error.as_deref().unwrap();
        assert!(error.contains("Stage failed: A"), "{error}");
        assert!(error.contains("a-step"), "{error}");

        assert_job_logged(&finished, "A", "a-job", "Starting: a-step");
        assert_job_logged(&finished, "A", "a-job", "Failed: a-step");
        assert_job_logged(
            &finished,
            "A",
            "a-job",
            "ERROR: Step 'a-step' failed: scripted failure",
        );
    }

    #[tokio::test]
    async fn test_failure_notifies_and_records_metrics() {
        let sink = Arc::new(CollectingNotificationSink::new());
        let metrics = Arc::new(InMemoryMetricsRecorder::new());
        let service = instant_service()
            .with_step_executor(Arc::new(ScriptedStepExecutor::new().fail_step("a-step")))
            .with_notification_sink(sink.clone())
            .with_metrics(metrics.clone());
        service.register(with_slack(two_stage_pipeline()));

        let id = service.trigger("two-stage", push_context("main")).unwrap();
        service.wait_for_completion(&id).await.unwrap();

        let events: Vec<_> = sink.sent().iter().map(|n| n.event).collect();
        assert_eq!(events, vec![LifecycleEvent::Start, LifecycleEvent::Failure]);
        assert!(sink.sent().iter().all(|n| n.execution_id == id));

        let executions = metrics.named("pipeline.execution");
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].tags["status"], "failure");
        assert_eq!(executions[0].tags["pipeline"], "two-stage");
        assert_eq!(metrics.named("pipeline.duration").len(), 1);
    }

    #[tokio::test]
    async fn test_success_notifies_and_records_metrics() {
        let sink = Arc::new(CollectingNotificationSink::new());
        let metrics = Arc::new(InMemoryMetricsRecorder::new());
        let service = instant_service()
            .with_step_executor(Arc::new(ScriptedStepExecutor::new()))
            .with_notification_sink(sink.clone())
            .with_metrics(metrics.clone());
        service.register(with_slack(two_stage_pipeline()));

        let id = service.trigger("two-stage", push_context("main")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Success);
        assert!(finished.deployment_id.is_none());
        let events: Vec<_> = sink.sent().iter().map(|n| n.event).collect();
        assert_eq!(events, vec![LifecycleEvent::Start, LifecycleEvent::Success]);
        assert_eq!(metrics.named("pipeline.execution")[0].tags["status"], "success");
    }

    #[tokio::test]
    async fn test_metrics_recorded_once_per_run() {
        let mut metrics = MockMetricsRecorder::new();
        metrics
            .expect_record()
            .withf(|m| m.name == "pipeline.execution" && m.tags["environment"] == "development")
            .times(1)
            .return_const(());
        metrics
            .expect_record()
            .withf(|m| m.name == "pipeline.duration" && !m.tags.contains_key("status"))
            .times(1)
            .return_const(());

        let service = instant_service()
            .with_step_executor(Arc::new(ScriptedStepExecutor::new()))
            .with_metrics(Arc::new(metrics));
        service.register(two_stage_pipeline());

        let id = service.trigger("two-stage", push_context("main")).unwrap();
        service.wait_for_completion(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_parallel_jobs_overlap() {
        let executor = Arc::new(RecordingStepExecutor::new(STEP_DELAY));
        let service = instant_service().with_step_executor(executor.clone());
        service.register(parallel_pipeline());

        let id = service.trigger("parallel", push_context("main")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();
        assert_execution_status(&finished, ExecutionStatus::Success);

        let a = executor.job_span("job-a").unwrap();
        let b = executor.job_span("job-b").unwrap();
        assert!(a.started < b.finished);
        assert!(b.started < a.finished);

        let stage = finished.stage("Test").unwrap();
        let a_start = stage.job("job-a").unwrap().logged_at("Starting: a-tests").unwrap();
        let b_end = stage.job("job-b").unwrap().logged_at("Completed: b-tests").unwrap();
        assert!(a_start < b_end);
    }

    #[tokio::test]
    async fn test_parallel_stage_fails_after_all_jobs_finish() {
        let executor = Arc::new(
            ScriptedStepExecutor::new()
                .fail_step("a-tests")
                .with_delay(Duration::from_millis(5)),
        );
        let service = instant_service().with_step_executor(executor.clone());
        service.register(parallel_pipeline());

        let id = service.trigger("parallel", push_context("main")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Failure);
        let stage = finished.stage("Test").unwrap();
        assert_eq!(stage.status, StageStatus::Failure);
        assert_eq!(stage.job("job-a").unwrap().status, StageStatus::Failure);
        assert_eq!(stage.job("job-b").unwrap().status, StageStatus::Success);
        assert_eq!(executor.call_count(), 2);
    }

    #[tokio::test]
    async fn test_sequential_failure_skips_later_jobs() {
        let config = PipelineConfig {
            stages: vec![StageConfig::new(
                "Build",
                vec![
                    JobConfig::new("first", vec![StepConfig::run("compile", "make")]),
                    JobConfig::new("second", vec![StepConfig::run("package", "make dist")]),
                ],
            )],
            ..PipelineConfig::new("sequential", "Sequential")
        };
        let executor = Arc::new(ScriptedStepExecutor::new().fail_step("compile"));
        let service = instant_service().with_step_executor(executor.clone());
        service.register(config);

        let id = service.trigger("sequential", push_context("main")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        let stage = finished.stage("Build").unwrap();
        assert_eq!(stage.job("first").unwrap().status, StageStatus::Failure);
        assert_eq!(stage.job("second").unwrap().status, StageStatus::Skipped);
        assert_eq!(executor.calls(), vec!["compile"]);
    }

    #[tokio::test]
    async fn test_failing_step_skips_rest_of_job() {
        let config = PipelineConfig {
            stages: vec![StageConfig::new(
                "Build",
                vec![JobConfig::new(
                    "build",
                    vec![
                        StepConfig::checkout("Checkout"),
                        StepConfig::run("compile", "make"),
                        StepConfig::run("package", "make dist"),
                    ],
                )],
            )],
            ..PipelineConfig::new("steps", "Steps")
        };
        let service = instant_service()
            .with_step_executor(Arc::new(ScriptedStepExecutor::new().fail_step("compile")));
        service.register(config);

        let id = service.trigger("steps", push_context("main")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        let statuses: Vec<_> = finished.stages[0].jobs[0]
            .steps
            .iter()
            .map(|s| s.status)
            .collect();
        assert_eq!(
            statuses,
            vec![StepStatus::Success, StepStatus::Failure, StepStatus::Skipped]
        );
    }

    #[tokio::test]
    async fn test_continue_on_error_keeps_job_running() {
        let config = PipelineConfig {
            stages: vec![StageConfig::new(
                "Quality",
                vec![JobConfig::new(
                    "lint",
                    vec![
                        StepConfig::run("audit", "npm audit").continue_on_error(),
                        StepConfig::run("lint", "npm run lint"),
                    ],
                )
                .with_artifacts(["lint-report.json"])],
            )],
            ..PipelineConfig::new("quality", "Quality")
        };
        let executor = Arc::new(ScriptedStepExecutor::new().fail_step("audit"));
        let service = instant_service().with_step_executor(executor.clone());
        service.register(config);

        let id = service.trigger("quality", push_context("main")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Success);
        let job = finished.stage("Quality").unwrap().job("lint").unwrap();
        assert_eq!(job.status, StageStatus::Success);
        assert_eq!(job.steps[0].status, StepStatus::Failure);
        assert_eq!(job.steps[1].status, StepStatus::Success);
        assert_eq!(job.artifacts, vec!["lint-report.json"]);
        assert_job_logged(&finished, "Quality", "lint", "Failed: audit");
        assert_job_logged(&finished, "Quality", "lint", "Completed: lint");
        assert_eq!(executor.calls(), vec!["audit", "lint"]);
    }

    #[tokio::test]
    async fn test_cancel_unknown_or_finished_returns_false() {
        let service = instant_service().with_step_executor(Arc::new(ScriptedStepExecutor::new()));
        service.register(two_stage_pipeline());

        assert!(!service.cancel(&ExecutionId::from("exec-unknown")));

        let id = service.trigger("two-stage", push_context("main")).unwrap();
        service.wait_for_completion(&id).await.unwrap();
        assert!(!service.cancel(&id));
        assert_eq!(service.execution(&id).unwrap().status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_cancelled_execution_is_overwritten_by_run_outcome() {
        let sink = Arc::new(CollectingNotificationSink::new());
        let executor = Arc::new(ScriptedStepExecutor::new().with_delay(STEP_DELAY));
        let service = instant_service()
            .with_step_executor(executor.clone())
            .with_notification_sink(sink.clone());
        service.register(with_slack(two_stage_pipeline()));

        let id = service.trigger("two-stage", push_context("main")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(service.cancel(&id));
        assert!(!service.cancel(&id));

        let cancelled = service.execution(&id).unwrap();
        assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
        assert!(cancelled.finished_at.is_some());
        assert!(service.active_executions().is_empty());

        let finished = service.wait_for_completion(&id).await.unwrap();
        assert_execution_status(&finished, ExecutionStatus::Success);
        assert_stage_status(&finished, "A", StageStatus::Success);
        assert_stage_status(&finished, "B", StageStatus::Success);
        assert_eq!(executor.call_count(), 2);
        assert!(service.active_executions().is_empty());

        let events: Vec<_> = sink.sent().iter().map(|n| n.event).collect();
        assert_eq!(events, vec![LifecycleEvent::Start, LifecycleEvent::Success]);
    }

    #[tokio::test]
    async fn test_cancelled_execution_failure_overwrites_and_notifies() {
        let sink = Arc::new(CollectingNotificationSink::new());
        let executor = ScriptedStepExecutor::new()
            .with_delay(STEP_DELAY)
            .fail_step("b-step");
        let service = instant_service()
            .with_step_executor(Arc::new(executor))
            .with_notification_sink(sink.clone());
        service.register(with_slack(two_stage_pipeline()));

        let id = service.trigger("two-stage", push_context("main")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(service.cancel(&id));

        let finished = service.wait_for_completion(&id).await.unwrap();
        assert_execution_status(&finished, ExecutionStatus::Failure);
        assert_stage_status(&finished, "B", StageStatus::Failure);
        assert!(finished.error.as_deref().unwrap().contains("Stage failed: B"));

        let events: Vec<_> = sink.sent().iter().map(|n| n.event).collect();
        assert_eq!(events, vec![LifecycleEvent::Start, LifecycleEvent::Failure]);
    }

    #[tokio::test]
    async fn test_sticky_cancel_keeps_cancelled_status() {
        let sink = Arc::new(CollectingNotificationSink::new());
        let deployer = Arc::new(RecordingDeploymentInvoker::new());
        let executor = Arc::new(ScriptedStepExecutor::new().with_delay(STEP_DELAY));
        let service = instant_service_with(CancelMode::Sticky)
            .with_step_executor(executor.clone())
            .with_deployer(deployer.clone())
            .with_notification_sink(sink.clone());
        let mut config = with_slack(two_stage_pipeline());
        config.environment = Environment::Staging;
        service.register(config);

        let id = service.trigger("two-stage", push_context("staging")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(service.cancel(&id));

        let finished = service.wait_for_completion(&id).await.unwrap();
        assert_execution_status(&finished, ExecutionStatus::Cancelled);
        assert_stage_status(&finished, "A", StageStatus::Success);
        assert_stage_status(&finished, "B", StageStatus::Success);
        assert!(finished.deployment_id.is_none());
        assert_eq!(executor.call_count(), 2);

        let events: Vec<_> = sink.sent().iter().map(|n| n.event).collect();
        assert_eq!(events, vec![LifecycleEvent::Start]);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_are_independent() {
        let executor = Arc::new(ScriptedStepExecutor::new().with_delay(STEP_DELAY));
        let service = instant_service_with(CancelMode::Sticky).with_step_executor(executor.clone());
        service.register(two_stage_pipeline());
        service.register(parallel_pipeline());

        let ids: Vec<_> = (0..5)
            .map(|_| service.trigger("two-stage", push_context("main")).unwrap())
            .collect();
        let other = service.trigger("parallel", push_context("main")).unwrap();

        let unique: HashSet<_> = ids.iter().chain(std::iter::once(&other)).collect();
        assert_eq!(unique.len(), 6);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let (cancelled, siblings) = ids.split_first().unwrap();
        assert!(service.cancel(cancelled));

        assert_eq!(service.execution(cancelled).unwrap().status, ExecutionStatus::Cancelled);
        let active: HashSet<_> = service.active_executions().into_iter().map(|e| e.id).collect();
        assert_eq!(active.len(), 5);
        assert!(!active.contains(cancelled));
        for id in siblings.iter().chain(std::iter::once(&other)) {
            assert!(active.contains(id));
            let running = service.execution(id).unwrap();
            assert_eq!(running.status, ExecutionStatus::Running);
            assert!(running.finished_at.is_none());
        }

        for id in siblings {
            let finished = service.wait_for_completion(id).await.unwrap();
            assert_eq!(&finished.id, id);
            assert_execution_status(&finished, ExecutionStatus::Success);
            assert_stage_status(&finished, "A", StageStatus::Success);
            assert_stage_status(&finished, "B", StageStatus::Success);
            assert!(finished.error.is_none());
        }
        let parallel = service.wait_for_completion(&other).await.unwrap();
        assert_execution_status(&parallel, ExecutionStatus::Success);

        let cancelled = service.wait_for_completion(cancelled).await.unwrap();
        assert_execution_status(&cancelled, ExecutionStatus::Cancelled);

        assert!(service.active_executions().is_empty());
        assert_eq!(service.executions(Some("two-stage")).len(), 5);
        assert_eq!(service.executions(Some("parallel")).len(), 1);
        assert_eq!(service.executions(None).len(), 6);
    }

    #[tokio::test]
    async fn test_staging_success_records_deployment() {
        let deployer = Arc::new(RecordingDeploymentInvoker::new());
        let service = instant_service()
            .with_step_executor(Arc::new(ScriptedStepExecutor::new()))
            .with_deployer(deployer.clone());
        service.register(gated_pipeline(Environment::Staging));

        let id = service.trigger("gated", push_context("staging")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Success);
        assert_eq!(finished.deployment_id.as_deref(), Some("deploy-1"));
        assert_eq!(
            finished.stage("Deploy").unwrap().approval,
            Some(ApprovalStatus::Approved)
        );

        let requests = deployer.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].environment, Environment::Staging);
        assert_eq!(requests[0].version, "01234567");
        assert_eq!(requests[0].branch, "staging");
        assert_eq!(requests[0].features, vec!["ci-cd-deployment"]);
    }

    #[tokio::test]
    async fn test_development_run_skips_deployment() {
        let deployer = Arc::new(RecordingDeploymentInvoker::new());
        let service = instant_service()
            .with_step_executor(Arc::new(ScriptedStepExecutor::new()))
            .with_deployer(deployer.clone());
        service.register(gated_pipeline(Environment::Development));

        let id = service.trigger("gated", push_context("develop")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Success);
        assert!(finished.deployment_id.is_none());
        assert!(deployer.requests().is_empty());
    }

    #[tokio::test]
    async fn test_deployment_failure_fails_execution() {
        let service = instant_service()
            .with_step_executor(Arc::new(ScriptedStepExecutor::new()))
            .with_deployer(Arc::new(RecordingDeploymentInvoker::failing("cluster unreachable")));
        service.register(gated_pipeline(Environment::Production));

        let id = service.trigger("gated", push_context("main")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Failure);
        assert_eq!(
            finished.error.as_deref(),
            Some("Deployment failed: cluster unreachable")
        );
        assert!(finished.deployment_id.is_none());
        assert_stage_status(&finished, "Verify", StageStatus::Success);
    }

    #[tokio::test]
    async fn test_rejected_approval_skips_stage_and_dependents() {
        let sink = Arc::new(CollectingNotificationSink::new());
        let executor = Arc::new(ScriptedStepExecutor::new());
        let service = instant_service()
            .with_step_executor(executor.clone())
            .with_notification_sink(sink.clone())
            .with_approval_gate(Arc::new(ManualApprovalGate::new(Duration::from_millis(20))));
        service.register(with_slack(gated_pipeline(Environment::Development)));

        let id = service.trigger("gated", push_context("develop")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Success);
        assert_stage_status(&finished, "Build", StageStatus::Success);
        assert_stage_skipped(&finished, "Deploy");
        assert_stage_skipped(&finished, "Verify");
        assert_eq!(
            finished.stage("Deploy").unwrap().approval,
            Some(ApprovalStatus::Rejected)
        );
        assert_eq!(executor.calls(), vec!["compile"]);

        let events: Vec<_> = sink.sent().iter().map(|n| n.event).collect();
        assert_eq!(
            events,
            vec![
                LifecycleEvent::Start,
                LifecycleEvent::ApprovalRequired,
                LifecycleEvent::Success,
            ]
        );
    }

    #[tokio::test]
    async fn test_manual_approval_unblocks_stage() {
        let gate = Arc::new(ManualApprovalGate::new(Duration::from_secs(5)));
        let service = instant_service()
            .with_step_executor(Arc::new(ScriptedStepExecutor::new()))
            .with_approval_gate(gate.clone());
        service.register(gated_pipeline(Environment::Development));

        let id = service.trigger("gated", push_context("develop")).unwrap();

        let pending = loop {
            let pending = gate.pending_requests();
            if !pending.is_empty() {
                break pending;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        };
        assert_eq!(pending[0].stage, "Deploy");
        assert_eq!(pending[0].execution_id, id);
        assert_eq!(
            service.execution(&id).unwrap().stage("Deploy").unwrap().approval,
            Some(ApprovalStatus::Pending)
        );

        assert!(gate.approve(pending[0].request_id));
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Success);
        assert_stage_status(&finished, "Deploy", StageStatus::Success);
        assert_stage_status(&finished, "Verify", StageStatus::Success);
    }

    #[tokio::test]
    async fn test_step_panic_fails_execution() {
        let executor = Arc::new(ScriptedStepExecutor::new().panic_on("a-step"));
        let service = instant_service().with_step_executor(executor.clone());
        service.register(two_stage_pipeline());

        let id = service.trigger("two-stage", push_context("main")).unwrap();
        let finished = service.wait_for_completion(&id).await.unwrap();

        assert_execution_status(&finished, ExecutionStatus::Failure);
        assert_stage_status(&finished, "A", StageStatus::Failure);
        assert_stage_skipped(&finished, "B");
        assert_eq!(executor.calls(), vec!["a-step"]);

        let job = &finished.stages[0].jobs[0];
        assert_eq!(job.status, StageStatus::Failure);
        assert_eq!(job.steps[0].status, StepStatus::Failure);
        assert_job_logged(&finished, "A", "a-job", "Failed: a-step");

        let error = finished.error.as_deref().unwrap();
        assert!(error.contains("Stage failed: A"), "{error}");
        assert!(error.contains("scripted panic in a-step"), "{error}");
        assert!(service.active_executions().is_empty());
    }

    #[tokio::test]
    async fn test_default_catalog_runs() {
        let deployer = Arc::new(RecordingDeploymentInvoker::new());
        let service = instant_service()
            .with_default_pipelines()
            .with_deployer(deployer.clone());

        for (pipeline, branch) in [
            ("development", "develop"),
            ("staging", "staging"),
            ("production", "main"),
            ("hotfix", "hotfix/login"),
        ] {
            let id = service.trigger(pipeline, push_context(branch)).unwrap();
            let finished = service.wait_for_completion(&id).await.unwrap();
            assert_execution_status(&finished, ExecutionStatus::Success);
            assert!(finished
                .stages
                .iter()
                .all(|stage| stage.status == StageStatus::Success));
        }

        let environments: Vec<_> = deployer.requests().iter().map(|r| r.environment).collect();
        assert_eq!(
            environments,
            vec![Environment::Staging, Environment::Production, Environment::Production]
        );
    }
}
