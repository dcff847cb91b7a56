//! Test assertions for execution records.

use crate::core::{ExecutionStatus, StageStatus};
use crate::execution::PipelineExecution;

/// Asserts that the execution finished with `expected`.
pub fn assert_execution_status(execution: &PipelineExecution, expected: ExecutionStatus) {
    assert_eq!(
        execution.status, expected,
        "Expected execution {} to be {:?}, got {:?} (error: {:?})",
        execution.id, expected, execution.status, execution.error
    );
}

/// Asserts the status of a named stage.
pub fn assert_stage_status(execution: &PipelineExecution, stage: &str, expected: StageStatus) {
    let Some(record) = execution.stage(stage) else {
        panic!(
            "Stage '{}' not found. Stages: {:?}",
            stage,
            execution.stages.iter().map(|s| &s.name).collect::<Vec<_>>()
        );
    };
    assert_eq!(
        record.status, expected,
        "Expected stage '{}' to be {:?}, got {:?}",
        stage, expected, record.status
    );
}

/// Asserts that a stage and every job and step under it were skipped.
pub fn assert_stage_skipped(execution: &PipelineExecution, stage: &str) {
    assert_stage_status(execution, stage, StageStatus::Skipped);
    let record = execution.stage(stage).map(|s| s.jobs.as_slice()).unwrap_or_default();
    for job in record {
        assert_eq!(job.status, StageStatus::Skipped, "Job '{}' not skipped", job.name);
        for step in &job.steps {
            assert_eq!(
                step.status,
                StageStatus::Skipped,
                "Step '{}' of job '{}' not skipped",
                step.name,
                job.name
            );
        }
    }
}

/// Asserts that a job of a stage logged `message`.
pub fn assert_job_logged(execution: &PipelineExecution, stage: &str, job: &str, message: &str) {
    let logs: Vec<&str> = execution
        .stage(stage)
        .and_then(|s| s.job(job))
        .map(|j| j.logs.iter().map(|l| l.message.as_str()).collect())
        .unwrap_or_default();
    assert!(
        logs.contains(&message),
        "Expected job '{stage}/{job}' to log '{message}'. Logs: {logs:?}"
    );
}
