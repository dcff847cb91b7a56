//! Approval gates for stages marked `approval_required`.

use crate::core::ExecutionId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// The stage may run.
    Approved,
    /// The stage is skipped.
    Rejected,
}

/// Decides whether a gated stage may run.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Blocks until a decision is made for `stage` of `execution_id`.
    async fn request(&self, execution_id: &ExecutionId, stage: &str) -> ApprovalDecision;
}

/// Waits a fixed delay, then always approves.
#[derive(Debug, Clone, Default)]
pub struct AutoApprovalGate {
    delay: Duration,
}

impl AutoApprovalGate {
    /// Creates a gate that approves after `delay`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ApprovalGate for AutoApprovalGate {
    async fn request(&self, execution_id: &ExecutionId, stage: &str) -> ApprovalDecision {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        debug!(execution_id = %execution_id, stage = %stage, "Auto-approved stage");
        ApprovalDecision::Approved
    }
}

/// A pending approval as seen by whoever decides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    /// Request id to pass to `approve`/`deny`.
    pub request_id: Uuid,
    /// Execution waiting on the decision.
    pub execution_id: ExecutionId,
    /// Gated stage.
    pub stage: String,
    /// When the request was raised.
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug)]
struct ApprovalRequest {
    info: PendingApproval,
    response_tx: Option<oneshot::Sender<bool>>,
}

/// Holds approvals open until someone calls `approve` or `deny`.
///
/// A request that times out, or whose gate drops the sender, counts as
/// rejected.
#[derive(Debug)]
pub struct ManualApprovalGate {
    timeout: Duration,
    requests: RwLock<HashMap<Uuid, ApprovalRequest>>,
}

impl ManualApprovalGate {
    /// Creates a gate whose requests expire after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            requests: RwLock::new(HashMap::new()),
        }
    }

    /// Approves a pending request. Returns false if it is not pending.
    pub fn approve(&self, request_id: Uuid) -> bool {
        self.respond(request_id, true)
    }

    /// Denies a pending request. Returns false if it is not pending.
    pub fn deny(&self, request_id: Uuid) -> bool {
        self.respond(request_id, false)
    }

    fn respond(&self, request_id: Uuid, approved: bool) -> bool {
        if let Some(mut request) = self.requests.write().remove(&request_id) {
            if let Some(tx) = request.response_tx.take() {
                return tx.send(approved).is_ok();
            }
        }
        false
    }

    /// Lists pending requests, oldest first.
    #[must_use]
    pub fn pending_requests(&self) -> Vec<PendingApproval> {
        let mut pending: Vec<_> = self
            .requests
            .read()
            .values()
            .map(|r| r.info.clone())
            .collect();
        pending.sort_by_key(|p| p.requested_at);
        pending
    }

    /// Returns the number of pending requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.requests.read().len()
    }
}

#[async_trait]
impl ApprovalGate for ManualApprovalGate {
    async fn request(&self, execution_id: &ExecutionId, stage: &str) -> ApprovalDecision {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();

        self.requests.write().insert(
            request_id,
            ApprovalRequest {
                info: PendingApproval {
                    request_id,
                    execution_id: execution_id.clone(),
                    stage: stage.to_string(),
                    requested_at: Utc::now(),
                },
                response_tx: Some(tx),
            },
        );
        info!(
            execution_id = %execution_id,
            stage = %stage,
            request_id = %request_id,
            "Waiting for stage approval"
        );

        let outcome = tokio::time::timeout(self.timeout, rx).await;
        self.requests.write().remove(&request_id);

        match outcome {
            Ok(Ok(true)) => ApprovalDecision::Approved,
            Ok(Ok(false)) => ApprovalDecision::Rejected,
            Ok(Err(_)) => {
                warn!(request_id = %request_id, "Approval channel closed; treating as rejected");
                ApprovalDecision::Rejected
            }
            Err(_) => {
                warn!(
                    request_id = %request_id,
                    timeout_ms = self.timeout.as_millis(),
                    "Approval timed out; treating as rejected"
                );
                ApprovalDecision::Rejected
            }
        }
    }
}
