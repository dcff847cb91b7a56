//! In-memory execution tracker.
//!
//! Executions are never evicted; state is lost when the process exits.

use super::PipelineExecution;
use crate::config::CancelMode;
use crate::core::{ExecutionId, ExecutionStatus};
use crate::errors::{Result, StagehandError};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

/// One tracked execution: its mutable record plus a completion signal for
/// the background run.
#[derive(Debug)]
pub struct TrackedExecution {
    record: RwLock<PipelineExecution>,
    done: watch::Sender<bool>,
}

impl TrackedExecution {
    fn new(record: PipelineExecution) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            record: RwLock::new(record),
            done,
        }
    }

    /// Returns a copy of the current record.
    #[must_use]
    pub fn snapshot(&self) -> PipelineExecution {
        self.record.read().clone()
    }

    /// Mutates the record in place. The lock is held only for `f`.
    pub fn update<R>(&self, f: impl FnOnce(&mut PipelineExecution) -> R) -> R {
        f(&mut self.record.write())
    }

    /// Current execution status.
    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        self.record.read().status
    }

    /// Returns true once the background run has returned.
    #[must_use]
    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    pub(crate) fn mark_done(&self) {
        self.done.send_replace(true);
    }

    /// Waits until the background run has returned.
    pub async fn wait_done(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|done| *done).await;
    }
}

/// Tracks every execution and the set of active ones.
#[derive(Debug, Default)]
pub struct ExecutionTracker {
    executions: DashMap<ExecutionId, Arc<TrackedExecution>>,
    // Ids are time ordered, so iteration follows trigger order.
    active: Mutex<BTreeSet<ExecutionId>>,
}

impl ExecutionTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a new execution and marks it active.
    pub fn insert(&self, record: PipelineExecution) -> Arc<TrackedExecution> {
        let id = record.id.clone();
        let tracked = Arc::new(TrackedExecution::new(record));
        self.executions.insert(id.clone(), Arc::clone(&tracked));
        self.active.lock().insert(id);
        tracked
    }

    /// Returns the tracked handle for an execution.
    #[must_use]
    pub fn handle(&self, id: &ExecutionId) -> Option<Arc<TrackedExecution>> {
        self.executions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns a snapshot of an execution.
    #[must_use]
    pub fn get(&self, id: &ExecutionId) -> Option<PipelineExecution> {
        self.handle(id).map(|tracked| tracked.snapshot())
    }

    /// Lists executions, oldest first, optionally for one pipeline.
    #[must_use]
    pub fn list(&self, pipeline_id: Option<&str>) -> Vec<PipelineExecution> {
        let mut executions: Vec<_> = self
            .executions
            .iter()
            .map(|entry| entry.value().snapshot())
            .filter(|exec| pipeline_id.map_or(true, |p| exec.pipeline_id == p))
            .collect();
        executions.sort_by(|a, b| a.id.cmp(&b.id));
        executions
    }

    /// Lists active executions, oldest first.
    #[must_use]
    pub fn active(&self) -> Vec<PipelineExecution> {
        let ids: Vec<_> = self.active.lock().iter().cloned().collect();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Returns true if the execution is active.
    #[must_use]
    pub fn is_active(&self, id: &ExecutionId) -> bool {
        self.active.lock().contains(id)
    }

    /// Returns the number of tracked executions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executions.len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    /// Cancels an active execution.
    ///
    /// Returns false if the id is unknown or no longer active. Work already
    /// in flight is not interrupted; see [`CancelMode`] for what the
    /// background run does with the record when it finishes.
    pub fn cancel(&self, id: &ExecutionId) -> bool {
        let mut active = self.active.lock();
        let Some(tracked) = self.handle(id) else {
            return false;
        };
        if !active.remove(id) {
            return false;
        }
        tracked.update(|exec| exec.finish(ExecutionStatus::Cancelled));
        drop(active);

        warn!(
            execution_id = %id,
            "Cancelled pipeline execution; in-flight steps keep running to completion"
        );
        true
    }

    /// Retires an execution from the active set and applies its terminal
    /// update. Under [`CancelMode::Sticky`] a cancelled execution is left
    /// as is.
    ///
    /// Returns the resulting status.
    pub(crate) fn complete(
        &self,
        tracked: &TrackedExecution,
        mode: CancelMode,
        apply: impl FnOnce(&mut PipelineExecution),
    ) -> ExecutionStatus {
        let mut active = self.active.lock();
        tracked.update(|exec| {
            active.remove(&exec.id);
            let keep = mode == CancelMode::Sticky && exec.status == ExecutionStatus::Cancelled;
            if !keep {
                apply(exec);
            }
            exec.status
        })
    }

    /// Waits for the background run of an execution to return and yields
    /// the final record.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionNotFound` for unknown ids.
    pub async fn wait(&self, id: &ExecutionId) -> Result<PipelineExecution> {
        let tracked = self
            .handle(id)
            .ok_or_else(|| StagehandError::ExecutionNotFound(id.to_string()))?;
        tracked.wait_done().await;
        Ok(tracked.snapshot())
    }
}
