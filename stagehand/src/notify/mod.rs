//! Lifecycle notifications.
//!
//! The [`Notifier`] picks the rules of a pipeline that fire on an event and
//! hands one [`Notification`] per rule to a [`NotificationSink`].

mod sink;

pub use sink::{
    CollectingNotificationSink, LoggingNotificationSink, NoOpNotificationSink, NotificationSink,
};

use crate::core::ExecutionId;
use crate::pipeline::{LifecycleEvent, NotificationChannel, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One message for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Pipeline that produced the event.
    pub pipeline_id: String,
    /// Execution that produced the event.
    pub execution_id: ExecutionId,
    /// The lifecycle event.
    pub event: LifecycleEvent,
    /// Channel transport.
    pub channel: NotificationChannel,
    /// Channel target.
    pub target: String,
}

/// Routes lifecycle events to the configured channels.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    /// Creates a notifier writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Sends `event` to every rule of `config` that listens for it, one at a
    /// time. Returns how many notifications were sent.
    pub async fn notify(
        &self,
        config: &PipelineConfig,
        execution_id: &ExecutionId,
        event: LifecycleEvent,
    ) -> usize {
        let mut sent = 0;
        for rule in config.rules_for(event) {
            let notification = Notification {
                pipeline_id: config.id.clone(),
                execution_id: execution_id.clone(),
                event,
                channel: rule.channel,
                target: rule.target.clone(),
            };
            self.sink.send(&notification).await;
            sent += 1;
        }
        sent
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}
