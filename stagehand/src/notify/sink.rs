//! Notification sink trait and implementations.

use super::Notification;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::time::Duration;
use tracing::info;

/// Receives notifications routed by the [`Notifier`](super::Notifier).
///
/// There is no real transport; sinks log, collect or drop messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification.
    async fn send(&self, notification: &Notification);
}

/// A sink that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotificationSink;

#[async_trait]
impl NotificationSink for NoOpNotificationSink {
    async fn send(&self, _notification: &Notification) {}
}

/// Logs each notification through `tracing`, then waits a simulated send
/// delay.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationSink {
    delay: Duration,
}

impl LoggingNotificationSink {
    /// Creates a sink with the given per-message delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn send(&self, notification: &Notification) {
        info!(
            pipeline_id = %notification.pipeline_id,
            execution_id = %notification.execution_id,
            event = %notification.event,
            channel = %notification.channel,
            target = %notification.target,
            "Sending {} notification for {} to {}",
            notification.channel,
            notification.event,
            notification.target
        );
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Collects notifications in memory.
#[derive(Debug, Default)]
pub struct CollectingNotificationSink {
    sent: RwLock<Vec<Notification>>,
}

impl CollectingNotificationSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.read().clone()
    }

    /// Returns the number of notifications sent.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.read().len()
    }

    /// Returns true if nothing was sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.read().is_empty()
    }

    /// Clears collected notifications.
    pub fn clear(&self) {
        self.sent.write().clear();
    }
}

#[async_trait]
impl NotificationSink for CollectingNotificationSink {
    async fn send(&self, notification: &Notification) {
        self.sent.write().push(notification.clone());
    }
}
