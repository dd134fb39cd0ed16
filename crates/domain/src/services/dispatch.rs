//! Background dispatch of request-triggered notifications.

use std::future::Future;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Owns every fire-and-forget notification task spawned while serving
/// requests, so shutdown can wait for them instead of dropping them.
#[derive(Debug, Clone, Default)]
pub struct NotificationDispatcher {
    tracker: TaskTracker,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` detached from the caller. Its outcome is only logged.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let span = tracing::info_span!("notify", task = label);
        self.tracker.spawn(task.instrument(span));
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting the notion of "more work coming" and wait up to
    /// `timeout` for in-flight tasks. Returns false if the deadline hit first.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            tracing::info!(pending = pending, "Draining in-flight notifications");
        }
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    remaining = self.tracker.len(),
                    "Notification drain timed out"
                );
                false
            }
        }
    }

    /// Wait for every task spawned so far, then keep accepting new ones.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
