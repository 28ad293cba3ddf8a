//! Fixed-interval notification rescans.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::center::NotificationCenter;
use crate::store::TaskStore;

/// Handle to a running rescan loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct NotificationTicker {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl NotificationTicker {
    /// Scan immediately, then every `period`, until cancelled or the store is
    /// disposed. Must be called from within a tokio runtime.
    pub fn spawn(store: TaskStore, center: NotificationCenter, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(period_secs = period.as_secs(), "notification ticker started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if store.is_disposed() {
                            break;
                        }
                        let _ = center.scan(&store, Utc::now());
                    }
                }
            }
            tracing::debug!("notification ticker stopped");
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for NotificationTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
