//! The surface a front end drives: store, notification center, reconciler and
//! backend behind one handle.
//!
//! Every mutating call goes through the reconciler, so the store shows the
//! change before the backend answers and never keeps it if the backend
//! refuses. Notifications are rescanned after each settled change so the list
//! reflects the store without waiting for the next tick.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::backend::TaskBackend;
use crate::center::NotificationCenter;
use crate::config::NotificationsConfig;
use crate::error::{Result, SyncCause};
use crate::notification::{DeriveWindow, Notification};
use crate::reconcile::{PendingMutation, Reconciler};
use crate::store::TaskStore;
use crate::task::{sort_tasks, Task, TaskDraft, TaskFilter, TaskPatch, TaskStatus};
use crate::ticker::NotificationTicker;

pub struct Desk<B: TaskBackend> {
    backend: B,
    store: TaskStore,
    center: NotificationCenter,
    reconciler: Reconciler,
    current_user: String,
    scan_interval: Duration,
    ticker: Mutex<Option<NotificationTicker>>,
}

impl<B: TaskBackend> Desk<B> {
    pub fn new(backend: B, current_user: impl Into<String>, config: &NotificationsConfig) -> Self {
        let store = TaskStore::new();
        Self {
            backend,
            reconciler: Reconciler::new(store.clone()),
            center: NotificationCenter::new(DeriveWindow::from(config)),
            store,
            current_user: current_user.into(),
            scan_interval: config.scan_interval(),
            ticker: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn center(&self) -> &NotificationCenter {
        &self.center
    }

    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    /// Fetch from the backend and replace the local view with the result.
    pub async fn refresh(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let tasks = self.backend.fetch_tasks(filter).await?;
        tracing::debug!(count = tasks.len(), "refreshed tasks from backend");
        self.hydrate(tasks)
    }

    /// Load tasks from somewhere other than the backend (e.g. the offline cache).
    pub fn hydrate(&self, tasks: Vec<Task>) -> Result<Vec<Task>> {
        self.store.replace_all(tasks)?;
        let _ = self.scan_notifications(Utc::now());
        Ok(self.list_tasks(&TaskFilter::default()))
    }

    /// Matching tasks in display order.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        let mut tasks = self.store.list_tasks(filter);
        sort_tasks(&mut tasks);
        tasks
    }

    pub fn task(&self, task_id: &str) -> Result<Task> {
        self.store.get(task_id)
    }

    /// Creation waits for the backend: there is no id to show until it answers.
    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task> {
        draft.validate()?;
        let task = self.backend.create_task(draft).await?;
        self.store.upsert(task.clone())?;
        if task.assigned_to == self.current_user {
            self.center
                .record_assignment(&task.id, &self.current_user, Utc::now());
        }
        tracing::info!(task_id = %task.id, "task created");
        let _ = self.scan_notifications(Utc::now());
        Ok(task)
    }

    pub async fn set_status(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        let patch = TaskPatch::status(status);
        self.reconcile(task_id, &patch, self.backend.update_task_status(task_id, status))
            .await
    }

    pub async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task> {
        self.reconcile(task_id, patch, self.backend.update_task(task_id, patch))
            .await
    }

    /// Hand the task to `user`. Assigning to the current user raises an
    /// `assigned` notification on the next scan.
    pub async fn reassign(&self, task_id: &str, user: &str, name: Option<String>) -> Result<Task> {
        let patch = TaskPatch::reassign(user, name);
        let task = self.update_task(task_id, &patch).await?;
        if task.assigned_to == self.current_user {
            self.center
                .record_assignment(&task.id, &self.current_user, Utc::now());
            let _ = self.scan_notifications(Utc::now());
        }
        Ok(task)
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<Task> {
        let outcome = self
            .reconciler
            .remove(task_id, self.backend.delete_task(task_id))
            .await;
        self.rescan_after_settle();
        outcome
    }

    /// Run an arbitrary remote call under the optimistic protocol.
    pub async fn reconcile<F, E>(&self, task_id: &str, patch: &TaskPatch, remote_call: F) -> Result<Task>
    where
        F: Future<Output = std::result::Result<Task, E>>,
        E: Into<SyncCause>,
    {
        let outcome = self.reconciler.reconcile(task_id, patch, remote_call).await;
        self.rescan_after_settle();
        outcome
    }

    pub fn pending(&self) -> Vec<PendingMutation> {
        self.reconciler.pending()
    }

    pub fn scan_notifications(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.center.scan(&self.store, now)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.center.notifications()
    }

    pub fn mark_read(&self, id: &str) -> Result<()> {
        self.center.mark_read(id)
    }

    pub fn dismiss(&self, id: &str) -> Result<()> {
        self.center.dismiss(id)
    }

    pub fn mark_all_read(&self) -> usize {
        self.center.mark_all_read()
    }

    /// Start the background rescan loop. A second call keeps the running one.
    ///
    /// Spawns onto the current tokio runtime; panics if called outside one.
    pub fn start_ticker(&self) {
        let mut slot = self.ticker.lock();
        if slot.as_ref().is_some_and(|ticker| !ticker.is_cancelled()) {
            return;
        }
        *slot = Some(NotificationTicker::spawn(
            self.store.clone(),
            self.center.clone(),
            self.scan_interval,
        ));
    }

    pub fn ticker_running(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(|ticker| !ticker.is_cancelled())
    }

    /// Stop the ticker and refuse further mutations. In-flight reconciles
    /// settle against a disposed store and are discarded.
    pub fn dispose(&self) {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.cancel();
        }
        self.store.dispose();
        tracing::debug!("desk disposed");
    }

    fn rescan_after_settle(&self) {
        if !self.store.is_disposed() {
            let _ = self.scan_notifications(Utc::now());
        }
    }
}
