//! Notification center: the derived list plus local read/dismiss state.
//!
//! Every scan re-derives the list and merges it by id, so a notification the
//! user read or dismissed keeps that state for as long as its condition holds.
//! Flags for ids that stop qualifying are forgotten, so a recurrence shows up
//! as new.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::notification::{derive_with_assignments, Assignment, DeriveWindow, Notification};
use crate::store::TaskStore;
use crate::task::{Task, TaskFilter};

#[derive(Debug, Default)]
struct CenterState {
    current: Vec<Notification>,
    read: HashSet<String>,
    dismissed: HashSet<String>,
    assignments: HashMap<String, Assignment>,
}

impl CenterState {
    fn merge(&mut self, derived: Vec<Notification>) {
        let live: HashSet<&str> = derived.iter().map(|n| n.id.as_str()).collect();
        self.read.retain(|id| live.contains(id.as_str()));
        self.dismissed.retain(|id| live.contains(id.as_str()));

        let mut merged = Vec::with_capacity(derived.len());
        for mut notification in derived {
            if self.dismissed.contains(&notification.id) {
                continue;
            }
            notification.is_read = self.read.contains(&notification.id);
            merged.push(notification);
        }
        self.current = merged;
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Notification> {
        self.current.iter_mut().find(|n| n.id == id)
    }
}

/// Shared handle; clones observe the same state.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    state: Arc<Mutex<CenterState>>,
    window: DeriveWindow,
    updates: Arc<watch::Sender<Vec<Notification>>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DeriveWindow::default())
    }
}

impl NotificationCenter {
    pub fn new(window: DeriveWindow) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            state: Arc::new(Mutex::new(CenterState::default())),
            window,
            updates: Arc::new(updates),
        }
    }

    pub fn window(&self) -> &DeriveWindow {
        &self.window
    }

    /// Re-derive from the store as of `now` and return the merged list.
    pub fn scan(&self, store: &TaskStore, now: DateTime<Utc>) -> Vec<Notification> {
        let tasks = store.list_tasks(&TaskFilter::default());
        let snapshot = {
            let mut state = self.state.lock();
            let by_id: HashMap<&str, &Task> =
                tasks.iter().map(|task| (task.id.as_str(), task)).collect();
            // An assignment only lives while the task is open and still with that user.
            state.assignments.retain(|task_id, assignment| {
                by_id.get(task_id.as_str()).is_some_and(|task| {
                    !task.is_completed() && task.assigned_to == assignment.user
                })
            });
            let derived = derive_with_assignments(&tasks, &state.assignments, now, &self.window);
            state.merge(derived);
            state.current.clone()
        };
        tracing::trace!(count = snapshot.len(), "notifications regenerated");
        self.publish(snapshot.clone());
        snapshot
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().current.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state.lock().current.iter().filter(|n| !n.is_read).count()
    }

    pub fn mark_read(&self, id: &str) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock();
            let notification = state
                .find_mut(id)
                .ok_or_else(|| Error::NotificationNotFound(id.to_string()))?;
            notification.is_read = true;
            let _ = state.read.insert(id.to_string());
            state.current.clone()
        };
        self.publish(snapshot);
        Ok(())
    }

    pub fn dismiss(&self, id: &str) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock();
            let idx = state
                .current
                .iter()
                .position(|n| n.id == id)
                .ok_or_else(|| Error::NotificationNotFound(id.to_string()))?;
            let _ = state.current.remove(idx);
            let _ = state.dismissed.insert(id.to_string());
            state.current.clone()
        };
        self.publish(snapshot);
        Ok(())
    }

    /// Mark everything read; returns how many notifications changed.
    pub fn mark_all_read(&self) -> usize {
        let (changed, snapshot) = {
            let mut state = self.state.lock();
            let mut changed = 0;
            let mut newly_read = Vec::new();
            for notification in state.current.iter_mut().filter(|n| !n.is_read) {
                notification.is_read = true;
                newly_read.push(notification.id.clone());
                changed += 1;
            }
            state.read.extend(newly_read);
            (changed, state.current.clone())
        };
        if changed > 0 {
            self.publish(snapshot);
        }
        changed
    }

    /// Remember that `task_id` was assigned to `user` so the next scan can
    /// raise an `assigned` notification.
    pub fn record_assignment(&self, task_id: &str, user: &str, at: DateTime<Utc>) {
        let mut state = self.state.lock();
        let _ = state.assignments.insert(
            task_id.to_string(),
            Assignment {
                user: user.to_string(),
                at,
            },
        );
    }

    /// Receive every list published by a scan or a flag change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.updates.subscribe()
    }

    fn publish(&self, snapshot: Vec<Notification>) {
        self.updates.send_replace(snapshot);
    }
}
