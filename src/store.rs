//! In-memory task store.
//!
//! The store is the single shared mutable view of tasks. Every mutation goes
//! through the primitives here; none of them suspend, so callers on the UI
//! thread never block on the network. Handles are cheap to clone and share the
//! same state.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::task::{Task, TaskFilter, TaskPatch};

#[derive(Debug, Default)]
struct StoreState {
    tasks: Vec<Task>,
    disposed: bool,
}

impl StoreState {
    fn position(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == task_id)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::StoreDisposed)
        } else {
            Ok(())
        }
    }

    /// Replace in place or append, keeping insertion order stable.
    fn put(&mut self, task_id: &str, task: Task) {
        match self.position(task_id) {
            Some(idx) => self.tasks[idx] = task,
            None => self.tasks.push(task),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    state: Arc<RwLock<StoreState>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let store = Self::new();
        store.state.write().tasks = dedupe(tasks);
        store
    }

    /// Snapshot of every task matching `filter`, in insertion order.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        self.state
            .read()
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    pub fn get(&self, task_id: &str) -> Result<Task> {
        let state = self.state.read();
        state
            .position(task_id)
            .map(|idx| state.tasks[idx].clone())
            .ok_or_else(|| Error::NotFound(task_id.to_string()))
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.state.read().position(task_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.state.read().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge `patch` into the task immediately and return the new snapshot.
    pub fn apply_optimistic(&self, task_id: &str, patch: &TaskPatch) -> Result<Task> {
        patch.validate()?;
        let mut state = self.state.write();
        state.ensure_live()?;
        let idx = state
            .position(task_id)
            .ok_or_else(|| Error::NotFound(task_id.to_string()))?;
        let task = &mut state.tasks[idx];
        patch.apply_to(task, Utc::now());
        tracing::debug!(task_id, status = %task.status, "applied optimistic patch");
        Ok(task.clone())
    }

    /// Overwrite the local record with the authoritative server copy.
    pub fn commit(&self, task_id: &str, server_task: Task) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_live()?;
        if server_task.id != task_id {
            // Backend re-keyed the record; drop the stale local entry.
            if let Some(idx) = state.position(task_id) {
                let _ = state.tasks.remove(idx);
            }
        }
        let key = server_task.id.clone();
        state.put(&key, server_task);
        tracing::debug!(task_id, "committed server copy");
        Ok(())
    }

    /// Restore the snapshot taken before an optimistic change.
    pub fn rollback(&self, task_id: &str, previous: Task) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_live()?;
        state.put(task_id, previous);
        tracing::debug!(task_id, "rolled back to previous snapshot");
        Ok(())
    }

    pub fn upsert(&self, task: Task) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_live()?;
        let key = task.id.clone();
        state.put(&key, task);
        Ok(())
    }

    pub fn remove(&self, task_id: &str) -> Result<Task> {
        let mut state = self.state.write();
        state.ensure_live()?;
        let idx = state
            .position(task_id)
            .ok_or_else(|| Error::NotFound(task_id.to_string()))?;
        Ok(state.tasks.remove(idx))
    }

    /// Swap the whole collection, e.g. after a fresh fetch from the backend.
    pub fn replace_all(&self, tasks: Vec<Task>) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_live()?;
        state.tasks = dedupe(tasks);
        Ok(())
    }

    /// Tear down: later mutations fail with [`Error::StoreDisposed`].
    pub fn dispose(&self) {
        self.state.write().disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.state.read().disposed
    }
}

/// Keep the last record for each id at the position of its first occurrence.
fn dedupe(tasks: Vec<Task>) -> Vec<Task> {
    let mut state = StoreState::default();
    for task in tasks {
        let key = task.id.clone();
        state.put(&key, task);
    }
    state.tasks
}
