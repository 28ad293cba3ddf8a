//! Optimistic local mutation with remote confirmation.
//!
//! A reconcile applies the patch to the store right away, awaits the caller's
//! remote call, then either commits the server copy or restores the snapshot
//! and returns [`Error::Sync`]. The store is never left holding an unconfirmed
//! change once the call settles. Nothing is retried here.
//!
//! Two reconciles racing on the same task are not serialized: whichever
//! settles last decides the final local state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use ulid::Ulid;

use crate::error::{Error, Result, SyncCause};
use crate::store::TaskStore;
use crate::task::{Task, TaskPatch};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    AppliedLocally,
    Confirmed,
    Failed,
}

/// An in-flight local change awaiting the backend.
#[derive(Debug, Clone, Serialize)]
pub struct PendingMutation {
    pub id: String,
    pub target_id: String,
    /// `None` for creations that had no prior record.
    pub previous: Option<Task>,
    /// `None` for removals.
    pub applied: Option<Task>,
    pub attempted_at: DateTime<Utc>,
    pub state: MutationState,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    store: TaskStore,
    pending: Arc<Mutex<HashMap<String, PendingMutation>>>,
}

impl Reconciler {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Apply `patch` locally, confirm it with `remote_call`, and settle.
    ///
    /// Returns the committed server copy. `NotFound` and `Validation` are
    /// returned before anything changes.
    pub async fn reconcile<F, E>(
        &self,
        task_id: &str,
        patch: &TaskPatch,
        remote_call: F,
    ) -> Result<Task>
    where
        F: Future<Output = std::result::Result<Task, E>>,
        E: Into<SyncCause>,
    {
        let previous = self.store.get(task_id)?;
        let applied = self.store.apply_optimistic(task_id, patch)?;
        let tracked = self.track(task_id, Some(previous.clone()), Some(applied));

        let outcome = remote_call.await;
        let settled = self.settle(tracked, outcome.is_ok());

        match outcome {
            Ok(server_task) => {
                if self.store.is_disposed() {
                    tracing::debug!(task_id, "store disposed; discarding confirmed result");
                    return Err(Error::StoreDisposed);
                }
                self.store.commit(task_id, server_task.clone())?;
                tracing::info!(task_id, mutation_id = %settled.id, "change confirmed");
                Ok(server_task)
            }
            Err(cause) => {
                let cause: SyncCause = cause.into();
                if self.store.is_disposed() {
                    tracing::debug!(task_id, error = %cause, "store disposed; discarding failed result");
                    return Err(Error::StoreDisposed);
                }
                self.store.rollback(task_id, previous)?;
                tracing::warn!(task_id, mutation_id = %settled.id, error = %cause, "change rolled back");
                Err(Error::Sync {
                    task_id: task_id.to_string(),
                    source: cause,
                })
            }
        }
    }

    /// Remove the task locally, confirm with `remote_call`, re-insert on failure.
    pub async fn remove<F, E>(&self, task_id: &str, remote_call: F) -> Result<Task>
    where
        F: Future<Output = std::result::Result<(), E>>,
        E: Into<SyncCause>,
    {
        let previous = self.store.remove(task_id)?;
        let tracked = self.track(task_id, Some(previous.clone()), None);

        let outcome = remote_call.await;
        let settled = self.settle(tracked, outcome.is_ok());

        match outcome {
            Ok(()) => {
                tracing::info!(task_id, mutation_id = %settled.id, "removal confirmed");
                Ok(previous)
            }
            Err(cause) => {
                let cause: SyncCause = cause.into();
                if self.store.is_disposed() {
                    return Err(Error::StoreDisposed);
                }
                self.store.rollback(task_id, previous)?;
                tracing::warn!(task_id, mutation_id = %settled.id, error = %cause, "removal rolled back");
                Err(Error::Sync {
                    task_id: task_id.to_string(),
                    source: cause,
                })
            }
        }
    }

    /// Mutations still waiting on the backend, oldest first.
    pub fn pending(&self) -> Vec<PendingMutation> {
        let mut pending: Vec<PendingMutation> = self.pending.lock().values().cloned().collect();
        pending.sort_by(|left, right| {
            left.attempted_at
                .cmp(&right.attempted_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        pending
    }

    pub fn is_pending(&self, task_id: &str) -> bool {
        self.pending
            .lock()
            .values()
            .any(|mutation| mutation.target_id == task_id)
    }

    fn track(
        &self,
        task_id: &str,
        previous: Option<Task>,
        applied: Option<Task>,
    ) -> PendingMutation {
        let mutation = PendingMutation {
            id: Ulid::new().to_string(),
            target_id: task_id.to_string(),
            previous,
            applied,
            attempted_at: Utc::now(),
            state: MutationState::AppliedLocally,
        };
        let _ = self
            .pending
            .lock()
            .insert(mutation.id.clone(), mutation.clone());
        mutation
    }

    /// Drop the mutation from the in-flight table and hand back its final form.
    fn settle(&self, mut mutation: PendingMutation, confirmed: bool) -> PendingMutation {
        let _ = self.pending.lock().remove(&mutation.id);
        mutation.state = if confirmed {
            MutationState::Confirmed
        } else {
            MutationState::Failed
        };
        mutation
    }
}
