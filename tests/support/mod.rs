#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use docket::backend::{BackendError, TaskBackend};
use docket::task::{enforce_completion, Task, TaskDraft, TaskFilter, TaskPatch, TaskStatus};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Four tasks relative to `now`: one overdue, one due within two days, one
/// completed an hour ago and one with no deadline.
pub fn fixture_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let mut overdue = Task::new("T1", "Respond to discovery", "u-1", now - Duration::days(10));
    overdue.due_date = Some(now - Duration::days(2));
    overdue.case_id = Some("C-100".to_string());

    let mut due_soon = Task::new("T2", "Draft settlement memo", "u-1", now - Duration::days(3));
    due_soon.due_date = Some(now + Duration::hours(30));
    due_soon.case_id = Some("C-100".to_string());

    let mut done = Task::new("T3", "File notice of appearance", "u-2", now - Duration::days(4));
    done.status = TaskStatus::Completed;
    done.completed_at = Some(now - Duration::hours(1));

    let idle = Task::new("T4", "Update conflict check", "u-2", now - Duration::days(1));

    vec![overdue, due_soon, done, idle]
}

#[derive(Debug, Default)]
struct MockState {
    tasks: Vec<Task>,
    failure: Option<u16>,
    calls: Vec<String>,
    gate: Option<Arc<Notify>>,
    next_id: usize,
}

/// Scriptable in-memory task service.
///
/// Acts like a real backend: it owns its own copy of the tasks, stamps
/// `updated_at`, fills in assignee display names it knows, and can be told to
/// fail every call or to hold each call until released.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let backend = Self::default();
        backend.state.lock().tasks = tasks;
        backend
    }

    /// Fail every following call with this HTTP status.
    pub fn fail_with(&self, status: u16) {
        self.state.lock().failure = Some(status);
    }

    pub fn recover(&self) {
        self.state.lock().failure = None;
    }

    /// Hold every following call until the returned handle is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.state.lock().tasks.iter().find(|task| task.id == id).cloned()
    }

    async fn enter(&self, call: String) -> Result<(), BackendError> {
        let gate = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.state.lock().failure {
            Some(status) => Err(BackendError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn modify(&self, id: &str, patch: &TaskPatch) -> Result<Task, BackendError> {
        let mut state = self.state.lock();
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| BackendError::Status {
                status: 404,
                body: format!("no task {id}"),
            })?;
        let now = Utc::now();
        patch.apply_to(task, now);
        task.assignee_name = directory_name(&task.assigned_to).or(task.assignee_name.take());
        Ok(task.clone())
    }
}

fn directory_name(user: &str) -> Option<String> {
    match user {
        "u-1" => Some("Ana Duarte".to_string()),
        "u-2" => Some("Ben Okafor".to_string()),
        _ => None,
    }
}

#[async_trait]
impl TaskBackend for MockBackend {
    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, BackendError> {
        self.enter("fetch_tasks".to_string()).await?;
        Ok(self
            .state
            .lock()
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, BackendError> {
        self.enter(format!("update_task_status {task_id} {status}")).await?;
        self.modify(task_id, &TaskPatch::status(status))
    }

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task, BackendError> {
        self.enter(format!("update_task {task_id}")).await?;
        self.modify(task_id, patch)
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, BackendError> {
        self.enter("create_task".to_string()).await?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let now = Utc::now();
        let mut task = Task::new(
            format!("N{}", state.next_id),
            draft.title.clone(),
            draft.assigned_to.clone(),
            now,
        );
        task.description = draft.description.clone();
        task.priority = draft.priority;
        task.assignee_name = directory_name(&draft.assigned_to).or(draft.assignee_name.clone());
        task.case_id = draft.case_id.clone();
        task.due_date = draft.due_date;
        task.estimated_hours = draft.estimated_hours;
        enforce_completion(&mut task, now);
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), BackendError> {
        self.enter(format!("delete_task {task_id}")).await?;
        let mut state = self.state.lock();
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != task_id);
        if state.tasks.len() == before {
            return Err(BackendError::Status {
                status: 404,
                body: format!("no task {task_id}"),
            });
        }
        Ok(())
    }
}

/// Scratch directory for config, cache and user files.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file(".docket.toml", contents)
    }
}
