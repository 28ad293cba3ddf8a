//! Remote task service contract and its REST implementation.
//!
//! The backend owns the authoritative task records. Everything here is JSON
//! over HTTP(S) with a bearer token; request and response bodies use the same
//! `snake_case` shapes as [`Task`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::task::{Task, TaskDraft, TaskFilter, TaskPatch, TaskStatus};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Config error: {0}")]
    Config(String),
}

/// Operations the local core needs from the task service.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, BackendError>;

    /// Returns the authoritative record after the change.
    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, BackendError>;

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task, BackendError>;

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, BackendError>;

    async fn delete_task(&self, task_id: &str) -> Result<(), BackendError>;
}

#[derive(Serialize)]
struct StatusBody {
    status: TaskStatus,
}

/// List endpoints answer with either a bare array or a `{"tasks": [...]}` envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskListBody {
    Bare(Vec<Task>),
    Wrapped { tasks: Vec<Task> },
}

impl From<TaskListBody> for Vec<Task> {
    fn from(body: TaskListBody) -> Self {
        match body {
            TaskListBody::Bare(tasks) | TaskListBody::Wrapped { tasks } => tasks,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTaskBackend {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl HttpTaskBackend {
    pub fn new(config: &BackendConfig, token: Option<&str>) -> Result<Self, BackendError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header: build_auth_headers(token)?,
        })
    }

    /// Build from config, reading the bearer token from `backend.token_env`.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|value| !value.trim().is_empty());
        Self::new(config, token.as_deref())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn task_path(task_id: &str) -> String {
        format!("/tasks/{}", urlencoding::encode(task_id))
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| {
            BackendError::InvalidResponse(format!("could not decode task payload: {err}"))
        })
    }
}

#[async_trait]
impl TaskBackend for HttpTaskBackend {
    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, BackendError> {
        tracing::debug!(base_url = %self.base_url, "fetching tasks");
        let response = self
            .client
            .get(self.url("/tasks"))
            .headers(self.auth_header.clone())
            .query(filter)
            .send()
            .await?;
        let body: TaskListBody = self.parse_response(response).await?;
        Ok(body.into())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, BackendError> {
        tracing::debug!(task_id, %status, "updating task status");
        let response = self
            .client
            .patch(self.url(&format!("{}/status", Self::task_path(task_id))))
            .headers(self.auth_header.clone())
            .json(&StatusBody { status })
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task, BackendError> {
        tracing::debug!(task_id, "updating task");
        let response = self
            .client
            .patch(self.url(&Self::task_path(task_id)))
            .headers(self.auth_header.clone())
            .json(patch)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, BackendError> {
        tracing::debug!(title = %draft.title, "creating task");
        let response = self
            .client
            .post(self.url("/tasks"))
            .headers(self.auth_header.clone())
            .json(draft)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), BackendError> {
        tracing::debug!(task_id, "deleting task");
        let response = self
            .client
            .delete(self.url(&Self::task_path(task_id)))
            .headers(self.auth_header.clone())
            .send()
            .await?;
        let _ = check_status(response).await?;
        Ok(())
    }
}

fn build_auth_headers(token: Option<&str>) -> Result<HeaderMap, BackendError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| BackendError::Config("token contains invalid header characters".into()))?;
        let _ = headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}
