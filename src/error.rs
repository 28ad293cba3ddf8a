//! Error types for docket
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, invalid patch or config)
//! - 3: Sync failure (remote confirmation failed and the change was rolled back)
//! - 4: Operation failed (backend, IO, serialization)

use std::path::PathBuf;
use thiserror::Error;

use crate::backend::BackendError;

/// Exit codes for the docket CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const SYNC_FAILED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Root cause carried by a [`Error::Sync`].
pub type SyncCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for docket operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Sync failures (exit code 3)
    #[error("Sync failed for task {task_id}: {source}")]
    Sync {
        task_id: String,
        #[source]
        source: SyncCause,
    },

    #[error("Task store has been disposed")]
    StoreDisposed,

    // Operation failures (exit code 4)
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Wrap a remote failure for a task whose optimistic change was rolled back.
    pub fn sync(task_id: impl Into<String>, source: impl Into<SyncCause>) -> Self {
        Error::Sync {
            task_id: task_id.into(),
            source: source.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::NotFound(_)
            | Error::NotificationNotFound(_)
            | Error::Validation(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            // Sync failures
            Error::Sync { .. } | Error::StoreDisposed => exit_codes::SYNC_FAILED,

            // Operation failures
            Error::Backend(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured fields for JSON error output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound(id) => Some(serde_json::json!({ "task_id": id })),
            Error::NotificationNotFound(id) => {
                Some(serde_json::json!({ "notification_id": id }))
            }
            Error::Validation(message)
            | Error::InvalidConfig(message)
            | Error::InvalidArgument(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            Error::Sync { task_id, source } => Some(serde_json::json!({
                "task_id": task_id,
                "cause": source.to_string(),
                "rolled_back": true,
            })),
            Error::Backend(BackendError::Status { status, body }) => Some(serde_json::json!({
                "status": status,
                "body": body,
            })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for docket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
