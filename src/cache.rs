//! Offline task snapshot.
//!
//! The CLI saves every successful refresh here and reads it back with
//! `--offline`. Writes go to a temp file that is renamed over the target while
//! an exclusive lock is held on `<path>.lock`, so readers never see a partial
//! snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::Task;

pub const SNAPSHOT_SCHEMA_VERSION: &str = "docket.tasks.v1";

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const LOCK_RETRY_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSnapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
}

impl TaskSnapshot {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            tasks,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
    timeout_ms: u64,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.lock", self.path.display()))
    }

    pub fn save(&self, tasks: &[Task]) -> Result<TaskSnapshot> {
        let snapshot = TaskSnapshot::new(tasks.to_vec());
        let data = serde_json::to_vec_pretty(&snapshot)?;
        let _lock = FileLock::acquire(self.lock_path(), self.timeout_ms)?;
        write_atomic(&self.path, &data)?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "saved task snapshot");
        Ok(snapshot)
    }

    /// Read the snapshot, or `None` if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<TaskSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = {
            let _lock = FileLock::acquire(self.lock_path(), self.timeout_ms)?;
            fs::read(&self.path)?
        };
        let snapshot: TaskSnapshot = serde_json::from_slice(&data)?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(Error::OperationFailed(format!(
                "unsupported snapshot schema '{}' in {}",
                snapshot.schema_version,
                self.path.display()
            )));
        }
        Ok(Some(snapshot))
    }
}

/// Exclusive advisory lock, released on drop.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let retry_interval = Duration::from_millis(LOCK_RETRY_INTERVAL_MS);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(FileLock { file }),
                Err(e) if is_lock_contended(&e) => {
                    if start.elapsed() >= timeout {
                        return Err(Error::LockFailed(path.to_path_buf()));
                    }
                    std::thread::sleep(retry_interval);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // Windows reports sharing/lock violations as raw OS errors.
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension(format!("tmp.{}", std::process::id()));

    let written = write_and_rename(&temp_path, path, data);
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

fn write_and_rename(temp_path: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut temp_file = File::create(temp_path)?;
    temp_file.write_all(data)?;
    temp_file.sync_all()?;
    drop(temp_file);

    fs::rename(temp_path, path)?;
    Ok(())
}
