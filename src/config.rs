//! Configuration loading and management
//!
//! Handles parsing of `.docket.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// File name looked up in the working directory.
pub const CONFIG_FILENAME: &str = ".docket.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote task service
    #[serde(default)]
    pub backend: BackendConfig,

    /// Notification derivation and rescan
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Current-user defaults
    #[serde(default)]
    pub user: UserConfig,

    /// Offline snapshot cache
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the REST API, e.g. `https://office.example.com/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_token_env() -> String {
    "DOCKET_TOKEN".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Seconds between background rescans
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Tasks due within this many days (rounded up) are "due soon"
    #[serde(default = "default_due_soon_days")]
    pub due_soon_days: u32,

    /// How long a completion stays reported
    #[serde(default = "default_window_hours")]
    pub completed_window_hours: u32,

    /// How long an assignment stays reported
    #[serde(default = "default_window_hours")]
    pub assigned_window_hours: u32,
}

fn default_scan_interval_secs() -> u64 {
    60
}

fn default_due_soon_days() -> u32 {
    2
}

fn default_window_hours() -> u32 {
    24
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            due_soon_days: default_due_soon_days(),
            completed_window_hours: default_window_hours(),
            assigned_window_hours: default_window_hours(),
        }
    }
}

impl NotificationsConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

/// User-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Default user id when none specified
    #[serde(default = "default_user")]
    pub default: String,
}

fn default_user() -> String {
    "unknown".to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default: default_user(),
        }
    }
}

/// Snapshot cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Save fetched tasks for `--offline` use
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Override the snapshot location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl Config {
    /// Load configuration from a `.docket.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `dir`, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILENAME);
        if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    /// Resolve the config for a CLI run: explicit path, working directory,
    /// then the platform config directory.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if cwd.join(CONFIG_FILENAME).exists() {
            return Ok(Self::load_from_dir(cwd));
        }
        if let Some(dirs) = project_dirs() {
            let user_path = dirs.config_dir().join("config.toml");
            if user_path.exists() {
                return Self::load(&user_path);
            }
        }
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Where the offline snapshot lives for this config.
    pub fn cache_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.cache.path.clone() {
            return Some(path);
        }
        project_dirs().map(|dirs| dirs.cache_dir().join("tasks.snapshot.json"))
    }

    fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        self.notifications.validate()?;
        if self.user.default.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "user.default cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl BackendConfig {
    fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "backend.base_url must start with http:// or https:// (got '{url}')"
            )));
        }
        if self.token_env.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "backend.token_env cannot be empty".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "backend.timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl NotificationsConfig {
    fn validate(&self) -> Result<()> {
        if !(1..=86_400).contains(&self.scan_interval_secs) {
            return Err(Error::InvalidConfig(
                "notifications.scan_interval_secs must be between 1 and 86400".to_string(),
            ));
        }
        if self.due_soon_days > 30 {
            return Err(Error::InvalidConfig(
                "notifications.due_soon_days must be <= 30".to_string(),
            ));
        }
        if self.completed_window_hours == 0 {
            return Err(Error::InvalidConfig(
                "notifications.completed_window_hours must be > 0".to_string(),
            ));
        }
        if self.assigned_window_hours == 0 {
            return Err(Error::InvalidConfig(
                "notifications.assigned_window_hours must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "docket")
}
