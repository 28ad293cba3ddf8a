//! Current user identity.
//!
//! User resolution order:
//! 1) CLI --user (explicit)
//! 2) DOCKET_USER environment variable
//! 3) Persisted value in .docket/user
//! 4) Config default (user.default) or "unknown"

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};

const USER_FILENAME: &str = "user";
const LOCAL_DIR: &str = ".docket";

/// Resolve the current user using CLI, environment, persisted value, and config.
pub fn resolve_user(root: Option<&Path>, cli_user: Option<&str>, config: &Config) -> Result<String> {
    if let Some(user) = non_empty(cli_user) {
        return Ok(user.to_string());
    }

    if let Ok(env_user) = std::env::var("DOCKET_USER") {
        if let Some(user) = non_empty(Some(env_user.as_str())) {
            return Ok(user.to_string());
        }
    }

    if let Some(root) = root {
        if let Some(user) = load_persisted_user(root)? {
            return Ok(user);
        }
    }

    Ok(config.user.default.clone())
}

/// Persist the user identity in `.docket/user`.
pub fn persist_user(root: &Path, user: &str) -> Result<PathBuf> {
    let user = non_empty(Some(user))
        .ok_or_else(|| Error::InvalidArgument("user id cannot be empty".to_string()))?;

    std::fs::create_dir_all(root.join(LOCAL_DIR))?;
    let path = user_path(root);
    std::fs::write(&path, format!("{user}\n"))?;
    Ok(path)
}

/// Load the user identity from `.docket/user`, if present.
pub fn load_persisted_user(root: &Path) -> Result<Option<String>> {
    let path = user_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    Ok(non_empty(Some(raw.as_str())).map(str::to_string))
}

pub fn user_path(root: &Path) -> PathBuf {
    root.join(LOCAL_DIR).join(USER_FILENAME)
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_user_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let _ = persist_user(dir.path(), "persisted").expect("persist");
        let user = resolve_user(Some(dir.path()), Some(" cli-user "), &Config::default())
            .expect("resolve");
        assert_eq!(user, "cli-user");
    }

    #[test]
    fn persisted_user_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(load_persisted_user(dir.path()).expect("load"), None);
        let path = persist_user(dir.path(), "associate-2").expect("persist");
        assert!(path.ends_with(".docket/user"));
        assert_eq!(
            load_persisted_user(dir.path()).expect("load"),
            Some("associate-2".to_string())
        );
    }

    #[test]
    fn blank_user_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = persist_user(dir.path(), "   ").expect_err("blank");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
