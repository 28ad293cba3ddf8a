//! docket user command implementation
//!
//! Provides current-user helpers (set/show).

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::user;

#[derive(serde::Serialize)]
struct UserSetReport {
    user: String,
    path: PathBuf,
}

#[derive(serde::Serialize)]
struct UserShowReport {
    user: String,
}

pub fn run_set(root: &Path, config: &Config, id: &str, output: OutputOptions) -> Result<()> {
    let path = user::persist_user(root, id)?;
    let resolved = user::resolve_user(Some(root), Some(id), config)?;

    let report = UserSetReport {
        user: resolved.clone(),
        path: path.clone(),
    };

    let mut human = HumanOutput::new(format!("docket user set: {resolved}"));
    human.push_summary("user", resolved);
    human.push_summary("path", path.display().to_string());
    human.push_next_step("docket notifications");

    emit_success(output, "user set", &report, Some(&human))
}

pub fn run_show(
    root: &Path,
    config: &Config,
    cli_user: Option<&str>,
    output: OutputOptions,
) -> Result<()> {
    let resolved = user::resolve_user(Some(root), cli_user, config)?;
    let unset = resolved == config.user.default;

    let report = UserShowReport {
        user: resolved.clone(),
    };

    let header = if unset {
        "docket user: not set".to_string()
    } else {
        format!("docket user: {resolved}")
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("user", resolved);
    if unset {
        human.push_warning("user not set; using config default".to_string());
        human.push_next_step("docket user set <id>");
    }

    emit_success(output, "user show", &report, Some(&human))
}
