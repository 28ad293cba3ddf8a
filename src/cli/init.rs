//! docket init command implementation
//!
//! Writes a default `.docket.toml` and the local `.docket/` directory.

use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILENAME};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct InitReport {
    dir: PathBuf,
    config: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    docket_dir: bool,
}

pub fn run(root: &Path, explicit: Option<&Path>, output: OutputOptions) -> Result<()> {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.join(CONFIG_FILENAME));

    let created_config = ensure_config(&config_path)?;
    let created_dir = ensure_dir(&root.join(".docket"))?;

    let report = InitReport {
        dir: root.to_path_buf(),
        config: config_path.clone(),
        created: InitCreated {
            config: created_config,
            docket_dir: created_dir,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(CONFIG_FILENAME);
    }
    if created_dir {
        created_items.push(".docket/");
    }

    let header = if created_items.is_empty() {
        "docket init: nothing to do".to_string()
    } else {
        "docket init: initialized".to_string()
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("dir", root.display().to_string());
    human.push_summary("config", config_path.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("set backend.base_url in .docket.toml");
    human.push_next_step("docket user set <id>");

    emit_success(output, "init", &report, Some(&human))
}

fn ensure_config(path: &Path) -> Result<bool> {
    if path.exists() {
        if !path.is_file() {
            return Err(Error::OperationFailed(format!(
                "config exists but is not a file: {}",
                path.display()
            )));
        }
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Config::default().save(path)?;
    Ok(true)
}

fn ensure_dir(path: &Path) -> Result<bool> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::OperationFailed(format!(
                "Expected directory at {}",
                path.display()
            )));
        }
        return Ok(false);
    }
    std::fs::create_dir_all(path)?;
    Ok(true)
}
