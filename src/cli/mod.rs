//! Command-line interface for docket
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is defined in its own submodule.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::backend::HttpTaskBackend;
use crate::cache::SnapshotCache;
use crate::config::Config;
use crate::desk::Desk;
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventSink};
use crate::output::OutputOptions;
use crate::task::{Task, TaskFilter};
use crate::user;

mod init;
mod notifications;
mod tasks;
mod user_cmd;

/// docket - optimistic task sync for case-management teams
///
/// Lists and edits tasks against the office task service, showing each
/// change immediately and rolling it back if the service refuses it.
#[derive(Parser, Debug)]
#[command(name = "docket")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Working directory holding .docket.toml (defaults to current directory)
    #[arg(long, global = true, env = "DOCKET_DIR")]
    pub dir: Option<PathBuf>,

    /// Explicit config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Current user id (overrides DOCKET_USER and .docket/user)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Read tasks from the last saved snapshot instead of the backend
    #[arg(long, global = true)]
    pub offline: bool,

    /// Append JSONL events to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default .docket.toml
    Init,

    /// Task listing and edits
    #[command(subcommand)]
    Tasks(TasksCommands),

    /// Show derived notifications
    Notifications {
        /// Keep rescanning until Ctrl-C
        #[arg(long)]
        watch: bool,

        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// Current user identity
    #[command(subcommand)]
    User(UserCommands),
}

#[derive(Subcommand, Debug)]
pub enum TasksCommands {
    /// List tasks
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        /// Assignee user id
        #[arg(long)]
        assignee: Option<String>,
        /// Case id
        #[arg(long = "case")]
        case_id: Option<String>,
        /// Case-insensitive text search over title, description and assignee
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one task
    Show { id: String },

    /// Create a task
    Create {
        #[arg(long)]
        title: String,
        /// Assignee user id (defaults to the current user)
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        assignee_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long = "case")]
        case_id: Option<String>,
        /// Due date, RFC 3339 or YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
        /// Estimated hours
        #[arg(long)]
        estimate: Option<f64>,
    },

    /// Change a task's status
    Status { id: String, status: String },

    /// Reassign a task
    Assign {
        id: String,
        user: String,
        /// Display name of the new assignee
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a task
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Persist the current user in .docket/user
    Set { id: String },
    /// Show the resolved current user
    Show,
}

impl Cli {
    /// Execute the CLI command on a single-threaded runtime.
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.dispatch())
    }

    async fn dispatch(self) -> Result<()> {
        let root = match self.dir.clone() {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Init => init::run(&root, self.config.as_deref(), output),
            Commands::User(cmd) => {
                let config = Config::discover(self.config.as_deref(), &root)?;
                match cmd {
                    UserCommands::Set { id } => user_cmd::run_set(&root, &config, &id, output),
                    UserCommands::Show => {
                        user_cmd::run_show(&root, &config, self.user.as_deref(), output)
                    }
                }
            }
            Commands::Tasks(cmd) => {
                let mut session = Session::open(
                    root,
                    self.config.as_deref(),
                    self.user.as_deref(),
                    output,
                    self.offline,
                    self.events.as_deref(),
                )?;
                tasks::run(&mut session, cmd).await
            }
            Commands::Notifications { watch, unread } => {
                let mut session = Session::open(
                    root,
                    self.config.as_deref(),
                    self.user.as_deref(),
                    output,
                    self.offline,
                    self.events.as_deref(),
                )?;
                notifications::run(&mut session, watch, unread).await
            }
        }
    }
}

/// Everything a task or notification command needs for one run.
pub(crate) struct Session {
    pub config: Config,
    pub user: String,
    pub output: OutputOptions,
    pub offline: bool,
    pub desk: Desk<HttpTaskBackend>,
    events: Option<EventSink>,
}

impl Session {
    fn open(
        root: PathBuf,
        config_path: Option<&Path>,
        cli_user: Option<&str>,
        output: OutputOptions,
        offline: bool,
        events: Option<&str>,
    ) -> Result<Self> {
        let config = Config::discover(config_path, &root)?;
        let user = user::resolve_user(Some(&root), cli_user, &config)?;
        let backend = HttpTaskBackend::from_config(&config.backend)?;
        let desk = Desk::new(backend, user.clone(), &config.notifications);
        let events = match EventDestination::parse(events) {
            Some(destination) => Some(destination.open()?),
            None => None,
        };
        tracing::debug!(%user, offline, base_url = %config.backend.base_url, "session opened");
        Ok(Self {
            config,
            user,
            output,
            offline,
            desk,
            events,
        })
    }

    /// Populate the desk from the backend (saving a snapshot) or, offline,
    /// from the last snapshot.
    pub async fn load(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        if self.offline {
            let cache = self.cache().ok_or_else(|| {
                Error::InvalidArgument("--offline needs the snapshot cache enabled".to_string())
            })?;
            let snapshot = cache.load()?.ok_or_else(|| {
                Error::OperationFailed(format!(
                    "no snapshot at {}; run once without --offline",
                    cache.path().display()
                ))
            })?;
            let _ = self.desk.hydrate(snapshot.tasks)?;
            return Ok(self.desk.list_tasks(filter));
        }

        let _ = self.desk.refresh(filter).await?;
        if filter.is_empty() {
            self.save_snapshot();
        }
        Ok(self.desk.list_tasks(filter))
    }

    /// Mutations need the backend to confirm them.
    pub fn require_online(&self, action: &str) -> Result<()> {
        if self.offline {
            return Err(Error::InvalidArgument(format!(
                "cannot {action} with --offline"
            )));
        }
        Ok(())
    }

    /// Best-effort: a failed snapshot write never fails the command.
    pub fn save_snapshot(&self) {
        let Some(cache) = self.cache() else {
            return;
        };
        let tasks = self.desk.store().list_tasks(&TaskFilter::default());
        if let Err(err) = cache.save(&tasks) {
            tracing::warn!(path = %cache.path().display(), error = %err, "failed to save snapshot");
        }
    }

    pub fn emit(&mut self, event: Result<Event>) {
        let Some(sink) = self.events.as_mut() else {
            return;
        };
        let outcome = event.and_then(|event| sink.emit(&event));
        if let Err(err) = outcome {
            tracing::warn!(error = %err, "failed to emit event");
        }
    }

    fn cache(&self) -> Option<SnapshotCache> {
        if !self.config.cache.enabled {
            return None;
        }
        self.config.cache_path().map(SnapshotCache::new)
    }
}
