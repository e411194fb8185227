//! Command-line interface for td
//!
//! This module defines the CLI structure using clap derive macros. One-shot
//! verbs live in `task`; `shell` runs the same verbs in a long-lived session
//! so undo has something to work with.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::clock::SystemClock;
use crate::config::{resolve_data_dir, Config};
use crate::error::Result;
use crate::notify::Notifier;
use crate::output::OutputOptions;
use crate::session::{SessionSettings, TaskSession};
use crate::storage::JsonTaskStore;
use crate::task::{Priority, TaskId};

mod shell;
mod task;

/// td - a small Taskwarrior-style task manager
///
/// Keeps tasks ordered by urgency, supports substring filtering, and can
/// undo the last add or edit inside `td shell`.
#[derive(Parser, Debug)]
#[command(name = "td")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding tasks.json and config.toml
    #[arg(long, global = true, env = "TASKDECK_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Task(TaskCommand),

    /// Interactive session; supports filter, reset and undo
    Shell,
}

/// Verbs shared by the one-shot CLI and the shell
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Add a task
    Add {
        /// Description words
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,

        /// Priority: high, medium, low, none (or H/M/L)
        #[arg(long, short)]
        priority: Option<Priority>,

        /// Due date: YYYY-MM-DD or RFC 3339
        #[arg(long, value_parser = parse_date)]
        due: Option<DateTime<Utc>>,

        /// Tag to attach (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Project name
        #[arg(long)]
        project: Option<String>,
    },

    /// List tasks in urgency order
    List {
        /// Only tasks whose description contains TEXT (case-insensitive)
        #[arg(long)]
        filter: Option<String>,

        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },

    /// Show one task
    Show { id: TaskId },

    /// Mark a task completed
    Done { id: TaskId },

    /// Mark a completed task pending again
    Reopen { id: TaskId },

    /// Start working on a task
    Start { id: TaskId },

    /// Stop working on a task
    Stop { id: TaskId },

    /// Change description, priority or due date
    Edit {
        id: TaskId,

        #[arg(long, short)]
        description: Option<String>,

        #[arg(long, short)]
        priority: Option<Priority>,

        #[arg(long, value_parser = parse_date, conflicts_with = "clear_due")]
        due: Option<DateTime<Utc>>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },

    /// Attach a note to a task
    Annotate {
        id: TaskId,

        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Add a tag
    Tag { id: TaskId, tag: String },

    /// Remove a tag
    Untag { id: TaskId, tag: String },

    /// Delete a task
    Delete { id: TaskId },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let options = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let context = Context::load(self.data_dir.as_deref())?;

        match self.command {
            Commands::Task(command) => task::run(&context, command, options),
            Commands::Shell => shell::run(&context, options),
        }
    }
}

/// Resolved data directory plus its configuration
pub(crate) struct Context {
    pub data_dir: PathBuf,
    pub config: Config,
}

impl Context {
    fn load(explicit: Option<&std::path::Path>) -> Result<Self> {
        let data_dir = resolve_data_dir(explicit)?;
        let config = Config::load_from_dir(&data_dir)?;
        tracing::debug!(data_dir = %data_dir.display(), "context loaded");
        Ok(Self { data_dir, config })
    }

    pub fn open_session<N: Notifier>(&self, notifier: N) -> Result<TaskSession<JsonTaskStore, N>> {
        let store = JsonTaskStore::new(&self.data_dir)
            .with_lock_timeout(self.config.storage.lock_timeout_ms);
        TaskSession::open(
            store,
            notifier,
            Arc::new(SystemClock),
            SessionSettings::from(&self.config),
        )
    }
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_date(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("invalid date '{value}' (expected YYYY-MM-DD or RFC 3339)"))
}
