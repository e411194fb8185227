//! taskdeck - Task Ordering & Edit-History Engine
//!
//! This library keeps Taskwarrior-style tasks continuously ordered by
//! urgency, filters them without disturbing that order, and records enough
//! history to undo an in-progress field edit or the last committed add and
//! edit.
//!
//! # Core Concepts
//!
//! - **Partitioned index**: pending tasks by urgency, completed tasks with a
//!   due date by due date, other completed tasks newest first
//! - **Filter view**: a case-insensitive substring view over that order
//! - **Edit session**: a snapshot stack for one task being created or edited
//! - **Commit history**: the last add and the last edit, each undoable once
//!
//! # Module Organization
//!
//! - `task`: Task records, ids and enums
//! - `clock`: Time source abstraction
//! - `urgency`: Urgency scoring
//! - `index`: Partitioned ordered index
//! - `filter`: Filter view
//! - `edit`: Edit session history
//! - `commit`: Commit history
//! - `session`: The mutating entry point composing all of the above
//! - `store`, `storage`, `lock`: Persistence port, JSON file store, file locking
//! - `notify`: Due-date reminders
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `output`, `cli`: The `td` command-line front end

pub mod cli;
pub mod clock;
pub mod commit;
pub mod config;
pub mod edit;
pub mod error;
pub mod filter;
pub mod index;
pub mod lock;
pub mod notify;
pub mod output;
pub mod session;
pub mod storage;
pub mod store;
pub mod task;
pub mod urgency;

pub use error::{Error, Result};
pub use session::{SessionSettings, TaskSession};
pub use task::{Priority, Status, Task, TaskId};
