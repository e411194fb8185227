//! Error types for taskdeck
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, invalid config, empty description)
//! - 3: Precondition violated (nothing to undo, unknown task, id in use)
//! - 4: Storage failed (io, serialization, lock contention)

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::task::TaskId;

/// Exit codes for the td CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const PRECONDITION_FAILED: i32 = 3;
    pub const STORAGE_FAILED: i32 = 4;
}

/// Which committed mutation an undo request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    Add,
    Edit,
}

impl fmt::Display for UndoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndoKind::Add => write!(f, "add"),
            UndoKind::Edit => write!(f, "edit"),
        }
    }
}

/// Main error type for taskdeck operations
#[derive(Error, Debug)]
pub enum Error {
    // Validation (exit code 2)
    #[error("Task description cannot be empty")]
    EmptyDescription,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // Precondition violations (exit code 3)
    #[error("No {0} to undo")]
    NothingToUndo(UndoKind),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task id already in use: {0}")]
    DuplicateId(TaskId),

    // Storage failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Storage failed: {0}")]
    Storage(String),
}

impl Error {
    /// The store has no record of a task the index holds.
    pub fn missing_in_store(id: TaskId) -> Self {
        Error::Storage(format!("task {id} is not in the store"))
    }

    /// The store already holds a record with this id.
    pub fn already_stored(id: TaskId) -> Self {
        Error::Storage(format!("task {id} is already stored"))
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::EmptyDescription
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::USER_ERROR,

            Error::NothingToUndo(_) | Error::TaskNotFound(_) | Error::DuplicateId(_) => {
                exit_codes::PRECONDITION_FAILED
            }

            Error::Io(_)
            | Error::Json(_)
            | Error::LockFailed(_)
            | Error::Storage(_) => exit_codes::STORAGE_FAILED,
        }
    }

    /// True when the failure came from the persistence collaborator.
    pub fn is_storage(&self) -> bool {
        self.exit_code() == exit_codes::STORAGE_FAILED
    }

    /// Structured details for JSON output, if any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::TaskNotFound(id) | Error::DuplicateId(id) => {
                Some(serde_json::json!({ "task_id": id.get() }))
            }
            Error::NothingToUndo(kind) => Some(serde_json::json!({ "undo": kind.to_string() })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for taskdeck operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(Error::EmptyDescription.exit_code(), exit_codes::USER_ERROR);
        assert_eq!(
            Error::NothingToUndo(UndoKind::Add).exit_code(),
            exit_codes::PRECONDITION_FAILED
        );
        assert_eq!(
            Error::TaskNotFound(TaskId::new(4)).exit_code(),
            exit_codes::PRECONDITION_FAILED
        );
        assert_eq!(
            Error::DuplicateId(TaskId::new(4)).exit_code(),
            exit_codes::PRECONDITION_FAILED
        );
        assert!(Error::missing_in_store(TaskId::new(4)).is_storage());
        assert!(Error::already_stored(TaskId::new(4)).is_storage());
        assert_eq!(
            Error::Storage("disk full".to_string()).exit_code(),
            exit_codes::STORAGE_FAILED
        );
        assert!(Error::LockFailed(PathBuf::from("tasks.json.lock")).is_storage());
        assert!(!Error::EmptyDescription.is_storage());
    }

    #[test]
    fn messages_name_the_undo_kind() {
        assert_eq!(Error::NothingToUndo(UndoKind::Edit).to_string(), "No edit to undo");
        assert_eq!(
            Error::TaskNotFound(TaskId::new(12)).to_string(),
            "Task not found: 12"
        );
    }
}
