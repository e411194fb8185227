//! Commit history: the most recent committed add and edit.
//!
//! Each slot holds one record. Recording overwrites; taking clears, so
//! undoing twice without an intervening commit fails.

use crate::error::{Error, Result, UndoKind};
use crate::task::Task;

/// A committed edit as the pair of tasks on either side of it
#[derive(Debug, Clone, PartialEq)]
pub struct EditRecord {
    pub before: Task,
    pub after: Task,
}

#[derive(Debug, Clone, Default)]
pub struct CommitHistory {
    last_added: Option<Task>,
    last_edited: Option<EditRecord>,
}

impl CommitHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_add(&mut self, task: Task) {
        self.last_added = Some(task);
    }

    pub fn record_edit(&mut self, before: Task, after: Task) {
        self.last_edited = Some(EditRecord { before, after });
    }

    pub fn last_added(&self) -> Option<&Task> {
        self.last_added.as_ref()
    }

    pub fn last_edited(&self) -> Option<&EditRecord> {
        self.last_edited.as_ref()
    }

    /// Clear and return the add record.
    pub fn take_add(&mut self) -> Result<Task> {
        self.last_added
            .take()
            .ok_or(Error::NothingToUndo(UndoKind::Add))
    }

    /// Clear and return the edit record.
    pub fn take_edit(&mut self) -> Result<EditRecord> {
        self.last_edited
            .take()
            .ok_or(Error::NothingToUndo(UndoKind::Edit))
    }

    /// Forget any record that refers to `task`'s id.
    ///
    /// Used when a task is deleted outright so a later undo cannot resurrect
    /// or re-edit it.
    pub fn forget(&mut self, task: &Task) {
        if self.last_added.as_ref().is_some_and(|t| t.id == task.id) {
            self.last_added = None;
        }
        if self
            .last_edited
            .as_ref()
            .is_some_and(|r| r.after.id == task.id)
        {
            self.last_edited = None;
        }
    }
}
