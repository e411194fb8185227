//! Edit session history.
//!
//! An edit session covers one task being created or edited. Every field
//! change pushes a whole-task snapshot tagged with the field class that
//! changed; undo pops one snapshot and reports the value the new top holds
//! for that field class so a front end can re-render it. The bottom snapshot
//! is the seed (blank task or the task as it was before editing) and is
//! never popped.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::task::{Priority, Task};

/// Field classes an edit session tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditField {
    Description,
    Priority,
    DueDate,
}

/// A new value for one tracked field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Description(String),
    Priority(Priority),
    DueDate(Option<DateTime<Utc>>),
}

impl FieldEdit {
    pub fn field(&self) -> EditField {
        match self {
            FieldEdit::Description(_) => EditField::Description,
            FieldEdit::Priority(_) => EditField::Priority,
            FieldEdit::DueDate(_) => EditField::DueDate,
        }
    }

    /// The value `task` holds for `field`.
    pub fn read(field: EditField, task: &Task) -> Self {
        match field {
            EditField::Description => FieldEdit::Description(task.description.clone()),
            EditField::Priority => FieldEdit::Priority(task.priority),
            EditField::DueDate => FieldEdit::DueDate(task.due),
        }
    }

    fn apply(self, task: &mut Task) {
        match self {
            FieldEdit::Description(description) => task.description = description,
            FieldEdit::Priority(priority) => task.priority = priority,
            FieldEdit::DueDate(due) => task.due = due,
        }
    }
}

/// One immutable step of an edit session
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    task: Task,
    field: Option<EditField>,
}

impl Snapshot {
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// The field class changed to produce this snapshot; `None` for the seed.
    pub fn field(&self) -> Option<EditField> {
        self.field
    }
}

/// Whether the session creates a new task or edits an indexed one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Create,
    Edit,
}

/// What an undo step did
#[derive(Debug, Clone, PartialEq)]
pub enum EditUndo {
    /// The top snapshot was popped; this is the restored value.
    Restored(FieldEdit),
    /// Only the seed remains. Nothing changed; the front end should close any
    /// open but uncommitted affordances.
    AtSeed,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    kind: SessionKind,
    snapshots: Vec<Snapshot>,
    coalesce_description: bool,
}

impl EditSession {
    /// Start a session that will create `seed` (normally a blank task).
    pub fn create(seed: Task) -> Self {
        Self::seeded(SessionKind::Create, seed)
    }

    /// Start a session editing `task`.
    pub fn edit(task: Task) -> Self {
        Self::seeded(SessionKind::Edit, task)
    }

    fn seeded(kind: SessionKind, seed: Task) -> Self {
        Self {
            kind,
            snapshots: vec![Snapshot {
                task: seed,
                field: None,
            }],
            coalesce_description: false,
        }
    }

    /// Merge consecutive description edits into a single undo step.
    pub fn with_description_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_description = enabled;
        self
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Record a change: copy the top snapshot, overwrite one field, push.
    pub fn log_edit(&mut self, edit: FieldEdit, now: DateTime<Utc>) {
        let field = edit.field();
        let mut task = self.current().clone();
        edit.apply(&mut task);
        task.modified = Some(now);

        let merge = self.coalesce_description
            && field == EditField::Description
            && self.top().field == Some(EditField::Description);
        if merge {
            self.snapshots.pop();
        }

        self.snapshots.push(Snapshot {
            task,
            field: Some(field),
        });
        tracing::debug!(?field, depth = self.depth(), merged = merge, "edit logged");
    }

    /// Step back one edit.
    pub fn undo(&mut self) -> EditUndo {
        if self.snapshots.len() <= 1 {
            return EditUndo::AtSeed;
        }
        let popped = match self.snapshots.pop() {
            Some(snapshot) => snapshot,
            None => return EditUndo::AtSeed,
        };
        let Some(field) = popped.field else {
            return EditUndo::AtSeed;
        };
        tracing::debug!(?field, depth = self.depth(), "edit undone");
        EditUndo::Restored(FieldEdit::read(field, self.current()))
    }

    /// The task as of the latest edit.
    pub fn current(&self) -> &Task {
        &self.top().task
    }

    /// The seed the session started from.
    pub fn original(&self) -> &Task {
        &self.snapshots[0].task
    }

    /// Number of undoable steps.
    pub fn depth(&self) -> usize {
        self.snapshots.len() - 1
    }

    pub fn is_modified(&self) -> bool {
        self.depth() > 0
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Field classes changed so far, oldest first, without repeats.
    pub fn changed_fields(&self) -> Vec<EditField> {
        let mut fields = Vec::new();
        for field in self.snapshots.iter().filter_map(|s| s.field) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    /// Finish the session and hand back the task to commit.
    pub fn commit(self) -> Result<Task> {
        let task = self.into_current();
        if task.description.trim().is_empty() {
            return Err(Error::EmptyDescription);
        }
        Ok(task)
    }

    fn into_current(mut self) -> Task {
        let top = self.snapshots.len() - 1;
        self.snapshots.swap_remove(top).task
    }

    fn top(&self) -> &Snapshot {
        // The seed is never popped, so the stack is never empty.
        &self.snapshots[self.snapshots.len() - 1]
    }
}
