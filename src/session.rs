//! Task session
//!
//! The session is the only mutating entry point. It owns the index, the
//! filter view, the commit history and the id allocator, and it talks to
//! storage and reminders through the [`TaskStore`] and [`Notifier`] ports.
//!
//! Every mutation follows the same order: build the replacement task,
//! recompute its urgency, update the index, reschedule its reminder,
//! refresh the filter view, then persist. A persistence failure is returned
//! to the caller but the in-memory change is kept.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::commit::CommitHistory;
use crate::config::Config;
use crate::edit::{EditSession, SessionKind};
use crate::error::{Error, Result};
use crate::filter::FilterView;
use crate::index::TaskIndex;
use crate::notify::{NoopNotifier, Notifier};
use crate::store::TaskStore;
use crate::task::{Annotation, IdAllocator, Status, Task, TaskId};
use crate::urgency::{calculate_urgency, UrgencyCoefficients};

/// Knobs the session reads from configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSettings {
    pub coefficients: UrgencyCoefficients,
    pub coalesce_description: bool,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            coefficients: config.urgency,
            coalesce_description: config.history.coalesce_description,
        }
    }
}

pub struct TaskSession<S: TaskStore, N: Notifier = NoopNotifier> {
    index: TaskIndex,
    view: FilterView,
    history: CommitHistory,
    ids: IdAllocator,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    store: S,
    notifier: N,
}

impl<S: TaskStore, N: Notifier> TaskSession<S, N> {
    // =========================================================================
    // Startup
    // =========================================================================

    /// Load every stored task and build the index.
    pub fn open(
        store: S,
        notifier: N,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Result<Self> {
        let tasks = store.read_all()?;
        let now = clock.now();
        let oldest_due = tasks
            .iter()
            .filter(|t| t.is_completed())
            .filter_map(|t| t.due)
            .min();

        let mut index = TaskIndex::new();
        let mut ids = IdAllocator::new();
        for mut task in tasks {
            ids.observe(task.id)?;
            task.urgency = calculate_urgency(&task, oldest_due, now, &settings.coefficients);
            notifier.schedule(&task);
            index.insert(task);
        }
        tracing::debug!(tasks = index.len(), next_id = %ids.peek(), "session opened");

        let view = FilterView::new(&index);
        Ok(Self {
            index,
            view,
            history: CommitHistory::new(),
            ids,
            clock,
            settings,
            store,
            notifier,
        })
    }

    // =========================================================================
    // Edit sessions
    // =========================================================================

    /// Start creating a task: a blank seed with a fresh id.
    pub fn new_task(&mut self) -> Result<EditSession> {
        let mut seed = Task::new(self.ids.allocate()?);
        seed.entry = Some(self.clock.now());
        Ok(EditSession::create(seed)
            .with_description_coalescing(self.settings.coalesce_description))
    }

    /// Start editing an indexed task.
    pub fn edit_task(&self, id: TaskId) -> Result<EditSession> {
        let task = self.require(id)?.clone();
        Ok(EditSession::edit(task).with_description_coalescing(self.settings.coalesce_description))
    }

    /// Commit a finished edit session as an add or an edit.
    pub fn commit(&mut self, session: EditSession) -> Result<TaskId> {
        match session.kind() {
            SessionKind::Create => {
                let task = session.commit()?;
                self.add(task)
            }
            SessionKind::Edit => {
                let id = session.original().id;
                let task = session.commit()?;
                self.edit(id, task)?;
                Ok(id)
            }
        }
    }

    // =========================================================================
    // Committed mutations
    // =========================================================================

    /// Add a new task.
    pub fn add(&mut self, mut task: Task) -> Result<TaskId> {
        validate_description(&task)?;
        if self.index.contains(task.id) {
            return Err(Error::DuplicateId(task.id));
        }
        self.ids.observe(task.id)?;

        let now = self.clock.now();
        if task.status == Status::None {
            task.status = Status::Pending;
        }
        task.entry.get_or_insert(now);
        task.modified.get_or_insert(now);
        self.score(&mut task, now);

        let id = task.id;
        let oldest_before = self.index.oldest_completed_due();
        self.index.insert(task.clone());
        self.rescore_if_oldest_moved(oldest_before);
        self.history.record_add(task.clone());
        self.notifier.schedule(&task);
        self.view.refresh(&self.index);
        tracing::debug!(%id, urgency = task.urgency, "task added");

        let result = self.store.create(&task);
        self.persisted("create", id, result)?;
        Ok(id)
    }

    /// Replace task `id` with `after` and remember the pair for undo.
    pub fn edit(&mut self, id: TaskId, after: Task) -> Result<()> {
        if after.id != id {
            return Err(Error::InvalidArgument(format!(
                "edit of task {id} cannot change its id to {}",
                after.id
            )));
        }
        validate_description(&after)?;
        let before = self.require(id)?.clone();
        self.history.record_edit(before, after.clone());
        self.replace(after, "edit")
    }

    /// Mark a task completed.
    pub fn complete(&mut self, id: TaskId) -> Result<()> {
        self.set_status(id, Status::Completed)
    }

    /// Change a task's status and move it to the matching partition.
    pub fn set_status(&mut self, id: TaskId, status: Status) -> Result<()> {
        let now = self.clock.now();
        let mut task = self.require(id)?.clone();
        task.status = status;
        if status == Status::Completed {
            task.end = Some(now);
            task.start = None;
        } else {
            task.end = None;
        }
        task.modified = Some(now);
        self.replace(task, "status")
    }

    /// Mark a task as being worked on.
    pub fn start(&mut self, id: TaskId) -> Result<()> {
        let now = self.clock.now();
        let mut task = self.require(id)?.clone();
        if task.is_completed() {
            return Err(Error::InvalidArgument(format!(
                "task {id} is completed; reopen it before starting"
            )));
        }
        task.start = Some(now);
        task.modified = Some(now);
        self.replace(task, "start")
    }

    pub fn stop(&mut self, id: TaskId) -> Result<()> {
        let now = self.clock.now();
        let mut task = self.require(id)?.clone();
        task.start = None;
        task.modified = Some(now);
        self.replace(task, "stop")
    }

    pub fn annotate(&mut self, id: TaskId, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidArgument(
                "annotation cannot be empty".to_string(),
            ));
        }
        let now = self.clock.now();
        let mut task = self.require(id)?.clone();
        task.annotations.push(Annotation {
            entry: now,
            description: text.to_string(),
        });
        task.modified = Some(now);
        self.replace(task, "annotate")
    }

    pub fn tag(&mut self, id: TaskId, tag: &str) -> Result<()> {
        let tag = validate_tag(tag)?;
        let now = self.clock.now();
        let mut task = self.require(id)?.clone();
        task.tags.insert(tag);
        task.modified = Some(now);
        self.replace(task, "tag")
    }

    pub fn untag(&mut self, id: TaskId, tag: &str) -> Result<()> {
        let tag = validate_tag(tag)?;
        let now = self.clock.now();
        let mut task = self.require(id)?.clone();
        if !task.tags.remove(&tag) {
            return Err(Error::InvalidArgument(format!(
                "task {id} has no tag '{tag}'"
            )));
        }
        task.modified = Some(now);
        self.replace(task, "untag")
    }

    /// Remove a task from the index and the store.
    pub fn delete(&mut self, id: TaskId) -> Result<Task> {
        let oldest_before = self.index.oldest_completed_due();
        let task = self.index.remove(id).ok_or(Error::TaskNotFound(id))?;
        self.rescore_if_oldest_moved(oldest_before);
        self.history.forget(&task);
        self.notifier.cancel(id);
        self.view.refresh(&self.index);
        tracing::debug!(%id, "task deleted");

        let result = self.store.delete(&task);
        self.persisted("delete", id, result)?;
        Ok(task)
    }

    // =========================================================================
    // Undo
    // =========================================================================

    /// Remove the most recently added task.
    pub fn undo_latest_add(&mut self) -> Result<Task> {
        let added = self.history.take_add()?;
        let id = added.id;
        let oldest_before = self.index.oldest_completed_due();
        let task = self.index.remove(id).ok_or(Error::TaskNotFound(id))?;
        self.rescore_if_oldest_moved(oldest_before);
        self.notifier.cancel(id);
        self.view.refresh(&self.index);
        tracing::debug!(%id, "add undone");

        let result = self.store.delete(&task);
        self.persisted("delete", id, result)?;
        Ok(task)
    }

    /// Put the most recently edited task back the way it was.
    pub fn undo_latest_edit(&mut self) -> Result<Task> {
        let record = self.history.take_edit()?;
        let id = record.before.id;
        self.require(id)?;
        self.replace(record.before, "undo edit")?;
        tracing::debug!(%id, "edit undone");
        self.require(id).cloned()
    }

    // =========================================================================
    // Urgency
    // =========================================================================

    /// Rescore every task against the current clock and rebuild the index.
    pub fn refresh_urgency(&mut self) {
        let now = self.clock.now();
        let oldest_due = self.index.oldest_completed_due();
        let coefficients = self.settings.coefficients;
        for mut task in self.index.drain() {
            task.urgency = calculate_urgency(&task, oldest_due, now, &coefficients);
            self.index.insert(task);
        }
        self.view.refresh(&self.index);
        tracing::debug!(tasks = self.index.len(), "urgency refreshed");
    }

    // =========================================================================
    // Filter
    // =========================================================================

    pub fn filter(&mut self, needle: &str) {
        self.view.apply(&self.index, needle);
    }

    pub fn reset_filter(&mut self) {
        self.view.reset(&self.index);
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.view.needle()
    }

    /// Tasks in the filter view, in display order.
    pub fn visible(&self) -> Vec<&Task> {
        self.view
            .visible()
            .iter()
            .filter_map(|id| self.index.get(*id))
            .collect()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.index.get(id)
    }

    pub fn index(&self) -> &TaskIndex {
        &self.index
    }

    pub fn history(&self) -> &CommitHistory {
        &self.history
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require(&self, id: TaskId) -> Result<&Task> {
        self.index.get(id).ok_or(Error::TaskNotFound(id))
    }

    /// Oldest completed due date once `task` replaces its indexed copy.
    fn oldest_due_after(&self, task: &Task) -> Option<DateTime<Utc>> {
        let others = self
            .index
            .completed_with_due()
            .filter(|other| other.id != task.id)
            .filter_map(|other| other.due)
            .last();
        let own = task.due.filter(|_| task.is_completed());
        match (others, own) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Every score depends on the oldest completed due date, so a change to
    /// it rescores the whole index.
    fn rescore_if_oldest_moved(&mut self, before: Option<DateTime<Utc>>) {
        if self.index.oldest_completed_due() != before {
            self.refresh_urgency();
        }
    }

    fn score(&self, task: &mut Task, now: DateTime<Utc>) {
        task.urgency = calculate_urgency(
            task,
            self.index.oldest_completed_due(),
            now,
            &self.settings.coefficients,
        );
    }

    /// Swap in a replacement for an indexed task and persist it.
    fn replace(&mut self, mut task: Task, op: &'static str) -> Result<()> {
        let now = self.clock.now();
        let oldest_before = self.index.oldest_completed_due();
        task.urgency = calculate_urgency(
            &task,
            self.oldest_due_after(&task),
            now,
            &self.settings.coefficients,
        );
        let id = task.id;
        self.index.relocate(task.clone());
        self.rescore_if_oldest_moved(oldest_before);
        self.notifier.schedule(&task);
        self.view.refresh(&self.index);
        tracing::debug!(%id, op, status = %task.status, urgency = task.urgency, "task replaced");

        let result = self.store.update(&task);
        self.persisted("update", id, result)
    }

    fn persisted<T>(&self, op: &'static str, id: TaskId, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            tracing::warn!(error = %err, %id, op, "store write failed; keeping in-memory change");
        }
        result
    }
}

fn validate_description(task: &Task) -> Result<()> {
    if task.description.trim().is_empty() {
        return Err(Error::EmptyDescription);
    }
    Ok(())
}

pub(crate) fn validate_tag(tag: &str) -> Result<String> {
    let tag = tag.trim();
    if tag.is_empty() || tag.chars().any(char::is_whitespace) {
        return Err(Error::InvalidArgument(format!("invalid tag '{tag}'")));
    }
    Ok(tag.to_string())
}
