//! Substring filter over the flattened task order.
//!
//! The filter never touches the index partitions. It derives a visible id
//! list from the index's flattened view each time it is applied, and keeps
//! at most one needle active.

use crate::index::TaskIndex;
use crate::task::{Task, TaskId};

/// Case-insensitive description match. `needle` must already be lowercase.
fn matches(task: &Task, needle: &str) -> bool {
    task.description.to_lowercase().contains(needle)
}

/// Keep the tasks whose description contains `needle`, ignoring case.
///
/// Order is preserved, so filtering an already filtered sequence with the
/// same needle yields the same sequence.
pub fn filter<'a, I>(tasks: I, needle: &str) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let needle = needle.to_lowercase();
    tasks
        .into_iter()
        .filter(|task| matches(task, &needle))
        .collect()
}

/// The visible subsequence of the index plus the needle that produced it
#[derive(Debug, Clone, Default)]
pub struct FilterView {
    needle: Option<String>,
    visible: Vec<TaskId>,
}

impl FilterView {
    /// A view showing everything in `index`.
    pub fn new(index: &TaskIndex) -> Self {
        Self {
            needle: None,
            visible: index.flattened().to_vec(),
        }
    }

    /// Replace the active filter with `needle`. A blank needle resets.
    pub fn apply(&mut self, index: &TaskIndex, needle: &str) {
        if needle.trim().is_empty() {
            self.reset(index);
            return;
        }
        let needle = needle.to_lowercase();
        self.visible = index
            .tasks()
            .filter(|task| matches(task, &needle))
            .map(|task| task.id)
            .collect();
        tracing::debug!(needle = %needle, visible = self.visible.len(), "filter applied");
        self.needle = Some(needle);
    }

    /// Drop the filter; the view becomes the flattened order again.
    pub fn reset(&mut self, index: &TaskIndex) {
        self.needle = None;
        self.visible = index.flattened().to_vec();
    }

    /// Recompute after the index changed, keeping the active needle.
    pub fn refresh(&mut self, index: &TaskIndex) {
        match self.needle.take() {
            Some(needle) => self.apply(index, &needle),
            None => self.reset(index),
        }
    }

    pub fn needle(&self) -> Option<&str> {
        self.needle.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.needle.is_some()
    }

    pub fn visible(&self) -> &[TaskId] {
        &self.visible
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
