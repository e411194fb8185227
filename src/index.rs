//! Partitioned ordered index of tasks.
//!
//! Tasks live in exactly one of three partitions:
//!
//! ```text
//! pending               not completed          sorted by urgency, highest first
//! completed_with_due    completed, due set     sorted by due date, latest first
//! completed_no_due      completed, no due      newest insertion first
//! ```
//!
//! `flattened` is `pending ++ completed_with_due ++ completed_no_due`. It is
//! rebuilt after every structural change and is the canonical "all tasks"
//! order. Partitions hold [`TaskId`] handles; the task records themselves are
//! owned by a side map keyed by id, so removal never depends on field
//! equality. A stored task is never mutated in place: the stored copy still
//! carries the status and due date that placed it, which is how `relocate`
//! finds the partition a changed task must leave.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::task::{Task, TaskId};

/// One of the three disjoint task partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Pending,
    CompletedWithDue,
    CompletedNoDue,
}

impl Partition {
    /// The partition a task belongs to given its current fields.
    pub fn of(task: &Task) -> Self {
        if !task.is_completed() {
            Partition::Pending
        } else if task.due.is_some() {
            Partition::CompletedWithDue
        } else {
            Partition::CompletedNoDue
        }
    }
}

/// Tasks partitioned by completion and kept in display order.
#[derive(Debug, Clone, Default)]
pub struct TaskIndex {
    tasks: HashMap<TaskId, Task>,
    pending: Vec<TaskId>,
    completed_with_due: Vec<TaskId>,
    completed_no_due: Vec<TaskId>,
    flattened: Vec<TaskId>,
}

impl TaskIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    /// Insert `task` into the partition its status and due date select.
    ///
    /// Ties on the sort key land immediately before the first equal element.
    /// If a task with the same id is already indexed it is displaced and
    /// returned.
    pub fn insert(&mut self, task: Task) -> Option<Task> {
        let id = task.id;
        let displaced = self.detach(id);
        let partition = Partition::of(&task);

        match partition {
            Partition::Pending => {
                let urgency = task.urgency;
                let pos = self
                    .pending
                    .partition_point(|other| self.urgency_of(*other) > urgency);
                self.pending.insert(pos, id);
            }
            Partition::CompletedWithDue => {
                let due = task.due;
                let pos = self
                    .completed_with_due
                    .partition_point(|other| self.due_of(*other) > due);
                self.completed_with_due.insert(pos, id);
            }
            Partition::CompletedNoDue => {
                self.completed_no_due.insert(0, id);
            }
        }

        tracing::debug!(task = %id, ?partition, urgency = task.urgency, "index insert");
        self.tasks.insert(id, task);
        self.rebuild_flattened();
        displaced
    }

    /// Remove a task by id from whichever partition holds it.
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let removed = self.detach(id)?;
        tracing::debug!(task = %id, "index remove");
        self.rebuild_flattened();
        Some(removed)
    }

    /// Move an already indexed task after its status, due date or urgency
    /// changed.
    ///
    /// The old copy is taken out of the partition it was placed in, then
    /// `task` is inserted by its current fields. Refresh the urgency before
    /// calling this so the new sort key is in effect. Returns the replaced
    /// version; a task that was not indexed is simply inserted.
    pub fn relocate(&mut self, task: Task) -> Option<Task> {
        let id = task.id;
        let previous = self.detach(id);
        if let Some(previous) = previous.as_ref() {
            tracing::debug!(
                task = %id,
                from = ?Partition::of(previous),
                to = ?Partition::of(&task),
                "index relocate"
            );
        }
        self.insert(task);
        previous
    }

    /// Take every task out of the index, in flattened order.
    pub fn drain(&mut self) -> Vec<Task> {
        let order = std::mem::take(&mut self.flattened);
        let mut tasks = std::mem::take(&mut self.tasks);
        self.pending.clear();
        self.completed_with_due.clear();
        self.completed_no_due.clear();
        order
            .into_iter()
            .filter_map(|id| tasks.remove(&id))
            .collect()
    }

    /// Unlink `id` from its partition and the side map without rebuilding
    /// the flattened view.
    fn detach(&mut self, id: TaskId) -> Option<Task> {
        let task = self.tasks.remove(&id)?;
        let partition = match Partition::of(&task) {
            Partition::Pending => &mut self.pending,
            Partition::CompletedWithDue => &mut self.completed_with_due,
            Partition::CompletedNoDue => &mut self.completed_no_due,
        };
        if let Some(pos) = partition.iter().position(|other| *other == id) {
            partition.remove(pos);
        }
        Some(task)
    }

    fn rebuild_flattened(&mut self) {
        self.flattened.clear();
        self.flattened.extend(
            self.pending
                .iter()
                .chain(self.completed_with_due.iter())
                .chain(self.completed_no_due.iter())
                .copied(),
        );
    }

    fn urgency_of(&self, id: TaskId) -> f64 {
        self.tasks
            .get(&id)
            .map_or(f64::NEG_INFINITY, |task| task.urgency)
    }

    fn due_of(&self, id: TaskId) -> Option<DateTime<Utc>> {
        self.tasks.get(&id).and_then(|task| task.due)
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.flattened.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flattened.is_empty()
    }

    /// Ids in canonical display order.
    pub fn flattened(&self) -> &[TaskId] {
        &self.flattened
    }

    /// Ids held by one partition, in partition order.
    pub fn partition(&self, partition: Partition) -> &[TaskId] {
        match partition {
            Partition::Pending => &self.pending,
            Partition::CompletedWithDue => &self.completed_with_due,
            Partition::CompletedNoDue => &self.completed_no_due,
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> + '_ {
        self.resolve(&self.pending)
    }

    pub fn completed_with_due(&self) -> impl Iterator<Item = &Task> + '_ {
        self.resolve(&self.completed_with_due)
    }

    pub fn completed_no_due(&self) -> impl Iterator<Item = &Task> + '_ {
        self.resolve(&self.completed_no_due)
    }

    /// Every task in flattened order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.resolve(&self.flattened)
    }

    /// Which partition currently holds `id`.
    pub fn partition_of(&self, id: TaskId) -> Option<Partition> {
        self.tasks.get(&id).map(Partition::of)
    }

    /// Earliest due date among completed tasks.
    ///
    /// `completed_with_due` is sorted latest first, so this is its tail.
    pub fn oldest_completed_due(&self) -> Option<DateTime<Utc>> {
        self.completed_with_due
            .last()
            .and_then(|id| self.due_of(*id))
    }

    fn resolve<'a>(&'a self, ids: &'a [TaskId]) -> impl Iterator<Item = &'a Task> + 'a {
        ids.iter().filter_map(move |id| self.tasks.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, Status};
    use chrono::TimeZone;

    fn pending(id: u64, urgency: f64) -> Task {
        let mut task = Task::new(TaskId::new(id));
        task.description = format!("task {id}");
        task.status = Status::Pending;
        task.urgency = urgency;
        task
    }

    fn completed(id: u64, due: Option<DateTime<Utc>>) -> Task {
        let mut task = Task::new(TaskId::new(id));
        task.description = format!("done {id}");
        task.status = Status::Completed;
        task.due = due;
        task
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn ids(values: &[u64]) -> Vec<TaskId> {
        values.iter().copied().map(TaskId::new).collect()
    }

    fn assert_invariants(index: &TaskIndex) {
        let urgencies: Vec<f64> = index.pending().map(|t| t.urgency).collect();
        assert!(
            urgencies.windows(2).all(|w| w[0] >= w[1]),
            "pending out of order: {urgencies:?}"
        );
        let dues: Vec<_> = index.completed_with_due().map(|t| t.due).collect();
        assert!(
            dues.windows(2).all(|w| w[0] >= w[1]),
            "completed_with_due out of order: {dues:?}"
        );
        assert!(index.pending().all(|t| !t.is_completed()));
        assert!(index.completed_with_due().all(|t| t.is_completed() && t.due.is_some()));
        assert!(index.completed_no_due().all(|t| t.is_completed() && t.due.is_none()));
        assert_eq!(
            index.flattened().len(),
            index.partition(Partition::Pending).len()
                + index.partition(Partition::CompletedWithDue).len()
                + index.partition(Partition::CompletedNoDue).len()
        );
        assert_eq!(index.flattened().len(), index.tasks().count());
    }

    #[test]
    fn pending_sorted_by_urgency_descending() {
        let mut index = TaskIndex::new();
        let mut high = pending(1, 7.0);
        high.priority = Priority::High;
        let mut medium = pending(2, 4.9);
        medium.priority = Priority::Medium;
        index.insert(high);
        index.insert(medium);
        assert_eq!(index.partition(Partition::Pending), ids(&[1, 2]).as_slice());

        let mut low = pending(3, 2.8);
        low.priority = Priority::Low;
        index.insert(low);
        assert_eq!(index.partition(Partition::Pending), ids(&[1, 2, 3]).as_slice());

        index.insert(pending(4, 5.0));
        assert_eq!(
            index.partition(Partition::Pending),
            ids(&[1, 4, 2, 3]).as_slice()
        );
        assert_invariants(&index);
    }

    #[test]
    fn completed_with_due_sorted_latest_first_either_order() {
        for order in [[1u64, 2], [2, 1]] {
            let mut index = TaskIndex::new();
            for id in order {
                let due = if id == 1 { day(2024, 1, 10) } else { day(2024, 3, 1) };
                index.insert(completed(id, Some(due)));
            }
            let dues: Vec<_> = index.completed_with_due().map(|t| t.due).collect();
            assert_eq!(dues, vec![Some(day(2024, 3, 1)), Some(day(2024, 1, 10))]);
            assert_eq!(index.oldest_completed_due(), Some(day(2024, 1, 10)));
        }
    }

    #[test]
    fn completed_without_due_newest_first() {
        let mut index = TaskIndex::new();
        index.insert(completed(1, None));
        index.insert(completed(2, None));
        index.insert(completed(3, None));
        assert_eq!(
            index.partition(Partition::CompletedNoDue),
            ids(&[3, 2, 1]).as_slice()
        );
    }

    #[test]
    fn equal_urgency_goes_before_first_equal() {
        let mut index = TaskIndex::new();
        index.insert(pending(1, 5.0));
        index.insert(pending(2, 3.0));
        index.insert(pending(3, 3.0));
        assert_eq!(index.partition(Partition::Pending), ids(&[1, 3, 2]).as_slice());
    }

    #[test]
    fn flattened_concatenates_partitions() {
        let mut index = TaskIndex::new();
        index.insert(completed(1, None));
        index.insert(completed(2, Some(day(2024, 2, 1))));
        index.insert(pending(3, 1.0));
        index.insert(pending(4, 9.0));
        assert_eq!(index.flattened(), ids(&[4, 3, 2, 1]).as_slice());
        assert_invariants(&index);
    }

    #[test]
    fn insert_then_remove_restores_partitions() {
        let mut index = TaskIndex::new();
        index.insert(pending(1, 5.0));
        index.insert(pending(2, 2.0));
        index.insert(completed(3, Some(day(2024, 5, 1))));
        index.insert(completed(4, None));
        let before = (
            index.partition(Partition::Pending).to_vec(),
            index.partition(Partition::CompletedWithDue).to_vec(),
            index.partition(Partition::CompletedNoDue).to_vec(),
            index.flattened().to_vec(),
        );

        for task in [
            pending(9, 3.0),
            completed(9, Some(day(2024, 4, 1))),
            completed(9, None),
        ] {
            index.insert(task);
            let removed = index.remove(TaskId::new(9)).expect("indexed");
            assert_eq!(removed.id, TaskId::new(9));
            let after = (
                index.partition(Partition::Pending).to_vec(),
                index.partition(Partition::CompletedWithDue).to_vec(),
                index.partition(Partition::CompletedNoDue).to_vec(),
                index.flattened().to_vec(),
            );
            assert_eq!(after, before);
        }
    }

    #[test]
    fn remove_unknown_id_is_none() {
        let mut index = TaskIndex::new();
        index.insert(pending(1, 1.0));
        assert!(index.remove(TaskId::new(2)).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn relocate_on_status_change_moves_between_partitions() {
        let mut index = TaskIndex::new();
        index.insert(pending(1, 4.0));
        index.insert(pending(2, 6.0));

        let mut done = index.get(TaskId::new(1)).cloned().expect("indexed");
        done.status = Status::Completed;
        done.urgency = 0.0;
        let previous = index.relocate(done).expect("was indexed");
        assert_eq!(previous.status, Status::Pending);

        assert_eq!(index.partition(Partition::Pending), ids(&[2]).as_slice());
        assert_eq!(index.partition(Partition::CompletedNoDue), ids(&[1]).as_slice());
        assert_eq!(
            index.partition_of(TaskId::new(1)),
            Some(Partition::CompletedNoDue)
        );
        let occurrences = index
            .flattened()
            .iter()
            .filter(|id| **id == TaskId::new(1))
            .count();
        assert_eq!(occurrences, 1);
        assert_invariants(&index);

        let mut reopened = index.get(TaskId::new(1)).cloned().expect("indexed");
        reopened.status = Status::Pending;
        reopened.urgency = 8.0;
        index.relocate(reopened);
        assert_eq!(index.partition(Partition::Pending), ids(&[1, 2]).as_slice());
        assert!(index.partition(Partition::CompletedNoDue).is_empty());
        assert_invariants(&index);
    }

    #[test]
    fn relocate_on_due_change_within_completed() {
        let mut index = TaskIndex::new();
        index.insert(completed(1, None));
        index.insert(completed(2, Some(day(2024, 1, 1))));

        let mut task = index.get(TaskId::new(1)).cloned().expect("indexed");
        task.due = Some(day(2024, 2, 1));
        index.relocate(task);

        assert!(index.partition(Partition::CompletedNoDue).is_empty());
        assert_eq!(
            index.partition(Partition::CompletedWithDue),
            ids(&[1, 2]).as_slice()
        );
        assert_eq!(index.oldest_completed_due(), Some(day(2024, 1, 1)));
    }

    #[test]
    fn relocate_on_urgency_change_resorts() {
        let mut index = TaskIndex::new();
        index.insert(pending(1, 9.0));
        index.insert(pending(2, 5.0));
        index.insert(pending(3, 1.0));

        let mut task = index.get(TaskId::new(3)).cloned().expect("indexed");
        task.urgency = 7.0;
        index.relocate(task);
        assert_eq!(index.partition(Partition::Pending), ids(&[1, 3, 2]).as_slice());
        assert_invariants(&index);
    }

    #[test]
    fn inserting_existing_id_displaces_it() {
        let mut index = TaskIndex::new();
        index.insert(pending(1, 1.0));
        let displaced = index.insert(pending(1, 5.0)).expect("displaced");
        assert_eq!(displaced.urgency, 1.0);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(TaskId::new(1)).map(|t| t.urgency), Some(5.0));
    }

    #[test]
    fn drain_empties_in_flattened_order() {
        let mut index = TaskIndex::new();
        index.insert(completed(1, None));
        index.insert(pending(2, 3.0));
        index.insert(pending(3, 4.0));
        let drained: Vec<TaskId> = index.drain().into_iter().map(|t| t.id).collect();
        assert_eq!(drained, ids(&[3, 2, 1]));
        assert!(index.is_empty());
        assert!(index.partition(Partition::Pending).is_empty());
    }

    #[test]
    fn many_mixed_operations_keep_invariants() {
        let mut index = TaskIndex::new();
        for n in 0..40u64 {
            let urgency = ((n * 7919) % 23) as f64 / 2.0;
            if n % 5 == 0 {
                let due = day(2024, 1, 1) + chrono::Duration::days(((n * 31) % 90) as i64);
                index.insert(completed(n, Some(due)));
            } else if n % 7 == 0 {
                index.insert(completed(n, None));
            } else {
                index.insert(pending(n, urgency));
            }
            assert_invariants(&index);
        }
        for n in (0..40u64).step_by(3) {
            index.remove(TaskId::new(n));
            assert_invariants(&index);
        }
        for n in (1..40u64).step_by(4) {
            if let Some(mut task) = index.get(TaskId::new(n)).cloned() {
                task.status = if task.is_completed() {
                    Status::Pending
                } else {
                    Status::Completed
                };
                index.relocate(task);
                assert_invariants(&index);
            }
        }
    }
}
