//! Persistence port.
//!
//! The session talks to storage only through [`TaskStore`]. Writes happen
//! after the in-memory change, so a failing store never leaves the index
//! half-updated; the caller decides what to do with the error.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::task::{Task, TaskId};

/// Persistence collaborator for tasks
pub trait TaskStore {
    /// Store a new task and return the id it was stored under.
    fn create(&mut self, task: &Task) -> Result<TaskId>;

    /// Replace the stored copy of a task.
    fn update(&mut self, task: &Task) -> Result<()>;

    /// Remove a task.
    fn delete(&mut self, task: &Task) -> Result<()>;

    /// Every stored task, ordered by id.
    fn read_all(&self) -> Result<Vec<Task>>;
}

impl<S: TaskStore + ?Sized> TaskStore for Box<S> {
    fn create(&mut self, task: &Task) -> Result<TaskId> {
        (**self).create(task)
    }

    fn update(&mut self, task: &Task) -> Result<()> {
        (**self).update(task)
    }

    fn delete(&mut self, task: &Task) -> Result<()> {
        (**self).delete(task)
    }

    fn read_all(&self) -> Result<Vec<Task>> {
        (**self).read_all()
    }
}

/// In-memory store with switchable write failures
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskStore {
    tasks: BTreeMap<TaskId, Task>,
    failing: bool,
    writes: usize,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with `tasks`.
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
            ..Self::default()
        }
    }

    /// While set, every write fails with [`Error::Storage`].
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn check(&self, op: &str) -> Result<()> {
        if self.failing {
            return Err(Error::Storage(format!("{op} rejected by memory store")));
        }
        Ok(())
    }
}

impl TaskStore for MemoryTaskStore {
    fn create(&mut self, task: &Task) -> Result<TaskId> {
        self.check("create")?;
        if self.tasks.contains_key(&task.id) {
            return Err(Error::already_stored(task.id));
        }
        self.tasks.insert(task.id, task.clone());
        self.writes += 1;
        Ok(task.id)
    }

    fn update(&mut self, task: &Task) -> Result<()> {
        self.check("update")?;
        match self.tasks.get_mut(&task.id) {
            Some(stored) => *stored = task.clone(),
            None => return Err(Error::missing_in_store(task.id)),
        }
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self, task: &Task) -> Result<()> {
        self.check("delete")?;
        if self.tasks.remove(&task.id).is_none() {
            return Err(Error::missing_in_store(task.id));
        }
        self.writes += 1;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64) -> Task {
        let mut task = Task::new(TaskId::new(id));
        task.description = format!("task {id}");
        task
    }

    #[test]
    fn crud_round_trip() {
        let mut store = MemoryTaskStore::new();
        assert_eq!(store.create(&task(2)).unwrap(), TaskId::new(2));
        store.create(&task(1)).unwrap();

        let mut changed = task(2);
        changed.description = "renamed".to_string();
        store.update(&changed).unwrap();

        let all = store.read_all().unwrap();
        let ids: Vec<u64> = all.iter().map(|t| t.id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(all[1].description, "renamed");

        store.delete(&task(1)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.writes(), 4);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let mut store = MemoryTaskStore::with_tasks([task(1)]);
        assert!(matches!(store.create(&task(1)), Err(Error::Storage(_))));
    }

    #[test]
    fn missing_task_update_and_delete_fail() {
        let mut store = MemoryTaskStore::new();
        assert!(matches!(store.update(&task(3)), Err(Error::Storage(_))));
        assert!(matches!(store.delete(&task(3)), Err(Error::Storage(_))));
    }

    #[test]
    fn failing_store_rejects_writes_but_still_reads() {
        let mut store = MemoryTaskStore::with_tasks([task(1)]);
        store.set_failing(true);
        let err = store.create(&task(2)).unwrap_err();
        assert!(err.is_storage());
        assert_eq!(store.read_all().unwrap().len(), 1);

        store.set_failing(false);
        store.create(&task(2)).unwrap();
        assert_eq!(store.len(), 2);
    }
}
