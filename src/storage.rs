//! JSON file storage for tasks
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   config.toml          # Optional settings (see `config`)
//!   tasks.json           # Snapshot of every task
//!   tasks.json.lock      # fs2 lock serializing writers
//! ```
//!
//! Each write is a locked read-modify-write of the whole snapshot followed
//! by an atomic rename, so readers never observe a partial file.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::store::TaskStore;
use crate::task::{Task, TaskId};

/// Name of the task snapshot file inside the data directory
pub const TASKS_FILE: &str = "tasks.json";

/// Schema tag written into every snapshot
pub const TASKS_SCHEMA_VERSION: &str = "taskdeck.tasks.v1";

/// On-disk snapshot of every task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFile {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Default for TaskFile {
    fn default() -> Self {
        Self {
            schema_version: TASKS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            tasks: Vec::new(),
        }
    }
}

impl TaskFile {
    fn validate(&self) -> Result<()> {
        if self.schema_version != TASKS_SCHEMA_VERSION {
            return Err(Error::Storage(format!(
                "unsupported task file schema '{}'",
                self.schema_version
            )));
        }
        let mut seen = BTreeSet::new();
        for task in &self.tasks {
            if task.id.get() == u64::MAX {
                return Err(Error::Storage(format!(
                    "task id {} is out of range",
                    task.id
                )));
            }
            if !seen.insert(task.id) {
                return Err(Error::Storage(format!("task file lists id {} twice", task.id)));
            }
        }
        Ok(())
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }
}

/// Task store backed by `tasks.json` in a data directory
#[derive(Debug, Clone)]
pub struct JsonTaskStore {
    data_dir: PathBuf,
    lock_timeout_ms: u64,
}

impl JsonTaskStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }

    /// Create the data directory if needed
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<TaskFile> {
        if !path.exists() {
            return Ok(TaskFile::default());
        }
        let content = fs::read_to_string(path)?;
        let file: TaskFile = serde_json::from_str(&content)?;
        file.validate()?;
        Ok(file)
    }

    fn update_tasks<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TaskFile) -> Result<T>,
    {
        let path = self.tasks_file();
        self.init()?;

        let _lock = FileLock::guard(&path, self.lock_timeout_ms)?;

        let mut file = self.read_file(&path)?;
        let result = f(&mut file)?;
        file.tasks.sort_by_key(|t| t.id);
        file.generated_at = Utc::now();
        file.validate()?;

        let json = serde_json::to_string_pretty(&file)?;
        lock::write_atomic(&path, json.as_bytes())?;

        Ok(result)
    }
}

impl TaskStore for JsonTaskStore {
    fn create(&mut self, task: &Task) -> Result<TaskId> {
        self.update_tasks(|file| {
            if file.position(task.id).is_some() {
                return Err(Error::already_stored(task.id));
            }
            file.tasks.push(task.clone());
            Ok(task.id)
        })
    }

    fn update(&mut self, task: &Task) -> Result<()> {
        self.update_tasks(|file| match file.position(task.id) {
            Some(pos) => {
                file.tasks[pos] = task.clone();
                Ok(())
            }
            None => Err(Error::missing_in_store(task.id)),
        })
    }

    fn delete(&mut self, task: &Task) -> Result<()> {
        self.update_tasks(|file| match file.position(task.id) {
            Some(pos) => {
                file.tasks.remove(pos);
                Ok(())
            }
            None => Err(Error::missing_in_store(task.id)),
        })
    }

    fn read_all(&self) -> Result<Vec<Task>> {
        let path = self.tasks_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let _lock = FileLock::guard(&path, self.lock_timeout_ms)?;
        let mut tasks = self.read_file(&path)?.tasks;
        tasks.sort_by_key(|t| t.id);
        tracing::debug!(count = tasks.len(), path = %path.display(), "tasks loaded");
        Ok(tasks)
    }
}
