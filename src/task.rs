//! Task records.
//!
//! The field set follows Taskwarrior's task format: identity, description,
//! status, priority, project, tags, annotations, the standard dates, the
//! recurrence descriptor and a dependency reference. `urgency` is derived; it
//! is written by the session from [`crate::urgency::calculate_urgency`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Local sequential task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        value
            .trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| Error::InvalidArgument(format!("invalid task id '{value}'")))
    }
}

/// Hands out local ids. One allocator is owned by whoever builds new tasks.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> Result<TaskId> {
        let id = TaskId(self.next);
        self.next = successor(id)?;
        Ok(id)
    }

    /// Make sure ids already in use (e.g. loaded from storage) are never reissued.
    pub fn observe(&mut self, id: TaskId) -> Result<()> {
        if id.0 >= self.next {
            self.next = successor(id)?;
        }
        Ok(())
    }

    pub fn peek(&self) -> TaskId {
        TaskId(self.next)
    }
}

fn successor(id: TaskId) -> Result<u64> {
    id.0.checked_add(1)
        .ok_or_else(|| Error::InvalidArgument(format!("task id {id} leaves no ids to allocate")))
}

/// Task status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    None,
    Pending,
    Completed,
    Deleted,
    Waiting,
    Recurring,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::None => "none",
            Status::Pending => "pending",
            Status::Completed => "completed",
            Status::Deleted => "deleted",
            Status::Waiting => "waiting",
            Status::Recurring => "recurring",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Status::None),
            "pending" => Ok(Status::Pending),
            "completed" | "done" => Ok(Status::Completed),
            "deleted" => Ok(Status::Deleted),
            "waiting" => Ok(Status::Waiting),
            "recurring" => Ok(Status::Recurring),
            other => Err(Error::InvalidArgument(format!("unknown status '{other}'"))),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Single-letter form used in list output (`H`, `M`, `L`, blank).
    pub fn short(self) -> &'static str {
        match self {
            Priority::None => " ",
            Priority::Low => "L",
            Priority::Medium => "M",
            Priority::High => "H",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Priority::None),
            "l" | "low" => Ok(Priority::Low),
            "m" | "medium" => Ok(Priority::Medium),
            "h" | "high" => Ok(Priority::High),
            other => Err(Error::InvalidArgument(format!(
                "unknown priority '{other}' (expected high|medium|low|none)"
            ))),
        }
    }
}

/// A timestamped note attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub entry: DateTime<Utc>,
    pub description: String,
}

/// A task with all of its fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub uuid: Uuid,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,

    // Standard dates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,

    // Optional dates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<DateTime<Utc>>,

    // Recurrence descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recur: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default)]
    pub imask: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends: Option<String>,

    #[serde(default)]
    pub urgency: f64,
}

impl Task {
    /// A blank task: no description, `Status::None`, `Priority::None`.
    pub fn new(id: TaskId) -> Self {
        Self::with_uuid(id, Uuid::new_v4())
    }

    pub fn with_uuid(id: TaskId, uuid: Uuid) -> Self {
        Self {
            id,
            uuid,
            description: String::new(),
            status: Status::None,
            priority: Priority::None,
            project: None,
            tags: BTreeSet::new(),
            annotations: Vec::new(),
            entry: None,
            modified: None,
            due: None,
            start: None,
            end: None,
            wait: None,
            scheduled: None,
            recur: None,
            mask: None,
            imask: 0,
            until: None,
            parent: None,
            depends: None,
            urgency: 0.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some() && !self.is_completed()
    }
}
