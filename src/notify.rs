//! Due-date reminders.
//!
//! [`Notifier::schedule`] is fire-and-forget. [`TimerNotifier`] spawns one
//! tokio timer per task with a future due date; when it fires, a
//! [`Reminder`] is sent down an unbounded channel. Timers never touch the
//! index. The host drains [`ReminderQueue`] on its own schedule.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::clock::Clock;
use crate::task::{Task, TaskId};

/// A task whose due date has arrived
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub id: TaskId,
    pub uuid: Uuid,
    pub description: String,
    pub due: DateTime<Utc>,
}

impl Reminder {
    fn for_task(task: &Task, due: DateTime<Utc>) -> Self {
        Self {
            id: task.id,
            uuid: task.uuid,
            description: task.description.clone(),
            due,
        }
    }
}

/// Notification collaborator
pub trait Notifier {
    /// Arrange a reminder for `task`'s due date, replacing any earlier one.
    fn schedule(&self, task: &Task);

    /// Drop any pending reminder for `id`.
    fn cancel(&self, _id: TaskId) {}
}

/// Discards every request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn schedule(&self, _task: &Task) {}
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn schedule(&self, task: &Task) {
        (**self).schedule(task)
    }

    fn cancel(&self, id: TaskId) {
        (**self).cancel(id)
    }
}

/// Tokio-backed reminder timers
pub struct TimerNotifier {
    runtime: Handle,
    clock: Arc<dyn Clock>,
    lead: chrono::Duration,
    sender: UnboundedSender<Reminder>,
    timers: Mutex<HashMap<TaskId, JoinHandle<()>>>,
}

impl TimerNotifier {
    /// Create a notifier spawning on `runtime` and the queue it feeds.
    pub fn new(runtime: Handle, clock: Arc<dyn Clock>) -> (Self, ReminderQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let notifier = Self {
            runtime,
            clock,
            lead: chrono::Duration::zero(),
            sender,
            timers: Mutex::new(HashMap::new()),
        };
        (notifier, ReminderQueue { receiver })
    }

    /// Fire this long before the due date (never before now).
    pub fn with_lead_time(mut self, lead: chrono::Duration) -> Self {
        self.lead = lead;
        self
    }

    /// Number of timers that have not fired or been cancelled.
    pub fn pending(&self) -> usize {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.retain(|_, handle| !handle.is_finished());
        timers.len()
    }

    fn delay_until(&self, due: DateTime<Utc>) -> Option<Duration> {
        let now = self.clock.now();
        if due <= now {
            return None;
        }
        let fire_at = (due - self.lead).max(now);
        Some((fire_at - now).to_std().unwrap_or(Duration::ZERO))
    }
}

impl Notifier for TimerNotifier {
    fn schedule(&self, task: &Task) {
        self.cancel(task.id);

        let Some(due) = task.due else {
            return;
        };
        if task.is_completed() {
            return;
        }
        let Some(delay) = self.delay_until(due) else {
            tracing::debug!(id = %task.id, "due date not in the future; no reminder");
            return;
        };

        let reminder = Reminder::for_task(task, due);
        let sender = self.sender.clone();
        tracing::debug!(id = %task.id, delay_ms = delay.as_millis() as u64, "reminder scheduled");
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // The queue may have been dropped by the host
            let _ = sender.send(reminder);
        });

        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.insert(task.id, handle);
    }

    fn cancel(&self, id: TaskId) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = timers.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TimerNotifier {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }
}

/// Receiving end of the reminder channel
pub struct ReminderQueue {
    receiver: UnboundedReceiver<Reminder>,
}

impl ReminderQueue {
    /// Every reminder that has fired so far, without waiting.
    pub fn drain(&mut self) -> Vec<Reminder> {
        let mut reminders = Vec::new();
        while let Ok(reminder) = self.receiver.try_recv() {
            reminders.push(reminder);
        }
        reminders
    }
}
