//! Urgency scoring.
//!
//! The score orders the pending partition: a priority bonus, an overdue
//! bonus, a due-date age term normalised by the oldest completed due date,
//! and a small bonus for tagged tasks. Completed tasks always score 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Priority, Task};

/// Weights applied by [`calculate_urgency`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgencyCoefficients {
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
    #[serde(default = "default_low")]
    pub low: f64,
    #[serde(default = "default_overdue")]
    pub overdue: f64,
    #[serde(default = "default_age")]
    pub age: f64,
    #[serde(default = "default_tags")]
    pub tags: f64,
}

fn default_high() -> f64 {
    6.0
}

fn default_medium() -> f64 {
    3.9
}

fn default_low() -> f64 {
    1.8
}

fn default_overdue() -> f64 {
    12.0
}

fn default_age() -> f64 {
    2.0
}

fn default_tags() -> f64 {
    1.0
}

impl Default for UrgencyCoefficients {
    fn default() -> Self {
        Self {
            high: default_high(),
            medium: default_medium(),
            low: default_low(),
            overdue: default_overdue(),
            age: default_age(),
            tags: default_tags(),
        }
    }
}

impl UrgencyCoefficients {
    pub fn priority(&self, priority: Priority) -> f64 {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
            Priority::None => 0.0,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let weights = [
            ("urgency.high", self.high),
            ("urgency.medium", self.medium),
            ("urgency.low", self.low),
            ("urgency.overdue", self.overdue),
            ("urgency.age", self.age),
            ("urgency.tags", self.tags),
        ];
        for (field, value) in weights {
            if !value.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "{field} must be a finite number"
                )));
            }
        }
        Ok(())
    }
}

/// Score `task` against `now`.
///
/// `oldest_due` is the earliest due date among completed tasks; the caller
/// recomputes it before every refresh. The age term divides the signed day
/// distance of `due` from `now` by the day distance of `oldest_due` from
/// `now`, clamped to at least one day.
pub fn calculate_urgency(
    task: &Task,
    oldest_due: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    coefficients: &UrgencyCoefficients,
) -> f64 {
    if task.is_completed() {
        return 0.0;
    }

    let mut urgency = coefficients.priority(task.priority);

    if let Some(due) = task.due {
        if due < now {
            urgency += coefficients.overdue;
        }
        let span = oldest_due
            .map(|oldest| day_delta(oldest, now).abs())
            .unwrap_or(1)
            .max(1);
        urgency += (day_delta(due, now) as f64 / span as f64) * coefficients.age;
    }

    if !task.tags.is_empty() {
        urgency += coefficients.tags;
    }

    urgency
}

/// Signed number of calendar days from `now` to `date` (UTC).
fn day_delta(date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (date.date_naive() - now.date_naive()).num_days()
}
