use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::Clock;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur while recording an attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("invalid attempt status: {0}")]
    InvalidStatus(String),

    #[error("task {task_number} is not part of this subject")]
    TaskOutsideSubject { task_number: u32 },

    #[error("completed part 2 task {task_number} needs a points value")]
    MissingPoints { task_number: u32 },

    #[error("max points for task {task_number} must be at least 1")]
    ZeroMaxPoints { task_number: u32 },

    #[error("task {task_number}: {points} points exceeds the maximum of {max_points}")]
    PointsExceedMax {
        task_number: u32,
        points: u32,
        max_points: u32,
    },
}

//
// ─── STATUS ───────────────────────────────────────────────────────────────────
//

/// How a single attempt went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Completed,
    Failed,
    /// Kept for the history but ignored by every percentage.
    Skipped,
}

impl AttemptStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::Completed => "completed",
            AttemptStatus::Failed => "failed",
            AttemptStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = AttemptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(AttemptStatus::Completed),
            "failed" => Ok(AttemptStatus::Failed),
            "skipped" => Ok(AttemptStatus::Skipped),
            other => Err(AttemptError::InvalidStatus(other.to_owned())),
        }
    }
}

//
// ─── RESULT ───────────────────────────────────────────────────────────────────
//

/// Outcome of an attempt in one of the two scoring modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    /// Solved or not; no points recorded.
    Binary(AttemptStatus),
    /// Points earned out of the maximum that was valid when the attempt was saved.
    PartialCredit {
        status: AttemptStatus,
        points: u32,
        max_points: u32,
    },
    /// A stored maximum without points; counts as 0 out of that maximum.
    Unscored {
        status: AttemptStatus,
        max_points: u32,
    },
}

impl AttemptResult {
    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        match self {
            AttemptResult::Binary(status)
            | AttemptResult::PartialCredit { status, .. }
            | AttemptResult::Unscored { status, .. } => *status,
        }
    }

    #[must_use]
    pub fn points(&self) -> Option<u32> {
        match self {
            AttemptResult::Binary(_) | AttemptResult::Unscored { .. } => None,
            AttemptResult::PartialCredit { points, .. } => Some(*points),
        }
    }

    #[must_use]
    pub fn max_points(&self) -> Option<u32> {
        match self {
            AttemptResult::Binary(_) => None,
            AttemptResult::PartialCredit { max_points, .. }
            | AttemptResult::Unscored { max_points, .. } => Some(*max_points),
        }
    }
}

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

/// One dated, immutable try at a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AttemptRecord", into = "AttemptRecord")]
pub struct TaskAttempt {
    task_number: u32,
    result: AttemptResult,
    date: NaiveDate,
}

impl TaskAttempt {
    #[must_use]
    pub fn new(task_number: u32, result: AttemptResult, date: NaiveDate) -> Self {
        Self {
            task_number,
            result,
            date,
        }
    }

    /// Rebuild an attempt from its flat stored form.
    ///
    /// Stored values are taken as given: historic rows may predate today's
    /// validation rules. A `max_points` without `points` is kept as
    /// [`AttemptResult::Unscored`].
    #[must_use]
    pub fn from_persisted(
        task_number: u32,
        status: AttemptStatus,
        points: Option<u32>,
        max_points: Option<u32>,
        date: NaiveDate,
    ) -> Self {
        let result = match (points, max_points) {
            (Some(points), max_points) => AttemptResult::PartialCredit {
                status,
                points,
                max_points: max_points.unwrap_or(1),
            },
            (None, Some(max_points)) => AttemptResult::Unscored { status, max_points },
            (None, None) => AttemptResult::Binary(status),
        };
        Self::new(task_number, result, date)
    }

    #[must_use]
    pub fn task_number(&self) -> u32 {
        self.task_number
    }

    #[must_use]
    pub fn result(&self) -> &AttemptResult {
        &self.result
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.result.status()
    }

    #[must_use]
    pub fn points(&self) -> Option<u32> {
        self.result.points()
    }

    #[must_use]
    pub fn max_points(&self) -> Option<u32> {
        self.result.max_points()
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status() == AttemptStatus::Skipped
    }
}

/// Create a new attempt stamped with the clock's current date.
///
/// Supplying `points` produces a partial-credit attempt out of `max_points`
/// (1 when absent); otherwise the attempt is binary and `max_points` is
/// ignored.
///
/// # Errors
///
/// Returns `AttemptError::ZeroMaxPoints` for an explicit maximum of 0 and
/// `AttemptError::PointsExceedMax` when `points > max_points`.
pub fn record_attempt(
    clock: &Clock,
    task_number: u32,
    status: AttemptStatus,
    points: Option<u32>,
    max_points: Option<u32>,
) -> Result<TaskAttempt, AttemptError> {
    let result = match points {
        Some(points) => {
            let max_points = max_points.unwrap_or(1);
            if max_points == 0 {
                return Err(AttemptError::ZeroMaxPoints { task_number });
            }
            if points > max_points {
                return Err(AttemptError::PointsExceedMax {
                    task_number,
                    points,
                    max_points,
                });
            }
            AttemptResult::PartialCredit {
                status,
                points,
                max_points,
            }
        }
        None => AttemptResult::Binary(status),
    };

    Ok(TaskAttempt::new(task_number, result, clock.today()))
}

/// Flat wire form: `points`/`maxPoints` appear only when the attempt carries them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub task_number: u32,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<u32>,
    pub date: NaiveDate,
}

impl From<AttemptRecord> for TaskAttempt {
    fn from(record: AttemptRecord) -> Self {
        TaskAttempt::from_persisted(
            record.task_number,
            record.status,
            record.points,
            record.max_points,
            record.date,
        )
    }
}

impl From<TaskAttempt> for AttemptRecord {
    fn from(attempt: TaskAttempt) -> Self {
        Self {
            task_number: attempt.task_number,
            status: attempt.status(),
            points: attempt.points(),
            max_points: attempt.max_points(),
            date: attempt.date,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
