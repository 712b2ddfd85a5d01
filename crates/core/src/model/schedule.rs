pub use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::ScheduleTaskId;

/// Errors that can occur when defining a schedule entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    #[error("schedule task title cannot be empty")]
    EmptyTitle,
}

/// Monday-first order used by every weekly listing.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Input for a new schedule entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTaskDraft {
    pub title: String,
    pub day: Weekday,
    pub repeat: bool,
    pub timer_minutes: u32,
}

impl ScheduleTaskDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, day: Weekday) -> Self {
        Self {
            title: title.into(),
            day,
            repeat: false,
            timer_minutes: 30,
        }
    }

    #[must_use]
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    #[must_use]
    pub fn with_timer(mut self, minutes: u32) -> Self {
        self.timer_minutes = minutes;
        self
    }

    /// Trim the title and reject blank ones.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::EmptyTitle` when nothing is left after trimming.
    pub fn validated(mut self) -> Result<Self, ScheduleError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ScheduleError::EmptyTitle);
        }
        self.title = title.to_owned();
        Ok(self)
    }
}

/// A recurring or one-off chore pinned to a weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTask {
    id: ScheduleTaskId,
    title: String,
    day: Weekday,
    repeat: bool,
    completed: bool,
    timer_minutes: u32,
    time_spent: u32,
    streak: u32,
    missed: u32,
}

impl ScheduleTask {
    /// A fresh, open entry with zeroed counters.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::EmptyTitle` for a blank title.
    pub fn new(id: ScheduleTaskId, draft: ScheduleTaskDraft) -> Result<Self, ScheduleError> {
        let draft = draft.validated()?;
        Ok(Self {
            id,
            title: draft.title,
            day: draft.day,
            repeat: draft.repeat,
            completed: false,
            timer_minutes: draft.timer_minutes,
            time_spent: 0,
            streak: 0,
            missed: 0,
        })
    }

    /// Rehydrate an entry with its counters as stored.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::EmptyTitle` for a blank title.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ScheduleTaskId,
        title: impl Into<String>,
        day: Weekday,
        repeat: bool,
        completed: bool,
        timer_minutes: u32,
        time_spent: u32,
        streak: u32,
        missed: u32,
    ) -> Result<Self, ScheduleError> {
        let title: String = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(ScheduleError::EmptyTitle);
        }
        Ok(Self {
            id,
            title: title.to_owned(),
            day,
            repeat,
            completed,
            timer_minutes,
            time_spent,
            streak,
            missed,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ScheduleTaskId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn day(&self) -> Weekday {
        self.day
    }

    #[must_use]
    pub fn is_repeating(&self) -> bool {
        self.repeat
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn timer_minutes(&self) -> u32 {
        self.timer_minutes
    }

    /// Minutes credited by the last completion.
    #[must_use]
    pub fn time_spent(&self) -> u32 {
        self.time_spent
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// Flip the completed flag and return the new value.
    ///
    /// Completing bumps the streak and credits the full timer. Reopening
    /// leaves both counters as they were.
    pub fn toggle_complete(&mut self) -> bool {
        self.completed = !self.completed;
        if self.completed {
            self.streak = self.streak.saturating_add(1);
            self.time_spent = self.timer_minutes;
        }
        self.completed
    }
}

/// Entries planned for one weekday, in the given order.
#[must_use]
pub fn tasks_for_day(tasks: &[ScheduleTask], day: Weekday) -> Vec<&ScheduleTask> {
    tasks.iter().filter(|task| task.day == day).collect()
}

/// Completed and planned counts for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub day: Weekday,
    pub completed: u32,
    pub total: u32,
}

/// Week roll-up behind the statistics view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub days: Vec<DaySummary>,
    pub completed: u32,
    pub total: u32,
    /// `round(100 * completed / total)`, halves up; 0 for an empty week.
    pub completion_rate: u8,
    /// Highest streak among the entries.
    pub best_streak: u32,
}

#[must_use]
pub fn weekly_summary(tasks: &[ScheduleTask]) -> WeeklySummary {
    let days: Vec<DaySummary> = WEEK
        .iter()
        .map(|&day| {
            let planned = tasks_for_day(tasks, day);
            let completed = planned.iter().filter(|task| task.completed).count();
            DaySummary {
                day,
                completed: u32::try_from(completed).unwrap_or(u32::MAX),
                total: u32::try_from(planned.len()).unwrap_or(u32::MAX),
            }
        })
        .collect();

    let completed: u32 = days.iter().map(|d| d.completed).sum();
    let total: u32 = days.iter().map(|d| d.total).sum();
    let completion_rate = if total == 0 {
        0
    } else {
        let (part, whole) = (u64::from(completed), u64::from(total));
        u8::try_from((200 * part + whole) / (2 * whole)).unwrap_or(100)
    };

    WeeklySummary {
        days,
        completed,
        total,
        completion_rate,
        best_streak: tasks.iter().map(ScheduleTask::streak).max().unwrap_or(0),
    }
}
