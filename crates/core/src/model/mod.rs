mod attempt;
mod ids;
mod schedule;
mod subject;

pub use ids::{ParseIdError, ScheduleTaskId, SubjectId};

pub use attempt::{
    AttemptError, AttemptRecord, AttemptResult, AttemptStatus, TaskAttempt, record_attempt,
};
pub use schedule::{
    DaySummary, ScheduleError, ScheduleTask, ScheduleTaskDraft, WEEK, Weekday, WeeklySummary,
    tasks_for_day, weekly_summary,
};
pub use subject::{
    DEFAULT_COLOR, DEFAULT_ICON, Subject, SubjectDisplay, SubjectDraft, SubjectError, TaskRange,
    TaskSection,
};
