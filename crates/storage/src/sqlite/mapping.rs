use std::collections::BTreeMap;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use chrono::Weekday;
use tracker_core::model::{
    AttemptStatus, ScheduleTask, ScheduleTaskId, Subject, SubjectDisplay, SubjectId, TaskAttempt,
    TaskRange,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps write failures: constraint violations become domain conflicts.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        Some(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn max_points_to_json(table: &BTreeMap<u32, u32>) -> Result<String, StorageError> {
    serde_json::to_string(table).map_err(ser)
}

pub(crate) fn max_points_from_json(raw: &str) -> Result<BTreeMap<u32, u32>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    let part1_range = TaskRange::new(
        u32_from_i64("part1_from", row.try_get("part1_from").map_err(ser)?)?,
        u32_from_i64("part1_to", row.try_get("part1_to").map_err(ser)?)?,
    );
    let part2_range = TaskRange::new(
        u32_from_i64("part2_from", row.try_get("part2_from").map_err(ser)?)?,
        u32_from_i64("part2_to", row.try_get("part2_to").map_err(ser)?)?,
    );
    let max_points_raw: String = row.try_get("part2_max_points").map_err(ser)?;

    Subject::from_persisted(
        SubjectId::new(row.try_get::<String, _>("id").map_err(ser)?),
        row.try_get::<String, _>("name").map_err(ser)?,
        part1_range,
        part2_range,
        max_points_from_json(&max_points_raw)?,
        SubjectDisplay::new(
            row.try_get::<String, _>("icon").map_err(ser)?,
            row.try_get::<String, _>("color").map_err(ser)?,
        ),
        row.try_get::<i64, _>("archived").map_err(ser)? != 0,
    )
    .map_err(ser)
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<TaskAttempt, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    let status: AttemptStatus = status.parse().map_err(ser)?;

    let points = row
        .try_get::<Option<i64>, _>("points")
        .map_err(ser)?
        .map(|v| u32_from_i64("points", v))
        .transpose()?;
    let max_points = row
        .try_get::<Option<i64>, _>("max_points")
        .map_err(ser)?
        .map(|v| u32_from_i64("max_points", v))
        .transpose()?;

    Ok(TaskAttempt::from_persisted(
        u32_from_i64("task_number", row.try_get("task_number").map_err(ser)?)?,
        status,
        points,
        max_points,
        row.try_get("attempt_date").map_err(ser)?,
    ))
}

pub(crate) fn schedule_id_to_i64(id: ScheduleTaskId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::NotFound)
}

pub(crate) fn map_schedule_row(row: &SqliteRow) -> Result<ScheduleTask, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let id = u64::try_from(id).map_err(|_| ser(format!("invalid schedule id: {id}")))?;
    let day: String = row.try_get("day").map_err(ser)?;
    let day: Weekday = day
        .parse()
        .map_err(|_| ser(format!("invalid weekday: {day}")))?;

    ScheduleTask::from_persisted(
        ScheduleTaskId::new(id),
        row.try_get::<String, _>("title").map_err(ser)?,
        day,
        row.try_get::<i64, _>("repeat").map_err(ser)? != 0,
        row.try_get::<i64, _>("completed").map_err(ser)? != 0,
        u32_from_i64("timer_minutes", row.try_get("timer_minutes").map_err(ser)?)?,
        u32_from_i64("time_spent", row.try_get("time_spent").map_err(ser)?)?,
        u32_from_i64("streak", row.try_get("streak").map_err(ser)?)?,
        u32_from_i64("missed", row.try_get("missed").map_err(ser)?)?,
    )
    .map_err(ser)
}
