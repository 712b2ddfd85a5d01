use tracker_core::model::{ScheduleTask, ScheduleTaskDraft, ScheduleTaskId};

use super::SqliteRepository;
use super::mapping::{conn_err, map_schedule_row, schedule_id_to_i64, ser, write_err};
use crate::repository::{ScheduleRepository, StorageError};

const SCHEDULE_COLUMNS: &str =
    "id, title, day, repeat, completed, timer_minutes, time_spent, streak, missed";

#[async_trait::async_trait]
impl ScheduleRepository for SqliteRepository {
    async fn insert_schedule_task(
        &self,
        draft: &ScheduleTaskDraft,
    ) -> Result<ScheduleTask, StorageError> {
        let draft = draft.clone().validated().map_err(ser)?;
        let res = sqlx::query(
            r"
            INSERT INTO schedule_tasks (title, day, repeat, timer_minutes)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(draft.title.as_str())
        .bind(draft.day.to_string())
        .bind(i64::from(draft.repeat))
        .bind(i64::from(draft.timer_minutes))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let rowid = res.last_insert_rowid();
        let id = u64::try_from(rowid).map_err(|_| ser(format!("invalid schedule id: {rowid}")))?;
        let task = ScheduleTask::new(ScheduleTaskId::new(id), draft).map_err(ser)?;
        tracing::debug!(schedule_task_id = id, "schedule task inserted");
        Ok(task)
    }

    async fn update_schedule_task(&self, task: &ScheduleTask) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE schedule_tasks
            SET title = ?2, day = ?3, repeat = ?4, completed = ?5,
                timer_minutes = ?6, time_spent = ?7, streak = ?8, missed = ?9
            WHERE id = ?1
            ",
        )
        .bind(schedule_id_to_i64(task.id())?)
        .bind(task.title())
        .bind(task.day().to_string())
        .bind(i64::from(task.is_repeating()))
        .bind(i64::from(task.is_completed()))
        .bind(i64::from(task.timer_minutes()))
        .bind(i64::from(task.time_spent()))
        .bind(i64::from(task.streak()))
        .bind(i64::from(task.missed()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tracing::debug!(schedule_task_id = %task.id(), "schedule task updated");
        Ok(())
    }

    async fn get_schedule_task(
        &self,
        id: ScheduleTaskId,
    ) -> Result<Option<ScheduleTask>, StorageError> {
        let Ok(key) = schedule_id_to_i64(id) else {
            return Ok(None);
        };
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedule_tasks WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn_err)?;

        row.as_ref().map(map_schedule_row).transpose()
    }

    async fn list_schedule_tasks(&self) -> Result<Vec<ScheduleTask>, StorageError> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedule_tasks ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn_err)?;

        rows.iter().map(map_schedule_row).collect()
    }

    async fn delete_schedule_task(&self, id: ScheduleTaskId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM schedule_tasks WHERE id = ?1")
            .bind(schedule_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tracing::debug!(schedule_task_id = %id, "schedule task deleted");
        Ok(())
    }
}
