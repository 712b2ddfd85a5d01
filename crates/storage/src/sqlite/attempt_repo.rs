use tracker_core::model::{SubjectId, TaskAttempt};

use super::SqliteRepository;
use super::mapping::{conn_err, map_attempt_row, write_err};
use crate::repository::{AttemptRepository, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(
        &self,
        subject_id: &SubjectId,
        attempt: &TaskAttempt,
    ) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO task_attempts (subject_id, task_number, status, points, max_points, attempt_date)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(subject_id.as_str())
        .bind(i64::from(attempt.task_number()))
        .bind(attempt.status().as_str())
        .bind(attempt.points().map(i64::from))
        .bind(attempt.max_points().map(i64::from))
        .bind(attempt.date())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let id = res.last_insert_rowid();
        tracing::debug!(%subject_id, attempt_id = id, task = attempt.task_number(), "attempt appended");
        Ok(id)
    }

    async fn attempts_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Vec<TaskAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT task_number, status, points, max_points, attempt_date
                FROM task_attempts
                WHERE subject_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(subject_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }
}
