use tracker_core::model::{Subject, SubjectId};

use super::SqliteRepository;
use super::mapping::{conn_err, map_subject_row, max_points_to_json, write_err};
use crate::repository::{StorageError, SubjectRepository};

const SUBJECT_COLUMNS: &str = "id, name, part1_from, part1_to, part2_from, part2_to, part2_max_points, icon, color, archived";

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn insert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO subjects (id, name, part1_from, part1_to, part2_from, part2_to, part2_max_points, icon, color, archived)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(subject.id().as_str())
        .bind(subject.name())
        .bind(i64::from(subject.part1_range().from))
        .bind(i64::from(subject.part1_range().to))
        .bind(i64::from(subject.part2_range().from))
        .bind(i64::from(subject.part2_range().to))
        .bind(max_points_to_json(subject.part2_max_points())?)
        .bind(subject.display().icon.as_str())
        .bind(subject.display().color.as_str())
        .bind(i64::from(subject.is_archived()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        tracing::debug!(subject_id = %subject.id(), "subject inserted");
        Ok(())
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO subjects (id, name, part1_from, part1_to, part2_from, part2_to, part2_max_points, icon, color, archived)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                part1_from = excluded.part1_from,
                part1_to = excluded.part1_to,
                part2_from = excluded.part2_from,
                part2_to = excluded.part2_to,
                part2_max_points = excluded.part2_max_points,
                icon = excluded.icon,
                color = excluded.color,
                archived = excluded.archived
            ",
        )
        .bind(subject.id().as_str())
        .bind(subject.name())
        .bind(i64::from(subject.part1_range().from))
        .bind(i64::from(subject.part1_range().to))
        .bind(i64::from(subject.part2_range().from))
        .bind(i64::from(subject.part2_range().to))
        .bind(max_points_to_json(subject.part2_max_points())?)
        .bind(subject.display().icon.as_str())
        .bind(subject.display().color.as_str())
        .bind(i64::from(subject.is_archived()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        tracing::debug!(subject_id = %subject.id(), "subject upserted");
        Ok(())
    }

    async fn get_subject(&self, id: &SubjectId) -> Result<Option<Subject>, StorageError> {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn_err)?;

        row.as_ref().map(map_subject_row).transpose()
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY seq ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn_err)?;

        let mut subjects = Vec::with_capacity(rows.len());
        for row in rows {
            subjects.push(map_subject_row(&row)?);
        }
        Ok(subjects)
    }

    async fn delete_subject(&self, id: &SubjectId) -> Result<(), StorageError> {
        // task_attempts rows go with it through ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM subjects WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tracing::debug!(subject_id = %id, "subject deleted");
        Ok(())
    }
}
