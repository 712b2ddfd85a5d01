use std::sync::Arc;

use storage::repository::{ScheduleRepository, StorageError};
use tracker_core::model::{
    ScheduleTask, ScheduleTaskDraft, ScheduleTaskId, Weekday, WeeklySummary, tasks_for_day,
    weekly_summary,
};
use tracing::info;

use crate::error::ScheduleServiceError;

/// Weekly planner: entries pinned to weekdays plus the completion roll-up.
#[derive(Clone)]
pub struct ScheduleService {
    tasks: Arc<dyn ScheduleRepository>,
}

impl ScheduleService {
    #[must_use]
    pub fn new(tasks: Arc<dyn ScheduleRepository>) -> Self {
        Self { tasks }
    }

    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Schedule` for a blank title.
    /// Returns `ScheduleServiceError::Storage` if persistence fails.
    pub async fn add_task(
        &self,
        draft: ScheduleTaskDraft,
    ) -> Result<ScheduleTask, ScheduleServiceError> {
        let draft = draft.validated()?;
        let task = self.tasks.insert_schedule_task(&draft).await?;
        info!(
            schedule_task_id = %task.id(),
            day = %task.day(),
            repeat = task.is_repeating(),
            "schedule task added"
        );
        Ok(task)
    }

    /// Flip an entry between open and done and persist the new counters.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::NotFound` if the entry does not exist.
    /// Returns `ScheduleServiceError::Storage` if persistence fails.
    pub async fn toggle_complete(
        &self,
        id: ScheduleTaskId,
    ) -> Result<ScheduleTask, ScheduleServiceError> {
        let mut task = self
            .tasks
            .get_schedule_task(id)
            .await?
            .ok_or(ScheduleServiceError::NotFound(id))?;

        let completed = task.toggle_complete();
        match self.tasks.update_schedule_task(&task).await {
            Ok(()) => {}
            Err(StorageError::NotFound) => return Err(ScheduleServiceError::NotFound(id)),
            Err(err) => return Err(err.into()),
        }

        info!(schedule_task_id = %id, completed, streak = task.streak(), "schedule task toggled");
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns `ScheduleServiceError::NotFound` if the entry does not exist.
    /// Returns `ScheduleServiceError::Storage` if persistence fails.
    pub async fn delete_task(&self, id: ScheduleTaskId) -> Result<(), ScheduleServiceError> {
        match self.tasks.delete_schedule_task(id).await {
            Ok(()) => {
                info!(schedule_task_id = %id, "schedule task deleted");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(ScheduleServiceError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// All entries in creation order.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Storage` if repository access fails.
    pub async fn list_tasks(&self) -> Result<Vec<ScheduleTask>, ScheduleServiceError> {
        Ok(self.tasks.list_schedule_tasks().await?)
    }

    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Storage` if repository access fails.
    pub async fn tasks_for_day(
        &self,
        day: Weekday,
    ) -> Result<Vec<ScheduleTask>, ScheduleServiceError> {
        let tasks = self.tasks.list_schedule_tasks().await?;
        Ok(tasks_for_day(&tasks, day).into_iter().cloned().collect())
    }

    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Storage` if repository access fails.
    pub async fn weekly_summary(&self) -> Result<WeeklySummary, ScheduleServiceError> {
        let tasks = self.tasks.list_schedule_tasks().await?;
        Ok(weekly_summary(&tasks))
    }
}
