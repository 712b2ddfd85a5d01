use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracker_core::model::{
    ScheduleTask, ScheduleTaskDraft, ScheduleTaskId, Subject, SubjectId, TaskAttempt,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for subject definitions.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Store a brand-new subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a subject with the same id exists.
    async fn insert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// Persist or replace a subject, keeping its attempt history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// Fetch a subject by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing subject is `Ok(None)`.
    async fn get_subject(&self, id: &SubjectId) -> Result<Option<Subject>, StorageError>;

    /// List all subjects in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError>;

    /// Remove a subject together with all of its attempts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist.
    async fn delete_subject(&self, id: &SubjectId) -> Result<(), StorageError>;
}

/// Append-only attempt history, keyed by subject.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append one attempt and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist.
    async fn append_attempt(
        &self,
        subject_id: &SubjectId,
        attempt: &TaskAttempt,
    ) -> Result<i64, StorageError>;

    /// All attempts of a subject in the order they were recorded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. Unknown subjects yield an empty list.
    async fn attempts_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Vec<TaskAttempt>, StorageError>;
}

/// Weekly schedule entries; ids are assigned on insert.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Store a new entry built from `draft` and return it with its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn insert_schedule_task(
        &self,
        draft: &ScheduleTaskDraft,
    ) -> Result<ScheduleTask, StorageError>;

    /// Overwrite an existing entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the entry does not exist.
    async fn update_schedule_task(&self, task: &ScheduleTask) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing entry is `Ok(None)`.
    async fn get_schedule_task(
        &self,
        id: ScheduleTaskId,
    ) -> Result<Option<ScheduleTask>, StorageError>;

    /// All entries in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_schedule_tasks(&self) -> Result<Vec<ScheduleTask>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the entry does not exist.
    async fn delete_schedule_task(&self, id: ScheduleTaskId) -> Result<(), StorageError>;
}

#[derive(Default)]
struct State {
    subjects: Vec<Subject>,
    attempts: HashMap<SubjectId, Vec<TaskAttempt>>,
    last_attempt_id: i64,
    schedule: Vec<ScheduleTask>,
    last_schedule_id: u64,
}

impl State {
    fn has_subject(&self, id: &SubjectId) -> bool {
        self.subjects.iter().any(|s| s.id() == id)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All tables sit behind one lock so existence checks and the writes that
/// depend on them happen atomically.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state.lock().map_err(lock_err)
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn insert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if state.has_subject(subject.id()) {
            return Err(StorageError::Conflict);
        }
        state.subjects.push(subject.clone());
        tracing::debug!(subject_id = %subject.id(), "subject inserted");
        Ok(())
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        match state.subjects.iter_mut().find(|s| s.id() == subject.id()) {
            Some(existing) => *existing = subject.clone(),
            None => state.subjects.push(subject.clone()),
        }
        tracing::debug!(subject_id = %subject.id(), "subject upserted");
        Ok(())
    }

    async fn get_subject(&self, id: &SubjectId) -> Result<Option<Subject>, StorageError> {
        let state = self.lock()?;
        Ok(state.subjects.iter().find(|s| s.id() == id).cloned())
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        Ok(self.lock()?.subjects.clone())
    }

    async fn delete_subject(&self, id: &SubjectId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let before = state.subjects.len();
        state.subjects.retain(|s| s.id() != id);
        if state.subjects.len() == before {
            return Err(StorageError::NotFound);
        }
        state.attempts.remove(id);
        tracing::debug!(subject_id = %id, "subject and attempts removed");
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(
        &self,
        subject_id: &SubjectId,
        attempt: &TaskAttempt,
    ) -> Result<i64, StorageError> {
        let mut state = self.lock()?;
        if !state.has_subject(subject_id) {
            return Err(StorageError::NotFound);
        }
        state
            .attempts
            .entry(subject_id.clone())
            .or_default()
            .push(attempt.clone());
        state.last_attempt_id += 1;
        Ok(state.last_attempt_id)
    }

    async fn attempts_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Vec<TaskAttempt>, StorageError> {
        let state = self.lock()?;
        Ok(state.attempts.get(subject_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryRepository {
    async fn insert_schedule_task(
        &self,
        draft: &ScheduleTaskDraft,
    ) -> Result<ScheduleTask, StorageError> {
        let mut state = self.lock()?;
        let id = ScheduleTaskId::new(state.last_schedule_id + 1);
        let task = ScheduleTask::new(id, draft.clone())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.last_schedule_id += 1;
        state.schedule.push(task.clone());
        tracing::debug!(schedule_task_id = %id, "schedule task inserted");
        Ok(task)
    }

    async fn update_schedule_task(&self, task: &ScheduleTask) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let existing = state
            .schedule
            .iter_mut()
            .find(|t| t.id() == task.id())
            .ok_or(StorageError::NotFound)?;
        *existing = task.clone();
        tracing::debug!(schedule_task_id = %task.id(), "schedule task updated");
        Ok(())
    }

    async fn get_schedule_task(
        &self,
        id: ScheduleTaskId,
    ) -> Result<Option<ScheduleTask>, StorageError> {
        let state = self.lock()?;
        Ok(state.schedule.iter().find(|t| t.id() == id).cloned())
    }

    async fn list_schedule_tasks(&self) -> Result<Vec<ScheduleTask>, StorageError> {
        Ok(self.lock()?.schedule.clone())
    }

    async fn delete_schedule_task(&self, id: ScheduleTaskId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let before = state.schedule.len();
        state.schedule.retain(|t| t.id() != id);
        if state.schedule.len() == before {
            return Err(StorageError::NotFound);
        }
        tracing::debug!(schedule_task_id = %id, "schedule task removed");
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub subjects: Arc<dyn SubjectRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub schedule: Arc<dyn ScheduleRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            subjects: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            schedule: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use tracker_core::model::{AttemptStatus, SubjectDraft, TaskRange};
    use tracker_core::time::fixed_clock;

    fn build_subject(name: &str) -> Subject {
        Subject::new(
            SubjectDraft::new(name, TaskRange::new(1, 12), TaskRange::new(13, 19))
                .with_max_points(13, 2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let repo = InMemoryRepository::new();
        repo.insert_subject(&build_subject("Math")).await.unwrap();

        let err = repo.insert_subject(&build_subject("math")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn list_keeps_creation_order_and_upsert_replaces() {
        let repo = InMemoryRepository::new();
        repo.insert_subject(&build_subject("Physics")).await.unwrap();
        repo.insert_subject(&build_subject("Chemistry")).await.unwrap();

        let mut physics = build_subject("Physics");
        physics.set_archived(true);
        repo.upsert_subject(&physics).await.unwrap();

        let listed = repo.list_subjects().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, vec!["physics", "chemistry"]);
        assert!(listed[0].is_archived());
    }

    #[tokio::test]
    async fn delete_cascades_attempts() {
        let repo = InMemoryRepository::new();
        let subject = build_subject("Math");
        repo.insert_subject(&subject).await.unwrap();

        let attempt = subject
            .record_attempt(&fixed_clock(), 1, AttemptStatus::Completed, None)
            .unwrap();
        repo.append_attempt(subject.id(), &attempt).await.unwrap();

        repo.delete_subject(subject.id()).await.unwrap();
        assert!(repo.get_subject(subject.id()).await.unwrap().is_none());
        assert!(repo.attempts_for_subject(subject.id()).await.unwrap().is_empty());

        let err = repo.delete_subject(subject.id()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn append_requires_known_subject() {
        let repo = InMemoryRepository::new();
        let subject = build_subject("Math");
        let attempt = subject
            .record_attempt(&fixed_clock(), 2, AttemptStatus::Failed, None)
            .unwrap();

        let err = repo.append_attempt(subject.id(), &attempt).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn attempts_keep_recording_order() {
        let repo = InMemoryRepository::new();
        let subject = build_subject("Math");
        repo.insert_subject(&subject).await.unwrap();
        let clock = fixed_clock();

        for task in [5, 13, 2] {
            let points = (task == 13).then_some(1);
            let attempt = subject
                .record_attempt(&clock, task, AttemptStatus::Completed, points)
                .unwrap();
            repo.append_attempt(subject.id(), &attempt).await.unwrap();
        }

        let attempts = repo.attempts_for_subject(subject.id()).await.unwrap();
        let order: Vec<u32> = attempts.iter().map(TaskAttempt::task_number).collect();
        assert_eq!(order, vec![5, 13, 2]);
        assert_eq!(attempts[1].points(), Some(1));
    }

    #[tokio::test]
    async fn recreated_subject_starts_with_empty_history() {
        let repo = InMemoryRepository::new();
        let subject = build_subject("Math");
        repo.insert_subject(&subject).await.unwrap();
        let attempt = subject
            .record_attempt(&fixed_clock(), 3, AttemptStatus::Completed, None)
            .unwrap();
        repo.append_attempt(subject.id(), &attempt).await.unwrap();

        repo.delete_subject(subject.id()).await.unwrap();
        let err = repo.append_attempt(subject.id(), &attempt).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        repo.insert_subject(&subject).await.unwrap();
        assert!(repo.attempts_for_subject(subject.id()).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_never_outlive_a_delete() {
        let repo = InMemoryRepository::new();
        let subject = build_subject("Math");
        repo.insert_subject(&subject).await.unwrap();
        let attempt = subject
            .record_attempt(&fixed_clock(), 4, AttemptStatus::Completed, None)
            .unwrap();

        let mut writers = Vec::new();
        for _ in 0..8 {
            let repo = repo.clone();
            let id = subject.id().clone();
            let attempt = attempt.clone();
            writers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    match repo.append_attempt(&id, &attempt).await {
                        Ok(_) | Err(StorageError::NotFound) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }
        tokio::task::yield_now().await;
        repo.delete_subject(subject.id()).await.unwrap();
        for writer in writers {
            writer.await.unwrap();
        }

        // Every append after the delete was rejected, so nothing is orphaned.
        repo.insert_subject(&subject).await.unwrap();
        assert!(repo.attempts_for_subject(subject.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn schedule_ids_are_sequential_and_listing_keeps_order() {
        let repo = InMemoryRepository::new();
        let first = repo
            .insert_schedule_task(&ScheduleTaskDraft::new("Essay", Weekday::Wed))
            .await
            .unwrap();
        let second = repo
            .insert_schedule_task(&ScheduleTaskDraft::new("Vocab", Weekday::Mon).repeating())
            .await
            .unwrap();

        assert_eq!(first.id().value(), 1);
        assert_eq!(second.id().value(), 2);
        let titles: Vec<String> = repo
            .list_schedule_tasks()
            .await
            .unwrap()
            .iter()
            .map(|t| t.title().to_owned())
            .collect();
        assert_eq!(titles, vec!["Essay", "Vocab"]);
    }

    #[tokio::test]
    async fn schedule_update_and_delete_require_existing_entry() {
        let repo = InMemoryRepository::new();
        let mut task = repo
            .insert_schedule_task(&ScheduleTaskDraft::new("Essay", Weekday::Wed))
            .await
            .unwrap();
        task.toggle_complete();
        repo.update_schedule_task(&task).await.unwrap();
        let stored = repo.get_schedule_task(task.id()).await.unwrap().unwrap();
        assert!(stored.is_completed());
        assert_eq!(stored.streak(), 1);

        repo.delete_schedule_task(task.id()).await.unwrap();
        assert!(repo.get_schedule_task(task.id()).await.unwrap().is_none());
        let err = repo.update_schedule_task(&task).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        let err = repo.delete_schedule_task(task.id()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
