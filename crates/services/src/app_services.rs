use std::collections::HashMap;
use std::sync::Arc;

use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::attempt_service::AttemptService;
use crate::config::TrackerConfig;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::schedule_service::ScheduleService;
use crate::store::TrackerStore;
use crate::subject_service::SubjectService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    subjects: Arc<SubjectService>,
    attempts: Arc<AttemptService>,
    progress: Arc<ProgressService>,
    schedule: Arc<ScheduleService>,
}

impl AppServices {
    /// Build services backed by the `SQLite` database named in the config.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Sqlite` if connecting or migrating fails.
    pub async fn from_config(config: &TrackerConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        info!(db_url = %config.db_url, "storage ready");
        Ok(Self::with_storage(storage, clock))
    }

    /// Build services backed by in-memory repositories.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::with_storage(Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn with_storage(storage: Storage, clock: Clock) -> Self {
        let subjects = Arc::new(SubjectService::new(Arc::clone(&storage.subjects)));
        let attempts = Arc::new(AttemptService::new(
            clock,
            Arc::clone(&storage.subjects),
            Arc::clone(&storage.attempts),
        ));
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.subjects),
            Arc::clone(&storage.attempts),
        ));
        let schedule = Arc::new(ScheduleService::new(Arc::clone(&storage.schedule)));

        Self {
            clock,
            storage,
            subjects,
            attempts,
            progress,
            schedule,
        }
    }

    #[must_use]
    pub fn subjects(&self) -> Arc<SubjectService> {
        Arc::clone(&self.subjects)
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempts)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn schedule(&self) -> Arc<ScheduleService> {
        Arc::clone(&self.schedule)
    }

    /// Snapshot every subject and its history into a `TrackerStore`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if repository access fails.
    pub async fn load_store(&self) -> Result<TrackerStore, AppServicesError> {
        let subjects = self.storage.subjects.list_subjects().await?;
        let mut attempts = HashMap::with_capacity(subjects.len());
        for subject in &subjects {
            let history = self.storage.attempts.attempts_for_subject(subject.id()).await?;
            attempts.insert(subject.id().clone(), history);
        }
        Ok(TrackerStore::from_snapshot(self.clock, subjects, attempts))
    }
}
