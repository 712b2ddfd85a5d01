use std::sync::Arc;

use storage::repository::{StorageError, SubjectRepository};
use tracker_core::model::{Subject, SubjectDraft, SubjectId};
use tracing::info;

use crate::error::SubjectServiceError;

/// Which subjects a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectFilter {
    #[default]
    All,
    Active,
    Archived,
}

impl SubjectFilter {
    #[must_use]
    pub fn matches(self, subject: &Subject) -> bool {
        match self {
            SubjectFilter::All => true,
            SubjectFilter::Active => !subject.is_archived(),
            SubjectFilter::Archived => subject.is_archived(),
        }
    }
}

/// Orchestrates subject creation, archival and removal.
#[derive(Clone)]
pub struct SubjectService {
    subjects: Arc<dyn SubjectRepository>,
}

impl SubjectService {
    #[must_use]
    pub fn new(subjects: Arc<dyn SubjectRepository>) -> Self {
        Self { subjects }
    }

    /// Validate a draft and persist it as a new subject.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Subject` for validation failures.
    /// Returns `SubjectServiceError::DuplicateId` if the name slug is taken.
    /// Returns `SubjectServiceError::Storage` if persistence fails.
    pub async fn create_subject(&self, draft: SubjectDraft) -> Result<Subject, SubjectServiceError> {
        let subject = Subject::new(draft)?;
        match self.subjects.insert_subject(&subject).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => {
                return Err(SubjectServiceError::DuplicateId(subject.id().clone()));
            }
            Err(err) => return Err(err.into()),
        }
        info!(subject = %subject.id(), name = subject.name(), "subject created");
        Ok(subject)
    }

    /// List subjects in creation order.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn list_subjects(
        &self,
        filter: SubjectFilter,
    ) -> Result<Vec<Subject>, SubjectServiceError> {
        let mut subjects = self.subjects.list_subjects().await?;
        subjects.retain(|subject| filter.matches(subject));
        Ok(subjects)
    }

    /// Fetch a subject by id.
    ///
    /// Returns `Ok(None)` when the subject does not exist.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn get_subject(&self, id: &SubjectId) -> Result<Option<Subject>, SubjectServiceError> {
        let subject = self.subjects.get_subject(id).await?;
        Ok(subject)
    }

    /// Flip the archived flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` if the subject does not exist.
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn toggle_archived(&self, id: &SubjectId) -> Result<bool, SubjectServiceError> {
        let mut subject = self
            .subjects
            .get_subject(id)
            .await?
            .ok_or_else(|| SubjectServiceError::NotFound(id.clone()))?;

        let archived = subject.toggle_archived();
        self.subjects.upsert_subject(&subject).await?;
        info!(subject = %id, archived, "subject archive flag toggled");
        Ok(archived)
    }

    /// Delete a subject together with its attempt history.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` if the subject does not exist.
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn delete_subject(&self, id: &SubjectId) -> Result<(), SubjectServiceError> {
        match self.subjects.delete_subject(id).await {
            Ok(()) => {
                info!(subject = %id, "subject deleted");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(SubjectServiceError::NotFound(id.clone())),
            Err(err) => Err(err.into()),
        }
    }
}
