use std::sync::Arc;

use storage::repository::{AttemptRepository, StorageError, SubjectRepository};
use tracker_core::model::{AttemptStatus, SubjectId, TaskAttempt};
use tracing::info;

use crate::error::AttemptServiceError;
use crate::Clock;

/// Records attempts against the current subject layout.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    subjects: Arc<dyn SubjectRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        subjects: Arc<dyn SubjectRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            subjects,
            attempts,
        }
    }

    /// Classify, validate and append one attempt dated today.
    ///
    /// `points` is only read for a completed part 2 task.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::UnknownSubject` if the subject does not exist.
    /// Returns `AttemptServiceError::Attempt` when the attempt fails validation.
    /// Returns `AttemptServiceError::Storage` if persistence fails.
    pub async fn save_attempt(
        &self,
        subject_id: &SubjectId,
        task_number: u32,
        status: AttemptStatus,
        points: Option<u32>,
    ) -> Result<TaskAttempt, AttemptServiceError> {
        let subject = self
            .subjects
            .get_subject(subject_id)
            .await?
            .ok_or_else(|| AttemptServiceError::UnknownSubject(subject_id.clone()))?;

        let attempt = subject.record_attempt(&self.clock, task_number, status, points)?;
        match self.attempts.append_attempt(subject_id, &attempt).await {
            Ok(_) => {}
            Err(StorageError::NotFound) => {
                return Err(AttemptServiceError::UnknownSubject(subject_id.clone()));
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            subject = %subject_id,
            task = task_number,
            status = %status,
            points = attempt.points(),
            "attempt saved"
        );
        Ok(attempt)
    }

    /// Attempt history of a subject, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::Storage` if repository access fails.
    pub async fn attempts_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Vec<TaskAttempt>, AttemptServiceError> {
        let attempts = self.attempts.attempts_for_subject(subject_id).await?;
        Ok(attempts)
    }
}
