use std::sync::Arc;

use serde::Serialize;
use storage::repository::{AttemptRepository, SubjectRepository};
use tracker_core::model::{Subject, SubjectId, TaskAttempt, TaskSection};
use tracker_core::scoring::{self, TaskStats, TaskSummary};
use tracing::warn;

use crate::error::ProgressServiceError;

/// Full breakdown of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectReport {
    pub subject_id: SubjectId,
    pub name: String,
    pub archived: bool,
    pub progress: u8,
    pub part1_progress: u8,
    pub part2_progress: u8,
    pub tasks: Vec<TaskSummary>,
}

impl SubjectReport {
    #[must_use]
    pub fn build(subject: &Subject, attempts: &[TaskAttempt]) -> Self {
        Self {
            subject_id: subject.id().clone(),
            name: subject.name().to_owned(),
            archived: subject.is_archived(),
            progress: scoring::subject_progress(subject, attempts),
            part1_progress: scoring::section_progress(subject, attempts, TaskSection::Part1),
            part2_progress: scoring::section_progress(subject, attempts, TaskSection::Part2),
            tasks: scoring::attempted_tasks(subject, attempts),
        }
    }
}

/// One dashboard line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectOverview {
    pub subject_id: SubjectId,
    pub name: String,
    pub archived: bool,
    pub progress: u8,
    pub attempted_tasks: usize,
    pub scored_attempts: u32,
}

/// Read-side scoring over persisted subjects and attempts.
#[derive(Clone)]
pub struct ProgressService {
    subjects: Arc<dyn SubjectRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(subjects: Arc<dyn SubjectRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { subjects, attempts }
    }

    /// Subject-level mastery, 0 for unknown subjects.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn subject_progress(&self, subject_id: &SubjectId) -> Result<u8, ProgressServiceError> {
        Ok(self
            .load(subject_id)
            .await?
            .map(|(subject, attempts)| scoring::subject_progress(&subject, &attempts))
            .unwrap_or_default())
    }

    /// Per-task score, zeros for unknown subjects.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn task_stats(
        &self,
        subject_id: &SubjectId,
        task_number: u32,
    ) -> Result<TaskStats, ProgressServiceError> {
        Ok(self
            .load(subject_id)
            .await?
            .map(|(subject, attempts)| scoring::task_stats(&subject, &attempts, task_number))
            .unwrap_or_default())
    }

    /// Whether the task is scored with partial credit; false for unknown subjects.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn is_part2_task(
        &self,
        subject_id: &SubjectId,
        task_number: u32,
    ) -> Result<bool, ProgressServiceError> {
        match self.subjects.get_subject(subject_id).await? {
            Some(subject) => Ok(scoring::is_part2_task(&subject, task_number)),
            None => {
                warn!(subject = %subject_id, "classification requested for unknown subject");
                Ok(false)
            }
        }
    }

    /// Overall, per-section and per-task scores of one subject.
    ///
    /// Returns `Ok(None)` when the subject does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn subject_report(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Option<SubjectReport>, ProgressServiceError> {
        Ok(self
            .load(subject_id)
            .await?
            .map(|(subject, attempts)| SubjectReport::build(&subject, &attempts)))
    }

    /// One overview line per subject, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn overview(&self) -> Result<Vec<SubjectOverview>, ProgressServiceError> {
        let subjects = self.subjects.list_subjects().await?;
        let mut lines = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let attempts = self.attempts.attempts_for_subject(subject.id()).await?;
            let tasks = scoring::attempted_tasks(&subject, &attempts);
            lines.push(SubjectOverview {
                subject_id: subject.id().clone(),
                name: subject.name().to_owned(),
                archived: subject.is_archived(),
                progress: scoring::subject_progress(&subject, &attempts),
                attempted_tasks: tasks.len(),
                scored_attempts: tasks.iter().map(|task| task.stats.attempts).sum(),
            });
        }
        Ok(lines)
    }

    async fn load(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Option<(Subject, Vec<TaskAttempt>)>, ProgressServiceError> {
        let Some(subject) = self.subjects.get_subject(subject_id).await? else {
            warn!(subject = %subject_id, "progress requested for unknown subject");
            return Ok(None);
        };
        let attempts = self.attempts.attempts_for_subject(subject_id).await?;
        Ok(Some((subject, attempts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::InMemoryRepository;
    use tracker_core::model::{AttemptStatus, SubjectDraft, TaskRange};
    use tracker_core::scoring::MasteryBand;
    use tracker_core::time::fixed_clock;

    async fn seeded() -> (ProgressService, SubjectId) {
        let repo = Arc::new(InMemoryRepository::new());
        let math = Subject::new(
            SubjectDraft::new("Math", TaskRange::new(1, 12), TaskRange::new(13, 19))
                .with_max_points(13, 2)
                .with_max_points(19, 4),
        )
        .unwrap();
        repo.insert_subject(&math).await.unwrap();

        let clock = fixed_clock();
        let history = [
            math.record_attempt(&clock, 1, AttemptStatus::Completed, None),
            math.record_attempt(&clock, 1, AttemptStatus::Failed, None),
            math.record_attempt(&clock, 1, AttemptStatus::Completed, None),
            math.record_attempt(&clock, 2, AttemptStatus::Skipped, None),
            math.record_attempt(&clock, 13, AttemptStatus::Completed, Some(2)),
            math.record_attempt(&clock, 13, AttemptStatus::Failed, None),
            math.record_attempt(&clock, 19, AttemptStatus::Completed, Some(3)),
        ];
        for attempt in history {
            repo.append_attempt(math.id(), &attempt.unwrap()).await.unwrap();
        }

        (ProgressService::new(repo.clone(), repo), math.id().clone())
    }

    #[tokio::test]
    async fn task_stats_follow_section_rules() {
        let (service, math) = seeded().await;

        let part1 = service.task_stats(&math, 1).await.unwrap();
        assert_eq!(part1, TaskStats { percentage: 67, attempts: 3 });

        // 2 points out of 2 + 1 (binary failure counts as max 1).
        let part2 = service.task_stats(&math, 13).await.unwrap();
        assert_eq!(part2, TaskStats { percentage: 67, attempts: 2 });

        let skipped_only = service.task_stats(&math, 2).await.unwrap();
        assert_eq!(skipped_only, TaskStats::default());
    }

    #[tokio::test]
    async fn report_splits_sections() {
        let (service, math) = seeded().await;

        let report = service.subject_report(&math).await.unwrap().unwrap();

        assert_eq!(report.name, "Math");
        assert_eq!(report.part1_progress, 67);
        assert_eq!(report.part2_progress, 71);
        assert_eq!(report.progress, 70);
        let tasks: Vec<(u32, MasteryBand)> = report
            .tasks
            .iter()
            .map(|task| (task.task_number, task.band))
            .collect();
        assert_eq!(
            tasks,
            vec![
                (1, MasteryBand::Developing),
                (13, MasteryBand::Developing),
                (19, MasteryBand::Strong),
            ]
        );
    }

    #[tokio::test]
    async fn overview_counts_scored_attempts() {
        let (service, _) = seeded().await;

        let lines = service.overview().await.unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].progress, 70);
        assert_eq!(lines[0].attempted_tasks, 3);
        assert_eq!(lines[0].scored_attempts, 6);
    }

    #[tokio::test]
    async fn unknown_subject_yields_zero_defaults() {
        let (service, _) = seeded().await;
        let missing = SubjectId::new("geography");

        assert_eq!(service.subject_progress(&missing).await.unwrap(), 0);
        assert_eq!(service.task_stats(&missing, 1).await.unwrap(), TaskStats::default());
        assert!(!service.is_part2_task(&missing, 13).await.unwrap());
        assert_eq!(service.subject_report(&missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn classification_uses_current_layout() {
        let (service, math) = seeded().await;

        assert!(service.is_part2_task(&math, 13).await.unwrap());
        assert!(service.is_part2_task(&math, 19).await.unwrap());
        assert!(!service.is_part2_task(&math, 12).await.unwrap());
    }
}
