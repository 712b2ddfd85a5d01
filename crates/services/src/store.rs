//! Synchronous in-memory application state.
//!
//! `TrackerStore` owns the subject list, the attempt history of each subject
//! and the task currently selected in each subject. Every mutation goes
//! through a method so the cascade rules stay in one place.

use std::collections::HashMap;

use tracker_core::model::{AttemptStatus, Subject, SubjectDraft, SubjectId, TaskAttempt};
use tracker_core::scoring::{self, TaskStats};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::Clock;

#[derive(Debug, Clone, Default)]
pub struct TrackerStore {
    clock: Clock,
    subjects: Vec<Subject>,
    attempts: HashMap<SubjectId, Vec<TaskAttempt>>,
    selected: HashMap<SubjectId, u32>,
}

impl TrackerStore {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    /// Rebuild a store from persisted data. Attempts of unknown subjects are dropped.
    #[must_use]
    pub fn from_snapshot(
        clock: Clock,
        subjects: Vec<Subject>,
        mut attempts: HashMap<SubjectId, Vec<TaskAttempt>>,
    ) -> Self {
        attempts.retain(|id, _| subjects.iter().any(|subject| subject.id() == id));
        Self {
            clock,
            subjects,
            attempts,
            selected: HashMap::new(),
        }
    }

    //
    // ─── SUBJECTS ──────────────────────────────────────────────────────────────
    //

    /// Validate and append a new active subject.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Subject` for an invalid draft and
    /// `StoreError::DuplicateId` when the name slug is already taken.
    pub fn add_subject(&mut self, draft: SubjectDraft) -> Result<&Subject, StoreError> {
        let subject = Subject::new(draft)?;
        if self.subject(subject.id()).is_some() {
            return Err(StoreError::DuplicateId(subject.id().clone()));
        }
        info!(subject = %subject.id(), "subject added");
        self.subjects.push(subject);
        let index = self.subjects.len() - 1;
        Ok(&self.subjects[index])
    }

    /// Flip the archived flag; returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownSubject` if the id is not present.
    pub fn toggle_archived(&mut self, id: &SubjectId) -> Result<bool, StoreError> {
        let subject = self
            .subjects
            .iter_mut()
            .find(|subject| subject.id() == id)
            .ok_or_else(|| StoreError::UnknownSubject(id.clone()))?;
        let archived = subject.toggle_archived();
        info!(subject = %id, archived, "subject archive flag toggled");
        Ok(archived)
    }

    /// Remove a subject, its attempts and its selection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownSubject` if the id is not present.
    pub fn delete_subject(&mut self, id: &SubjectId) -> Result<Subject, StoreError> {
        let index = self
            .subjects
            .iter()
            .position(|subject| subject.id() == id)
            .ok_or_else(|| StoreError::UnknownSubject(id.clone()))?;
        let removed = self.subjects.remove(index);
        self.attempts.remove(id);
        self.selected.remove(id);
        info!(subject = %id, "subject deleted");
        Ok(removed)
    }

    #[must_use]
    pub fn subject(&self, id: &SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.id() == id)
    }

    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn active_subjects(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter().filter(|subject| !subject.is_archived())
    }

    pub fn archived_subjects(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter().filter(|subject| subject.is_archived())
    }

    //
    // ─── SELECTION ─────────────────────────────────────────────────────────────
    //

    /// Select a task, or clear the selection when it is already selected.
    ///
    /// Returns the selection after the toggle.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownSubject` if the id is not present.
    pub fn select_task(&mut self, id: &SubjectId, task_number: u32) -> Result<Option<u32>, StoreError> {
        if self.subject(id).is_none() {
            return Err(StoreError::UnknownSubject(id.clone()));
        }
        if self.selected.get(id) == Some(&task_number) {
            self.selected.remove(id);
            return Ok(None);
        }
        self.selected.insert(id.clone(), task_number);
        Ok(Some(task_number))
    }

    #[must_use]
    pub fn selected_task(&self, id: &SubjectId) -> Option<u32> {
        self.selected.get(id).copied()
    }

    //
    // ─── ATTEMPTS ──────────────────────────────────────────────────────────────
    //

    /// Record an attempt dated today and clear the subject's selection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownSubject` if the id is not present and
    /// `StoreError::Attempt` when the attempt fails validation. A rejected
    /// attempt leaves the selection untouched.
    pub fn save_attempt(
        &mut self,
        id: &SubjectId,
        task_number: u32,
        status: AttemptStatus,
        points: Option<u32>,
    ) -> Result<&TaskAttempt, StoreError> {
        let subject = self
            .subject(id)
            .ok_or_else(|| StoreError::UnknownSubject(id.clone()))?;
        let attempt = subject.record_attempt(&self.clock, task_number, status, points)?;

        info!(subject = %id, task = task_number, status = %status, "attempt saved");
        self.selected.remove(id);
        let history = self.attempts.entry(id.clone()).or_default();
        history.push(attempt);
        let index = history.len() - 1;
        Ok(&history[index])
    }

    /// Attempt history of a subject, oldest first; empty for unknown ids.
    #[must_use]
    pub fn attempts(&self, id: &SubjectId) -> &[TaskAttempt] {
        self.attempts.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    //
    // ─── SCORES ────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn task_stats(&self, id: &SubjectId, task_number: u32) -> TaskStats {
        match self.known_subject(id) {
            Some(subject) => scoring::task_stats(subject, self.attempts(id), task_number),
            None => TaskStats::default(),
        }
    }

    #[must_use]
    pub fn subject_progress(&self, id: &SubjectId) -> u8 {
        match self.known_subject(id) {
            Some(subject) => scoring::subject_progress(subject, self.attempts(id)),
            None => 0,
        }
    }

    #[must_use]
    pub fn is_part2_task(&self, id: &SubjectId, task_number: u32) -> bool {
        self.known_subject(id)
            .is_some_and(|subject| scoring::is_part2_task(subject, task_number))
    }

    fn known_subject(&self, id: &SubjectId) -> Option<&Subject> {
        let subject = self.subject(id);
        if subject.is_none() {
            warn!(subject = %id, "score requested for unknown subject");
        }
        subject
    }
}
