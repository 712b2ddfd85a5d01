use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::attempt::{AttemptError, AttemptStatus, TaskAttempt, record_attempt};
use crate::model::ids::SubjectId;
use crate::scoring;
use crate::time::Clock;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,

    #[error("subject id cannot be empty")]
    EmptyId,

    #[error("{section} range is inverted: {from} > {to}")]
    InvertedRange {
        section: TaskSection,
        from: u32,
        to: u32,
    },

    #[error("max points configured for task {task_number}, which is outside part 2")]
    MaxPointsOutsideRange { task_number: u32 },

    #[error("max points for task {task_number} must be at least 1")]
    ZeroMaxPoints { task_number: u32 },
}

//
// ─── SECTIONS & RANGES ─────────────────────────────────────────────────────────
//

/// The two scoring modes of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSection {
    /// Binary tasks: solved or not solved.
    Part1,
    /// Partial-credit tasks: earned points over a configured maximum.
    Part2,
}

impl fmt::Display for TaskSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskSection::Part1 => write!(f, "part 1"),
            TaskSection::Part2 => write!(f, "part 2"),
        }
    }
}

/// Inclusive range of task numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRange {
    pub from: u32,
    pub to: u32,
}

impl TaskRange {
    #[must_use]
    pub fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub fn contains(&self, task_number: u32) -> bool {
        (self.from..=self.to).contains(&task_number)
    }

    /// Task numbers in ascending order. Empty when the range is inverted.
    #[must_use]
    pub fn iter(&self) -> RangeInclusive<u32> {
        self.from..=self.to
    }

    #[must_use]
    pub fn len(&self) -> usize {
        if self.from > self.to {
            0
        } else {
            (self.to - self.from) as usize + 1
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//
// ─── DISPLAY METADATA ──────────────────────────────────────────────────────────
//

pub const DEFAULT_ICON: &str = "BookOpen";
pub const DEFAULT_COLOR: &str = "bg-blue-500";

/// Presentation hints owned by the UI. Never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDisplay {
    pub icon: String,
    pub color: String,
}

impl SubjectDisplay {
    #[must_use]
    pub fn new(icon: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            icon: icon.into(),
            color: color.into(),
        }
    }
}

impl Default for SubjectDisplay {
    fn default() -> Self {
        Self::new(DEFAULT_ICON, DEFAULT_COLOR)
    }
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// Input for defining a new subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDraft {
    pub name: String,
    pub part1_range: TaskRange,
    pub part2_range: TaskRange,
    pub part2_max_points: BTreeMap<u32, u32>,
    pub display: SubjectDisplay,
}

impl SubjectDraft {
    #[must_use]
    pub fn new(name: impl Into<String>, part1_range: TaskRange, part2_range: TaskRange) -> Self {
        Self {
            name: name.into(),
            part1_range,
            part2_range,
            part2_max_points: BTreeMap::new(),
            display: SubjectDisplay::default(),
        }
    }

    #[must_use]
    pub fn with_max_points(mut self, task_number: u32, max_points: u32) -> Self {
        self.part2_max_points.insert(task_number, max_points);
        self
    }

    #[must_use]
    pub fn with_display(mut self, display: SubjectDisplay) -> Self {
        self.display = display;
        self
    }
}

/// One exam subject and the task layout it is scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SubjectRecord")]
pub struct Subject {
    id: SubjectId,
    name: String,
    part1_range: TaskRange,
    part2_range: TaskRange,
    part2_max_points: BTreeMap<u32, u32>,
    #[serde(flatten)]
    display: SubjectDisplay,
    archived: bool,
}

impl Subject {
    /// Define a new, active subject. The id is slugged from the name.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if the name is blank, a range is inverted, or
    /// the max-points table has entries outside part 2 or below 1.
    pub fn new(draft: SubjectDraft) -> Result<Self, SubjectError> {
        let name = draft.name.trim().to_owned();
        let id = SubjectId::from_name(&name);
        Self::from_persisted(
            id,
            name,
            draft.part1_range,
            draft.part2_range,
            draft.part2_max_points,
            draft.display,
            false,
        )
    }

    /// Rehydrate a subject from storage or the wire.
    ///
    /// # Errors
    ///
    /// Same validation as [`Subject::new`], plus `SubjectError::EmptyId`.
    pub fn from_persisted(
        id: SubjectId,
        name: impl Into<String>,
        part1_range: TaskRange,
        part2_range: TaskRange,
        part2_max_points: BTreeMap<u32, u32>,
        display: SubjectDisplay,
        archived: bool,
    ) -> Result<Self, SubjectError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(SubjectError::EmptyName);
        }
        if id.as_str().trim().is_empty() {
            return Err(SubjectError::EmptyId);
        }
        for (section, range) in [
            (TaskSection::Part1, part1_range),
            (TaskSection::Part2, part2_range),
        ] {
            if range.from > range.to {
                return Err(SubjectError::InvertedRange {
                    section,
                    from: range.from,
                    to: range.to,
                });
            }
        }
        for (&task_number, &max_points) in &part2_max_points {
            if !part2_range.contains(task_number) {
                return Err(SubjectError::MaxPointsOutsideRange { task_number });
            }
            if max_points == 0 {
                return Err(SubjectError::ZeroMaxPoints { task_number });
            }
        }

        Ok(Self {
            id,
            name,
            part1_range,
            part2_range,
            part2_max_points,
            display,
            archived,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn part1_range(&self) -> TaskRange {
        self.part1_range
    }

    #[must_use]
    pub fn part2_range(&self) -> TaskRange {
        self.part2_range
    }

    #[must_use]
    pub fn part2_max_points(&self) -> &BTreeMap<u32, u32> {
        &self.part2_max_points
    }

    #[must_use]
    pub fn display(&self) -> &SubjectDisplay {
        &self.display
    }

    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.archived
    }

    pub fn set_archived(&mut self, archived: bool) {
        self.archived = archived;
    }

    /// Flip between active and archived; returns the new archived flag.
    pub fn toggle_archived(&mut self) -> bool {
        self.archived = !self.archived;
        self.archived
    }

    /// Maximum points of a part 2 task; 1 when not configured.
    #[must_use]
    pub fn max_points_for(&self, task_number: u32) -> u32 {
        self.part2_max_points
            .get(&task_number)
            .copied()
            .unwrap_or(1)
    }

    /// True if the task number belongs to either range.
    #[must_use]
    pub fn contains_task(&self, task_number: u32) -> bool {
        self.part1_range.contains(task_number) || self.part2_range.contains(task_number)
    }

    /// Record an attempt, choosing the scoring mode from the current layout.
    ///
    /// A completed part 2 attempt carries `points` out of the configured
    /// maximum. Everything else is recorded as binary and `points` is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::TaskOutsideSubject` for unknown task numbers,
    /// `AttemptError::MissingPoints` for a completed part 2 attempt without
    /// points, and `AttemptError::PointsExceedMax` when points are too high.
    pub fn record_attempt(
        &self,
        clock: &Clock,
        task_number: u32,
        status: AttemptStatus,
        points: Option<u32>,
    ) -> Result<TaskAttempt, AttemptError> {
        if !self.contains_task(task_number) {
            return Err(AttemptError::TaskOutsideSubject { task_number });
        }

        if scoring::is_part2_task(self, task_number) && status == AttemptStatus::Completed {
            let points = points.ok_or(AttemptError::MissingPoints { task_number })?;
            let max_points = self.max_points_for(task_number);
            return record_attempt(clock, task_number, status, Some(points), Some(max_points));
        }

        record_attempt(clock, task_number, status, None, None)
    }
}

/// Wire shape accepted when deserializing a [`Subject`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectRecord {
    id: SubjectId,
    name: String,
    part1_range: TaskRange,
    part2_range: TaskRange,
    #[serde(default)]
    part2_max_points: BTreeMap<u32, u32>,
    #[serde(default = "default_icon")]
    icon: String,
    #[serde(default = "default_color")]
    color: String,
    #[serde(default)]
    archived: bool,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_owned()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_owned()
}

impl TryFrom<SubjectRecord> for Subject {
    type Error = SubjectError;

    fn try_from(record: SubjectRecord) -> Result<Self, Self::Error> {
        Subject::from_persisted(
            record.id,
            record.name,
            record.part1_range,
            record.part2_range,
            record.part2_max_points,
            SubjectDisplay::new(record.icon, record.color),
            record.archived,
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttemptResult;
    use crate::time::fixed_clock;

    fn math_draft() -> SubjectDraft {
        SubjectDraft::new("Математика", TaskRange::new(1, 12), TaskRange::new(13, 19))
            .with_max_points(13, 2)
            .with_max_points(16, 3)
            .with_max_points(19, 4)
    }

    #[test]
    fn new_subject_slugs_id_and_starts_active() {
        let subject = Subject::new(
            SubjectDraft::new("  Computer Science ", TaskRange::new(1, 3), TaskRange::new(4, 5)),
        )
        .unwrap();

        assert_eq!(subject.id().as_str(), "computer-science");
        assert_eq!(subject.name(), "Computer Science");
        assert!(!subject.is_archived());
        assert_eq!(subject.display(), &SubjectDisplay::default());
    }

    #[test]
    fn rejects_blank_name() {
        let err = Subject::new(SubjectDraft::new(
            "   ",
            TaskRange::new(1, 2),
            TaskRange::new(3, 4),
        ))
        .unwrap_err();
        assert_eq!(err, SubjectError::EmptyName);
    }

    #[test]
    fn rejects_inverted_ranges() {
        let err = Subject::new(SubjectDraft::new(
            "Physics",
            TaskRange::new(1, 20),
            TaskRange::new(26, 21),
        ))
        .unwrap_err();
        assert_eq!(
            err,
            SubjectError::InvertedRange {
                section: TaskSection::Part2,
                from: 26,
                to: 21
            }
        );
    }

    #[test]
    fn rejects_bad_max_points_table() {
        let outside = Subject::new(math_draft().with_max_points(5, 2)).unwrap_err();
        assert_eq!(outside, SubjectError::MaxPointsOutsideRange { task_number: 5 });

        let zero = Subject::new(math_draft().with_max_points(14, 0)).unwrap_err();
        assert_eq!(zero, SubjectError::ZeroMaxPoints { task_number: 14 });
    }

    #[test]
    fn overlapping_ranges_are_allowed() {
        let subject = Subject::new(SubjectDraft::new(
            "Overlap",
            TaskRange::new(1, 10),
            TaskRange::new(8, 12),
        ))
        .unwrap();
        assert!(subject.contains_task(9));
    }

    #[test]
    fn max_points_default_to_one() {
        let subject = Subject::new(math_draft()).unwrap();
        assert_eq!(subject.max_points_for(16), 3);
        assert_eq!(subject.max_points_for(17), 1);
    }

    #[test]
    fn toggle_archived_is_reversible() {
        let mut subject = Subject::new(math_draft()).unwrap();
        assert!(subject.toggle_archived());
        assert!(subject.is_archived());
        assert!(!subject.toggle_archived());
        assert!(!subject.is_archived());
    }

    #[test]
    fn record_attempt_uses_configured_maximum_for_part2() {
        let subject = Subject::new(math_draft()).unwrap();
        let attempt = subject
            .record_attempt(&fixed_clock(), 19, AttemptStatus::Completed, Some(3))
            .unwrap();

        assert_eq!(
            attempt.result(),
            &AttemptResult::PartialCredit {
                status: AttemptStatus::Completed,
                points: 3,
                max_points: 4
            }
        );
    }

    #[test]
    fn record_attempt_drops_points_outside_completed_part2() {
        let subject = Subject::new(math_draft()).unwrap();
        let clock = fixed_clock();

        let part1 = subject
            .record_attempt(&clock, 3, AttemptStatus::Completed, Some(1))
            .unwrap();
        assert_eq!(part1.result(), &AttemptResult::Binary(AttemptStatus::Completed));

        let skipped = subject
            .record_attempt(&clock, 13, AttemptStatus::Skipped, Some(2))
            .unwrap();
        assert_eq!(skipped.result(), &AttemptResult::Binary(AttemptStatus::Skipped));
    }

    #[test]
    fn record_attempt_validates_task_and_points() {
        let subject = Subject::new(math_draft()).unwrap();
        let clock = fixed_clock();

        let err = subject
            .record_attempt(&clock, 40, AttemptStatus::Failed, None)
            .unwrap_err();
        assert_eq!(err, AttemptError::TaskOutsideSubject { task_number: 40 });

        let err = subject
            .record_attempt(&clock, 13, AttemptStatus::Completed, None)
            .unwrap_err();
        assert_eq!(err, AttemptError::MissingPoints { task_number: 13 });

        let err = subject
            .record_attempt(&clock, 13, AttemptStatus::Completed, Some(3))
            .unwrap_err();
        assert_eq!(
            err,
            AttemptError::PointsExceedMax {
                task_number: 13,
                points: 3,
                max_points: 2
            }
        );
    }

    #[test]
    fn deserializes_collaborator_payload() {
        let json = r#"{
            "id": "russian",
            "name": "Русский язык",
            "part1Range": {"from": 1, "to": 26},
            "part2Range": {"from": 27, "to": 27},
            "part2MaxPoints": {"27": 24},
            "icon": "BookOpen",
            "color": "bg-purple-500"
        }"#;

        let subject: Subject = serde_json::from_str(json).unwrap();
        assert_eq!(subject.id().as_str(), "russian");
        assert_eq!(subject.max_points_for(27), 24);
        assert_eq!(subject.display().color, "bg-purple-500");
        assert!(!subject.is_archived());
    }

    #[test]
    fn serializes_with_flat_display_fields() {
        let subject = Subject::new(math_draft()).unwrap();
        let value = serde_json::to_value(&subject).unwrap();

        assert_eq!(value["part1Range"]["to"], 12);
        assert_eq!(value["part2MaxPoints"]["19"], 4);
        assert_eq!(value["icon"], DEFAULT_ICON);
        assert_eq!(value["archived"], false);
    }

    #[test]
    fn deserialize_rejects_invalid_layout() {
        let json = r#"{
            "id": "x",
            "name": "X",
            "part1Range": {"from": 5, "to": 1},
            "part2Range": {"from": 6, "to": 7}
        }"#;
        assert!(serde_json::from_str::<Subject>(json).is_err());
    }
}
