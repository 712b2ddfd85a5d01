//! Progress scoring for exam subjects.
//!
//! Everything here is a pure function of a [`Subject`] layout and a slice of
//! [`TaskAttempt`]s. Attempt order never matters: results are built from sums
//! and counts only. Empty input always yields zeros.
//!
//! ```
//! # use tracker_core::model::{AttemptStatus, Subject, SubjectDraft, TaskRange};
//! # use tracker_core::scoring::{subject_progress, task_stats};
//! # use tracker_core::time::fixed_clock;
//! let subject = Subject::new(
//!     SubjectDraft::new("Math", TaskRange::new(1, 12), TaskRange::new(13, 19))
//!         .with_max_points(13, 2),
//! )?;
//! let clock = fixed_clock();
//! let attempts = vec![
//!     subject.record_attempt(&clock, 1, AttemptStatus::Completed, None)?,
//!     subject.record_attempt(&clock, 13, AttemptStatus::Completed, Some(1))?,
//! ];
//!
//! assert_eq!(task_stats(&subject, &attempts, 13).percentage, 50);
//! assert_eq!(subject_progress(&subject, &attempts), 75);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{AttemptResult, AttemptStatus, Subject, TaskAttempt, TaskSection};

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

/// Score of a single task.
///
/// `{ percentage: 0, attempts: 0 }` means "no data"; a task attempted and
/// always failed reports `percentage: 0` with a non-zero `attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskStats {
    pub percentage: u8,
    pub attempts: u32,
}

/// Coarse label for a percentage, used when listing tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryBand {
    /// 70% and above.
    Strong,
    /// 40% up to 69%.
    Developing,
    /// Below 40%.
    Weak,
}

impl MasteryBand {
    #[must_use]
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            70.. => MasteryBand::Strong,
            40..=69 => MasteryBand::Developing,
            _ => MasteryBand::Weak,
        }
    }
}

/// A task with at least one scored attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub task_number: u32,
    pub section: TaskSection,
    pub stats: TaskStats,
    pub band: MasteryBand,
}

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

/// True iff the task number lies in the subject's part 2 range.
///
/// Part 2 wins when the ranges overlap.
#[must_use]
pub fn is_part2_task(subject: &Subject, task_number: u32) -> bool {
    subject.part2_range().contains(task_number)
}

#[must_use]
pub fn section_of(subject: &Subject, task_number: u32) -> TaskSection {
    if is_part2_task(subject, task_number) {
        TaskSection::Part2
    } else {
        TaskSection::Part1
    }
}

/// Part 1 numbers followed by part 2 numbers.
///
/// Numbers covered by both ranges appear twice.
#[must_use]
pub fn task_numbers(subject: &Subject) -> Vec<u32> {
    subject
        .part1_range()
        .iter()
        .chain(subject.part2_range().iter())
        .collect()
}

//
// ─── TASK LEVEL ────────────────────────────────────────────────────────────────
//

/// Score one task from the non-skipped attempts recorded for it.
///
/// Part 2 tasks score earned points over possible points; part 1 tasks score
/// completed attempts over all scored attempts.
#[must_use]
pub fn task_stats(subject: &Subject, attempts: &[TaskAttempt], task_number: u32) -> TaskStats {
    let scored: Vec<&TaskAttempt> = attempts
        .iter()
        .filter(|attempt| attempt.task_number() == task_number && !attempt.is_skipped())
        .collect();
    stats_of(subject, task_number, &scored)
}

/// `scored` holds only non-skipped attempts of `task_number`.
fn stats_of(subject: &Subject, task_number: u32, scored: &[&TaskAttempt]) -> TaskStats {
    if scored.is_empty() {
        return TaskStats::default();
    }

    let (earned, possible) = if is_part2_task(subject, task_number) {
        scored.iter().fold((0_u64, 0_u64), |(earned, possible), attempt| {
            let (points, max_points) = credit(attempt.result());
            (earned + points, possible + max_points)
        })
    } else {
        let completed = scored
            .iter()
            .filter(|attempt| attempt.status() == AttemptStatus::Completed)
            .count();
        (completed as u64, scored.len() as u64)
    };

    TaskStats {
        percentage: rounded_percentage(earned, possible),
        attempts: u32::try_from(scored.len()).unwrap_or(u32::MAX),
    }
}

/// Points earned and points possible for one part 2 attempt.
///
/// Binary attempts are worth 0 of 1. A stored maximum of 0 counts as 1 and
/// points above the maximum are capped.
fn credit(result: &AttemptResult) -> (u64, u64) {
    match result {
        AttemptResult::Binary(_) => (0, 1),
        AttemptResult::PartialCredit {
            points, max_points, ..
        } => {
            let max_points = (*max_points).max(1);
            (u64::from((*points).min(max_points)), u64::from(max_points))
        }
        AttemptResult::Unscored { max_points, .. } => (0, u64::from((*max_points).max(1))),
    }
}

/// Non-skipped attempts keyed by task number.
fn scored_by_task(attempts: &[TaskAttempt]) -> BTreeMap<u32, Vec<&TaskAttempt>> {
    let mut grouped: BTreeMap<u32, Vec<&TaskAttempt>> = BTreeMap::new();
    for attempt in attempts.iter().filter(|attempt| !attempt.is_skipped()) {
        grouped.entry(attempt.task_number()).or_default().push(attempt);
    }
    grouped
}

//
// ─── AGGREGATES ────────────────────────────────────────────────────────────────
//

/// Mean score over every task of the subject that has been attempted.
///
/// Unattempted tasks are left out rather than counted as 0. A number covered
/// by both ranges is weighted twice. Returns 0 when nothing has been attempted.
#[must_use]
pub fn subject_progress(subject: &Subject, attempts: &[TaskAttempt]) -> u8 {
    let (part1, part2) = (subject.part1_range(), subject.part2_range());
    mean_of_attempted(subject, attempts, |task_number| {
        u64::from(part1.contains(task_number)) + u64::from(part2.contains(task_number))
    })
}

/// [`subject_progress`] restricted to the numbers of one range.
#[must_use]
pub fn section_progress(subject: &Subject, attempts: &[TaskAttempt], section: TaskSection) -> u8 {
    let range = match section {
        TaskSection::Part1 => subject.part1_range(),
        TaskSection::Part2 => subject.part2_range(),
    };
    mean_of_attempted(subject, attempts, |task_number| {
        u64::from(range.contains(task_number))
    })
}

/// Every distinct task number with at least one scored attempt, in layout order.
///
/// Part 1 numbers come first, then the part 2 numbers not already listed.
#[must_use]
pub fn attempted_tasks(subject: &Subject, attempts: &[TaskAttempt]) -> Vec<TaskSummary> {
    let grouped = scored_by_task(attempts);
    let (part1, part2) = (subject.part1_range(), subject.part2_range());
    let in_part1 = grouped.iter().filter(|(n, _)| part1.contains(**n));
    let only_part2 = grouped
        .iter()
        .filter(|(n, _)| !part1.contains(**n) && part2.contains(**n));

    in_part1
        .chain(only_part2)
        .map(|(&task_number, scored)| {
            let stats = stats_of(subject, task_number, scored);
            TaskSummary {
                task_number,
                section: section_of(subject, task_number),
                stats,
                band: MasteryBand::from_percentage(stats.percentage),
            }
        })
        .collect()
}

/// Weighted mean of the task percentages; `weight` is 0 for numbers outside
/// the aggregate.
fn mean_of_attempted(
    subject: &Subject,
    attempts: &[TaskAttempt],
    weight: impl Fn(u32) -> u64,
) -> u8 {
    let (sum, count) = scored_by_task(attempts).iter().fold(
        (0_u64, 0_u64),
        |(sum, count), (&task_number, scored)| {
            let weight = weight(task_number);
            if weight == 0 {
                return (sum, count);
            }
            let stats = stats_of(subject, task_number, scored);
            (sum + weight * u64::from(stats.percentage), count + weight)
        },
    );

    if count == 0 {
        return 0;
    }
    rounded_percentage(sum, count * 100)
}

/// `round(100 * part / whole)`, halves rounded up, capped at 100.
///
/// `whole` must be non-zero.
fn rounded_percentage(part: u64, whole: u64) -> u8 {
    let scaled = (200 * part + whole) / (2 * whole);
    u8::try_from(scaled.min(100)).unwrap_or(100)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SubjectDraft, TaskRange, record_attempt};
    use crate::time::fixed_clock;
    use chrono::NaiveDate;

    fn math() -> Subject {
        Subject::new(
            SubjectDraft::new("Математика", TaskRange::new(1, 12), TaskRange::new(13, 19))
                .with_max_points(13, 2)
                .with_max_points(14, 2)
                .with_max_points(15, 2)
                .with_max_points(16, 3)
                .with_max_points(17, 3)
                .with_max_points(18, 4)
                .with_max_points(19, 4),
        )
        .unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()
    }

    fn binary(task_number: u32, status: AttemptStatus) -> TaskAttempt {
        TaskAttempt::new(task_number, AttemptResult::Binary(status), day())
    }

    fn scored(task_number: u32, points: u32, max_points: u32) -> TaskAttempt {
        TaskAttempt::new(
            task_number,
            AttemptResult::PartialCredit {
                status: AttemptStatus::Completed,
                points,
                max_points,
            },
            day(),
        )
    }

    #[test]
    fn part2_membership_is_inclusive() {
        let subject = math();
        assert!(!is_part2_task(&subject, 12));
        assert!(is_part2_task(&subject, 13));
        assert!(is_part2_task(&subject, 19));
        assert!(!is_part2_task(&subject, 20));
    }

    #[test]
    fn part2_wins_when_ranges_overlap() {
        let subject = Subject::new(SubjectDraft::new(
            "Overlap",
            TaskRange::new(1, 10),
            TaskRange::new(9, 12),
        ))
        .unwrap();
        assert_eq!(section_of(&subject, 8), TaskSection::Part1);
        assert_eq!(section_of(&subject, 9), TaskSection::Part2);
        assert_eq!(task_numbers(&subject).iter().filter(|n| **n == 10).count(), 2);
    }

    #[test]
    fn no_attempts_yields_zero_stats() {
        assert_eq!(task_stats(&math(), &[], 1), TaskStats::default());
    }

    #[test]
    fn all_skipped_is_the_same_as_no_attempts() {
        let attempts = vec![
            binary(3, AttemptStatus::Skipped),
            binary(3, AttemptStatus::Skipped),
        ];
        assert_eq!(task_stats(&math(), &attempts, 3), TaskStats::default());
    }

    #[test]
    fn part1_counts_failed_but_not_skipped() {
        let attempts = vec![
            binary(2, AttemptStatus::Completed),
            binary(2, AttemptStatus::Failed),
            binary(2, AttemptStatus::Skipped),
            binary(2, AttemptStatus::Completed),
            binary(5, AttemptStatus::Failed),
        ];
        assert_eq!(
            task_stats(&math(), &attempts, 2),
            TaskStats {
                percentage: 67,
                attempts: 3
            }
        );
    }

    #[test]
    fn part2_sums_points_over_maximums() {
        let attempts = vec![scored(14, 2, 2), scored(14, 0, 2)];
        assert_eq!(
            task_stats(&math(), &attempts, 14),
            TaskStats {
                percentage: 50,
                attempts: 2
            }
        );
    }

    #[test]
    fn part2_failed_attempt_without_points_counts_as_zero_of_one() {
        let attempts = vec![scored(18, 4, 4), binary(18, AttemptStatus::Failed)];
        // 4 / (4 + 1)
        assert_eq!(task_stats(&math(), &attempts, 18).percentage, 80);
    }

    #[test]
    fn stored_history_keeps_its_own_maximum() {
        // maximum for 16 is 3 today; the old attempt was scored out of 5
        let attempts = vec![scored(16, 5, 5), scored(16, 0, 3)];
        assert_eq!(task_stats(&math(), &attempts, 16).percentage, 63);
    }

    #[test]
    fn out_of_range_history_stays_within_bounds() {
        let attempts = vec![scored(13, 9, 2), scored(13, 1, 0)];
        let stats = task_stats(&math(), &attempts, 13);
        // capped to 2/2 and 1/1
        assert_eq!(stats.percentage, 100);
        assert_eq!(stats.attempts, 2);
    }

    #[test]
    fn rounding_is_half_up() {
        let attempts: Vec<TaskAttempt> = std::iter::once(binary(1, AttemptStatus::Completed))
            .chain((0..7).map(|_| binary(1, AttemptStatus::Failed)))
            .collect();
        // 1/8 = 12.5%
        assert_eq!(task_stats(&math(), &attempts, 1).percentage, 13);
    }

    #[test]
    fn recorded_attempt_round_trips_into_stats() {
        let attempt =
            record_attempt(&fixed_clock(), 17, AttemptStatus::Completed, Some(3), Some(4)).unwrap();
        assert_eq!(
            task_stats(&math(), &[attempt], 17),
            TaskStats {
                percentage: 75,
                attempts: 1
            }
        );
    }

    #[test]
    fn subject_progress_ignores_unattempted_tasks() {
        let attempts = vec![binary(1, AttemptStatus::Completed)];
        assert_eq!(subject_progress(&math(), &attempts), 100);
    }

    #[test]
    fn subject_progress_is_zero_without_attempts() {
        assert_eq!(subject_progress(&math(), &[]), 0);
        let skipped = vec![binary(4, AttemptStatus::Skipped)];
        assert_eq!(subject_progress(&math(), &skipped), 0);
    }

    #[test]
    fn subject_progress_averages_task_percentages() {
        let attempts = vec![
            binary(1, AttemptStatus::Completed),
            binary(2, AttemptStatus::Completed),
            binary(3, AttemptStatus::Failed),
            scored(13, 2, 2),
            scored(19, 2, 4),
        ];
        // (100 + 100 + 0 + 100 + 50) / 5
        assert_eq!(subject_progress(&math(), &attempts), 70);
    }

    #[test]
    fn subject_progress_weights_overlapping_numbers_twice() {
        let subject = Subject::new(SubjectDraft::new(
            "Overlap",
            TaskRange::new(1, 2),
            TaskRange::new(2, 3),
        ))
        .unwrap();
        let attempts = vec![binary(1, AttemptStatus::Completed), scored(2, 0, 1)];
        // task 1 at 100 once, task 2 at 0 twice
        assert_eq!(subject_progress(&subject, &attempts), 33);
    }

    #[test]
    fn section_progress_splits_by_range() {
        let attempts = vec![
            binary(1, AttemptStatus::Completed),
            binary(2, AttemptStatus::Failed),
            scored(13, 1, 2),
        ];
        let subject = math();
        assert_eq!(section_progress(&subject, &attempts, TaskSection::Part1), 50);
        assert_eq!(section_progress(&subject, &attempts, TaskSection::Part2), 50);
        assert_eq!(section_progress(&subject, &[], TaskSection::Part2), 0);
    }

    #[test]
    fn attempted_tasks_lists_scored_tasks_in_order() {
        let attempts = vec![
            scored(19, 1, 4),
            binary(3, AttemptStatus::Completed),
            binary(5, AttemptStatus::Skipped),
            binary(7, AttemptStatus::Failed),
            binary(7, AttemptStatus::Completed),
        ];
        let listed = attempted_tasks(&math(), &attempts);

        let numbers: Vec<u32> = listed.iter().map(|t| t.task_number).collect();
        assert_eq!(numbers, vec![3, 7, 19]);
        assert_eq!(listed[0].band, MasteryBand::Strong);
        assert_eq!(listed[1].band, MasteryBand::Developing);
        assert_eq!(listed[2].band, MasteryBand::Weak);
        assert_eq!(listed[2].section, TaskSection::Part2);
    }

    #[test]
    fn stored_maximum_without_points_counts_in_denominator() {
        let json = r#"[
            {"taskNumber":18,"status":"completed","points":4,"maxPoints":4,"date":"2025-10-16"},
            {"taskNumber":18,"status":"failed","maxPoints":4,"date":"2025-10-16"}
        ]"#;
        let attempts: Vec<TaskAttempt> = serde_json::from_str(json).unwrap();
        // 4 / (4 + 4)
        assert_eq!(
            task_stats(&math(), &attempts, 18),
            TaskStats {
                percentage: 50,
                attempts: 2
            }
        );
    }

    #[test]
    fn wide_ranges_score_only_attempted_numbers() {
        let subject = Subject::new(SubjectDraft::new(
            "Marathon",
            TaskRange::new(1, u32::MAX),
            TaskRange::new(u32::MAX - 1, u32::MAX),
        ))
        .unwrap();
        let attempts = vec![
            binary(7, AttemptStatus::Completed),
            scored(u32::MAX, 0, 2),
        ];

        // task 7 at 100 once, the last number at 0 in both ranges
        assert_eq!(subject_progress(&subject, &attempts), 33);
        assert_eq!(section_progress(&subject, &attempts, TaskSection::Part1), 50);
        assert_eq!(section_progress(&subject, &attempts, TaskSection::Part2), 0);
        let numbers: Vec<u32> = attempted_tasks(&subject, &attempts)
            .iter()
            .map(|t| t.task_number)
            .collect();
        assert_eq!(numbers, vec![7, u32::MAX]);
    }

    #[test]
    fn attempts_outside_the_layout_are_ignored() {
        let attempts = vec![binary(1, AttemptStatus::Completed), binary(40, AttemptStatus::Failed)];
        assert_eq!(subject_progress(&math(), &attempts), 100);
        assert_eq!(attempted_tasks(&math(), &attempts).len(), 1);
    }

    #[test]
    fn mastery_band_thresholds() {
        assert_eq!(MasteryBand::from_percentage(100), MasteryBand::Strong);
        assert_eq!(MasteryBand::from_percentage(70), MasteryBand::Strong);
        assert_eq!(MasteryBand::from_percentage(69), MasteryBand::Developing);
        assert_eq!(MasteryBand::from_percentage(40), MasteryBand::Developing);
        assert_eq!(MasteryBand::from_percentage(39), MasteryBand::Weak);
        assert_eq!(MasteryBand::from_percentage(0), MasteryBand::Weak);
    }

    #[test]
    fn scoring_is_idempotent_and_order_independent() {
        let subject = math();
        let mut attempts = vec![
            binary(1, AttemptStatus::Completed),
            binary(1, AttemptStatus::Failed),
            scored(15, 1, 2),
            binary(6, AttemptStatus::Completed),
        ];
        let first = (task_stats(&subject, &attempts, 1), subject_progress(&subject, &attempts));
        let second = (task_stats(&subject, &attempts, 1), subject_progress(&subject, &attempts));
        assert_eq!(first, second);

        attempts.reverse();
        let reversed = (task_stats(&subject, &attempts, 1), subject_progress(&subject, &attempts));
        assert_eq!(first, reversed);
    }

    #[test]
    fn percentages_stay_within_bounds() {
        let subject = math();
        let attempts: Vec<TaskAttempt> = (1..=19)
            .flat_map(|n| {
                [
                    binary(n, AttemptStatus::Completed),
                    binary(n, AttemptStatus::Failed),
                    scored(n, n, 3),
                ]
            })
            .collect();
        for n in task_numbers(&subject) {
            let stats = task_stats(&subject, &attempts, n);
            assert!(stats.percentage <= 100);
            assert_eq!(stats.attempts, 3);
        }
        assert!(subject_progress(&subject, &attempts) <= 100);
    }
}
