use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use storage::repository::{Storage, StorageError};
use tracing_subscriber::EnvFilter;
use tracker_core::model::{
    AttemptResult, AttemptStatus, Subject, SubjectDisplay, SubjectDraft, SubjectId, TaskAttempt,
    TaskRange,
};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    with_attempts: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("TRACKER_DB_URL").unwrap_or_else(|_| "sqlite:tracker.sqlite3".into());
        let mut with_attempts = false;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--with-attempts" => with_attempts = true,
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            with_attempts,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:tracker.sqlite3)");
    eprintln!("  --with-attempts           Append a sample attempt history to empty subjects");
    eprintln!("  --now <rfc3339>           Fixed date for the sample attempts");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TRACKER_DB_URL (same as --db), TRACKER_LOG (log filter, default: info)");
}

fn default_subjects() -> Result<Vec<Subject>, tracker_core::model::SubjectError> {
    let mut math = SubjectDraft::new("Математика", TaskRange::new(1, 12), TaskRange::new(13, 19))
        .with_display(SubjectDisplay::new("Calculator", "bg-blue-500"));
    for (task, max) in [(13, 2), (14, 2), (15, 2), (16, 3), (17, 3), (18, 4), (19, 4)] {
        math = math.with_max_points(task, max);
    }
    let russian = SubjectDraft::new("Русский язык", TaskRange::new(1, 26), TaskRange::new(27, 27))
        .with_max_points(27, 24)
        .with_display(SubjectDisplay::new("BookOpen", "bg-purple-500"));

    // stable ids instead of the Cyrillic slugs
    [("math", math), ("russian", russian)]
        .into_iter()
        .map(|(id, draft)| {
            Subject::from_persisted(
                SubjectId::new(id),
                draft.name,
                draft.part1_range,
                draft.part2_range,
                draft.part2_max_points,
                draft.display,
                false,
            )
        })
        .collect()
}

fn sample_math_attempts(date: NaiveDate) -> Vec<TaskAttempt> {
    let binary = |task, status| TaskAttempt::new(task, AttemptResult::Binary(status), date);
    let scored = |task, points, max_points| {
        TaskAttempt::new(
            task,
            AttemptResult::PartialCredit {
                status: AttemptStatus::Completed,
                points,
                max_points,
            },
            date,
        )
    };
    vec![
        binary(1, AttemptStatus::Completed),
        binary(2, AttemptStatus::Completed),
        binary(3, AttemptStatus::Failed),
        scored(13, 2, 2),
        scored(19, 2, 4),
    ]
}

/// Insert the subjects that are not stored yet and return how many were added.
///
/// Existing rows are left untouched so archive flags and display tweaks
/// survive a re-seed.
async fn seed_subjects(storage: &Storage, subjects: &[Subject]) -> Result<usize, StorageError> {
    let mut inserted = 0;
    for subject in subjects {
        match storage.subjects.insert_subject(subject).await {
            Ok(()) => {
                inserted += 1;
                tracing::info!(subject_id = %subject.id(), "seeded subject");
            }
            Err(StorageError::Conflict) => {
                tracing::info!(subject_id = %subject.id(), "subject already present, skipped");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(inserted)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let today = args.now.unwrap_or_else(Utc::now).date_naive();

    let subjects = default_subjects()?;
    let inserted = seed_subjects(&storage, &subjects).await?;

    let mut appended = 0_usize;
    if args.with_attempts {
        let math = SubjectId::new("math");
        if storage.attempts.attempts_for_subject(&math).await?.is_empty() {
            for attempt in sample_math_attempts(today) {
                storage.attempts.append_attempt(&math, &attempt).await?;
                appended += 1;
            }
        }
    }

    println!(
        "Seeded {} of {} subjects and {} attempts into {}",
        inserted,
        subjects.len(),
        appended,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TRACKER_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
