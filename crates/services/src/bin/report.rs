use std::fmt;

use services::{AppServices, Clock, SubjectOverview, SubjectReport, TrackerConfig};
use tracing_subscriber::EnvFilter;
use tracker_core::model::{SubjectId, WeeklySummary};

#[derive(Debug, Clone)]
struct Args {
    config: TrackerConfig,
    subject: Option<SubjectId>,
    week: bool,
    json: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSubject { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSubject { raw } => write!(f, "invalid --subject value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut config = TrackerConfig::from_env();
        let mut subject = None;
        let mut week = false;
        let mut json = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    config.db_url = args.next().ok_or(ArgsError::MissingValue { flag: "--db" })?;
                }
                "--subject" => {
                    let raw = args
                        .next()
                        .ok_or(ArgsError::MissingValue { flag: "--subject" })?;
                    let id = raw
                        .parse::<SubjectId>()
                        .map_err(|_| ArgsError::InvalidSubject { raw: raw.clone() })?;
                    subject = Some(id);
                }
                "--week" => week = true,
                "--json" => json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            config,
            subject,
            week,
            json,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p services --bin report -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:tracker.sqlite3)");
    eprintln!("  --subject <id>            Per-task breakdown of one subject");
    eprintln!("  --week                    Weekly schedule completion instead of subjects");
    eprintln!("  --json                    Print JSON instead of text");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TRACKER_DB_URL (same as --db), TRACKER_LOG (log filter, default: info)");
}

fn print_overview(lines: &[SubjectOverview]) {
    if lines.is_empty() {
        println!("no subjects");
        return;
    }
    for line in lines {
        let state = if line.archived { " (archived)" } else { "" };
        println!(
            "{:<24} {:>3}%  {} tasks, {} attempts{state}",
            line.name, line.progress, line.attempted_tasks, line.scored_attempts
        );
    }
}

fn print_report(report: &SubjectReport) {
    println!("{} [{}]", report.name, report.subject_id);
    println!(
        "  overall {}%  part 1 {}%  part 2 {}%",
        report.progress, report.part1_progress, report.part2_progress
    );
    for task in &report.tasks {
        println!(
            "  #{:<3} {:<7} {:>3}%  {} attempts  {:?}",
            task.task_number,
            task.section.to_string(),
            task.stats.percentage,
            task.stats.attempts,
            task.band
        );
    }
}

fn print_week(summary: &WeeklySummary) {
    for day in &summary.days {
        println!("  {:<4} {}/{}", day.day.to_string(), day.completed, day.total);
    }
    println!(
        "  done {}/{} ({}%)  best streak {}",
        summary.completed, summary.total, summary.completion_rate, summary.best_streak
    );
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse()?;
    let services = AppServices::from_config(&args.config, Clock::default_clock()).await?;
    let progress = services.progress();

    if args.week {
        let summary = services.schedule().weekly_summary().await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_week(&summary);
        }
        return Ok(());
    }

    match args.subject {
        Some(id) => {
            let report = progress
                .subject_report(&id)
                .await?
                .ok_or_else(|| format!("subject `{id}` not found"))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        None => {
            let lines = progress.overview().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&lines)?);
            } else {
                print_overview(&lines);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = TrackerConfig::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("report failed: {err}");
        std::process::exit(2);
    }
}
