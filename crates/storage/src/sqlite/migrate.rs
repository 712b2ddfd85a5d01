use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Ordered schema versions; each entry runs in its own transaction.
const MIGRATIONS: &[(i64, &[&str])] = &[
    (
        1,
        &[
            r"
            CREATE TABLE IF NOT EXISTS subjects (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                part1_from INTEGER NOT NULL CHECK (part1_from >= 0),
                part1_to INTEGER NOT NULL CHECK (part1_to >= part1_from),
                part2_from INTEGER NOT NULL CHECK (part2_from >= 0),
                part2_to INTEGER NOT NULL CHECK (part2_to >= part2_from),
                part2_max_points TEXT NOT NULL DEFAULT '{}',
                icon TEXT NOT NULL,
                color TEXT NOT NULL,
                archived INTEGER NOT NULL DEFAULT 0 CHECK (archived IN (0, 1))
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS task_attempts (
                id INTEGER PRIMARY KEY,
                subject_id TEXT NOT NULL,
                task_number INTEGER NOT NULL CHECK (task_number >= 0),
                status TEXT NOT NULL CHECK (status IN ('completed', 'failed', 'skipped')),
                points INTEGER CHECK (points >= 0),
                max_points INTEGER CHECK (max_points >= 0),
                attempt_date TEXT NOT NULL,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_task_attempts_subject_task
                ON task_attempts (subject_id, task_number)
            ",
        ],
    ),
    (
        2,
        &[r"
        CREATE TABLE IF NOT EXISTS schedule_tasks (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            day TEXT NOT NULL CHECK (day IN ('Mon', 'Tue', 'Wed', 'Thu', 'Fri', 'Sat', 'Sun')),
            repeat INTEGER NOT NULL DEFAULT 0 CHECK (repeat IN (0, 1)),
            completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
            timer_minutes INTEGER NOT NULL CHECK (timer_minutes >= 0),
            time_spent INTEGER NOT NULL DEFAULT 0 CHECK (time_spent >= 0),
            streak INTEGER NOT NULL DEFAULT 0 CHECK (streak >= 0),
            missed INTEGER NOT NULL DEFAULT 0 CHECK (missed >= 0)
        )
        "],
    ),
];

/// Apply every migration newer than the recorded schema version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    let current: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
        .fetch_one(pool)
        .await?;

    for &(version, statements) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
        let mut tx = pool.begin().await?;
        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(version)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(version, "applied schema migration");
    }

    Ok(())
}
