use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;

/// Create a connection pool for the SQLite task store
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    let url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}

/// The task store schema
const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Reminder tasks table
CREATE TABLE IF NOT EXISTS reminder_tasks (
    id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    scheduled_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- At most one pending task per (subject, kind); the planner upserts
-- against this index.
CREATE UNIQUE INDEX IF NOT EXISTS idx_reminder_tasks_pending_subject_kind
    ON reminder_tasks(subject_id, kind) WHERE status = 'pending';

CREATE INDEX IF NOT EXISTS idx_reminder_tasks_status_scheduled_at
    ON reminder_tasks(status, scheduled_at);
CREATE INDEX IF NOT EXISTS idx_reminder_tasks_subject_id
    ON reminder_tasks(subject_id);
"#;
