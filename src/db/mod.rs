pub mod connection;

use sqlx::SqlitePool;

use crate::error::Result;

/// Database operations for reminder tasks
pub mod tasks {
    use herald_types::{ReminderKind, ReminderTask, TaskStatus, ids};

    use super::*;

    /// Insert a pending task for `(subject_id, kind)`, or overwrite the
    /// scheduled instant of the existing pending row. Returns the row as
    /// stored.
    pub async fn upsert(
        pool: &SqlitePool,
        subject_id: &str,
        kind: ReminderKind,
        scheduled_at: &str,
    ) -> Result<ReminderTask> {
        let now = chrono::Utc::now().to_rfc3339();
        let id = ids::generate_task_id(subject_id, kind);
        let task = sqlx::query_as::<_, ReminderTask>(
            r#"
            INSERT INTO reminder_tasks (id, subject_id, kind, scheduled_at, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'pending', ?, ?)
            ON CONFLICT (subject_id, kind) WHERE status = 'pending'
            DO UPDATE SET scheduled_at = excluded.scheduled_at, updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(subject_id)
        .bind(kind.as_str())
        .bind(scheduled_at)
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await?;
        Ok(task)
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<ReminderTask>> {
        let task = sqlx::query_as::<_, ReminderTask>("SELECT * FROM reminder_tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(task)
    }

    /// Move a pending task to a terminal status. Returns false if the task
    /// was not pending anymore (already terminal, e.g. cancelled while the
    /// timer was firing); terminal states are never overwritten.
    pub async fn set_status(pool: &SqlitePool, id: &str, status: TaskStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE reminder_tasks SET status = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Pending tasks due in the window `[from, to]`, soonest first.
    pub async fn find_pending_due_between(
        pool: &SqlitePool,
        from: &str,
        to: &str,
    ) -> Result<Vec<ReminderTask>> {
        let tasks = sqlx::query_as::<_, ReminderTask>(
            r#"
            SELECT * FROM reminder_tasks
            WHERE status = 'pending' AND scheduled_at >= ? AND scheduled_at <= ?
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;
        Ok(tasks)
    }

    pub async fn find_pending_for(pool: &SqlitePool, subject_id: &str) -> Result<Vec<ReminderTask>> {
        let tasks = sqlx::query_as::<_, ReminderTask>(
            "SELECT * FROM reminder_tasks WHERE subject_id = ? AND status = 'pending' ORDER BY scheduled_at ASC",
        )
        .bind(subject_id)
        .fetch_all(pool)
        .await?;
        Ok(tasks)
    }

    /// Cancel every pending task for a subject. Returns the number of rows
    /// cancelled.
    pub async fn cancel_pending_for(pool: &SqlitePool, subject_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE reminder_tasks SET status = 'cancelled', updated_at = ? WHERE subject_id = ? AND status = 'pending'",
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(subject_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete terminal-state rows last touched before `cutoff`. Pending rows
    /// are never deleted here.
    pub async fn delete_terminal_older_than(pool: &SqlitePool, cutoff: &str) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM reminder_tasks WHERE status != 'pending' AND updated_at < ?",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use herald_types::{ReminderKind, TaskStatus};

    use super::*;
    use crate::db::connection;

    async fn setup_pool() -> SqlitePool {
        let pool = connection::create_pool(std::path::Path::new(":memory:"))
            .await
            .expect("create_pool");
        connection::run_migrations(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn upsert_replaces_pending_row_for_same_subject_and_kind() {
        let pool = setup_pool().await;
        let t1 = chrono::Utc::now() + chrono::Duration::hours(3);
        let t2 = t1 + chrono::Duration::hours(1);

        let first = tasks::upsert(&pool, "ev-1", ReminderKind::OneHour, &t1.to_rfc3339())
            .await
            .unwrap();
        let second = tasks::upsert(&pool, "ev-1", ReminderKind::OneHour, &t2.to_rfc3339())
            .await
            .unwrap();

        // Same row, new instant
        assert_eq!(first.id, second.id);
        assert_eq!(second.scheduled_at, t2.to_rfc3339());
        assert_eq!(tasks::find_pending_for(&pool, "ev-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_after_cancel_creates_a_fresh_row() {
        let pool = setup_pool().await;
        let t = chrono::Utc::now() + chrono::Duration::hours(3);

        let first = tasks::upsert(&pool, "ev-1", ReminderKind::OneHour, &t.to_rfc3339())
            .await
            .unwrap();
        assert_eq!(tasks::cancel_pending_for(&pool, "ev-1").await.unwrap(), 1);
        let second = tasks::upsert(&pool, "ev-1", ReminderKind::OneHour, &t.to_rfc3339())
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        let old = tasks::get(&pool, &first.id).await.unwrap().unwrap();
        assert_eq!(old.status_enum(), TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn set_status_is_terminal_and_monotonic() {
        let pool = setup_pool().await;
        let t = chrono::Utc::now() + chrono::Duration::hours(3);
        let task = tasks::upsert(&pool, "ev-1", ReminderKind::Starting, &t.to_rfc3339())
            .await
            .unwrap();

        assert!(tasks::set_status(&pool, &task.id, TaskStatus::Completed)
            .await
            .unwrap());
        // Already terminal: the transition is refused
        assert!(!tasks::set_status(&pool, &task.id, TaskStatus::Failed)
            .await
            .unwrap());
        let row = tasks::get(&pool, &task.id).await.unwrap().unwrap();
        assert_eq!(row.status_enum(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn due_window_query_excludes_outside_and_terminal_rows() {
        let pool = setup_pool().await;
        let now = chrono::Utc::now();

        tasks::upsert(&pool, "soon", ReminderKind::OneHour, &(now + chrono::Duration::minutes(10)).to_rfc3339())
            .await
            .unwrap();
        tasks::upsert(&pool, "later", ReminderKind::OneHour, &(now + chrono::Duration::hours(5)).to_rfc3339())
            .await
            .unwrap();
        let done = tasks::upsert(&pool, "done", ReminderKind::OneHour, &(now + chrono::Duration::minutes(5)).to_rfc3339())
            .await
            .unwrap();
        tasks::set_status(&pool, &done.id, TaskStatus::Completed)
            .await
            .unwrap();

        let due = tasks::find_pending_due_between(
            &pool,
            &now.to_rfc3339(),
            &(now + chrono::Duration::minutes(30)).to_rfc3339(),
        )
        .await
        .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].subject_id, "soon");
    }

    #[tokio::test]
    async fn retention_deletes_only_old_terminal_rows() {
        let pool = setup_pool().await;
        let t = chrono::Utc::now() + chrono::Duration::hours(1);

        let old = tasks::upsert(&pool, "old", ReminderKind::OneHour, &t.to_rfc3339())
            .await
            .unwrap();
        tasks::set_status(&pool, &old.id, TaskStatus::Completed)
            .await
            .unwrap();
        tasks::upsert(&pool, "live", ReminderKind::OneHour, &t.to_rfc3339())
            .await
            .unwrap();

        // Cutoff in the future relative to updated_at: the terminal row goes,
        // the pending row stays regardless of age.
        let cutoff = (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        assert_eq!(tasks::delete_terminal_older_than(&pool, &cutoff).await.unwrap(), 1);
        assert!(tasks::get(&pool, &old.id).await.unwrap().is_none());
        assert_eq!(tasks::find_pending_for(&pool, "live").await.unwrap().len(), 1);
    }
}
