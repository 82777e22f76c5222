//! Reminder planning.
//!
//! The planner turns a subject's trigger instant into the set of future
//! reminder tasks, one per kind, and upserts them into the task store.
//! Candidates whose instant is already in the past are skipped outright: a
//! "24 hours until start" reminder sent two minutes before start is worse
//! than no reminder at all.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use herald_types::{ReminderKind, ReminderTask};

use crate::db;
use crate::error::Result;

#[derive(Clone)]
pub struct ReminderPlanner {
    pool: SqlitePool,
}

impl ReminderPlanner {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Plan reminder tasks for a subject triggering at `trigger_at`.
    ///
    /// Upserts one pending task per kind whose instant is still in the
    /// future, keyed by `(subject_id, kind)`, overwriting the scheduled
    /// instant of any existing pending row. Returns the planned rows so
    /// callers can arm soon-due ones without waiting for the next sweep.
    ///
    /// Store errors propagate: whether subject creation should survive a
    /// failed planning pass is the caller's call, not ours.
    pub async fn plan(
        &self,
        subject_id: &str,
        trigger_at: DateTime<Utc>,
    ) -> Result<Vec<ReminderTask>> {
        let now = Utc::now();
        let mut planned = Vec::new();

        for kind in ReminderKind::ALL {
            let at = trigger_at - kind.offset();
            if at <= now {
                tracing::debug!(
                    "skipping past-due {} reminder for {} (would have fired {})",
                    kind,
                    subject_id,
                    at.to_rfc3339()
                );
                continue;
            }

            let task = db::tasks::upsert(&self.pool, subject_id, kind, &at.to_rfc3339()).await?;
            planned.push(task);
        }

        tracing::info!(
            "planned {} reminder task(s) for {} triggering at {}",
            planned.len(),
            subject_id,
            trigger_at.to_rfc3339()
        );
        Ok(planned)
    }

    /// Cancel every pending reminder task for a subject.
    ///
    /// Callers pair this with `ExecutionScheduler::disarm` so armed
    /// in-process timers are dropped too. On reschedule, `cancel` is
    /// immediately followed by a fresh `plan`.
    pub async fn cancel(&self, subject_id: &str) -> Result<u64> {
        let cancelled = db::tasks::cancel_pending_for(&self.pool, subject_id).await?;
        if cancelled > 0 {
            tracing::info!(
                "cancelled {} pending reminder task(s) for {}",
                cancelled,
                subject_id
            );
        }
        Ok(cancelled)
    }
}
