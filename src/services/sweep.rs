//! Coarse periodic sweeping of the task store.
//!
//! The sweep is the durability half of scheduling: every tick it pulls
//! pending tasks due inside the sweep window and hands them to the
//! execution scheduler, which provides the actual precision. The window
//! must be at least as long as the tick period so every task is discovered
//! by at least one tick before it is due.
//!
//! The due query has no lower bound: tasks that went overdue while the
//! process was down are rediscovered too, and the executor's past-due
//! branch fires them immediately.

use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::db;
use crate::error::Result;
use crate::services::executor::ExecutionScheduler;

/// Lower bound for the due-window query. Pending rows can only predate
/// "now" across a downtime window, never by decades; the epoch floor keeps
/// the query a plain index range.
const SWEEP_FLOOR: &str = "1970-01-01T00:00:00+00:00";

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30 * 60;
const DEFAULT_SWEEP_WINDOW_SECS: u64 = 30 * 60;
const DEFAULT_RETENTION_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_RETENTION_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Configuration for the sweep and retention jobs
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Interval between sweep ticks
    pub sweep_interval: Duration,
    /// How far ahead a sweep looks for due tasks; keep this >= the interval
    pub sweep_window: Duration,
    /// Interval between retention runs
    pub retention_interval: Duration,
    /// Terminal rows older than this are deleted by retention
    pub retention_age: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            sweep_window: Duration::from_secs(DEFAULT_SWEEP_WINDOW_SECS),
            retention_interval: Duration::from_secs(DEFAULT_RETENTION_INTERVAL_SECS),
            retention_age: Duration::from_secs(DEFAULT_RETENTION_AGE_SECS),
        }
    }
}

impl SweepConfig {
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn sweep_window(mut self, window: Duration) -> Self {
        self.sweep_window = window;
        self
    }

    pub fn retention_interval(mut self, interval: Duration) -> Self {
        self.retention_interval = interval;
        self
    }

    pub fn retention_age(mut self, age: Duration) -> Self {
        self.retention_age = age;
        self
    }

    /// The far edge of the sweep window starting now. Saturates instead of
    /// panicking for absurdly large configured windows.
    pub fn window_horizon(&self) -> chrono::DateTime<Utc> {
        let window =
            chrono::Duration::from_std(self.sweep_window).unwrap_or(chrono::Duration::MAX);
        Utc::now()
            .checked_add_signed(window)
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
    }

    /// Whether an instant falls inside the sweep window starting now; used
    /// by the immediate-scheduling fast path.
    pub fn within_window(&self, at: chrono::DateTime<Utc>) -> bool {
        at <= self.window_horizon()
    }
}

#[derive(Clone)]
pub struct SweepScheduler {
    pool: SqlitePool,
    executor: ExecutionScheduler,
    config: SweepConfig,
}

impl SweepScheduler {
    pub fn new(pool: SqlitePool, executor: ExecutionScheduler, config: SweepConfig) -> Self {
        Self {
            pool,
            executor,
            config,
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// One sweep pass: find pending tasks due inside the window and arm
    /// them. A failed store query propagates (the tick is abandoned and the
    /// next one retries); a failed arm is logged and the pass continues.
    /// Returns the number of tasks armed.
    pub async fn run_sweep(&self) -> Result<usize> {
        let horizon = self.config.window_horizon();
        let due =
            db::tasks::find_pending_due_between(&self.pool, SWEEP_FLOOR, &horizon.to_rfc3339())
                .await?;

        let mut armed = 0;
        for task in &due {
            match self.executor.arm(task).await {
                Ok(()) => armed += 1,
                Err(e) => {
                    tracing::warn!("sweep could not arm task {}: {}", task.id, e);
                }
            }
        }

        if armed > 0 {
            tracing::info!("sweep armed {} task(s) due by {}", armed, horizon.to_rfc3339());
        } else {
            tracing::debug!("sweep found nothing due by {}", horizon.to_rfc3339());
        }
        Ok(armed)
    }

    /// One retention pass: delete terminal rows older than the configured
    /// age. Purely housekeeping; a failure here never touches delivery.
    pub async fn run_retention(&self) -> Result<u64> {
        let age =
            chrono::Duration::from_std(self.config.retention_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(age)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let deleted =
            db::tasks::delete_terminal_older_than(&self.pool, &cutoff.to_rfc3339()).await?;
        if deleted > 0 {
            tracing::info!("retention deleted {} old terminal task(s)", deleted);
        }
        Ok(deleted)
    }
}
