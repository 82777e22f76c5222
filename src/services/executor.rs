//! Precise in-process execution of reminder tasks.
//!
//! The execution scheduler keeps one timer per armed task in an in-memory
//! registry keyed by task id. The registry is the single dedup point:
//! overlapping sweep discoveries and the immediate-scheduling fast path all
//! funnel through `arm`, which refuses to double-arm an id. A secondary
//! subject lookup over the same registry serves targeted cancellation.
//!
//! Timers are not persisted. After a restart the sweep rediscovers pending
//! tasks, and anything that became overdue during the downtime fires
//! through the inline past-due branch of `arm`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use herald_types::{ReminderTask, TaskStatus};

use crate::db;
use crate::error::{HeraldError, Result};
use crate::services::dispatch::{self, NotificationDispatcher};
use crate::services::subjects::SubjectSource;
use crate::services::supersession;

/// A live in-process timer for one pending task.
///
/// `abort` is `None` while an overdue task executes inline; there is no
/// timer to cancel once firing has begun.
struct ArmedTimer {
    subject_id: String,
    abort: Option<AbortHandle>,
}

#[derive(Clone)]
pub struct ExecutionScheduler {
    pool: SqlitePool,
    subjects: Arc<dyn SubjectSource>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    timers: Arc<Mutex<HashMap<String, ArmedTimer>>>,
    draining: Arc<AtomicBool>,
}

impl ExecutionScheduler {
    pub fn new(
        pool: SqlitePool,
        subjects: Arc<dyn SubjectSource>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            pool,
            subjects,
            dispatcher,
            timers: Arc::new(Mutex::new(HashMap::new())),
            draining: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Arm a timer for a pending task.
    ///
    /// Idempotent: a task id that is already armed (or currently firing
    /// inline) is left alone. A task whose instant has already passed
    /// executes inline before `arm` returns — late-but-delivered beats
    /// dropped for a process that was down past the due time.
    pub async fn arm(&self, task: &ReminderTask) -> Result<()> {
        if self.draining.load(Ordering::SeqCst) {
            tracing::debug!("draining, not arming task {}", task.id);
            return Ok(());
        }

        let scheduled = task
            .scheduled_at_utc()
            .ok_or_else(|| HeraldError::InvalidTimestamp {
                task_id: task.id.clone(),
                value: task.scheduled_at.clone(),
            })?;

        let overdue = {
            let mut timers = self.timers.lock().await;
            if timers.contains_key(&task.id) {
                tracing::debug!("task {} already armed, ignoring re-arm", task.id);
                return Ok(());
            }

            let delay = scheduled - Utc::now();
            if delay <= chrono::Duration::zero() {
                // Reserve the id so an overlapping arm is a no-op while we
                // execute inline below.
                timers.insert(
                    task.id.clone(),
                    ArmedTimer {
                        subject_id: task.subject_id.clone(),
                        abort: None,
                    },
                );
                true
            } else {
                let delay = delay.to_std().unwrap_or_default();
                let this = self.clone();
                let armed = task.clone();
                // The timer's first action after the sleep is to take the
                // registry lock, so it cannot fire before the entry below
                // is inserted.
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    // Remove our own entry before executing; absence means
                    // we were disarmed while sleeping.
                    if this.timers.lock().await.remove(&armed.id).is_none() {
                        return;
                    }
                    // Detach execution: once firing has begun, disarm and
                    // shutdown must not interrupt it.
                    let exec = this.clone();
                    tokio::spawn(async move {
                        exec.execute(&armed).await;
                    });
                });
                timers.insert(
                    task.id.clone(),
                    ArmedTimer {
                        subject_id: task.subject_id.clone(),
                        abort: Some(handle.abort_handle()),
                    },
                );
                tracing::debug!(
                    "armed task {} ({}) firing at {}",
                    task.id,
                    task.kind,
                    task.scheduled_at
                );
                false
            }
        };

        if overdue {
            tracing::debug!("task {} is overdue, executing inline", task.id);
            self.execute(task).await;
            self.timers.lock().await.remove(&task.id);
        }

        Ok(())
    }

    /// Expedited arming for tasks that fall inside the current sweep window
    /// before the next tick would discover them. Failures are logged per
    /// task; the sweep remains the safety net.
    pub async fn schedule_immediately(&self, tasks: &[ReminderTask]) {
        for task in tasks {
            if let Err(e) = self.arm(task).await {
                tracing::warn!("immediate arm of task {} failed: {}", task.id, e);
            }
        }
    }

    /// Drop every armed timer belonging to a subject. Timers mid-fire are
    /// unaffected; only future firings are prevented. Returns the number of
    /// timers removed.
    pub async fn disarm(&self, subject_id: &str) -> usize {
        let mut timers = self.timers.lock().await;
        let ids: Vec<String> = timers
            .iter()
            .filter(|(_, t)| t.subject_id == subject_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            if let Some(timer) = timers.remove(id)
                && let Some(abort) = timer.abort
            {
                abort.abort();
            }
        }
        if !ids.is_empty() {
            tracing::debug!("disarmed {} timer(s) for {}", ids.len(), subject_id);
        }
        ids.len()
    }

    /// Accept arms again after a shutdown. The engine calls this when its
    /// periodic loops start, so stop/start cycles on one handle work.
    pub fn resume(&self) {
        self.draining.store(false, Ordering::SeqCst);
    }

    /// Graceful shutdown: stop accepting arms and drop all outstanding
    /// timers without firing them. Pending rows stay in the store for the
    /// next process start's sweep to rediscover.
    pub async fn shutdown(&self) {
        self.draining.store(true, Ordering::SeqCst);
        let mut timers = self.timers.lock().await;
        let count = timers.len();
        for (_, timer) in timers.drain() {
            if let Some(abort) = timer.abort {
                abort.abort();
            }
        }
        if count > 0 {
            tracing::info!("cleared {} armed timer(s) on shutdown", count);
        }
    }

    /// Number of currently armed timers.
    pub async fn armed_count(&self) -> usize {
        self.timers.lock().await.len()
    }

    /// Execute one task: look up live subject state, supersede coarser
    /// notifications, deliver, and record the terminal status. All failure
    /// handling is internal; a task never retries automatically.
    async fn execute(&self, task: &ReminderTask) {
        // Re-read the row: a cancellation may have landed between arm and
        // firing, and cancelled tasks must stay silent.
        match db::tasks::get(&self.pool, &task.id).await {
            Ok(Some(row)) if row.is_pending() => {}
            Ok(_) => {
                tracing::debug!("task {} no longer pending, skipping execution", task.id);
                return;
            }
            Err(e) => {
                // Row still pending in the store; a later sweep retries.
                tracing::warn!("could not re-read task {} before firing: {}", task.id, e);
                return;
            }
        }

        let Some(kind) = task.kind_enum() else {
            tracing::error!("task {} has unknown kind {:?}", task.id, task.kind);
            self.finish(task, TaskStatus::Failed).await;
            return;
        };

        let trigger_at = match self.subjects.trigger_instant(&task.subject_id).await {
            Ok(Some(at)) => at,
            Ok(None) => {
                tracing::debug!(
                    "subject {} is gone, completing task {} with no delivery",
                    task.subject_id,
                    task.id
                );
                self.finish(task, TaskStatus::Completed).await;
                return;
            }
            Err(e) => {
                tracing::warn!("trigger lookup for {} failed: {}", task.subject_id, e);
                self.finish(task, TaskStatus::Failed).await;
                return;
            }
        };

        // Recipients are read at delivery time, never from planning time:
        // registrations may have changed in between.
        let recipients = match self.subjects.current_recipients(&task.subject_id).await {
            Ok(Some(recipients)) => recipients,
            Ok(None) => {
                self.finish(task, TaskStatus::Completed).await;
                return;
            }
            Err(e) => {
                tracing::warn!("recipient lookup for {} failed: {}", task.subject_id, e);
                self.finish(task, TaskStatus::Failed).await;
                return;
            }
        };

        if recipients.is_empty() {
            tracing::debug!(
                "no recipients for {}, completing task {} without dispatch",
                task.subject_id,
                task.id
            );
            self.finish(task, TaskStatus::Completed).await;
            return;
        }

        supersession::supersede(self.dispatcher.as_ref(), &task.subject_id, kind).await;

        let message = dispatch::render_message(kind, trigger_at);
        match self
            .dispatcher
            .deliver(&task.subject_id, kind, &recipients, &message)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "delivered {} reminder for {} to {} recipient(s)",
                    kind,
                    task.subject_id,
                    recipients.len()
                );
                self.finish(task, TaskStatus::Completed).await;
            }
            Err(e) => {
                tracing::warn!(
                    "dispatch of {} reminder for {} failed: {}",
                    kind,
                    task.subject_id,
                    e
                );
                self.finish(task, TaskStatus::Failed).await;
            }
        }
    }

    async fn finish(&self, task: &ReminderTask, status: TaskStatus) {
        match db::tasks::set_status(&self.pool, &task.id, status).await {
            Ok(true) => {}
            Ok(false) => {
                // Cancelled mid-fire; the delivery (if any) stands, the row
                // keeps its terminal state.
                tracing::debug!("task {} was already terminal, leaving it", task.id);
            }
            Err(e) => {
                tracing::error!("failed to record status for task {}: {}", task.id, e);
            }
        }
    }
}
