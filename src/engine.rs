//! Reminder engine facade.
//!
//! `ReminderEngine` is the handle the surrounding application holds: it
//! wires the planner, sweep, and execution scheduler together, exposes the
//! subject lifecycle entry points, and owns the periodic job loops. It is
//! an explicitly constructed, cheaply cloneable object — there is no
//! process-wide singleton to reach for.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use herald_types::ReminderTask;

use crate::error::Result;
use crate::services::dispatch::NotificationDispatcher;
use crate::services::executor::ExecutionScheduler;
use crate::services::planner::ReminderPlanner;
use crate::services::subjects::SubjectSource;
use crate::services::sweep::{SweepConfig, SweepScheduler};

/// One entry in the periodic-job table. All recurring work runs through
/// the same ticking loop shape so shutdown draining is uniform.
#[derive(Clone, Copy)]
struct PeriodicJob {
    name: &'static str,
    period: Duration,
    kind: JobKind,
}

#[derive(Clone, Copy)]
enum JobKind {
    Sweep,
    Retention,
}

#[derive(Clone)]
pub struct ReminderEngine {
    planner: ReminderPlanner,
    executor: ExecutionScheduler,
    sweep: SweepScheduler,
    shutdown_tx: watch::Sender<bool>,
    jobs: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ReminderEngine {
    pub fn new(
        pool: SqlitePool,
        subjects: Arc<dyn SubjectSource>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: SweepConfig,
    ) -> Self {
        let executor = ExecutionScheduler::new(pool.clone(), subjects, dispatcher);
        let planner = ReminderPlanner::new(pool.clone());
        let sweep = SweepScheduler::new(pool, executor.clone(), config);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            planner,
            executor,
            sweep,
            shutdown_tx,
            jobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A subject now exists with the given trigger instant: plan its
    /// reminders, and arm any that are due before the next sweep tick
    /// would discover them.
    pub async fn on_subject_created(
        &self,
        subject_id: &str,
        trigger_at: DateTime<Utc>,
    ) -> Result<()> {
        let planned = self.planner.plan(subject_id, trigger_at).await?;
        self.arm_if_due_soon(&planned).await;
        Ok(())
    }

    /// A subject's trigger instant moved: drop what was scheduled for the
    /// old instant and plan afresh. Tasks already mid-fire are unaffected.
    pub async fn on_subject_rescheduled(
        &self,
        subject_id: &str,
        new_trigger_at: DateTime<Utc>,
    ) -> Result<()> {
        self.executor.disarm(subject_id).await;
        self.planner.cancel(subject_id).await?;
        let planned = self.planner.plan(subject_id, new_trigger_at).await?;
        self.arm_if_due_soon(&planned).await;
        Ok(())
    }

    /// A subject was cancelled or deleted: silence all of its reminders.
    pub async fn on_subject_cancelled(&self, subject_id: &str) -> Result<()> {
        self.planner.cancel(subject_id).await?;
        self.executor.disarm(subject_id).await;
        Ok(())
    }

    /// Manual sweep trigger for operational tooling and tests.
    pub async fn run_sweep_now(&self) -> Result<usize> {
        self.sweep.run_sweep().await
    }

    /// Manual retention trigger for operational tooling and tests.
    pub async fn run_retention_now(&self) -> Result<u64> {
        self.sweep.run_retention().await
    }

    /// Number of armed in-process timers.
    pub async fn armed_count(&self) -> usize {
        self.executor.armed_count().await
    }

    /// Start the periodic job loops. The first sweep tick fires
    /// immediately, so tasks that came due during a restart window are
    /// recovered without waiting a full period.
    pub async fn start(&self) {
        self.executor.resume();
        let table = [
            PeriodicJob {
                name: "sweep",
                period: self.sweep.config().sweep_interval,
                kind: JobKind::Sweep,
            },
            PeriodicJob {
                name: "retention",
                period: self.sweep.config().retention_interval,
                kind: JobKind::Retention,
            },
        ];

        let mut jobs = self.jobs.lock().await;
        for job in table {
            let engine = self.clone();
            let mut shutdown_rx = self.shutdown_tx.subscribe();
            let handle = tokio::spawn(async move {
                let mut interval = tokio::time::interval(job.period);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = engine.run_job(job.kind).await {
                                tracing::warn!("{} tick failed, retrying next tick: {}", job.name, e);
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                tracing::info!("{} job stopping", job.name);
                                break;
                            }
                        }
                    }
                }
            });
            jobs.push(handle);
        }
        tracing::info!("reminder engine started");
    }

    async fn run_job(&self, kind: JobKind) -> Result<()> {
        match kind {
            JobKind::Sweep => {
                self.sweep.run_sweep().await?;
            }
            JobKind::Retention => {
                self.sweep.run_retention().await?;
            }
        }
        Ok(())
    }

    /// Graceful shutdown: stop the periodic loops, then drop all armed
    /// timers without firing them. Anything still pending is rediscovered
    /// by the next process start's immediate sweep.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let mut jobs = self.jobs.lock().await;
        for handle in jobs.drain(..) {
            let _ = handle.await;
        }
        self.executor.shutdown().await;
        tracing::info!("reminder engine stopped");
    }

    /// Arm planned tasks that fall inside the current sweep window; the
    /// next tick would be too late for them.
    async fn arm_if_due_soon(&self, planned: &[ReminderTask]) {
        let due_soon: Vec<ReminderTask> = planned
            .iter()
            .filter(|t| {
                t.scheduled_at_utc()
                    .map(|at| self.sweep.config().within_window(at))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if !due_soon.is_empty() {
            self.executor.schedule_immediately(&due_soon).await;
        }
    }
}
