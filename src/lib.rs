//! Herald - a scheduled reminder delivery engine.
//!
//! Herald owns the lifecycle of reminder tasks for subjects with a mutable
//! trigger instant (typically events): planning reminder instants, sweeping
//! the task store for soon-due work, arming precise in-process timers, and
//! delivering through a pluggable notification dispatcher — exactly once per
//! `(subject, kind)`, across reschedules and process restarts.

pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;

pub use engine::ReminderEngine;
pub use error::{HeraldError, Result};
pub use services::sweep::SweepConfig;
