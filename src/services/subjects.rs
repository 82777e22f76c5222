//! Subject data access seam.
//!
//! The engine never caches subject state between planning and firing:
//! trigger instants and recipient lists are read through this trait at
//! delivery time, so registrations added or removed after planning are
//! reflected in what actually gets sent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Read access to the subjects (events) reminders are scheduled for.
///
/// Implemented by the surrounding application against its own store. Both
/// lookups return `None` when the subject no longer exists; the engine
/// treats that as "nothing to deliver", not as an error.
#[async_trait]
pub trait SubjectSource: Send + Sync {
    /// The subject's current trigger instant.
    async fn trigger_instant(&self, subject_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// The subject's current recipient list.
    async fn current_recipients(&self, subject_id: &str) -> Result<Option<Vec<String>>>;
}
