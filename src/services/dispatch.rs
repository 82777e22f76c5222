//! Notification dispatch seam and message rendering.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herald_types::ReminderKind;

use crate::error::Result;

/// Rendered user-facing copy for one reminder delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderMessage {
    pub title: String,
    pub body: String,
}

/// Outbound notification delivery.
///
/// Implemented by the surrounding application; the engine decides *when*
/// and *to whom*, the dispatcher owns rendering persistence and transport.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one reminder to the given recipients.
    async fn deliver(
        &self,
        subject_id: &str,
        kind: ReminderKind,
        recipients: &[String],
        message: &ReminderMessage,
    ) -> Result<()>;

    /// Delete not-yet-read notifications previously delivered for the
    /// subject under any of the given kinds. Returns the number deleted.
    async fn delete_unread_for_subject_and_kinds(
        &self,
        subject_id: &str,
        kinds: &[ReminderKind],
    ) -> Result<u64>;
}

/// Render the user-facing copy for a reminder of `kind` whose subject
/// triggers at `trigger_at`.
pub fn render_message(kind: ReminderKind, trigger_at: DateTime<Utc>) -> ReminderMessage {
    let title = match kind {
        ReminderKind::TwentyFourHours => "Starts in 24 hours",
        ReminderKind::TwoHours => "Starts in 2 hours",
        ReminderKind::OneHour => "Starts in 1 hour",
        ReminderKind::Starting => "Starting now",
    };
    ReminderMessage {
        title: title.to_string(),
        body: format!("Scheduled for {}", trigger_at.to_rfc3339()),
    }
}
