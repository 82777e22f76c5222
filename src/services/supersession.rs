//! Reminder hierarchy supersession.
//!
//! Reminders are a decaying staircase, not an accumulating log: once the
//! "1 hour" reminder lands, the stale "24 hour" one is noise. When a task
//! of some kind is about to deliver, unread notifications for strictly
//! coarser kinds of the same subject are deleted.

use herald_types::ReminderKind;

use crate::services::dispatch::NotificationDispatcher;

/// Delete unread notifications for kinds strictly coarser than
/// `firing_kind`. Best-effort: failures are logged and never block the
/// delivery that triggered the supersession.
pub async fn supersede(
    dispatcher: &dyn NotificationDispatcher,
    subject_id: &str,
    firing_kind: ReminderKind,
) {
    let kinds = firing_kind.coarser();
    if kinds.is_empty() {
        return;
    }

    match dispatcher
        .delete_unread_for_subject_and_kinds(subject_id, kinds)
        .await
    {
        Ok(0) => {}
        Ok(n) => {
            tracing::debug!(
                "superseded {} stale notification(s) for {} below {}",
                n,
                subject_id,
                firing_kind
            );
        }
        Err(e) => {
            tracing::warn!(
                "supersession for {} failed, continuing with delivery: {}",
                subject_id,
                e
            );
        }
    }
}
