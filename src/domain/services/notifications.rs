#[cfg(test)]
#[path = "notifications_test.rs"]
mod tests;

use std::collections::HashSet;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::infrastructure::notifiers::NotifierBox;

/// Surfaces newly appended remote messages as alerts. Only reconcile
/// *appends* reach this service; in-place replacements never alert, and a
/// message id is never alerted twice.
pub struct NotificationDispatcher {
    notifier: NotifierBox,
    seen: HashSet<String>,
}

impl NotificationDispatcher {
    pub fn new(notifier: NotifierBox) -> NotificationDispatcher {
        return NotificationDispatcher {
            notifier,
            seen: HashSet::new(),
        };
    }

    pub async fn dispatch(
        &mut self,
        message: &Message,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        if message.sender.is_local() {
            return Ok(());
        }

        if let Some(id) = message.id.as_ref() {
            if !self.seen.insert(id.to_string()) {
                return Ok(());
            }
        }

        if let Err(err) = self.notifier.play_sound().await {
            tracing::warn!(err = ?err, "Notification sound failed, falling back to a visual pulse");
            tx.send(Event::NotificationPulse())?;
        }

        if self.notifier.permission_granted().await {
            if let Err(err) = self.notifier.notify("Souk support", &message.content).await {
                tracing::warn!(err = ?err, "System notification failed");
            }
        }

        return Ok(());
    }
}
