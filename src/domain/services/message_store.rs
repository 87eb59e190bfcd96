#[cfg(test)]
#[path = "message_store_test.rs"]
mod tests;

use crate::domain::models::Message;
use crate::domain::models::Sender;

/// A send request response and its push echo can drift apart by the length
/// of the race between them; anything farther apart than this is treated as
/// a different message.
const HEURISTIC_WINDOW_MS: i64 = 2000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Appended,
    Replaced,
}

/// The ordered, deduplicated message list for the active conversation. This
/// is the single source of truth the widget renders; every incoming
/// descriptor goes through `reconcile` so that an optimistic send and its
/// server echo collapse into exactly one visible entry.
#[derive(Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn messages(&self) -> &[Message] {
        return &self.messages;
    }

    /// Inserts a locally rendered send immediately and returns its temp id
    /// for later correlation. Never fails; the network outcome is reported
    /// separately by the caller.
    pub fn append_optimistic(&mut self, content: &str) -> String {
        let message = Message::optimistic(content);
        let temp_id = message.temp_id.clone().unwrap_or_default();
        self.messages.push(message);
        return temp_id;
    }

    /// Merges an incoming confirmed message. Precedence, first match wins:
    /// server id, then temp id correlation, then the content heuristic for
    /// local echoes, then append. Replacements never reorder history.
    pub fn reconcile(&mut self, incoming: Message) -> ReconcileOutcome {
        if let Some(idx) = self.identity_match(&incoming) {
            self.messages[idx] = incoming;
            return ReconcileOutcome::Replaced;
        }

        if let Some(idx) = self.correlation_match(&incoming) {
            let mut confirmed = incoming;
            confirmed.optimistic = false;
            confirmed.failed = false;
            self.messages[idx] = confirmed;
            return ReconcileOutcome::Replaced;
        }

        if incoming.sender == Sender::Local {
            if let Some(idx) = self.heuristic_match(&incoming) {
                self.messages[idx] = incoming;
                return ReconcileOutcome::Replaced;
            }
        }

        self.messages.push(incoming);
        return ReconcileOutcome::Appended;
    }

    /// Replaces the store with freshly fetched history, then re-appends any
    /// still-unconfirmed optimistic entries; they cannot match anything in a
    /// payload the server assembled before confirming them.
    pub fn hydrate(&mut self, history: Vec<Message>) {
        let pending = self
            .messages
            .iter()
            .filter(|e| return e.optimistic)
            .cloned()
            .collect::<Vec<Message>>();

        self.messages = history;
        self.messages.extend(pending);
    }

    /// Flags a send whose request failed. The entry stays visible so the
    /// user can retry it; it is never silently dropped.
    pub fn mark_failed(&mut self, temp_id: &str) {
        if let Some(entry) = self
            .messages
            .iter_mut()
            .find(|e| return e.temp_id.as_deref() == Some(temp_id))
        {
            entry.failed = true;
        }
    }

    /// Clears the failed flag and hands back the content for a fresh send
    /// request under the same temp id.
    pub fn clear_failed(&mut self, temp_id: &str) -> Option<String> {
        let entry = self
            .messages
            .iter_mut()
            .find(|e| return e.failed && e.temp_id.as_deref() == Some(temp_id))?;

        entry.failed = false;
        return Some(entry.content.clone());
    }

    fn identity_match(&self, incoming: &Message) -> Option<usize> {
        let id = incoming.id.as_deref()?;
        return self
            .messages
            .iter()
            .position(|e| return e.id.as_deref() == Some(id));
    }

    fn correlation_match(&self, incoming: &Message) -> Option<usize> {
        let temp_id = incoming.temp_id.as_deref()?;
        return self
            .messages
            .iter()
            .position(|e| return e.optimistic && e.temp_id.as_deref() == Some(temp_id));
    }

    /// Best-effort match for a local echo that lost its correlation id in
    /// transit: an optimistic entry of the same sender class with identical
    /// content inside a short time window. Two identical in-flight sends
    /// inside the window are indistinguishable here; tighten this to a
    /// server correlation token if the gateway ever provides one.
    fn heuristic_match(&self, incoming: &Message) -> Option<usize> {
        let incoming_at = incoming.timestamp_parsed()?;

        return self.messages.iter().position(|entry| {
            if !entry.optimistic
                || entry.sender != incoming.sender
                || entry.content != incoming.content
            {
                return false;
            }

            if let Some(entry_at) = entry.timestamp_parsed() {
                let delta = incoming_at
                    .signed_duration_since(entry_at)
                    .num_milliseconds()
                    .abs();
                return delta < HEURISTIC_WINDOW_MS;
            }

            return false;
        });
    }
}
