#[cfg(test)]
#[path = "typing_test.rs"]
mod tests;

use std::time::Duration;
use std::time::Instant;

/// How long after the last keystroke the local composing state is abandoned.
const LOCAL_IDLE: Duration = Duration::from_millis(1000);
/// Remote composing flags are dropped after this long without a stop signal,
/// so a lost `stopTyping` can never leave the indicator stuck.
const REMOTE_FALLBACK: Duration = Duration::from_secs(5);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypingTransition {
    Started,
    Stopped,
}

/// Transient composing state for both directions. Nothing here is persisted;
/// expiry is driven by the widget's tick.
#[derive(Default)]
pub struct TypingTracker {
    last_keystroke: Option<Instant>,
    remote_typist: Option<(String, Instant)>,
}

impl TypingTracker {
    /// Registers a local keystroke. Only the idle-to-composing transition
    /// produces a signal; further keystrokes just push the debounce window.
    pub fn keystroke(&mut self, now: Instant) -> Option<TypingTransition> {
        let was_idle = self.last_keystroke.is_none();
        self.last_keystroke = Some(now);

        if was_idle {
            return Some(TypingTransition::Started);
        }

        return None;
    }

    /// Sending always ends the composing state immediately.
    pub fn message_sent(&mut self) -> Option<TypingTransition> {
        if self.last_keystroke.take().is_some() {
            return Some(TypingTransition::Stopped);
        }

        return None;
    }

    pub fn local_tick(&mut self, now: Instant) -> Option<TypingTransition> {
        if let Some(last) = self.last_keystroke {
            if now.duration_since(last) >= LOCAL_IDLE {
                self.last_keystroke = None;
                return Some(TypingTransition::Stopped);
            }
        }

        return None;
    }

    pub fn remote_typing(&mut self, sender: &str, now: Instant) {
        self.remote_typist = Some((sender.to_string(), now));
    }

    pub fn remote_stopped(&mut self, sender: &str) {
        if let Some((typist, _)) = self.remote_typist.as_ref() {
            if typist == sender {
                self.remote_typist = None;
            }
        }
    }

    pub fn remote_tick(&mut self, now: Instant) {
        if let Some((_, since)) = self.remote_typist.as_ref() {
            if now.duration_since(*since) >= REMOTE_FALLBACK {
                self.remote_typist = None;
            }
        }
    }

    pub fn active_remote_typist(&self) -> Option<&str> {
        return self.remote_typist.as_ref().map(|(typist, _)| return typist.as_str());
    }

    pub fn reset(&mut self) {
        self.last_keystroke = None;
        self.remote_typist = None;
    }
}
