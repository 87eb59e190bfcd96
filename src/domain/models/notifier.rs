use anyhow::Result;
use async_trait::async_trait;
use strum::EnumIter;
use strum::IntoEnumIterator;

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum NotifierName {
    Desktop,
    None,
}

impl NotifierName {
    pub fn parse(text: &str) -> Option<NotifierName> {
        return NotifierName::iter().find(|e| return e.to_string() == text);
    }
}

/// Platform notification surface. Every method is best-effort: a notifier
/// that cannot deliver must fail with an error the caller can swallow, never
/// crash the widget.
#[async_trait]
pub trait Notifier {
    fn name(&self) -> NotifierName;

    /// Whether system-level notifications were previously authorized.
    async fn permission_granted(&self) -> bool;

    async fn play_sound(&self) -> Result<()>;

    async fn notify(&self, title: &str, body: &str) -> Result<()>;
}
