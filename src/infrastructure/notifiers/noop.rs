#[cfg(test)]
#[path = "noop_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::Notifier;
use crate::domain::models::NotifierName;

/// Silent notifier for headless or embedded hosts. Alerts degrade to
/// nothing rather than erroring, so the dispatcher never falls back to a
/// pulse it cannot display.
#[derive(Default)]
pub struct NoopNotifier {}

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> NotifierName {
        return NotifierName::None;
    }

    #[allow(clippy::implicit_return)]
    async fn permission_granted(&self) -> bool {
        return false;
    }

    #[allow(clippy::implicit_return)]
    async fn play_sound(&self) -> Result<()> {
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        return Ok(());
    }
}
