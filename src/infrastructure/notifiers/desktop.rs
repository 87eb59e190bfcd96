use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::models::Notifier;
use crate::domain::models::NotifierName;

#[cfg(target_os = "macos")]
const SOUND_COMMAND: (&str, &[&str]) = ("afplay", &["/System/Library/Sounds/Ping.aiff"]);
#[cfg(not(target_os = "macos"))]
const SOUND_COMMAND: (&str, &[&str]) =
    ("paplay", &["/usr/share/sounds/freedesktop/stereo/message.oga"]);

/// Notifier backed by the platform's own tools, in the same way editor
/// integrations drive external binaries.
#[derive(Default)]
pub struct DesktopNotifier {}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn name(&self) -> NotifierName {
        return NotifierName::Desktop;
    }

    #[allow(clippy::implicit_return)]
    async fn permission_granted(&self) -> bool {
        // A responding platform notifier binary is the closest local
        // equivalent of a granted notification permission.
        #[cfg(target_os = "macos")]
        let probe = Command::new("osascript").arg("-e").arg("return 0").output().await;
        #[cfg(not(target_os = "macos"))]
        let probe = Command::new("notify-send").arg("--version").output().await;

        return matches!(probe, Ok(output) if output.status.success());
    }

    #[allow(clippy::implicit_return)]
    async fn play_sound(&self) -> Result<()> {
        let (program, args) = SOUND_COMMAND;
        let output = Command::new(program).args(args).output().await?;

        if !output.status.success() {
            bail!(format!("{program} exited with {status}", status = output.status));
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        #[cfg(target_os = "macos")]
        let output = Command::new("osascript")
            .arg("-e")
            .arg(format!(
                "display notification \"{body}\" with title \"{title}\"",
                body = body.replace('"', "'"),
                title = title.replace('"', "'")
            ))
            .output()
            .await?;
        #[cfg(not(target_os = "macos"))]
        let output = Command::new("notify-send").arg(title).arg(body).output().await?;

        if !output.status.success() {
            bail!("The platform notifier rejected the notification");
        }

        return Ok(());
    }
}
