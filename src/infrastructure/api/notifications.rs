#[cfg(test)]
#[path = "notifications_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub created_at: String,
    pub read: bool,
}

/// Client for the marketplace notification inbox; used by the widget's host
/// to show unread counts next to the chat entry point.
#[derive(Clone)]
pub struct NotificationsApi {
    url: String,
}

impl Default for NotificationsApi {
    fn default() -> NotificationsApi {
        return NotificationsApi {
            url: Config::get(ConfigKey::ApiURL),
        };
    }
}

impl NotificationsApi {
    pub fn with_url(url: String) -> NotificationsApi {
        return NotificationsApi { url };
    }

    pub async fn list(&self, participant_id: &str) -> Result<Vec<Notification>> {
        let res = reqwest::Client::new()
            .get(format!(
                "{url}/notifications/{participant_id}",
                url = self.url
            ))
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                "Failed to list notifications"
            );
            bail!("Failed to list notifications");
        }

        let body = res.json::<Vec<Notification>>().await?;
        return Ok(body);
    }

    pub async fn mark_all_read(&self, participant_id: &str) -> Result<()> {
        let res = reqwest::Client::new()
            .post(format!(
                "{url}/notifications/{participant_id}/read",
                url = self.url
            ))
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                "Failed to mark notifications read"
            );
            bail!("Failed to mark notifications read");
        }

        return Ok(());
    }
}
