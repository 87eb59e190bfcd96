#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Local;
use chrono::SecondsFormat;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use uuid::Uuid;

use super::Sender;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Option<String>,
    pub temp_id: Option<String>,
    pub content: String,
    pub sender: Sender,
    pub timestamp: String,
    pub optimistic: bool,
    pub failed: bool,
}

impl Message {
    /// A locally rendered send, visible before the server has confirmed it.
    /// The temp id correlates it with the eventual push echo.
    pub fn optimistic(content: &str) -> Message {
        return Message {
            id: None,
            temp_id: Some(Uuid::new_v4().to_string()),
            content: content.to_string(),
            sender: Sender::Local,
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            optimistic: true,
            failed: false,
        };
    }

    pub fn timestamp_parsed(&self) -> Option<DateTime<FixedOffset>> {
        return DateTime::parse_from_rfc3339(&self.timestamp).ok();
    }
}

/// Raw message shape as delivered by the backend, either in a history fetch
/// or a gateway push. History payloads carry `createdAt`, pushes `timestamp`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub temp_id: Option<String>,
    pub sender: String,
    pub content: String,
    #[serde(alias = "createdAt")]
    pub timestamp: String,
}

impl MessageDescriptor {
    pub fn resolve(&self, participant_id: &str) -> Message {
        return Message {
            id: self.id.clone(),
            temp_id: self.temp_id.clone(),
            content: self.content.clone(),
            sender: Sender::resolve(&self.sender, participant_id),
            timestamp: self.timestamp.clone(),
            optimistic: false,
            failed: false,
        };
    }
}
