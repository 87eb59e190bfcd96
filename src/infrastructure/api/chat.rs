#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::MessageDescriptor;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartConversationRequest {
    participant_id: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartConversationResponse {
    pub conversation_id: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    conversation_id: String,
    content: String,
    sender_id: String,
    temp_id: String,
}

/// HTTP client for the support backend. The send-message response is an ack
/// only; the persisted message always arrives through the gateway push.
#[derive(Clone)]
pub struct ChatApi {
    url: String,
}

impl Default for ChatApi {
    fn default() -> ChatApi {
        return ChatApi {
            url: Config::get(ConfigKey::ApiURL),
        };
    }
}

fn authorized(builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    let token = Config::get(ConfigKey::AuthToken);
    if token.is_empty() {
        return builder;
    }

    return builder.header("Authorization", format!("Bearer {token}"));
}

impl ChatApi {
    pub fn with_url(url: String) -> ChatApi {
        return ChatApi { url };
    }

    pub async fn start_conversation(&self, participant_id: &str) -> Result<String> {
        let req = StartConversationRequest {
            participant_id: participant_id.to_string(),
        };

        let res = authorized(
            reqwest::Client::new().post(format!("{url}/support/conversations", url = self.url)),
        )
        .json(&req)
        .send()
        .await?;

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                "Failed to start a support conversation"
            );
            bail!("Failed to start a support conversation");
        }

        let body = res.json::<StartConversationResponse>().await?;
        return Ok(body.conversation_id);
    }

    /// `Ok(None)` means the backend does not know the conversation id; the
    /// caller should drop its cached id and bootstrap again.
    pub async fn history(&self, conversation_id: &str) -> Result<Option<Vec<MessageDescriptor>>> {
        let res = authorized(reqwest::Client::new().get(format!(
            "{url}/support/conversations/{conversation_id}/messages",
            url = self.url
        )))
        .send()
        .await?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                "Failed to fetch conversation history"
            );
            bail!("Failed to fetch conversation history");
        }

        let body = res.json::<Vec<MessageDescriptor>>().await?;
        return Ok(Some(body));
    }

    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        sender_id: &str,
        temp_id: &str,
    ) -> Result<()> {
        let req = SendMessageRequest {
            conversation_id: conversation_id.to_string(),
            content: content.to_string(),
            sender_id: sender_id.to_string(),
            temp_id: temp_id.to_string(),
        };

        let res = authorized(
            reqwest::Client::new().post(format!("{url}/support/messages", url = self.url)),
        )
        .json(&req)
        .send()
        .await?;

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                temp_id,
                "Send-message request failed"
            );
            bail!("Send-message request failed");
        }

        return Ok(());
    }
}
