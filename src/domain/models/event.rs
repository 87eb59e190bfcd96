use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::MessageDescriptor;

/// Typing payload shared by both directions of the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub conversation_id: String,
    pub sender: String,
}

/// Everything the widget's event loop reacts to: gateway lifecycle signals,
/// push events, and internal outcomes reported back by spawned workers.
pub enum Event {
    ChannelConnected(),
    ChannelReconnected(),
    ChannelDown(String),
    ChannelError(String),
    ConversationStarted(String),
    MessageReceived(MessageDescriptor),
    RemoteTyping(TypingSignal),
    RemoteStoppedTyping(TypingSignal),
    SendFailed(String),
    NotificationPulse(),
    Tick(),
}
