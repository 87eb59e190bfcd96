use serde_derive::Deserialize;
use serde_derive::Serialize;

/// The active support conversation. The id is handed out by the backend on
/// first contact and stays stable for the life of the widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_id: String,
}

/// On-disk shape of a resumable conversation, one file per participant.
#[derive(Serialize, Deserialize)]
pub struct CachedConversation {
    pub conversation_id: String,
    pub version: String,
    pub timestamp: String,
}
