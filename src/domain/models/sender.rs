use serde_derive::Deserialize;
use serde_derive::Serialize;

/// Identity the support backend posts automated replies under.
pub const AUTOMATED_SENDER: &str = "system";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    Local,
    Remote,
    Automated,
}

impl Sender {
    pub fn resolve(raw: &str, participant_id: &str) -> Sender {
        if raw == participant_id {
            return Sender::Local;
        }

        if raw == AUTOMATED_SENDER {
            return Sender::Automated;
        }

        return Sender::Remote;
    }

    pub fn is_local(&self) -> bool {
        return *self == Sender::Local;
    }
}
