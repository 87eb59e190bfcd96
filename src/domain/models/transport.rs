use anyhow::Result;
use async_trait::async_trait;
use strum::EnumIter;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;

use super::Event;
use super::TypingSignal;

/// Connection lifecycle. Join state is deliberately its own step: the
/// gateway does not remember joins across reconnects, so every transition
/// back to `Connected` requires a fresh `join_conversation`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Joined,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TransportName {
    WebSocket,
}

impl TransportName {
    pub fn parse(text: &str) -> Option<TransportName> {
        return TransportName::iter().find(|e| return e.to_string() == text);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundEvent {
    Typing(TypingSignal),
    StopTyping(TypingSignal),
}

#[async_trait]
pub trait Transport {
    fn name(&self) -> TransportName;

    fn state(&self) -> ChannelState;

    /// Opens the channel, retrying with backoff up to a bounded number of
    /// attempts. Emits `ChannelConnected` (or `ChannelReconnected` on any
    /// connect after the first) into the event channel on success, and a
    /// `ChannelError` after exhausting all attempts. Inbound frames are
    /// forwarded into the same channel until the connection drops, which
    /// surfaces as `ChannelDown`.
    async fn connect(&mut self, tx: &mpsc::UnboundedSender<Event>) -> Result<()>;

    /// Must be re-issued after every successful connect, reconnects included.
    async fn join_conversation(&mut self, conversation_id: &str) -> Result<()>;

    async fn leave_conversation(&mut self, conversation_id: &str) -> Result<()>;

    async fn emit(&mut self, event: OutboundEvent) -> Result<()>;

    /// Stops forwarding inbound events and releases the connection.
    async fn close(&mut self) -> Result<()>;
}
