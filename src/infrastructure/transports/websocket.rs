#[cfg(test)]
#[path = "websocket_test.rs"]
mod tests;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChannelState;
use crate::domain::models::Event;
use crate::domain::models::MessageDescriptor;
use crate::domain::models::OutboundEvent;
use crate::domain::models::Transport;
use crate::domain::models::TransportName;
use crate::domain::models::TypingSignal;

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_BASE_DELAY: time::Duration = time::Duration::from_secs(1);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// Envelope for every frame on the gateway, both directions.
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    data: serde_json::Value,
}

/// Turns a raw gateway frame into an event. Malformed frames are dropped
/// and logged; they must never take the store down.
fn parse_frame(raw: &str) -> Option<Event> {
    let frame: Frame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(err) => {
            tracing::warn!(err = ?err, raw, "Dropping malformed gateway frame");
            return None;
        }
    };

    match frame.event.as_str() {
        "conversationStarted" => {
            let id = frame.data.get("conversationId")?.as_str()?.to_string();
            return Some(Event::ConversationStarted(id));
        }
        "message" => match serde_json::from_value::<MessageDescriptor>(frame.data) {
            Ok(descriptor) => return Some(Event::MessageReceived(descriptor)),
            Err(err) => {
                tracing::warn!(err = ?err, "Dropping message frame with an invalid payload");
                return None;
            }
        },
        "typing" => match serde_json::from_value::<TypingSignal>(frame.data) {
            Ok(signal) => return Some(Event::RemoteTyping(signal)),
            Err(err) => {
                tracing::warn!(err = ?err, "Dropping typing frame with an invalid payload");
                return None;
            }
        },
        "stopTyping" => match serde_json::from_value::<TypingSignal>(frame.data) {
            Ok(signal) => return Some(Event::RemoteStoppedTyping(signal)),
            Err(err) => {
                tracing::warn!(err = ?err, "Dropping stop-typing frame with an invalid payload");
                return None;
            }
        },
        other => {
            tracing::debug!(event = other, "Ignoring unknown gateway event");
            return None;
        }
    }
}

/// Persistent gateway connection. One instance per open widget; the reader
/// half runs as a spawned task forwarding parsed events into the widget's
/// event channel until the connection drops.
pub struct WebSocketGateway {
    url: String,
    state: ChannelState,
    sink: Option<WsSink>,
    reader: Option<JoinHandle<()>>,
    connected_before: bool,
}

impl Default for WebSocketGateway {
    fn default() -> WebSocketGateway {
        return WebSocketGateway::with_url(Config::get(ConfigKey::GatewayURL));
    }
}

impl WebSocketGateway {
    pub fn with_url(url: String) -> WebSocketGateway {
        return WebSocketGateway {
            url,
            state: ChannelState::Disconnected,
            sink: None,
            reader: None,
            connected_before: false,
        };
    }

    async fn dial(&self) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        let mut request = self.url.clone().into_client_request()?;

        let token = Config::get(ConfigKey::AuthToken);
        if !token.is_empty() {
            request.headers_mut().insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))?,
            );
        }

        let (stream, _) = connect_async(request).await?;
        return Ok(stream);
    }

    async fn send_frame(&mut self, event: &str, data: serde_json::Value) -> Result<()> {
        let sink = match self.sink.as_mut() {
            Some(sink) => sink,
            None => bail!("The gateway channel is not connected"),
        };

        let frame = Frame {
            event: event.to_string(),
            data,
        };

        sink.send(WsMessage::Text(serde_json::to_string(&frame)?)).await?;
        return Ok(());
    }
}

#[async_trait]
impl Transport for WebSocketGateway {
    fn name(&self) -> TransportName {
        return TransportName::WebSocket;
    }

    fn state(&self) -> ChannelState {
        return self.state;
    }

    #[allow(clippy::implicit_return)]
    async fn connect(&mut self, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
        self.state = ChannelState::Connecting;

        let mut delay = CONNECT_BASE_DELAY;
        let mut last_err = anyhow!("Connect was never attempted");

        for attempt in 1..=CONNECT_ATTEMPTS {
            match self.dial().await {
                Ok(stream) => {
                    let (sink, mut source) = stream.split();
                    self.sink = Some(sink);

                    let reader_tx = tx.clone();
                    self.reader = Some(tokio::spawn(async move {
                        while let Some(received) = source.next().await {
                            match received {
                                Ok(WsMessage::Text(raw)) => {
                                    if let Some(event) = parse_frame(&raw) {
                                        if reader_tx.send(event).is_err() {
                                            return;
                                        }
                                    }
                                }
                                Ok(WsMessage::Close(_)) | Err(_) => {
                                    reader_tx
                                        .send(Event::ChannelDown(
                                            "The gateway closed the connection".to_string(),
                                        ))
                                        .ok();
                                    return;
                                }
                                Ok(_) => {}
                            }
                        }

                        reader_tx
                            .send(Event::ChannelDown("The gateway stream ended".to_string()))
                            .ok();
                    }));

                    self.state = ChannelState::Connected;

                    if self.connected_before {
                        tx.send(Event::ChannelReconnected())?;
                    } else {
                        tx.send(Event::ChannelConnected())?;
                    }
                    self.connected_before = true;

                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(attempt, err = ?err, "Gateway connect attempt failed");
                    last_err = err;
                }
            }

            if attempt < CONNECT_ATTEMPTS {
                time::sleep(delay).await;
                delay *= 2;
            }
        }

        self.state = ChannelState::Disconnected;
        tx.send(Event::ChannelError(format!(
            "Could not reach the support gateway: {last_err}"
        )))?;
        return Err(last_err);
    }

    #[allow(clippy::implicit_return)]
    async fn join_conversation(&mut self, conversation_id: &str) -> Result<()> {
        self.send_frame("joinConversation", json!({ "conversationId": conversation_id }))
            .await?;
        self.state = ChannelState::Joined;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn leave_conversation(&mut self, conversation_id: &str) -> Result<()> {
        self.send_frame("leaveConversation", json!({ "conversationId": conversation_id }))
            .await?;

        if self.state == ChannelState::Joined {
            self.state = ChannelState::Connected;
        }
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn emit(&mut self, event: OutboundEvent) -> Result<()> {
        match event {
            OutboundEvent::Typing(signal) => {
                return self.send_frame("typing", serde_json::to_value(&signal)?).await;
            }
            OutboundEvent::StopTyping(signal) => {
                return self
                    .send_frame("stopTyping", serde_json::to_value(&signal)?)
                    .await;
            }
        }
    }

    #[allow(clippy::implicit_return)]
    async fn close(&mut self) -> Result<()> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        if let Some(mut sink) = self.sink.take() {
            sink.close().await.ok();
        }

        self.state = ChannelState::Disconnected;
        self.connected_before = false;
        return Ok(());
    }
}
