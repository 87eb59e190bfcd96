pub mod websocket;

use anyhow::bail;
use anyhow::Result;

use crate::domain::models::Transport;
use crate::domain::models::TransportName;

pub type TransportBox = Box<dyn Transport + Send + Sync>;

pub struct TransportManager {}

impl TransportManager {
    pub fn get(name: TransportName) -> Result<TransportBox> {
        if name == TransportName::WebSocket {
            return Ok(Box::<websocket::WebSocketGateway>::default());
        }

        bail!(format!("No transport implemented for {name}"))
    }
}
