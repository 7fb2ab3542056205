use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::domain::Order;
use crate::error::ChannelError;

/// Client-to-server control frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "auth")]
    Auth { token: String },
    #[serde(rename = "order:subscribe")]
    Subscribe(String),
    #[serde(rename = "order:unsubscribe")]
    Unsubscribe(String),
}

/// Server-to-client event frames. The only event of interest carries a full
/// order snapshot; the client performs no partial-merge logic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ServerMessage {
    #[serde(rename = "order:update")]
    OrderUpdate(Order),
}

/// The wire seam under the channel service. Production uses [`WsTransport`];
/// tests script connections and events deterministically.
#[async_trait]
pub trait EventTransport: Send {
    /// Establishes a connection and authenticates with the bearer token.
    /// Callable again after a drop; the service drives retries.
    async fn open(&mut self, token: &str) -> Result<(), ChannelError>;

    /// Next inbound event. `None` means the connection is gone and the
    /// service should enter its retry loop.
    async fn next_event(&mut self) -> Option<ServerMessage>;

    async fn send(&mut self, message: ClientMessage) -> Result<(), ChannelError>;

    async fn close(&mut self);
}

/// WebSocket transport over tokio-tungstenite. Frames are JSON
/// `{"event": ..., "payload": ...}` objects.
pub struct WsTransport {
    url: String,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }
}

#[async_trait]
impl EventTransport for WsTransport {
    async fn open(&mut self, token: &str) -> Result<(), ChannelError> {
        let (mut stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        let auth = serde_json::to_string(&ClientMessage::Auth {
            token: token.to_string(),
        })
        .map_err(|e| ChannelError::Transport(e.to_string()))?;
        stream
            .send(Message::Text(auth))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<ServerMessage> {
        let stream = self.stream.as_mut()?;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str(&text) {
                    Ok(message) => return Some(message),
                    Err(e) => debug!(error = %e, "ignoring unrecognized frame"),
                },
                Some(Ok(Message::Ping(payload))) => {
                    let _ = stream.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    self.stream = None;
                    return None;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "websocket read error");
                    self.stream = None;
                    return None;
                }
            }
        }
    }

    async fn send(&mut self, message: ClientMessage) -> Result<(), ChannelError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ChannelError::Transport("not connected".to_string()))?;
        let text =
            serde_json::to_string(&message).map_err(|e| ChannelError::Transport(e.to_string()))?;
        stream
            .send(Message::Text(text))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
    }
}
