//! WebSocket transport implementation over tokio-tungstenite

use anyhow::Result;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::traits::{TransportConnector, TransportEvent, TransportStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector producing WebSocket transports
#[derive(Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportConnector for WsConnector {
    type Stream = WsTransportStream;

    async fn connect(&self, url: &str) -> Result<Self::Stream> {
        let (inner, _response) = connect_async(url).await?;
        Ok(WsTransportStream { inner })
    }

    fn name(&self) -> &'static str {
        "WebSocket"
    }
}

/// WebSocket stream wrapper implementing TransportStream
pub struct WsTransportStream {
    inner: WsStream,
}

#[async_trait]
impl TransportStream for WsTransportStream {
    async fn send(&mut self, text: String) -> Result<()> {
        self.inner.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Result<TransportEvent>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(TransportEvent::Text(text))),
                Ok(Message::Close(frame)) => {
                    let clean = frame.map(|f| f.code == CloseCode::Normal).unwrap_or(false);
                    return Some(Ok(TransportEvent::Closed { clean }));
                }
                // Ping/pong is handled inside tungstenite; binary frames are
                // not part of the billboard protocol.
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.inner
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnecting".into(),
            }))
            .await?;
        Ok(())
    }
}
