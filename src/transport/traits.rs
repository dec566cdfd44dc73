//! Transport trait abstraction for pluggable socket backends

use anyhow::Result;
use async_trait::async_trait;

/// A single inbound occurrence on an open transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete text frame
    Text(String),
    /// The peer closed the transport. `clean` is true only for a normal
    /// close handshake; an abrupt drop is unclean.
    Closed { clean: bool },
}

/// An open, message-oriented transport
#[async_trait]
pub trait TransportStream: Send + 'static {
    /// Send a text frame
    async fn send(&mut self, text: String) -> Result<()>;

    /// Wait for the next inbound event. `None` means the transport is gone
    /// without any close notification.
    async fn next_event(&mut self) -> Option<Result<TransportEvent>>;

    /// Close the transport gracefully with a normal status
    async fn close(&mut self) -> Result<()>;
}

/// Factory for creating transport connections
#[async_trait]
pub trait TransportConnector: Send + Sync + 'static {
    /// The stream type this connector produces
    type Stream: TransportStream;

    /// Attempt to connect to `url`, returning a stream on success
    async fn connect(&self, url: &str) -> Result<Self::Stream>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
