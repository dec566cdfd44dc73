//! Channel-backed transport for driving the connection manager in tests

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::traits::{TransportConnector, TransportEvent, TransportStream};

/// What the client wrote to the transport, as seen by the test peer
#[derive(Debug)]
pub enum ClientFrame {
    Text(String),
    Close,
}

/// Test-side handle to one accepted connection
pub struct MockPeer {
    pub url: String,
    events: mpsc::UnboundedSender<Result<TransportEvent>>,
    sent: mpsc::UnboundedReceiver<ClientFrame>,
}

impl MockPeer {
    /// Push a text frame to the client
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.events.send(Ok(TransportEvent::Text(text.into())));
    }

    /// Close the connection from the server side
    pub fn close(&self, clean: bool) {
        let _ = self.events.send(Ok(TransportEvent::Closed { clean }));
    }

    /// Wait for the next frame the client wrote
    pub async fn next_sent(&mut self) -> Option<ClientFrame> {
        self.sent.recv().await
    }

    /// Frame the client wrote, if one is already queued
    pub fn try_next_sent(&mut self) -> Option<ClientFrame> {
        self.sent.try_recv().ok()
    }
}

/// Test-side stream of accepted connections
pub struct MockListener {
    peers: mpsc::UnboundedReceiver<MockPeer>,
    refuse: Arc<AtomicUsize>,
}

impl MockListener {
    /// Wait for the next dial from the client
    pub async fn accept(&mut self) -> MockPeer {
        self.peers.recv().await.expect("connector dropped")
    }

    /// Dial already made by the client, if any
    pub fn try_accept(&mut self) -> Option<MockPeer> {
        self.peers.try_recv().ok()
    }

    /// Make the next `count` dials fail before opening
    pub fn refuse_next(&self, count: usize) {
        self.refuse.fetch_add(count, Ordering::SeqCst);
    }
}

/// Connector handing each accepted connection to the test as a [`MockPeer`]
pub struct MockConnector {
    peers: mpsc::UnboundedSender<MockPeer>,
    refuse: Arc<AtomicUsize>,
}

/// Create a connector plus the listener observing its connections
pub fn mock_pair() -> (MockConnector, MockListener) {
    let (peer_tx, peer_rx) = mpsc::unbounded_channel();
    let refuse = Arc::new(AtomicUsize::new(0));
    (
        MockConnector {
            peers: peer_tx,
            refuse: refuse.clone(),
        },
        MockListener {
            peers: peer_rx,
            refuse,
        },
    )
}

#[async_trait]
impl TransportConnector for MockConnector {
    type Stream = MockStream;

    async fn connect(&self, url: &str) -> Result<Self::Stream> {
        if self.refuse.load(Ordering::SeqCst) > 0 {
            self.refuse.fetch_sub(1, Ordering::SeqCst);
            return Err(anyhow!("connection refused"));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let peer = MockPeer {
            url: url.to_string(),
            events: event_tx,
            sent: sent_rx,
        };
        self.peers
            .send(peer)
            .map_err(|_| anyhow!("listener dropped"))?;

        Ok(MockStream {
            events: event_rx,
            sent: sent_tx,
        })
    }

    fn name(&self) -> &'static str {
        "Mock"
    }
}

/// Client-side stream paired with a [`MockPeer`]
pub struct MockStream {
    events: mpsc::UnboundedReceiver<Result<TransportEvent>>,
    sent: mpsc::UnboundedSender<ClientFrame>,
}

#[async_trait]
impl TransportStream for MockStream {
    async fn send(&mut self, text: String) -> Result<()> {
        self.sent
            .send(ClientFrame::Text(text))
            .map_err(|_| anyhow!("peer dropped"))
    }

    async fn next_event(&mut self) -> Option<Result<TransportEvent>> {
        self.events.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        let _ = self.sent.send(ClientFrame::Close);
        Ok(())
    }
}
