//! Connection manager with a persistent transport and automatic reconnection
//!
//! A single actor task owns the socket; the [`ConnectionManager`] handle
//! talks to it over a command channel. At most one live transport exists at
//! any time, across reconnects and target switches.

use anyhow::{anyhow, Result};
use billboard_protocol::{codec, Envelope};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::status::{ConnectionStatus, StatusBroadcast, StatusSubscription};
use crate::dispatch::{EventDispatcher, Subscription};
use crate::transport::{TransportConnector, TransportEvent, TransportStream};
use serde_json::Value;

/// Configuration for the connection manager
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server base URL, e.g. `ws://localhost:3000`
    pub base_url: String,
    /// Interval between outbound heartbeat envelopes while open
    pub heartbeat_interval: Duration,
    /// Initial reconnect delay; doubles on each scheduled attempt
    pub reconnect_base_delay: Duration,
    /// Scheduled reconnects before staying offline until a manual connect
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: "ws://localhost:3000".into(),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_base_delay: Duration::from_millis(1000),
            max_reconnect_attempts: 5,
        }
    }
}

type ConnectAck = oneshot::Sender<Result<()>>;

enum Command {
    Connect {
        location_id: Option<String>,
        ack: ConnectAck,
    },
    Disconnect {
        ack: oneshot::Sender<()>,
    },
    Send {
        envelope: Envelope,
    },
}

/// Handle to the connection actor
///
/// Cheap to clone; all clones drive the same single transport. One instance
/// per dashboard session.
#[derive(Clone)]
pub struct ConnectionManager {
    cmd_tx: mpsc::UnboundedSender<Command>,
    status: StatusBroadcast,
    dispatcher: EventDispatcher,
    target: Arc<Mutex<Option<String>>>,
}

impl ConnectionManager {
    /// Spawn the connection actor. No transport is opened until `connect`.
    pub fn new<C: TransportConnector>(config: ConnectionConfig, connector: C) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let status = StatusBroadcast::new();
        let dispatcher = EventDispatcher::new();

        let actor = ConnectionActor {
            config,
            connector,
            cmd_rx,
            status: status.clone(),
            dispatcher: dispatcher.clone(),
            target: None,
            attempts: 0,
        };
        tokio::spawn(actor.run());

        Self {
            cmd_tx,
            status,
            dispatcher,
            target: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the transport, optionally scoped to a location.
    ///
    /// Resolves once the transport reports open. A reentrant call while
    /// connecting, or while already open to the same target, is a no-op
    /// that resolves immediately. Calling with a different location while
    /// open reconnects to the new target.
    ///
    /// # Errors
    ///
    /// Fails only for the attempt the caller is waiting on; background
    /// reconnect failures are reported through the status stream instead.
    pub async fn connect(&self, location_id: Option<&str>) -> Result<()> {
        {
            let snapshot = self.status.snapshot();
            let target = self.target.lock();
            let same_target = target.as_deref() == location_id;
            if snapshot.is_connecting || (snapshot.is_connected && same_target) {
                debug!("connection attempt already in flight or open, skipping");
                return Ok(());
            }
        }

        *self.target.lock() = location_id.map(str::to_string);

        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Connect {
                location_id: location_id.map(str::to_string),
                ack: ack_tx,
            })
            .map_err(|_| anyhow!("connection actor stopped"))?;
        ack_rx
            .await
            .map_err(|_| anyhow!("connection actor stopped"))?
    }

    /// Close the transport with a normal status code and cancel any pending
    /// reconnect. Safe to call in any state; resolves after the final
    /// offline status has been published.
    pub async fn disconnect(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Disconnect { ack: ack_tx })
            .is_ok()
        {
            let _ = ack_rx.await;
        }
    }

    /// Queue an envelope for the open transport. Dropped with a warning
    /// when not connected.
    pub fn send(&self, envelope: Envelope) {
        if self.cmd_tx.send(Command::Send { envelope }).is_err() {
            warn!("connection actor stopped, dropping outbound message");
        }
    }

    /// The latest connection status snapshot
    pub fn status(&self) -> ConnectionStatus {
        self.status.snapshot()
    }

    /// Listen for future status transitions
    pub fn on_status_change(
        &self,
        listener: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> StatusSubscription {
        self.status.subscribe(listener)
    }

    /// Subscribe to a raw inbound event type
    pub fn subscribe(
        &self,
        event_type: impl Into<String>,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.dispatcher.subscribe(event_type, callback)
    }

    /// The dispatcher fed by this connection
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }
}

/// How an open session ended
enum Close {
    /// `disconnect()` was called; ack released after the final status
    Requested(oneshot::Sender<()>),
    /// The server completed a normal close handshake
    Clean,
    /// `connect()` with a new location id while open
    Retarget(ConnectAck),
    /// The transport dropped without a clean close
    Dropped(String),
}

/// Outcome of a scheduled reconnect wait
enum Backoff {
    /// Timer fired, or a manual connect superseded it (carrying its ack)
    Retry(Option<ConnectAck>),
    /// Attempts exhausted, disconnect requested, or all handles dropped
    Stop,
}

struct ConnectionActor<C: TransportConnector> {
    config: ConnectionConfig,
    connector: C,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    status: StatusBroadcast,
    dispatcher: EventDispatcher,
    target: Option<String>,
    attempts: u32,
}

impl<C: TransportConnector> ConnectionActor<C> {
    async fn run(mut self) {
        while let Some(cmd) = self.cmd_rx.recv().await {
            match cmd {
                Command::Connect { location_id, ack } => {
                    self.target = location_id;
                    self.session(ack).await;
                }
                Command::Disconnect { ack } => {
                    // Already idle; publish the final offline status anyway.
                    self.status.publish(ConnectionStatus::offline());
                    let _ = ack.send(());
                }
                Command::Send { envelope } => {
                    warn!(
                        event_type = %envelope.event_type,
                        "not connected, dropping outbound message"
                    );
                }
            }
        }
    }

    fn url(&self) -> String {
        match &self.target {
            Some(location_id) => format!("{}/ws/billboard/{}", self.config.base_url, location_id),
            None => format!("{}/ws", self.config.base_url),
        }
    }

    /// Drive one connected lifecycle, including silent background
    /// reconnects, until the connection is down for good.
    async fn session(&mut self, ack: ConnectAck) {
        let mut pending_ack = Some(ack);
        loop {
            self.status.publish(ConnectionStatus::connecting());
            let url = self.url();
            info!(url = %url, transport = self.connector.name(), "connecting");

            match self.connector.connect(&url).await {
                Ok(stream) => {
                    if pending_ack.is_some() {
                        // A caller-initiated open restarts the backoff
                        // series; silent reconnects keep it, so consecutive
                        // drops walk the exponential delays.
                        self.attempts = 0;
                    }
                    info!(url = %url, "connected");
                    self.status.publish(ConnectionStatus::connected());
                    if let Some(ack) = pending_ack.take() {
                        let _ = ack.send(Ok(()));
                    }

                    match self.drive(stream).await {
                        Close::Requested(done) => {
                            info!("disconnected on request");
                            self.status.publish(ConnectionStatus::offline());
                            let _ = done.send(());
                            return;
                        }
                        Close::Clean => {
                            info!("server closed the connection");
                            self.status.publish(ConnectionStatus::offline());
                            return;
                        }
                        Close::Retarget(ack) => {
                            self.status.publish(ConnectionStatus::offline());
                            self.attempts = 0;
                            pending_ack = Some(ack);
                        }
                        Close::Dropped(reason) => {
                            warn!(reason = %reason, "connection lost");
                            self.status.publish(ConnectionStatus::offline());
                            match self.backoff().await {
                                Backoff::Retry(manual_ack) => pending_ack = manual_ack,
                                Backoff::Stop => return,
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(url = %url, error = %e, "connection attempt failed");
                    self.status.publish(ConnectionStatus::failed("Connection failed"));
                    if let Some(ack) = pending_ack.take() {
                        // The caller is waiting on this attempt: reject it
                        // and leave reconnection to a manual connect.
                        let _ = ack.send(Err(e));
                        return;
                    }
                    // A failed background reconnect continues the series.
                    match self.backoff().await {
                        Backoff::Retry(manual_ack) => pending_ack = manual_ack,
                        Backoff::Stop => return,
                    }
                }
            }
        }
    }

    /// One open transport until it goes away
    async fn drive(&mut self, mut stream: C::Stream) -> Close {
        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    debug!("sending heartbeat");
                    if let Err(e) = write_envelope(&mut stream, &Envelope::heartbeat()).await {
                        warn!(error = %e, "heartbeat send failed");
                        return Close::Dropped(e.to_string());
                    }
                }

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Send { envelope }) => {
                        debug!(event_type = %envelope.event_type, "sending message");
                        if let Err(e) = write_envelope(&mut stream, &envelope).await {
                            warn!(error = %e, "send failed");
                            return Close::Dropped(e.to_string());
                        }
                    }
                    Some(Command::Connect { location_id, ack }) => {
                        if location_id == self.target {
                            // Reentrant connect while open: safe no-op.
                            let _ = ack.send(Ok(()));
                        } else {
                            info!(?location_id, "switching connection target");
                            self.target = location_id;
                            let _ = stream.close().await;
                            return Close::Retarget(ack);
                        }
                    }
                    Some(Command::Disconnect { ack }) => {
                        let _ = stream.close().await;
                        return Close::Requested(ack);
                    }
                    // All handles dropped: shut the transport, no reconnect.
                    None => {
                        let _ = stream.close().await;
                        return Close::Clean;
                    }
                },

                event = stream.next_event() => match event {
                    Some(Ok(TransportEvent::Text(text))) => match codec::decode(&text) {
                        Ok(envelope) => {
                            debug!(event_type = %envelope.event_type, "message received");
                            self.dispatcher.dispatch(&envelope);
                        }
                        // Malformed frames are discarded; the connection
                        // stays up.
                        Err(e) => warn!(error = %e, "discarding malformed message"),
                    },
                    Some(Ok(TransportEvent::Closed { clean: true })) => return Close::Clean,
                    Some(Ok(TransportEvent::Closed { clean: false })) => {
                        return Close::Dropped("unclean close".into())
                    }
                    Some(Err(e)) => return Close::Dropped(e.to_string()),
                    None => return Close::Dropped("transport stream ended".into()),
                },
            }
        }
    }

    /// Wait out the next reconnect delay, unless superseded or cancelled
    async fn backoff(&mut self) -> Backoff {
        if self.attempts >= self.config.max_reconnect_attempts {
            warn!(
                attempts = self.attempts,
                "reconnect attempts exhausted, staying offline until manual connect"
            );
            return Backoff::Stop;
        }
        self.attempts += 1;
        let delay = self.config.reconnect_base_delay * 2u32.pow(self.attempts - 1);
        info!(
            attempt = self.attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Backoff::Retry(None),
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Connect { location_id, ack }) => {
                        // A manual connect supersedes the pending timer.
                        self.target = location_id;
                        return Backoff::Retry(Some(ack));
                    }
                    Some(Command::Disconnect { ack }) => {
                        info!("disconnect requested, cancelling pending reconnect");
                        self.status.publish(ConnectionStatus::offline());
                        let _ = ack.send(());
                        return Backoff::Stop;
                    }
                    Some(Command::Send { envelope }) => {
                        warn!(
                            event_type = %envelope.event_type,
                            "not connected, dropping outbound message"
                        );
                    }
                    None => return Backoff::Stop,
                },
            }
        }
    }
}

async fn write_envelope<S: TransportStream>(stream: &mut S, envelope: &Envelope) -> Result<()> {
    let text = codec::encode(envelope)?;
    stream.send(text).await
}
