//! Real-time client for the check-in billboard server
//!
//! Maintains one persistent WebSocket connection per dashboard session and
//! fans inbound typed events out to independent subscribers. The connection
//! heals itself: unclean drops trigger exponentially backed-off reconnects,
//! and a status stream keeps the UI's live indicator honest throughout.
//!
//! [`RealtimeService`] is the intended entry point; [`ConnectionManager`]
//! sits underneath it for callers that want raw envelopes.

pub mod connection;
pub mod dispatch;
pub mod service;
pub mod transport;

pub use billboard_protocol as protocol;
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionStatus, StatusSubscription};
pub use dispatch::{EventDispatcher, Subscription};
pub use service::RealtimeService;
pub use transport::WsConnector;
