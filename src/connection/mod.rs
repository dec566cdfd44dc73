//! Persistent server connection lifecycle: dialing, heartbeat, reconnection

mod manager;
mod status;

pub use manager::{ConnectionConfig, ConnectionManager};
pub use status::{ConnectionStatus, StatusSubscription};
