//! Pluggable transports for the persistent server connection

#[cfg(test)]
pub mod mock;
pub mod traits;
pub mod ws;

pub use traits::{TransportConnector, TransportEvent, TransportStream};
pub use ws::{WsConnector, WsTransportStream};
