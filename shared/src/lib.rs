//! Billboard Shared Protocol Types
//!
//! This crate provides the wire envelope, event-type constants, and payload
//! models for the check-in billboard real-time channel. Both directions of
//! the socket use the same JSON envelope:
//!
//! ```text
//! { "type": "<event type>", "data": { ... }, "timestamp": "<RFC 3339>" }
//! ```

pub mod codec;
pub mod models;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Get current timestamp as an RFC 3339 string (millisecond precision, UTC)
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Event type strings used as the dispatch key on the wire
pub mod event {
    // Server -> client
    pub const NEW_CHECK_IN: &str = "new_check_in";
    pub const STATE_UPDATE: &str = "state_update";
    pub const NOTIFICATION_UPDATE: &str = "notification_update";
    pub const BILLBOARD_STATE_CHANGE: &str = "billboard_state_change";
    pub const SECURITY_CODE_ADDED: &str = "security_code_added";
    pub const SECURITY_CODE_REMOVED: &str = "security_code_removed";
    pub const BILLBOARD_LAUNCHED: &str = "billboard_launched";
    pub const BILLBOARD_CLEARED: &str = "billboard_cleared";

    // Client -> server
    pub const HEARTBEAT: &str = "heartbeat";
    pub const SUBSCRIBE_LOCATION: &str = "subscribe_location";
    pub const SUBSCRIBE_NOTIFICATIONS: &str = "subscribe_notifications";
    pub const SUBSCRIBE_BILLBOARD_STATE: &str = "subscribe_billboard_state";
}

/// Wire envelope for all push messages, both directions.
///
/// `type` is the dispatch key; the shape of `data` is determined by `type`
/// and is opaque at this level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub timestamp: String,
}

impl Envelope {
    /// Create a new envelope with the given event type, stamped now
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: now_iso(),
        }
    }

    /// Create a heartbeat envelope carrying the current timestamp
    pub fn heartbeat() -> Self {
        Self::new(event::HEARTBEAT, json!({ "timestamp": now_ms() }))
    }

    /// Create a request for location-scoped check-in events
    pub fn subscribe_location(location_id: impl Into<String>) -> Self {
        Self::new(
            event::SUBSCRIBE_LOCATION,
            json!({ "location_id": location_id.into() }),
        )
    }

    /// Create a request for notification pushes
    pub fn subscribe_notifications() -> Self {
        Self::new(event::SUBSCRIBE_NOTIFICATIONS, json!({}))
    }

    /// Create a request for billboard state pushes
    pub fn subscribe_billboard_state() -> Self {
        Self::new(event::SUBSCRIBE_BILLBOARD_STATE, json!({}))
    }
}
