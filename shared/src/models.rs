//! Typed payloads carried in the `data` field of the wire envelope
//!
//! Field names follow the server's JSON casing. Optional fields are omitted
//! from the wire when absent.

use serde::{Deserialize, Serialize};

/// One check-in as shown on the billboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInDisplay {
    pub id: String,
    pub person_name: String,
    pub check_in_time: String,
    pub location_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub time_ago: String,
}

/// Aggregate billboard state for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillboardState {
    pub location_id: String,
    pub location_name: String,
    pub last_updated: String,
    pub total_check_ins: u64,
    pub recent_check_ins: Vec<CheckInDisplay>,
    pub is_online: bool,
}

/// Payload of `new_check_in` and `state_update` events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealTimeUpdate {
    #[serde(rename = "type")]
    pub update_type: String,
    pub location_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<CheckInDisplay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<BillboardState>,
    pub timestamp: String,
}

/// A pending "ready for pickup" record, payload of `notification_update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Billboard control state, payload of `billboard_state_change` and
/// `billboard_launched`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillboardControl {
    pub event_id: String,
    pub event_name: String,
    pub location_id: String,
    pub location_name: String,
    pub security_codes: Vec<String>,
    pub is_active: bool,
    pub last_updated: String,
}

/// Payload of `security_code_added` and `security_code_removed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityCodeEvent {
    pub code: String,
    pub event_id: String,
}

/// Payload of `billboard_cleared`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillboardCleared {
    pub event_id: String,
}

/// Payload of the outbound `heartbeat` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatData {
    pub timestamp: u64,
}

/// Payload of the outbound `subscribe_location` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeLocation {
    pub location_id: String,
}
