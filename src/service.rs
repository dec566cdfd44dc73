//! Typed facade over the raw connection for dashboard consumers
//!
//! Deserializes each event's payload into its protocol model before handing
//! it to the subscriber, and exposes the outbound scope-subscription
//! messages the server understands.

use anyhow::Result;
use billboard_protocol::{codec, event};
use billboard_protocol::models::{
    BillboardCleared, BillboardControl, BillboardState, Notification, RealTimeUpdate,
    SecurityCodeEvent,
};
use billboard_protocol::Envelope;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::connection::{ConnectionManager, ConnectionStatus, StatusSubscription};
use crate::dispatch::Subscription;

/// Typed real-time API for one dashboard session
#[derive(Clone)]
pub struct RealtimeService {
    manager: ConnectionManager,
}

impl RealtimeService {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Open the connection, optionally scoped to a location
    pub async fn connect(&self, location_id: Option<&str>) -> Result<()> {
        self.manager.connect(location_id).await
    }

    /// Close the connection and stop reconnecting
    pub async fn disconnect(&self) {
        self.manager.disconnect().await
    }

    /// Latest connection status snapshot
    pub fn connection_status(&self) -> ConnectionStatus {
        self.manager.status()
    }

    /// Listen for connection status transitions
    pub fn on_connection_status_change(
        &self,
        listener: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> StatusSubscription {
        self.manager.on_status_change(listener)
    }

    /// Subscribe to a raw event type, receiving the undecoded payload
    pub fn on_event(
        &self,
        event_type: impl Into<String>,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.manager.subscribe(event_type, callback)
    }

    pub fn on_new_check_in(
        &self,
        callback: impl Fn(RealTimeUpdate) + Send + Sync + 'static,
    ) -> Subscription {
        self.on_typed(event::NEW_CHECK_IN, callback)
    }

    pub fn on_state_update(
        &self,
        callback: impl Fn(RealTimeUpdate) + Send + Sync + 'static,
    ) -> Subscription {
        self.on_typed(event::STATE_UPDATE, callback)
    }

    pub fn on_notification_update(
        &self,
        callback: impl Fn(Notification) + Send + Sync + 'static,
    ) -> Subscription {
        self.on_typed(event::NOTIFICATION_UPDATE, callback)
    }

    pub fn on_billboard_state_change(
        &self,
        callback: impl Fn(BillboardState) + Send + Sync + 'static,
    ) -> Subscription {
        self.on_typed(event::BILLBOARD_STATE_CHANGE, callback)
    }

    pub fn on_security_code_added(
        &self,
        callback: impl Fn(SecurityCodeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.on_typed(event::SECURITY_CODE_ADDED, callback)
    }

    pub fn on_security_code_removed(
        &self,
        callback: impl Fn(SecurityCodeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.on_typed(event::SECURITY_CODE_REMOVED, callback)
    }

    pub fn on_billboard_launched(
        &self,
        callback: impl Fn(BillboardControl) + Send + Sync + 'static,
    ) -> Subscription {
        self.on_typed(event::BILLBOARD_LAUNCHED, callback)
    }

    pub fn on_billboard_cleared(
        &self,
        callback: impl Fn(BillboardCleared) + Send + Sync + 'static,
    ) -> Subscription {
        self.on_typed(event::BILLBOARD_CLEARED, callback)
    }

    /// Ask the server to scope check-in updates to one location
    pub fn subscribe_to_location(&self, location_id: &str) {
        self.manager.send(Envelope::subscribe_location(location_id));
    }

    /// Ask the server to start streaming notification updates
    pub fn subscribe_to_notifications(&self) {
        self.manager.send(Envelope::subscribe_notifications());
    }

    /// Ask the server to start streaming billboard control state
    pub fn subscribe_to_billboard_state(&self) {
        self.manager.send(Envelope::subscribe_billboard_state());
    }

    /// The underlying connection handle
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    fn on_typed<T: DeserializeOwned>(
        &self,
        event_type: &'static str,
        callback: impl Fn(T) + Send + Sync + 'static,
    ) -> Subscription {
        self.manager
            .subscribe(event_type, move |data: &Value| {
                match codec::payload::<T>(data) {
                    Ok(payload) => callback(payload),
                    Err(e) => warn!(
                        event_type,
                        error = %e,
                        "discarding payload with unexpected shape"
                    ),
                }
            })
    }
}
