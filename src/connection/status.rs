//! Connection status snapshot and its listener set
//!
//! This is a separate listener registry from the event-type dispatcher; it
//! drives the UI "Live/Offline" indicator.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::error;

/// Latest connection lifecycle snapshot
///
/// Recomputed on every transition; consumers keep only the most recent
/// value, there is no history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub is_connecting: bool,
    pub error: Option<String>,
}

impl ConnectionStatus {
    /// A connection attempt is in flight
    pub fn connecting() -> Self {
        Self {
            is_connected: false,
            is_connecting: true,
            error: None,
        }
    }

    /// The transport is open
    pub fn connected() -> Self {
        Self {
            is_connected: true,
            is_connecting: false,
            error: None,
        }
    }

    /// No transport and no attempt in flight
    pub fn offline() -> Self {
        Self::default()
    }

    /// A connection attempt failed before opening
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_connected: false,
            is_connecting: false,
            error: Some(error.into()),
        }
    }
}

type Listener = Arc<dyn Fn(&ConnectionStatus) + Send + Sync>;

#[derive(Default)]
struct Inner {
    current: ConnectionStatus,
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Broadcast of [`ConnectionStatus`] snapshots to registered listeners.
/// Cheap to clone; all clones share one listener set.
#[derive(Clone, Default)]
pub struct StatusBroadcast {
    inner: Arc<Mutex<Inner>>,
}

impl StatusBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> ConnectionStatus {
        self.inner.lock().current.clone()
    }

    /// Replace the snapshot and notify every listener synchronously.
    /// A panicking listener is logged and does not stop the broadcast.
    pub fn publish(&self, status: ConnectionStatus) {
        let listeners: Vec<Listener> = {
            let mut inner = self.inner.lock();
            inner.current = status.clone();
            inner.listeners.iter().map(|(_, l)| l.clone()).collect()
        };

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&status))).is_err() {
                error!("status listener panicked");
            }
        }
    }

    /// Register a listener for future transitions. Listeners do not receive
    /// the current snapshot retroactively, only the next publish.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> StatusSubscription {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));

        StatusSubscription {
            inner: Arc::downgrade(&self.inner),
            id,
            active: AtomicBool::new(true),
        }
    }
}

/// Disposer capability returned by [`StatusBroadcast::subscribe`]
pub struct StatusSubscription {
    inner: Weak<Mutex<Inner>>,
    id: u64,
    active: AtomicBool,
}

impl StatusSubscription {
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(inner) = self.inner.upgrade() {
                inner.lock().listeners.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(broadcast: &StatusBroadcast) -> (Arc<Mutex<Vec<ConnectionStatus>>>, StatusSubscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sub = broadcast.subscribe(move |status| seen_clone.lock().push(status.clone()));
        (seen, sub)
    }

    #[test]
    fn test_snapshot_tracks_latest_publish() {
        let broadcast = StatusBroadcast::new();
        assert_eq!(broadcast.snapshot(), ConnectionStatus::offline());

        broadcast.publish(ConnectionStatus::connecting());
        broadcast.publish(ConnectionStatus::connected());
        assert_eq!(broadcast.snapshot(), ConnectionStatus::connected());
    }

    #[test]
    fn test_late_listener_gets_next_transition_only() {
        let broadcast = StatusBroadcast::new();
        broadcast.publish(ConnectionStatus::connected());

        let (seen, _sub) = recorder(&broadcast);
        assert!(seen.lock().is_empty(), "no retroactive delivery");

        broadcast.publish(ConnectionStatus::offline());
        assert_eq!(*seen.lock(), vec![ConnectionStatus::offline()]);
    }

    #[test]
    fn test_unsubscribed_listener_is_silent() {
        let broadcast = StatusBroadcast::new();
        let (seen, sub) = recorder(&broadcast);

        broadcast.publish(ConnectionStatus::connecting());
        sub.unsubscribe();
        sub.unsubscribe(); // idempotent
        broadcast.publish(ConnectionStatus::connected());

        assert_eq!(*seen.lock(), vec![ConnectionStatus::connecting()]);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_broadcast() {
        let broadcast = StatusBroadcast::new();
        let _bad = broadcast.subscribe(|_| panic!("listener bug"));
        let (seen, _sub) = recorder(&broadcast);

        broadcast.publish(ConnectionStatus::failed("Connection failed"));

        assert_eq!(
            *seen.lock(),
            vec![ConnectionStatus::failed("Connection failed")]
        );
    }
}
