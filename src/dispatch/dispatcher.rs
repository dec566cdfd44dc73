//! Event dispatcher routing inbound envelopes to per-type subscriber sets

use billboard_protocol::Envelope;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    // Insertion order within a type is dispatch order.
    handlers: HashMap<String, Vec<(u64, Callback)>>,
}

impl Registry {
    fn remove(&mut self, event_type: &str, id: u64) {
        if let Some(entries) = self.handlers.get_mut(event_type) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                self.handlers.remove(event_type);
            }
        }
    }
}

/// Routes each inbound envelope to exactly the subscribers registered for
/// its event type. Cheap to clone; all clones share one registry.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    registry: Arc<Mutex<Registry>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `event_type`. The returned subscription
    /// removes exactly this callback when unsubscribed (or dropped).
    /// Multiple independent subscriptions to the same type each receive
    /// every event.
    pub fn subscribe(
        &self,
        event_type: impl Into<String>,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        let event_type = event_type.into();
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .handlers
            .entry(event_type.clone())
            .or_default()
            .push((id, Arc::new(callback)));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            event_type,
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Invoke every subscriber for the envelope's type, synchronously and in
    /// subscription order. A panicking subscriber is logged and does not
    /// stop delivery to the rest.
    pub fn dispatch(&self, envelope: &Envelope) {
        // Callbacks are cloned out so a subscriber may subscribe or
        // unsubscribe reentrantly without deadlocking the registry.
        let callbacks: Vec<Callback> = {
            let registry = self.registry.lock();
            match registry.handlers.get(&envelope.event_type) {
                Some(entries) => entries.iter().map(|(_, cb)| cb.clone()).collect(),
                None => {
                    debug!(event_type = %envelope.event_type, "no subscribers for event");
                    return;
                }
            }
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&envelope.data))).is_err() {
                error!(
                    event_type = %envelope.event_type,
                    "subscriber panicked, continuing dispatch"
                );
            }
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self, event_type: &str) -> usize {
        self.registry
            .lock()
            .handlers
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

/// Disposer capability returned by [`EventDispatcher::subscribe`].
///
/// Unsubscribing twice is a safe no-op; dropping the subscription
/// unsubscribes as well.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    event_type: String,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(registry) = self.registry.upgrade() {
                registry.lock().remove(&self.event_type, self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billboard_protocol::event;
    use serde_json::json;

    fn envelope(event_type: &str) -> Envelope {
        Envelope::new(event_type, json!({ "id": "n-1" }))
    }

    fn collector() -> (
        Arc<Mutex<Vec<String>>>,
        impl Fn(&str) -> Box<dyn Fn(&Value) + Send + Sync>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let make = move |tag: &str| -> Box<dyn Fn(&Value) + Send + Sync> {
            let seen = seen_clone.clone();
            let tag = tag.to_string();
            Box::new(move |_: &Value| seen.lock().push(tag.clone()))
        };
        (seen, make)
    }

    #[test]
    fn test_dispatch_in_subscription_order() {
        let dispatcher = EventDispatcher::new();
        let (seen, make) = collector();

        let _a = dispatcher.subscribe(event::NOTIFICATION_UPDATE, make("first"));
        let _b = dispatcher.subscribe(event::NOTIFICATION_UPDATE, make("second"));
        let _c = dispatcher.subscribe(event::NOTIFICATION_UPDATE, make("third"));

        dispatcher.dispatch(&envelope(event::NOTIFICATION_UPDATE));

        assert_eq!(*seen.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dispatch_only_matching_type() {
        let dispatcher = EventDispatcher::new();
        let (seen, make) = collector();

        let _sub = dispatcher.subscribe(event::NEW_CHECK_IN, make("check_in"));

        dispatcher.dispatch(&envelope(event::STATE_UPDATE));
        assert!(seen.lock().is_empty());

        dispatcher.dispatch(&envelope(event::NEW_CHECK_IN));
        assert_eq!(*seen.lock(), vec!["check_in"]);
    }

    #[test]
    fn test_panicking_subscriber_does_not_suppress_later_ones() {
        let dispatcher = EventDispatcher::new();
        let (seen, make) = collector();

        let _a = dispatcher.subscribe(event::NOTIFICATION_UPDATE, make("before"));
        let _b = dispatcher.subscribe(event::NOTIFICATION_UPDATE, |_: &Value| {
            panic!("subscriber bug")
        });
        let _c = dispatcher.subscribe(event::NOTIFICATION_UPDATE, make("after"));

        dispatcher.dispatch(&envelope(event::NOTIFICATION_UPDATE));

        assert_eq!(*seen.lock(), vec!["before", "after"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery_and_is_idempotent() {
        let dispatcher = EventDispatcher::new();
        let (seen, make) = collector();

        let _kept = dispatcher.subscribe(event::NOTIFICATION_UPDATE, make("kept"));
        let sub = dispatcher.subscribe(event::NOTIFICATION_UPDATE, make("removed"));

        sub.unsubscribe();
        sub.unsubscribe(); // second call is a no-op

        dispatcher.dispatch(&envelope(event::NOTIFICATION_UPDATE));
        assert_eq!(*seen.lock(), vec!["kept"]);
    }

    #[test]
    fn test_registry_entry_removed_when_last_subscriber_leaves() {
        let dispatcher = EventDispatcher::new();

        let a = dispatcher.subscribe(event::BILLBOARD_CLEARED, |_: &Value| {});
        let b = dispatcher.subscribe(event::BILLBOARD_CLEARED, |_: &Value| {});
        assert_eq!(dispatcher.subscriber_count(event::BILLBOARD_CLEARED), 2);

        a.unsubscribe();
        assert_eq!(dispatcher.subscriber_count(event::BILLBOARD_CLEARED), 1);

        drop(b); // dropping unsubscribes too
        assert_eq!(dispatcher.subscriber_count(event::BILLBOARD_CLEARED), 0);
        assert!(!dispatcher
            .registry
            .lock()
            .handlers
            .contains_key(event::BILLBOARD_CLEARED));
    }

    #[test]
    fn test_callback_receives_envelope_data() {
        let dispatcher = EventDispatcher::new();
        let received = Arc::new(Mutex::new(None));

        let received_clone = received.clone();
        let _sub = dispatcher.subscribe(event::BILLBOARD_LAUNCHED, move |data: &Value| {
            *received_clone.lock() = Some(data.clone());
        });

        let payload = json!({ "event_id": "evt-9", "is_active": true });
        dispatcher.dispatch(&Envelope::new(event::BILLBOARD_LAUNCHED, payload.clone()));

        assert_eq!(received.lock().as_ref(), Some(&payload));
    }
}
