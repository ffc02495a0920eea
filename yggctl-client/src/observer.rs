//! Response observers and the merged payload snapshot
//!
//! Observers are registered per operation name and run after every
//! successful call of that operation, in registration order. Failed calls
//! never reach them.

use serde_json::{Map, Value};

/// Handle returned when registering an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Trait for reacting to successful responses
pub trait ResponseObserver: Send {
    /// Handle the payload of a successful call
    fn on_response(&mut self, operation: &str, payload: &Value);
}

/// Simple callback-based observer
pub struct CallbackObserver<F>
where
    F: FnMut(&Value) + Send,
{
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: FnMut(&Value) + Send,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ResponseObserver for CallbackObserver<F>
where
    F: FnMut(&Value) + Send,
{
    fn on_response(&mut self, _operation: &str, payload: &Value) {
        (self.callback)(payload);
    }
}

struct Registration {
    id: ObserverId,
    operation: String,
    observer: Box<dyn ResponseObserver>,
}

/// Observer registry plus the snapshot of everything received so far
#[derive(Default)]
pub(crate) struct Tracker {
    registrations: Vec<Registration>,
    next_id: u64,
    snapshot: Map<String, Value>,
}

impl Tracker {
    pub(crate) fn add(
        &mut self,
        operation: impl Into<String>,
        observer: Box<dyn ResponseObserver>,
    ) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            id,
            operation: operation.into(),
            observer,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Record a successful call: merge it into the snapshot, then notify
    pub(crate) fn record(&mut self, operation: &str, payload: &Value) {
        if let Value::Object(fields) = payload {
            for (key, value) in fields {
                self.snapshot.insert(key.clone(), value.clone());
            }
        }

        for registration in self
            .registrations
            .iter_mut()
            .filter(|r| r.operation == operation)
        {
            registration.observer.on_response(operation, payload);
        }
    }

    pub(crate) fn snapshot(&self) -> &Map<String, Value> {
        &self.snapshot
    }

    pub(crate) fn clear_snapshot(&mut self) {
        self.snapshot.clear();
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("observers", &self.registrations.len())
            .field("snapshot_keys", &self.snapshot.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_callback_observer_receives_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let mut observer = CallbackObserver::new(move |payload: &Value| {
            seen_clone.lock().unwrap().push(payload.clone());
        });

        observer.on_response("getSelf", &json!({"self": {}}));
        assert_eq!(*seen.lock().unwrap(), vec![json!({"self": {}})]);
    }

    #[test]
    fn test_tracker_notifies_matching_operation_only() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let mut tracker = Tracker::default();
        tracker.add(
            "getPeers",
            Box::new(CallbackObserver::new(move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            })),
        );

        tracker.record("getPeers", &json!({"peers": {}}));
        tracker.record("getSelf", &json!({"self": {}}));
        tracker.record("getPeers", &json!({"peers": {}}));

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_tracker_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = Tracker::default();

        for name in ["first", "second"] {
            let order = order.clone();
            tracker.add(
                "getDHT",
                Box::new(CallbackObserver::new(move |_| order.lock().unwrap().push(name))),
            );
        }

        tracker.record("getDHT", &json!({"dht": {}}));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_tracker_remove() {
        let mut tracker = Tracker::default();
        let id = tracker.add("getSelf", Box::new(CallbackObserver::new(|_| {})));

        assert!(tracker.remove(id));
        assert!(!tracker.remove(id));
    }

    #[test]
    fn test_snapshot_merges_object_payloads() {
        let mut tracker = Tracker::default();
        tracker.record("getSelf", &json!({"self": {"200:1::1": {}}}));
        tracker.record("getPeers", &json!({"peers": {}}));
        tracker.record("getPeers", &json!({"peers": {"a": 1}}));
        tracker.record("list", &json!(["getSelf"]));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["peers"], json!({"a": 1}));

        tracker.clear_snapshot();
        assert!(tracker.snapshot().is_empty());
    }

    // Sessions must stay Send, so observers must be too
    fn assert_send<T: Send>() {}

    #[test]
    fn test_callback_observer_is_send() {
        assert_send::<CallbackObserver<fn(&Value)>>();
        assert_send::<Tracker>();
    }
}
