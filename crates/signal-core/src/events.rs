//! Tracker notifications and the bus hosts subscribe to for logging and
//! counters.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::ids::{InfoHash, PeerId};

/// Notifications raised while serving sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrackerEvent {
    /// The host's listening endpoint is ready.
    Listening { address: String },
    /// A session reported a transport-level failure.
    TransportError { session: String, message: String },
    /// Rejected input, a state warning, or an undeliverable relay.
    Warning { message: String },
    /// A peer joined a swarm.
    Start {
        #[serde(rename = "infoHash")]
        info_hash: String,
        #[serde(rename = "peerId")]
        peer_id: String,
    },
    /// A peer left a swarm with a `stopped` announce.
    Stop {
        #[serde(rename = "infoHash")]
        info_hash: String,
        #[serde(rename = "peerId")]
        peer_id: String,
    },
    /// A peer finished downloading.
    Complete {
        #[serde(rename = "infoHash")]
        info_hash: String,
        #[serde(rename = "peerId")]
        peer_id: String,
    },
    /// A regular re-announce from a present peer.
    Update {
        #[serde(rename = "infoHash")]
        info_hash: String,
        #[serde(rename = "peerId")]
        peer_id: String,
    },
}

impl TrackerEvent {
    pub(crate) fn start(info_hash: &InfoHash, peer_id: &PeerId) -> Self {
        Self::Start {
            info_hash: info_hash.to_string(),
            peer_id: peer_id.to_string(),
        }
    }

    pub(crate) fn stop(info_hash: &InfoHash, peer_id: &PeerId) -> Self {
        Self::Stop {
            info_hash: info_hash.to_string(),
            peer_id: peer_id.to_string(),
        }
    }

    pub(crate) fn complete(info_hash: &InfoHash, peer_id: &PeerId) -> Self {
        Self::Complete {
            info_hash: info_hash.to_string(),
            peer_id: peer_id.to_string(),
        }
    }

    pub(crate) fn update(info_hash: &InfoHash, peer_id: &PeerId) -> Self {
        Self::Update {
            info_hash: info_hash.to_string(),
            peer_id: peer_id.to_string(),
        }
    }

    pub(crate) fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }
}

type Callback = Arc<dyn Fn(TrackerEvent) + Send + Sync>;

/// Registered callbacks keyed by subscription number.
#[derive(Default)]
struct Subscribers {
    next: u64,
    callbacks: BTreeMap<u64, Callback>,
}

/// Fan-out point for tracker notifications. Shared as `Arc<EventBus>`
/// between the tracker and whatever the host hangs off it.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Subscribers>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `callback` for every future event until the returned
    /// `Subscription` is dropped.
    pub fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(TrackerEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let mut subscribers = self.subscribers();
        let key = subscribers.next;
        subscribers.next += 1;
        subscribers.callbacks.insert(key, Arc::new(callback));
        Subscription {
            bus: Arc::downgrade(self),
            key,
        }
    }

    /// Deliver `event` to every subscriber in registration order. The lock
    /// is released before any callback runs.
    pub fn emit(&self, event: TrackerEvent) {
        let callbacks: Vec<Callback> = self.subscribers().callbacks.values().cloned().collect();
        for callback in callbacks {
            callback(event.clone());
        }
    }
}

/// Keeps a callback registered on an `EventBus`; dropping it unregisters.
pub struct Subscription {
    bus: Weak<EventBus>,
    key: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.subscribers().callbacks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collect(bus: &Arc<EventBus>) -> (Subscription, Arc<Mutex<Vec<TrackerEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = bus.subscribe(move |event| sink.lock().unwrap().push(event));
        (sub, seen)
    }

    #[test]
    fn test_subscribe_and_emit() {
        let bus = Arc::new(EventBus::new());
        let (_sub, seen) = collect(&bus);

        bus.emit(TrackerEvent::warning("careful"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![TrackerEvent::Warning {
                message: "careful".into()
            }]
        );
    }

    #[test]
    fn test_subscription_unsubscribes_on_drop() {
        let bus = Arc::new(EventBus::new());
        let (sub, seen) = collect(&bus);

        bus.emit(TrackerEvent::warning("one"));
        drop(sub);
        bus.emit(TrackerEvent::warning("two"));

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_callback_may_drop_its_own_subscription() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(Mutex::new(0));

        let (slot_cb, hits_cb) = (Arc::clone(&slot), Arc::clone(&hits));
        let sub = bus.subscribe(move |_| {
            *hits_cb.lock().unwrap() += 1;
            slot_cb.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(sub);

        bus.emit(TrackerEvent::warning("one"));
        bus.emit(TrackerEvent::warning("two"));

        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_multiple_subscribers() {
        let bus = Arc::new(EventBus::new());
        let (_a, seen_a) = collect(&bus);
        let (_b, seen_b) = collect(&bus);

        bus.emit(TrackerEvent::Listening {
            address: "127.0.0.1:8000".into(),
        });

        assert_eq!(seen_a.lock().unwrap().len(), 1);
        assert_eq!(seen_b.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_event_serialization() {
        let event = TrackerEvent::start(&InfoHash::from([0x01; 20]), &PeerId::from([0x02; 20]));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"start\""));
        assert!(json.contains(&format!("\"infoHash\":\"{}\"", "01".repeat(20))));
        assert!(json.contains(&format!("\"peerId\":\"{}\"", "02".repeat(20))));
    }
}
