//! Cleanup when the transport reports a session gone.

use tracing::{debug, info, warn};

use crate::events::TrackerEvent;
use crate::session::{SessionHandle, SessionId};
use crate::tracker::Tracker;

impl<S: SessionHandle> Tracker<S> {
    /// Forget a closed session and remove the peer it announced first.
    ///
    /// Counters are decremented exactly as for `stopped`. The peer entry is
    /// only removed while it still belongs to this session. Returns whether
    /// a peer was removed; calling this again is a no-op.
    pub fn on_session_ended(&mut self, session: SessionId) -> bool {
        let Some(binding) = self.bindings.remove(&session) else {
            debug!("Session {} ended without announcing", session);
            return false;
        };
        let Some(swarm) = self.registry.get_mut(&binding.info_hash) else {
            return false;
        };

        let owned = swarm
            .peer(&binding.peer_id)
            .is_some_and(|peer| peer.session.id() == session);
        if !owned {
            debug!(
                "Session {} ended; {} no longer registered in {}",
                session, binding.peer_id, binding.info_hash
            );
            return false;
        }

        swarm.remove_peer(&binding.peer_id);
        info!(
            "Removed {} from {} after {} ended",
            binding.peer_id, binding.info_hash, session
        );
        true
    }

    /// A transport failure on `session`: notify, then clean up as for a close.
    pub fn on_transport_error(&mut self, session: SessionId, message: &str) -> bool {
        warn!("Transport error on {}: {}", session, message);
        self.events.emit(TrackerEvent::TransportError {
            session: session.to_string(),
            message: message.to_string(),
        });
        self.on_session_ended(session)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::RecordingSession;
    use crate::{InfoHash, SessionHandle, Tracker, TrackerConfig, TrackerEvent};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    const HASH: &str = "HHHHHHHHHHHHHHHHHHHH";
    const PEER_A: &str = "AAAAAAAAAAAAAAAAAAAA";
    const PEER_B: &str = "BBBBBBBBBBBBBBBBBBBB";

    fn announce(peer: &str, event: &str, left: u64) -> String {
        json!({ "peer_id": peer, "info_hash": HASH, "event": event, "left": left }).to_string()
    }

    fn counters(tracker: &mut Tracker<RecordingSession>) -> (u64, u64, usize) {
        let swarm = tracker.swarm(InfoHash::from_binary_str(HASH).unwrap());
        (swarm.complete(), swarm.incomplete(), swarm.peer_count())
    }

    #[test]
    fn test_close_removes_peer_and_counts() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let a = RecordingSession::new(1);
        let b = RecordingSession::new(2);
        tracker.handle(&a, &announce(PEER_A, "started", 0));
        tracker.handle(&b, &announce(PEER_B, "started", 10));

        assert!(tracker.on_session_ended(a.id()));

        assert_eq!(counters(&mut tracker), (0, 1, 1));
        assert!(tracker.binding(a.id()).is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let a = RecordingSession::new(1);
        tracker.handle(&a, &announce(PEER_A, "started", 10));

        assert!(tracker.on_session_ended(a.id()));
        assert!(!tracker.on_session_ended(a.id()));
        assert_eq!(counters(&mut tracker), (0, 0, 0));
    }

    #[test]
    fn test_close_of_unbound_session_is_noop() {
        let mut tracker: Tracker<RecordingSession> = Tracker::new(TrackerConfig::default());
        assert!(!tracker.on_session_ended(RecordingSession::new(9).id()));
        assert!(tracker.registry().is_empty());
    }

    #[test]
    fn test_close_after_stop_does_not_double_count() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let a = RecordingSession::new(1);
        let b = RecordingSession::new(2);
        tracker.handle(&a, &announce(PEER_A, "started", 10));
        tracker.handle(&b, &announce(PEER_B, "started", 10));
        tracker.handle(&a, &announce(PEER_A, "stopped", 10));

        assert!(!tracker.on_session_ended(a.id()));
        assert_eq!(counters(&mut tracker), (0, 1, 1));
    }

    #[test]
    fn test_close_spares_entry_owned_by_another_session() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let first = RecordingSession::new(1);
        let second = RecordingSession::new(2);
        tracker.handle(&first, &announce(PEER_A, "started", 10));
        tracker.handle(&first, &announce(PEER_A, "stopped", 10));
        tracker.handle(&second, &announce(PEER_A, "started", 10));

        assert!(!tracker.on_session_ended(first.id()));
        assert_eq!(counters(&mut tracker), (0, 1, 1));
    }

    #[test]
    fn test_transport_error_notifies_and_cleans_up() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = tracker
            .events()
            .subscribe(move |event| sink.lock().unwrap().push(event));
        let a = RecordingSession::new(3);
        tracker.handle(&a, &announce(PEER_A, "started", 10));

        assert!(tracker.on_transport_error(a.id(), "connection reset"));

        assert_eq!(counters(&mut tracker), (0, 0, 0));
        assert!(seen.lock().unwrap().contains(&TrackerEvent::TransportError {
            session: "conn-3".into(),
            message: "connection reset".into(),
        }));
    }

    #[test]
    fn test_dead_relay_target_counts_one_transport_error() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = tracker
            .events()
            .subscribe(move |event| sink.lock().unwrap().push(event));
        let a = RecordingSession::new(1);
        let b = RecordingSession::new(2);
        tracker.handle(&b, &announce(PEER_B, "started", 10));
        b.close();

        let offer = json!({
            "peer_id": PEER_A,
            "info_hash": HASH,
            "event": "started",
            "offers": [{ "offer": { "sdp": "x" }, "offer_id": "o-1" }],
        });
        tracker.handle(&a, &offer.to_string());
        tracker.on_transport_error(b.id(), "write failed");

        let transport_errors = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, TrackerEvent::TransportError { .. }))
            .count();
        assert_eq!(transport_errors, 1);
        assert!(seen.lock().unwrap().contains(&TrackerEvent::Warning {
            message: "relay failed: session conn-2 is closed".into(),
        }));
        assert_eq!(counters(&mut tracker), (0, 1, 1));
    }
}
