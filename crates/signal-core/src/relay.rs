//! Fire-and-forget delivery of payloads to sessions.
//!
//! A failed hand-off is reported as a warning and otherwise ignored; the
//! sender of the triggering message never hears about it. The transport
//! raises the session's one transport error when it reports the failure.

use serde::Serialize;
use tracing::{debug, warn};

use crate::events::{EventBus, TrackerEvent};
use crate::session::SessionHandle;

/// Serialize `payload` and queue it on `target`. Returns whether the
/// transport accepted it.
pub fn forward<S, T>(target: &S, payload: &T, events: &EventBus) -> bool
where
    S: SessionHandle,
    T: Serialize,
{
    let text = match serde_json::to_string(payload) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode message for {}: {}", target.id(), e);
            events.emit(TrackerEvent::warning(format!("encode failed: {e}")));
            return false;
        }
    };

    match target.send(text) {
        Ok(()) => {
            debug!("Queued message for {}", target.id());
            true
        }
        Err(e) => {
            warn!("Relay to {} failed: {}", target.id(), e);
            events.emit(TrackerEvent::warning(format!("relay failed: {e}")));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FailureReply;
    use crate::testing::RecordingSession;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_forward_queues_json() {
        let bus = EventBus::new();
        let session = RecordingSession::new(1);

        assert!(forward(&session, &FailureReply::new("nope"), &bus));
        assert_eq!(session.sent()[0]["failure reason"], "nope");
    }

    #[test]
    fn test_forward_to_closed_session_warns() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = bus.subscribe(move |event| sink.lock().unwrap().push(event));

        let session = RecordingSession::new(4);
        session.close();

        assert!(!forward(&session, &FailureReply::new("nope"), &bus));
        assert!(session.sent().is_empty());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![TrackerEvent::Warning {
                message: "relay failed: session conn-4 is closed".into(),
            }]
        );
    }
}
