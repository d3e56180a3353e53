//! In-memory session used by unit tests.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::session::{SendError, SessionHandle, SessionId};

/// Records everything sent to it; can be closed to simulate a dead socket.
#[derive(Debug, Clone)]
pub(crate) struct RecordingSession {
    id: SessionId,
    outbox: Arc<Mutex<Vec<String>>>,
    open: Arc<AtomicBool>,
}

impl RecordingSession {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id: SessionId(id),
            outbox: Arc::new(Mutex::new(Vec::new())),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Everything sent so far, parsed as JSON.
    pub(crate) fn sent(&self) -> Vec<Value> {
        self.outbox
            .lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.outbox.lock().unwrap().clear();
    }

    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl SessionHandle for RecordingSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn send(&self, text: String) -> Result<(), SendError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(SendError::Closed(self.id));
        }
        self.outbox.lock().unwrap().push(text);
        Ok(())
    }
}
