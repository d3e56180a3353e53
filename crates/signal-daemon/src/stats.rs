//! Per-event counters fed from the tracker's notification bus.

use serde::Serialize;
use signal_core::{EventBus, Subscription, TrackerEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct AnnounceStats {
    started: AtomicU64,
    stopped: AtomicU64,
    completed: AtomicU64,
    updated: AtomicU64,
    warnings: AtomicU64,
    transport_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub started: u64,
    pub stopped: u64,
    pub completed: u64,
    pub updated: u64,
    pub warnings: u64,
    pub transport_errors: u64,
}

impl AnnounceStats {
    /// Count events from `bus` for as long as the returned subscription lives.
    pub fn attach(self: &Arc<Self>, bus: &Arc<EventBus>) -> Subscription {
        let stats = Arc::clone(self);
        bus.subscribe(move |event| stats.record(&event))
    }

    pub fn record(&self, event: &TrackerEvent) {
        let counter = match event {
            TrackerEvent::Start { .. } => &self.started,
            TrackerEvent::Stop { .. } => &self.stopped,
            TrackerEvent::Complete { .. } => &self.completed,
            TrackerEvent::Update { .. } => &self.updated,
            TrackerEvent::Warning { .. } => &self.warnings,
            TrackerEvent::TransportError { .. } => &self.transport_errors,
            TrackerEvent::Listening { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            stopped: self.stopped.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}
