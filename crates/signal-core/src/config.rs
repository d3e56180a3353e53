//! Tracker tunables.

/// Default seconds between a peer's announces.
pub const DEFAULT_INTERVAL_SECS: u64 = 600;

/// Hard ceiling on introductions relayed for one announce.
pub const MAX_OFFERS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Announce interval advertised in every acknowledgment, in seconds
    pub interval: u64,
    /// Upper bound on peers introduced per announce, never above `MAX_OFFERS`
    pub max_offers: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_SECS,
            max_offers: MAX_OFFERS,
        }
    }
}

impl TrackerConfig {
    pub fn with_interval(interval: u64) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }
}
