//! signal-core: swarm state and announce handling for a WebRTC signaling tracker.
//!
//! This crate provides:
//! - 20-byte swarm and peer identifiers with the wire binary-string encoding
//! - The swarm registry and deterministic peer selection
//! - The announce state machine, offer/answer relay and session cleanup
//! - A typed notification bus for hosts
//!
//! It knows nothing about sockets. A host implements [`SessionHandle`] for
//! its connections and feeds each text frame to [`Tracker::handle`], one at
//! a time.

pub mod config;
pub mod events;
pub mod ids;
mod lifecycle;
pub mod protocol;
pub mod relay;
pub mod session;
pub mod swarm;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::TrackerConfig;
pub use events::{EventBus, Subscription, TrackerEvent};
pub use ids::{IdError, InfoHash, PeerId};
pub use protocol::{Request, ValidationError};
pub use session::{SendError, SessionHandle, SessionId};
pub use swarm::{Peer, Swarm, SwarmRegistry, SwarmStats};
pub use tracker::{Binding, Outcome, StateWarning, Tracker};
