//! signal-daemon library: exposes the transport host for testing.
//!
//! A thin layer over the daemon components, allowing integration tests
//! to run a real server on a random port.

pub mod config;
pub mod connection;
pub mod daemon;
pub mod server;
pub mod stats;

// Re-export key types for convenience
pub use config::Args;
pub use connection::{ConnectionEvent, IncomingMessage, MAX_MESSAGE_SIZE, WsSession};
pub use daemon::Daemon;
pub use server::{ServerEvent, WebSocketServer};
pub use stats::{AnnounceStats, StatsSnapshot};
