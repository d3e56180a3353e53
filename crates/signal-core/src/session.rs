//! Transport seam: what the tracker needs from a live connection.
//!
//! The transport owns its connections. The tracker only holds cheap
//! handles to them, and the only thing it does with a handle is queue a
//! text message. Delivery happens later. A delivery failure comes back
//! from the transport as an independent close/error for that session.

use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Transport-assigned identifier of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("session {0} is closed")]
    Closed(SessionId),
}

/// A handle to a transport session that can accept outbound text.
///
/// `send` must not block: it queues the message and returns. Handles are
/// cloned into every swarm the session joins.
pub trait SessionHandle: Clone {
    fn id(&self) -> SessionId;

    fn send(&self, text: String) -> Result<(), SendError>;
}
