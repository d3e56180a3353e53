//! Wire protocol for the announce socket.
//!
//! Messages are JSON text frames. [`inbound`] parses and validates what
//! clients send; [`outbound`] holds the typed replies and relays.

pub mod inbound;
pub mod outbound;

pub use inbound::{
    AnnounceEvent, AnnounceRequest, Answer, Offer, Request, ScrapeRequest, ValidationError,
};
pub use outbound::{AnnounceResponse, AnswerRelay, FailureReply, Introduction, ScrapeResponse};
