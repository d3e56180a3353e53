//! Messages the tracker sends.
//!
//! Everything except the failure reply carries `action` and `info_hash` so
//! a client announcing several swarms over one socket can route replies.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::ids::{InfoHash, PeerId};
use crate::swarm::SwarmStats;

const ANNOUNCE: &str = "announce";
const SCRAPE: &str = "scrape";

/// Acknowledgment of an announce, sent to the announcing session.
///
/// Wire format: `{"action":"announce","info_hash":"…","complete":0,"incomplete":1,"interval":600}`
#[derive(Debug, Clone, Serialize)]
pub struct AnnounceResponse {
    action: &'static str,
    pub info_hash: InfoHash,
    pub complete: u64,
    pub incomplete: u64,
    pub interval: u64,
    #[serde(rename = "warning message", skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl AnnounceResponse {
    pub fn new(info_hash: InfoHash, complete: u64, incomplete: u64, interval: u64) -> Self {
        Self {
            action: ANNOUNCE,
            info_hash,
            complete,
            incomplete,
            interval,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }
}

/// An offer handed to a selected peer; `peer_id` is the offering peer.
#[derive(Debug, Clone, Serialize)]
pub struct Introduction<'a> {
    action: &'static str,
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub offer: &'a Value,
    pub offer_id: &'a str,
}

impl<'a> Introduction<'a> {
    pub fn new(info_hash: InfoHash, peer_id: PeerId, offer: &'a Value, offer_id: &'a str) -> Self {
        Self {
            action: ANNOUNCE,
            info_hash,
            peer_id,
            offer,
            offer_id,
        }
    }
}

/// An answer forwarded to the peer that made the offer; `peer_id` is the
/// answering peer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRelay<'a> {
    action: &'static str,
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub answer: &'a Value,
    pub offer_id: &'a str,
}

impl<'a> AnswerRelay<'a> {
    pub fn new(info_hash: InfoHash, peer_id: PeerId, answer: &'a Value, offer_id: &'a str) -> Self {
        Self {
            action: ANNOUNCE,
            info_hash,
            peer_id,
            answer,
            offer_id,
        }
    }
}

/// Reply to a rejected message.
///
/// Wire format: `{"failure reason":"invalid peer_id"}`
#[derive(Debug, Clone, Serialize)]
pub struct FailureReply {
    #[serde(rename = "failure reason")]
    pub reason: String,
}

impl FailureReply {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Counters for each requested swarm, keyed by the binary-string info hash.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResponse {
    action: &'static str,
    pub files: BTreeMap<String, SwarmStats>,
}

impl ScrapeResponse {
    pub fn new(files: BTreeMap<String, SwarmStats>) -> Self {
        Self {
            action: SCRAPE,
            files,
        }
    }
}
