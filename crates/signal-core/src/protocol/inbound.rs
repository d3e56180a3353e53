//! Parsing and validation of client messages.
//!
//! Wire format (announce):
//! `{"action":"announce","info_hash":"…","peer_id":"…","event":"started","left":0,
//!   "offers":[{"offer":{…},"offer_id":"…"}],"answer":{…},"to_peer_id":"…","offer_id":"…"}`
//!
//! Every check happens here, before the tracker touches any swarm state, so
//! a rejected message never mutates anything.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::ids::{InfoHash, PeerId};

/// Hard failures. The `Display` text is sent back as the `failure reason`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid message")]
    Malformed,
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("invalid info_hash")]
    InvalidInfoHash,
    #[error("invalid peer_id")]
    InvalidPeerId,
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("invalid offers")]
    InvalidOffers,
    #[error("invalid to_peer_id")]
    InvalidToPeerId,
    #[error("invalid offer_id")]
    InvalidOfferId,
}

/// Declared announce event. An empty or missing event is a plain update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceEvent {
    Started,
    Stopped,
    Completed,
    Update,
}

impl AnnounceEvent {
    fn parse(value: Option<&Value>) -> Result<Self, ValidationError> {
        match value {
            None => Ok(Self::Update),
            Some(Value::String(s)) => match s.as_str() {
                "" => Ok(Self::Update),
                "started" => Ok(Self::Started),
                "stopped" => Ok(Self::Stopped),
                "completed" => Ok(Self::Completed),
                other => Err(ValidationError::InvalidEvent(other.to_string())),
            },
            Some(other) => Err(ValidationError::InvalidEvent(other.to_string())),
        }
    }
}

/// One negotiation offer to be handed to another peer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Offer {
    pub offer: Value,
    pub offer_id: String,
}

/// A negotiation answer addressed to one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: Value,
    /// Only type-checked; an id that decodes to nothing simply never matches.
    pub to_peer_id: String,
    pub offer_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub event: AnnounceEvent,
    /// Bytes left to download, when the client sent a number
    pub left: Option<f64>,
    pub offers: Vec<Offer>,
    pub answer: Option<Answer>,
}

impl AnnounceRequest {
    /// `started` with exactly zero bytes left counts as a seeder.
    pub fn is_seeding(&self) -> bool {
        self.left == Some(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRequest {
    /// Swarms to report; empty means every known swarm.
    pub info_hashes: Vec<InfoHash>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

/// Loosely typed view of a message; field types are checked afterwards so
/// each problem maps to its own failure reason.
#[derive(Debug, Deserialize)]
struct RawMessage {
    action: Option<Value>,
    info_hash: Option<Value>,
    peer_id: Option<Value>,
    event: Option<Value>,
    left: Option<Value>,
    offers: Option<Value>,
    answer: Option<Value>,
    to_peer_id: Option<Value>,
    offer_id: Option<Value>,
}

impl Request {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(text).map_err(|_| ValidationError::Malformed)?;
        if !value.is_object() {
            return Err(ValidationError::Malformed);
        }
        let mut raw: RawMessage =
            serde_json::from_value(value).map_err(|_| ValidationError::Malformed)?;

        let action = match raw.action.take() {
            None => None,
            Some(Value::String(action)) => Some(action),
            Some(other) => return Err(ValidationError::InvalidAction(other.to_string())),
        };

        match action.as_deref() {
            None | Some("announce") => AnnounceRequest::from_raw(raw).map(Request::Announce),
            Some("scrape") => ScrapeRequest::from_raw(raw).map(Request::Scrape),
            Some(other) => Err(ValidationError::InvalidAction(other.to_string())),
        }
    }
}

fn parse_info_hash(value: &Value) -> Result<InfoHash, ValidationError> {
    value
        .as_str()
        .and_then(|s| InfoHash::from_binary_str(s).ok())
        .ok_or(ValidationError::InvalidInfoHash)
}

impl AnnounceRequest {
    fn from_raw(raw: RawMessage) -> Result<Self, ValidationError> {
        let peer_id = raw
            .peer_id
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| PeerId::from_binary_str(s).ok())
            .ok_or(ValidationError::InvalidPeerId)?;
        let info_hash = raw
            .info_hash
            .as_ref()
            .ok_or(ValidationError::InvalidInfoHash)
            .and_then(parse_info_hash)?;
        let event = AnnounceEvent::parse(raw.event.as_ref())?;

        let offers = match raw.offers {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value::<Vec<Offer>>(value)
                .map_err(|_| ValidationError::InvalidOffers)?,
        };

        let answer = match raw.answer {
            None | Some(Value::Null) => None,
            Some(answer) => {
                let to_peer_id = match raw.to_peer_id {
                    Some(Value::String(s)) => s,
                    _ => return Err(ValidationError::InvalidToPeerId),
                };
                let offer_id = match raw.offer_id {
                    Some(Value::String(s)) => s,
                    _ => return Err(ValidationError::InvalidOfferId),
                };
                Some(Answer {
                    answer,
                    to_peer_id,
                    offer_id,
                })
            }
        };

        Ok(Self {
            info_hash,
            peer_id,
            event,
            left: raw.left.as_ref().and_then(Value::as_f64),
            offers,
            answer,
        })
    }
}

impl ScrapeRequest {
    fn from_raw(raw: RawMessage) -> Result<Self, ValidationError> {
        let info_hashes = match raw.info_hash {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values
                .iter()
                .map(parse_info_hash)
                .collect::<Result<_, _>>()?,
            Some(value) => vec![parse_info_hash(&value)?],
        };
        Ok(Self { info_hashes })
    }
}
