//! Announce state machine.
//!
//! `Tracker::handle` takes one text frame from one session and runs it to
//! completion: validate, bind the session on its first message, apply the
//! event to the swarm, acknowledge, then relay offers and answers. The host
//! must not interleave calls; every swarm mutation relies on that.
//!
//! | event       | requires                    | effect                          |
//! |-------------|-----------------------------|---------------------------------|
//! | `started`   | peer absent                 | add peer (seeder if `left == 0`) |
//! | `stopped`   | peer present                | remove peer                     |
//! | `completed` | peer present and incomplete | move peer to seeders            |
//! | update      | peer present                | nothing                         |
//!
//! A failed requirement is a [`StateWarning`]: nothing changes, but the
//! acknowledgment is still sent with a `warning message`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{MAX_OFFERS, TrackerConfig};
use crate::events::{EventBus, TrackerEvent};
use crate::ids::{InfoHash, PeerId};
use crate::protocol::{
    AnnounceEvent, AnnounceRequest, AnnounceResponse, AnswerRelay, FailureReply, Introduction,
    Request, ScrapeRequest, ScrapeResponse, ValidationError,
};
use crate::relay;
use crate::session::{SessionHandle, SessionId};
use crate::swarm::{Peer, Swarm, SwarmRegistry};

/// Soft failures: the event was inconsistent with the peer's presence, or
/// an answer named nobody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateWarning {
    #[error("peer already in swarm")]
    AlreadyInSwarm,
    #[error("peer not in swarm")]
    NotInSwarm,
    #[error("peer already completed")]
    AlreadyCompleted,
    #[error("no peer with that to_peer_id")]
    UnknownTarget,
}

/// The peer and swarm a session announced first. Fixed for the session's
/// lifetime and used to clean up when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub peer_id: PeerId,
    pub info_hash: InfoHash,
}

/// What handling one message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Validation failed; only a failure reply was sent.
    Rejected(ValidationError),
    Announced {
        warning: Option<StateWarning>,
        /// Offers queued to other peers
        introductions: usize,
        answer_relayed: bool,
    },
    Scraped {
        swarms: usize,
    },
}

pub struct Tracker<S> {
    pub(crate) config: TrackerConfig,
    pub(crate) registry: SwarmRegistry<S>,
    pub(crate) bindings: HashMap<SessionId, Binding>,
    pub(crate) events: Arc<EventBus>,
}

impl<S: SessionHandle> Tracker<S> {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_events(config, Arc::new(EventBus::new()))
    }

    /// Create a tracker publishing to an existing bus.
    pub fn with_events(config: TrackerConfig, events: Arc<EventBus>) -> Self {
        Self {
            config,
            registry: SwarmRegistry::new(),
            bindings: HashMap::new(),
            events,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn registry(&self) -> &SwarmRegistry<S> {
        &self.registry
    }

    /// Look up a swarm for inspection, creating it if it does not exist.
    pub fn swarm(&mut self, info_hash: InfoHash) -> &Swarm<S> {
        self.registry.get_or_create(info_hash)
    }

    pub fn binding(&self, session: SessionId) -> Option<Binding> {
        self.bindings.get(&session).copied()
    }

    /// Handle one inbound text frame from `session`.
    pub fn handle(&mut self, session: &S, text: &str) -> Outcome {
        match Request::parse(text) {
            Ok(Request::Announce(request)) => self.announce(session, request),
            Ok(Request::Scrape(request)) => self.scrape(session, request),
            Err(e) => self.reject(session, e),
        }
    }

    fn reject(&self, session: &S, error: ValidationError) -> Outcome {
        warn!("Rejected message from {}: {}", session.id(), error);
        self.events.emit(TrackerEvent::warning(error.to_string()));
        relay::forward(session, &FailureReply::new(error.to_string()), &self.events);
        Outcome::Rejected(error)
    }

    fn announce(&mut self, session: &S, request: AnnounceRequest) -> Outcome {
        self.bindings.entry(session.id()).or_insert(Binding {
            peer_id: request.peer_id,
            info_hash: request.info_hash,
        });

        let events = &self.events;
        let swarm = self.registry.get_or_create(request.info_hash);

        let warning = match apply_event(swarm, session, &request) {
            Ok(event) => {
                events.emit(event);
                None
            }
            Err(warning) => {
                debug!(
                    "Announce warning for {} in {}: {}",
                    request.peer_id, request.info_hash, warning
                );
                events.emit(TrackerEvent::warning(warning.to_string()));
                Some(warning)
            }
        };

        let response = AnnounceResponse::new(
            request.info_hash,
            swarm.complete(),
            swarm.incomplete(),
            self.config.interval,
        )
        .with_warning(warning.map(|w| w.to_string()));
        relay::forward(session, &response, events);

        let mut introductions = 0;
        let want = request
            .offers
            .len()
            .min(self.config.max_offers.min(MAX_OFFERS));
        if want > 0 {
            let selected = swarm.select(want, Some(&request.peer_id));
            for (peer, offer) in selected.into_iter().zip(&request.offers) {
                let intro = Introduction::new(
                    request.info_hash,
                    request.peer_id,
                    &offer.offer,
                    &offer.offer_id,
                );
                if relay::forward(&peer.session, &intro, events) {
                    introductions += 1;
                }
            }
            debug!(
                "Introduced {} to {} peer(s) in {}",
                request.peer_id, introductions, request.info_hash
            );
        }

        let answer_relayed = match &request.answer {
            None => false,
            Some(answer) => {
                let target = PeerId::from_binary_str(&answer.to_peer_id)
                    .ok()
                    .and_then(|id| swarm.peer(&id));
                match target {
                    Some(peer) => {
                        let relay_msg = AnswerRelay::new(
                            request.info_hash,
                            request.peer_id,
                            &answer.answer,
                            &answer.offer_id,
                        );
                        relay::forward(&peer.session, &relay_msg, events)
                    }
                    None => {
                        warn!(
                            "Answer from {} in {} names an unknown peer",
                            request.peer_id, request.info_hash
                        );
                        events.emit(TrackerEvent::warning(StateWarning::UnknownTarget.to_string()));
                        false
                    }
                }
            }
        };

        Outcome::Announced {
            warning,
            introductions,
            answer_relayed,
        }
    }

    fn scrape(&mut self, session: &S, request: ScrapeRequest) -> Outcome {
        let info_hashes: Vec<InfoHash> = if request.info_hashes.is_empty() {
            self.registry.iter().map(|(hash, _)| *hash).collect()
        } else {
            request.info_hashes
        };

        let files: BTreeMap<String, _> = info_hashes
            .into_iter()
            .map(|hash| {
                let stats = self.registry.get_or_create(hash).stats();
                (hash.to_binary_string(), stats)
            })
            .collect();

        let swarms = files.len();
        relay::forward(session, &ScrapeResponse::new(files), &self.events);
        Outcome::Scraped { swarms }
    }
}

/// Apply the announced event to `swarm`, returning the counter notification
/// to raise on success.
fn apply_event<S: SessionHandle>(
    swarm: &mut Swarm<S>,
    session: &S,
    request: &AnnounceRequest,
) -> Result<TrackerEvent, StateWarning> {
    let id = &request.peer_id;
    match request.event {
        AnnounceEvent::Started => {
            let added = swarm.add_peer(Peer {
                id: *id,
                session: session.clone(),
                complete: request.is_seeding(),
            });
            if !added {
                return Err(StateWarning::AlreadyInSwarm);
            }
            Ok(TrackerEvent::start(&request.info_hash, id))
        }
        AnnounceEvent::Stopped => {
            swarm.remove_peer(id).ok_or(StateWarning::NotInSwarm)?;
            Ok(TrackerEvent::stop(&request.info_hash, id))
        }
        AnnounceEvent::Completed => match swarm.peer(id) {
            None => Err(StateWarning::NotInSwarm),
            Some(peer) if peer.complete => Err(StateWarning::AlreadyCompleted),
            Some(_) => {
                swarm.mark_complete(id);
                Ok(TrackerEvent::complete(&request.info_hash, id))
            }
        },
        AnnounceEvent::Update => {
            if !swarm.contains(id) {
                return Err(StateWarning::NotInSwarm);
            }
            Ok(TrackerEvent::update(&request.info_hash, id))
        }
    }
}
