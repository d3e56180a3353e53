//! Swarm registry and peer selection.
//!
//! A swarm is every peer announcing the same info hash, plus the aggregate
//! seeder/leecher counters. Swarms are created on first reference and are
//! never evicted. Peer entries are deleted outright on removal.
//!
//! Every mutation goes through `add_peer`, `remove_peer` and
//! `mark_complete`, which keep `complete + incomplete` equal to the number
//! of peers in the map.

use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::ids::{InfoHash, PeerId};
use crate::session::SessionHandle;

/// One session's membership in one swarm.
#[derive(Debug, Clone)]
pub struct Peer<S> {
    pub id: PeerId,
    /// Where messages for this peer are delivered
    pub session: S,
    /// Whether the peer has the full content
    pub complete: bool,
}

/// Counter snapshot, as reported by scrape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SwarmStats {
    pub complete: u64,
    pub incomplete: u64,
    pub downloaded: u64,
}

#[derive(Debug)]
pub struct Swarm<S> {
    complete: u64,
    incomplete: u64,
    /// Successful `completed` transitions, never decremented
    downloaded: u64,
    /// Ordered by peer id so enumeration is deterministic
    peers: BTreeMap<PeerId, Peer<S>>,
}

impl<S> Default for Swarm<S> {
    fn default() -> Self {
        Self {
            complete: 0,
            incomplete: 0,
            downloaded: 0,
            peers: BTreeMap::new(),
        }
    }
}

impl<S: SessionHandle> Swarm<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(&self) -> u64 {
        self.complete
    }

    pub fn incomplete(&self) -> u64 {
        self.incomplete
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn stats(&self) -> SwarmStats {
        SwarmStats {
            complete: self.complete,
            incomplete: self.incomplete,
            downloaded: self.downloaded,
        }
    }

    pub fn peer(&self, id: &PeerId) -> Option<&Peer<S>> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Insert a peer and count it. Returns false (and changes nothing) if
    /// the id is already present.
    pub fn add_peer(&mut self, peer: Peer<S>) -> bool {
        match self.peers.entry(peer.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                if peer.complete {
                    self.complete += 1;
                } else {
                    self.incomplete += 1;
                }
                slot.insert(peer);
                true
            }
        }
    }

    /// Delete a peer and uncount it.
    pub fn remove_peer(&mut self, id: &PeerId) -> Option<Peer<S>> {
        let peer = self.peers.remove(id)?;
        if peer.complete {
            self.complete = self.complete.saturating_sub(1);
        } else {
            self.incomplete = self.incomplete.saturating_sub(1);
        }
        Some(peer)
    }

    /// Flip a present, incomplete peer to complete. Returns false if the
    /// peer is absent or already complete.
    pub fn mark_complete(&mut self, id: &PeerId) -> bool {
        match self.peers.get_mut(id) {
            Some(peer) if !peer.complete => {
                peer.complete = true;
                self.complete += 1;
                self.incomplete = self.incomplete.saturating_sub(1);
                self.downloaded += 1;
                true
            }
            _ => false,
        }
    }

    /// Pick up to `want` peers for negotiation pairing, in map order,
    /// skipping `exclude`.
    pub fn select(&self, want: usize, exclude: Option<&PeerId>) -> Vec<&Peer<S>> {
        self.peers
            .values()
            .filter(|peer| Some(&peer.id) != exclude)
            .take(want)
            .collect()
    }
}

/// Owner of all swarm state for the lifetime of the tracker.
#[derive(Debug)]
pub struct SwarmRegistry<S> {
    swarms: HashMap<InfoHash, Swarm<S>>,
}

impl<S> Default for SwarmRegistry<S> {
    fn default() -> Self {
        Self {
            swarms: HashMap::new(),
        }
    }
}

impl<S: SessionHandle> SwarmRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing swarm for `info_hash`, or a fresh empty one.
    pub fn get_or_create(&mut self, info_hash: InfoHash) -> &mut Swarm<S> {
        self.swarms.entry(info_hash).or_default()
    }

    /// Read-only lookup that does not create.
    pub fn get(&self, info_hash: &InfoHash) -> Option<&Swarm<S>> {
        self.swarms.get(info_hash)
    }

    pub fn get_mut(&mut self, info_hash: &InfoHash) -> Option<&mut Swarm<S>> {
        self.swarms.get_mut(info_hash)
    }

    pub fn len(&self) -> usize {
        self.swarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swarms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InfoHash, &Swarm<S>)> {
        self.swarms.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSession;

    fn peer(n: u8, complete: bool) -> Peer<RecordingSession> {
        Peer {
            id: PeerId::from([n; 20]),
            session: RecordingSession::new(n as u64),
            complete,
        }
    }

    #[test]
    fn test_get_or_create_is_lazy_and_stable() {
        let mut registry: SwarmRegistry<RecordingSession> = SwarmRegistry::new();
        let hash = InfoHash::from([7; 20]);
        assert!(registry.get(&hash).is_none());

        registry.get_or_create(hash).add_peer(peer(1, false));
        assert_eq!(registry.len(), 1);

        let swarm = registry.get_or_create(hash);
        assert_eq!(swarm.incomplete(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_peer_counts_by_completion() {
        let mut swarm = Swarm::new();
        assert!(swarm.add_peer(peer(1, true)));
        assert!(swarm.add_peer(peer(2, false)));
        assert_eq!((swarm.complete(), swarm.incomplete()), (1, 1));
    }

    #[test]
    fn test_add_duplicate_changes_nothing() {
        let mut swarm = Swarm::new();
        assert!(swarm.add_peer(peer(1, false)));
        assert!(!swarm.add_peer(peer(1, true)));
        assert_eq!((swarm.complete(), swarm.incomplete()), (0, 1));
        assert!(!swarm.peer(&PeerId::from([1; 20])).unwrap().complete);
    }

    #[test]
    fn test_remove_peer_uncounts() {
        let mut swarm = Swarm::new();
        swarm.add_peer(peer(1, true));
        swarm.add_peer(peer(2, false));

        assert!(swarm.remove_peer(&PeerId::from([1; 20])).is_some());
        assert_eq!((swarm.complete(), swarm.incomplete()), (0, 1));
        assert!(swarm.remove_peer(&PeerId::from([1; 20])).is_none());
        assert_eq!(swarm.peer_count(), 1);
    }

    #[test]
    fn test_mark_complete_once() {
        let mut swarm = Swarm::new();
        swarm.add_peer(peer(1, false));
        let id = PeerId::from([1; 20]);

        assert!(swarm.mark_complete(&id));
        assert!(!swarm.mark_complete(&id));
        assert_eq!(swarm.stats(), SwarmStats {
            complete: 1,
            incomplete: 0,
            downloaded: 1,
        });
        assert!(!swarm.mark_complete(&PeerId::from([9; 20])));
    }

    #[test]
    fn test_select_is_ordered_bounded_and_skips_excluded() {
        let mut swarm = Swarm::new();
        for n in [5, 1, 4, 2, 3] {
            swarm.add_peer(peer(n, false));
        }

        let picked: Vec<u8> = swarm
            .select(3, Some(&PeerId::from([2; 20])))
            .iter()
            .map(|p| p.id.as_bytes()[0])
            .collect();
        assert_eq!(picked, vec![1, 3, 4]);

        assert_eq!(swarm.select(10, None).len(), 5);
        assert!(swarm.select(0, None).is_empty());
    }

    #[test]
    fn test_counters_match_peers_after_mixed_operations() {
        let mut swarm = Swarm::new();
        for n in 0..6 {
            swarm.add_peer(peer(n, n % 2 == 0));
        }
        swarm.mark_complete(&PeerId::from([1; 20]));
        swarm.remove_peer(&PeerId::from([2; 20]));
        swarm.remove_peer(&PeerId::from([3; 20]));

        assert_eq!(
            (swarm.complete() + swarm.incomplete()) as usize,
            swarm.peer_count()
        );
    }
}
