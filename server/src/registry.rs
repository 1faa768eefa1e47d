//! Registry of live matches
//!
//! This module owns every running [`Match`] and handles:
//! - Match creation with collision-checked random identifiers
//! - Identifier lookup for joins, attaches and moves
//! - Seat release and removal of matches once both seats are free
//! - Reaping of matches that sit idle with no stream attached
//!
//! Matches are stored in a sharded concurrent map. Operations that may remove
//! an entry hold that entry's shard lock across the match's own check, so a
//! lookup of the same identifier either sees the match fully present or not
//! at all. Operations on matches in different shards never contend.

use crate::error::SessionError;
use crate::game::{AttachmentId, Match};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{info, warn};
use rand::Rng;
use shared::{MatchId, Packet, Side};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct Registry {
    /// Live matches indexed by identifier
    matches: DashMap<MatchId, Arc<Match>>,
    /// Soft cap on concurrently live matches
    max_matches: usize,
}

impl Registry {
    pub fn new(max_matches: usize) -> Self {
        Self {
            matches: DashMap::new(),
            max_matches,
        }
    }

    /// Creates and registers a new match with its creator seated as Red.
    ///
    /// Identifiers are random non-negative 31-bit values, redrawn until one is
    /// free. The capacity check is not atomic with the insert, so a burst of
    /// concurrent creations may overshoot `max_matches` slightly.
    pub fn new_match(&self) -> Result<(MatchId, Side), SessionError> {
        if self.matches.len() >= self.max_matches {
            warn!("Refusing new match: {} matches live", self.max_matches);
            return Err(SessionError::ServerFull(self.max_matches));
        }

        let mut rng = rand::thread_rng();
        loop {
            let id = rng.gen_range(0..=i32::MAX as u32);
            if let Entry::Vacant(slot) = self.matches.entry(id) {
                let game = Arc::new(Match::new(id));
                let side = game.join()?;
                slot.insert(game);
                info!("Match {} created", id);
                return Ok((id, side));
            }
        }
    }

    pub fn lookup(&self, id: MatchId) -> Result<Arc<Match>, SessionError> {
        self.matches
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::NoSuchMatch(id))
    }

    /// Seats a player in an existing match.
    pub fn join(&self, id: MatchId) -> Result<Side, SessionError> {
        let game = self.matches.get(&id).ok_or(SessionError::NoSuchMatch(id))?;
        game.join()
    }

    /// Frees a seat and removes the match if that left it empty.
    pub fn leave(&self, id: MatchId, side: Side) -> Result<(), SessionError> {
        let vacant = {
            let game = self.matches.get(&id).ok_or(SessionError::NoSuchMatch(id))?;
            game.leave(side)
        };
        if vacant {
            self.remove(id);
        }
        Ok(())
    }

    /// Binds an outbound channel to a seat of an existing match.
    pub fn attach(
        &self,
        id: MatchId,
        side: Side,
        sender: mpsc::Sender<Packet>,
    ) -> Result<AttachmentId, SessionError> {
        let game = self.matches.get(&id).ok_or(SessionError::NoSuchMatch(id))?;
        Ok(game.attach(side, sender))
    }

    /// Leaves on behalf of a closed stream, if it still owns its seat.
    ///
    /// Returns true if the match was removed as a result.
    pub fn detach(
        &self,
        id: MatchId,
        side: Side,
        attachment: AttachmentId,
    ) -> Result<bool, SessionError> {
        let vacant = {
            let game = self.matches.get(&id).ok_or(SessionError::NoSuchMatch(id))?;
            game.detach(side, attachment)
        };
        Ok(vacant == Some(true) && self.remove(id))
    }

    /// Removes a match, but only if both of its seats are free.
    ///
    /// The vacancy check runs under the entry's shard lock, so a join racing
    /// with this call either lands first and keeps the match alive or fails
    /// with `NoSuchMatch`.
    pub fn remove(&self, id: MatchId) -> bool {
        let removed = self
            .matches
            .remove_if(&id, |_, game| game.is_vacant())
            .is_some();
        if removed {
            info!("Match {} removed", id);
        }
        removed
    }

    /// Drops matches with no attached stream and no activity for `timeout`.
    pub fn reap_idle(&self, timeout: Duration) -> Vec<MatchId> {
        let mut reaped = Vec::new();
        self.matches.retain(|id, game| {
            if game.is_idle(timeout) {
                reaped.push(*id);
                false
            } else {
                true
            }
        });

        for id in &reaped {
            info!("Match {} reaped after {:?} idle", id, timeout);
        }
        reaped
    }

    pub fn contains(&self, id: MatchId) -> bool {
        self.matches.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn max_matches(&self) -> usize {
        self.max_matches
    }
}

/// Tests cover match lifecycle, seat assignment, removal races and idle
/// reaping.
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new(5);
        assert_eq!(registry.max_matches(), 5);
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_new_match_seats_creator_as_red() {
        let registry = Registry::new(4);
        let (id, side) = registry.new_match().unwrap();

        assert_eq!(side, Side::Red);
        assert!(id <= i32::MAX as u32);
        assert!(registry.contains(id));
        assert!(registry.lookup(id).unwrap().is_occupied(Side::Red));
    }

    #[test]
    fn test_new_match_ids_are_unique() {
        let registry = Registry::new(256);
        for _ in 0..200 {
            registry.new_match().unwrap();
        }
        assert_eq!(registry.len(), 200);
    }

    #[test]
    fn test_new_match_respects_capacity() {
        let registry = Registry::new(1);
        registry.new_match().unwrap();
        assert_eq!(registry.new_match(), Err(SessionError::ServerFull(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_join_assigns_yellow_then_full() {
        let registry = Registry::new(4);
        let (id, _) = registry.new_match().unwrap();

        assert_eq!(registry.join(id), Ok(Side::Yellow));
        assert_eq!(registry.join(id), Err(SessionError::MatchFull(id)));
    }

    #[test]
    fn test_unknown_match() {
        let registry = Registry::new(4);
        let (id, _) = registry.new_match().unwrap();
        let missing = id.wrapping_add(1);

        assert_eq!(registry.join(missing), Err(SessionError::NoSuchMatch(missing)));
        assert_eq!(
            registry.leave(missing, Side::Red),
            Err(SessionError::NoSuchMatch(missing))
        );
        assert!(registry.lookup(missing).is_err());
    }

    #[test]
    fn test_leave_removes_only_when_both_gone() {
        let registry = Registry::new(4);
        let (id, _) = registry.new_match().unwrap();
        registry.join(id).unwrap();

        registry.leave(id, Side::Red).unwrap();
        assert!(registry.contains(id));

        registry.leave(id, Side::Yellow).unwrap();
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_keeps_occupied_match() {
        let registry = Registry::new(4);
        let (id, _) = registry.new_match().unwrap();

        assert!(!registry.remove(id));
        assert!(registry.contains(id));
    }

    #[test]
    fn test_detach_removes_after_last_stream() {
        let registry = Registry::new(4);
        let (id, _) = registry.new_match().unwrap();
        let (tx, _rx) = mpsc::channel(4);
        let attachment = registry.attach(id, Side::Red, tx).unwrap();

        assert_eq!(registry.detach(id, Side::Red, attachment), Ok(true));
        assert!(!registry.contains(id));
        assert_eq!(
            registry.detach(id, Side::Red, attachment),
            Err(SessionError::NoSuchMatch(id))
        );
    }

    #[test]
    fn test_attach_to_unknown_match() {
        let registry = Registry::new(4);
        let (tx, _rx) = mpsc::channel(4);
        assert_eq!(
            registry.attach(99, Side::Red, tx),
            Err(SessionError::NoSuchMatch(99))
        );
    }

    #[test]
    fn test_reap_idle_spares_attached_matches() {
        let registry = Registry::new(4);
        let (idle, _) = registry.new_match().unwrap();
        let (live, _) = registry.new_match().unwrap();
        let (tx, _rx) = mpsc::channel(4);
        registry.attach(live, Side::Red, tx).unwrap();

        let reaped = registry.reap_idle(Duration::ZERO);

        assert_eq!(reaped, vec![idle]);
        assert!(!registry.contains(idle));
        assert!(registry.contains(live));
    }

    #[test]
    fn test_concurrent_leave_and_join_never_tear() {
        for _ in 0..50 {
            let registry = Arc::new(Registry::new(4));
            let (id, _) = registry.new_match().unwrap();

            let leaver = {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.leave(id, Side::Red))
            };
            let joiner = {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.join(id))
            };

            leaver.join().unwrap().unwrap();
            match joiner.join().unwrap() {
                // Joined before or after the leave: the match must still exist
                // and hold the joined seat.
                Ok(side) => {
                    let game = registry.lookup(id).unwrap();
                    assert!(game.is_occupied(side));
                }
                // The match was emptied and removed first.
                Err(e) => {
                    assert_eq!(e, SessionError::NoSuchMatch(id));
                    assert!(!registry.contains(id));
                }
            }
        }
    }
}
