//! Authoritative state of one match and delivery of its snapshots
//!
//! Every field of a match (board, turn marker, seat occupancy, outbound
//! channels and the score) lives behind one mutex, so a move, its win check,
//! the turn change and the resulting broadcast happen as a single unit.
//! Broadcasts never await: each side's bounded outbound queue is fed with
//! `try_send`, so a stalled peer cannot hold the lock or delay the other side.

use crate::board::Board;
use crate::error::{MoveError, SessionError};
use log::{debug, info, warn};
use shared::{MatchId, Packet, Score, Side};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Token identifying one attach of a stream to a seat.
pub type AttachmentId = u64;

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The turn passed to the opponent.
    Continued,
    /// The mover won; the board was cleared and Red moves next.
    Won(Side),
    /// The board filled up without a winner and was cleared.
    Drawn,
}

#[derive(Debug)]
struct Outbound {
    attachment: AttachmentId,
    sender: mpsc::Sender<Packet>,
}

#[derive(Debug, Default)]
struct Seat {
    occupied: bool,
    outbound: Option<Outbound>,
}

#[derive(Debug)]
struct MatchState {
    board: Board,
    turn: Side,
    seats: [Seat; 2],
    score: Score,
    next_attachment: AttachmentId,
    last_activity: Instant,
}

impl MatchState {
    fn seat(&mut self, side: Side) -> &mut Seat {
        &mut self.seats[side.index()]
    }

    fn snapshot(&self) -> Packet {
        Packet::State {
            turn: self.turn,
            board: *self.board.grid(),
            score: self.score,
        }
    }

    fn record_win(&mut self, side: Side) {
        match side {
            Side::Red => self.score.red += 1,
            Side::Yellow => self.score.yellow += 1,
        }
    }

    fn reset_round(&mut self) {
        self.board.clear();
        self.turn = Side::Red;
    }

    fn is_vacant(&self) -> bool {
        self.seats.iter().all(|seat| !seat.occupied)
    }

    fn vacate(&mut self, side: Side) -> bool {
        let seat = self.seat(side);
        seat.occupied = false;
        seat.outbound = None;
        self.last_activity = Instant::now();
        self.is_vacant()
    }
}

/// One game between Red and Yellow.
#[derive(Debug)]
pub struct Match {
    id: MatchId,
    state: Mutex<MatchState>,
}

impl Match {
    /// Creates a match with an empty board, both seats free and Red to move.
    pub fn new(id: MatchId) -> Self {
        Self {
            id,
            state: Mutex::new(MatchState {
                board: Board::new(),
                turn: Side::Red,
                seats: Default::default(),
                score: Score::default(),
                next_attachment: 1,
                last_activity: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, MatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the first free seat, Red before Yellow.
    pub fn join(&self) -> Result<Side, SessionError> {
        let mut state = self.lock();
        let side = Side::BOTH
            .into_iter()
            .find(|side| !state.seats[side.index()].occupied)
            .ok_or(SessionError::MatchFull(self.id))?;

        state.seat(side).occupied = true;
        state.last_activity = Instant::now();
        info!("Match {}: {} joined", self.id, side);
        Ok(side)
    }

    /// Frees a seat and drops its outbound channel.
    ///
    /// Returns true when both seats are now free and the match should be
    /// removed from the registry.
    pub fn leave(&self, side: Side) -> bool {
        let vacant = self.lock().vacate(side);
        info!("Match {}: {} left", self.id, side);
        vacant
    }

    /// Binds a live outbound channel to a seat, replacing any earlier one.
    ///
    /// The seat is marked occupied and the new channel immediately receives
    /// the current state.
    pub fn attach(&self, side: Side, sender: mpsc::Sender<Packet>) -> AttachmentId {
        let mut state = self.lock();
        let attachment = state.next_attachment;
        state.next_attachment += 1;
        state.last_activity = Instant::now();

        let snapshot = state.snapshot();
        deliver(self.id, side, &sender, snapshot);

        let seat = state.seat(side);
        if seat.outbound.is_some() {
            debug!("Match {}: replacing {} stream", self.id, side);
        }
        seat.occupied = true;
        seat.outbound = Some(Outbound { attachment, sender });

        debug!("Match {}: {} attached ({})", self.id, side, attachment);
        attachment
    }

    /// Leaves `side` only if `attachment` still owns its channel.
    ///
    /// Returns `None` for a stale attachment, otherwise whether the match is
    /// now vacant.
    pub fn detach(&self, side: Side, attachment: AttachmentId) -> Option<bool> {
        let mut state = self.lock();
        let current = state.seats[side.index()]
            .outbound
            .as_ref()
            .map(|outbound| outbound.attachment);

        if current != Some(attachment) {
            debug!(
                "Match {}: stale detach of {} ({}), keeping current stream",
                self.id, side, attachment
            );
            return None;
        }

        let vacant = state.vacate(side);
        info!("Match {}: {} disconnected", self.id, side);
        Some(vacant)
    }

    /// Applies a move for `side` on behalf of the stream holding `attachment`
    /// and broadcasts the resulting state.
    ///
    /// Moves from a stream that no longer owns the seat, out of turn or into
    /// a full or invalid column change nothing and broadcast nothing.
    pub fn apply_move(
        &self,
        side: Side,
        attachment: AttachmentId,
        column: i32,
    ) -> Result<MoveOutcome, MoveError> {
        let mut state = self.lock();
        let owner = state.seats[side.index()]
            .outbound
            .as_ref()
            .map(|outbound| outbound.attachment);
        if owner != Some(attachment) {
            debug!(
                "Match {}: move from stale {} stream ({})",
                self.id, side, attachment
            );
            return Err(MoveError::SeatLost(side));
        }
        if state.turn != side {
            debug!("Match {}: {} moved out of turn", self.id, side);
            return Err(MoveError::NotYourTurn(side));
        }
        if let Err(e) = state.board.apply_drop(column, side) {
            debug!("Match {}: rejected move by {}: {}", self.id, side, e);
            return Err(e);
        }
        state.last_activity = Instant::now();

        let outcome = if state.board.detect_win(side) {
            state.record_win(side);
            state.reset_round();
            info!(
                "Match {}: {} wins (red {} - yellow {})",
                self.id, side, state.score.red, state.score.yellow
            );
            MoveOutcome::Won(side)
        } else if state.board.is_full() {
            state.reset_round();
            info!("Match {}: board full, round drawn", self.id);
            MoveOutcome::Drawn
        } else {
            state.turn = side.opponent();
            MoveOutcome::Continued
        };

        let snapshot = state.snapshot();
        for seat_side in Side::BOTH {
            if let Some(outbound) = &state.seats[seat_side.index()].outbound {
                deliver(self.id, seat_side, &outbound.sender, snapshot.clone());
            }
        }

        Ok(outcome)
    }

    /// Current state as it would be broadcast.
    pub fn snapshot(&self) -> Packet {
        self.lock().snapshot()
    }

    pub fn turn(&self) -> Side {
        self.lock().turn
    }

    pub fn score(&self) -> Score {
        self.lock().score
    }

    pub fn board(&self) -> Board {
        self.lock().board.clone()
    }

    pub fn is_occupied(&self, side: Side) -> bool {
        self.lock().seats[side.index()].occupied
    }

    pub fn is_attached(&self, side: Side) -> bool {
        self.lock().seats[side.index()].outbound.is_some()
    }

    pub fn is_vacant(&self) -> bool {
        self.lock().is_vacant()
    }

    /// True when no stream is attached and nothing happened for `timeout`.
    pub fn is_idle(&self, timeout: Duration) -> bool {
        let state = self.lock();
        state.seats.iter().all(|seat| seat.outbound.is_none())
            && state.last_activity.elapsed() >= timeout
    }
}

/// Queues a packet without waiting. A full queue drops this snapshot for this
/// side only; a closed queue means the peer is already gone.
fn deliver(id: MatchId, side: Side, sender: &mpsc::Sender<Packet>, packet: Packet) {
    match sender.try_send(packet) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!("Match {}: {} outbound queue full, dropping state", id, side);
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Match {}: {} stream already closed", id, side);
        }
    }
}
