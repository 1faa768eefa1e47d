//! Per-connection protocol state machine
//!
//! A connection starts unbound. It may issue `NewGame`, `JoinGame` and
//! `LeaveGame` requests at any time. Its first `Input` binds it to a match
//! seat; every later `Input` is a move for that seat. When the inbound stream
//! ends, for whatever reason, the binding is released and the seat is left.
//!
//! The handler only sees packets: inbound packets arrive on a bounded
//! channel fed by the transport, replies and broadcasts go out on another.

use crate::error::MoveError;
use crate::game::AttachmentId;
use crate::registry::Registry;
use log::{debug, info, warn};
use shared::{MatchId, Packet, Side, ATTACH_ONLY};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;

/// A connection's claim on one seat of one match.
///
/// Dropping the binding leaves the seat, provided no newer stream has
/// replaced this one in the meantime.
struct Binding {
    registry: Arc<Registry>,
    match_id: MatchId,
    side: Side,
    attachment: AttachmentId,
}

impl Drop for Binding {
    fn drop(&mut self) {
        match self
            .registry
            .detach(self.match_id, self.side, self.attachment)
        {
            Ok(removed) => debug!(
                "Released {} in match {} (removed: {})",
                self.side, self.match_id, removed
            ),
            Err(e) => debug!("Nothing to release: {}", e),
        }
    }
}

pub struct ProtocolHandler {
    registry: Arc<Registry>,
    outbound: mpsc::Sender<Packet>,
    peer: String,
    binding: Option<Binding>,
}

impl ProtocolHandler {
    pub fn new(
        registry: Arc<Registry>,
        outbound: mpsc::Sender<Packet>,
        peer: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            outbound,
            peer: peer.into(),
            binding: None,
        }
    }

    /// The match and side this connection is bound to, if any.
    pub fn bound_to(&self) -> Option<(MatchId, Side)> {
        self.binding
            .as_ref()
            .map(|binding| (binding.match_id, binding.side))
    }

    /// Processes inbound packets until the stream ends or the outbound side
    /// goes away, then releases the seat.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<Packet>) {
        while let Some(packet) = inbound.recv().await {
            if let Err(e) = self.handle_packet(packet).await {
                warn!("{}: outbound closed, dropping reply {:?}", self.peer, e.0);
                break;
            }
        }

        if let Some((match_id, side)) = self.bound_to() {
            info!("{}: stream closed, {} leaves match {}", self.peer, side, match_id);
        } else {
            debug!("{}: stream closed", self.peer);
        }
    }

    pub async fn handle_packet(&mut self, packet: Packet) -> Result<(), SendError<Packet>> {
        match packet {
            Packet::NewGame => {
                let reply = match self.registry.new_match() {
                    Ok((match_id, side)) => {
                        info!("{}: created match {} as {}", self.peer, match_id, side);
                        Packet::Joined { match_id, side }
                    }
                    Err(e) => {
                        warn!("{}: cannot create match: {}", self.peer, e);
                        Packet::Error { code: e.code() }
                    }
                };
                self.outbound.send(reply).await
            }

            Packet::JoinGame { match_id } => {
                let reply = match self.registry.join(match_id) {
                    Ok(side) => {
                        info!("{}: joined match {} as {}", self.peer, match_id, side);
                        Packet::Joined { match_id, side }
                    }
                    Err(e) => {
                        info!("{}: join refused: {}", self.peer, e);
                        Packet::Error { code: e.code() }
                    }
                };
                self.outbound.send(reply).await
            }

            Packet::LeaveGame { match_id, side } => {
                let reply = match self.registry.leave(match_id, side) {
                    Ok(()) => Packet::Left { match_id },
                    Err(e) => Packet::Error { code: e.code() },
                };
                if self.bound_to() == Some((match_id, side)) {
                    // The seat is already free, so this detach is stale.
                    self.binding = None;
                }
                self.outbound.send(reply).await
            }

            Packet::Input {
                match_id,
                side,
                column,
            } => match self.bound_to() {
                None => self.bind(match_id, side, column).await,
                Some(_) => {
                    self.play((match_id, side), column);
                    Ok(())
                }
            },

            other => {
                warn!("{}: unexpected packet {:?}", self.peer, other);
                Ok(())
            }
        }
    }

    async fn bind(
        &mut self,
        match_id: MatchId,
        side: Side,
        column: i32,
    ) -> Result<(), SendError<Packet>> {
        match self
            .registry
            .attach(match_id, side, self.outbound.clone())
        {
            Ok(attachment) => {
                if column != ATTACH_ONLY {
                    debug!("{}: ignoring column {} on attach", self.peer, column);
                }
                info!("{}: bound to match {} as {}", self.peer, match_id, side);
                self.binding = Some(Binding {
                    registry: Arc::clone(&self.registry),
                    match_id,
                    side,
                    attachment,
                });
                Ok(())
            }
            Err(e) => {
                info!("{}: cannot bind: {}", self.peer, e);
                self.outbound.send(Packet::Error { code: e.code() }).await
            }
        }
    }

    /// Forwards a move for the bound seat. Rejected moves are dropped
    /// silently; the sender only observes the next broadcast.
    ///
    /// A stream whose seat was taken over or freed loses its binding.
    fn play(&mut self, declared: (MatchId, Side), column: i32) {
        let Some(binding) = self.binding.as_ref() else {
            return;
        };
        let (match_id, side, attachment) = (binding.match_id, binding.side, binding.attachment);
        if declared != (match_id, side) {
            warn!(
                "{}: move declared for {:?} but stream is bound to {:?}",
                self.peer,
                declared,
                (match_id, side)
            );
        }

        let result = self
            .registry
            .lookup(match_id)
            .map(|game| game.apply_move(side, attachment, column));
        match result {
            Ok(Ok(outcome)) => debug!(
                "{}: {} played column {} ({:?})",
                self.peer, side, column, outcome
            ),
            Ok(Err(MoveError::SeatLost(_))) => {
                info!(
                    "{}: no longer holds {} in match {}, unbinding",
                    self.peer, side, match_id
                );
                self.binding = None;
            }
            Ok(Err(e)) => debug!("{}: move rejected: {}", self.peer, e),
            Err(e) => {
                debug!("{}: move dropped: {}", self.peer, e);
                self.binding = None;
            }
        }
    }
}
