//! Error taxonomy for match sessions and moves

use shared::{ErrorCode, MatchId, Side};
use thiserror::Error;

/// Failures resolving or joining a match. These are returned to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("match {0} does not exist")]
    NoSuchMatch(MatchId),

    #[error("match {0} already has two players")]
    MatchFull(MatchId),

    #[error("server already hosts the maximum of {0} matches")]
    ServerFull(usize),
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NoSuchMatch(_) => ErrorCode::NoSuchMatch,
            SessionError::MatchFull(_) => ErrorCode::MatchFull,
            SessionError::ServerFull(_) => ErrorCode::ServerFull,
        }
    }
}

/// Reasons a move is dropped. Never sent to clients, only logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("column {0} is outside 1..=8")]
    ColumnOutOfRange(i32),

    #[error("column {0} is full")]
    ColumnFull(i32),

    #[error("it is not {0}'s turn")]
    NotYourTurn(Side),

    #[error("stream no longer holds the {0} seat")]
    SeatLost(Side),
}
