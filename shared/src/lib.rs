//! Wire vocabulary shared by the Connect-Four server and its clients.
//!
//! Both sides agree on the board geometry, the cell and side encodings and the
//! single [`Packet`] enum that travels over every connection. Framing lives in
//! the [`codec`] module.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod codec;

/// Width and height of the board.
pub const BOARD_SIZE: usize = 8;

/// Column value of an `Input` that only binds the stream and makes no move.
pub const ATTACH_ONLY: i32 = -1;

/// Identifier of a live match, unique among live matches on one server.
pub type MatchId = u32;

/// Board rows, indexed `[row][col]` with row 0 at the bottom.
pub type Grid = [[Cell; BOARD_SIZE]; BOARD_SIZE];

/// One of the two players of a match. Red always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Red,
    Yellow,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Red, Side::Yellow];

    pub fn opponent(self) -> Side {
        match self {
            Side::Red => Side::Yellow,
            Side::Yellow => Side::Red,
        }
    }

    /// Stable slot index, used for per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Side::Red => 0,
            Side::Yellow => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Red => write!(f, "red"),
            Side::Yellow => write!(f, "yellow"),
        }
    }
}

/// Owner of a board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Red,
    Yellow,
}

impl Cell {
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

impl From<Side> for Cell {
    fn from(side: Side) -> Self {
        match side {
            Side::Red => Cell::Red,
            Side::Yellow => Cell::Yellow,
        }
    }
}

/// Cumulative wins of both sides in one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub red: u32,
    pub yellow: u32,
}

impl Score {
    pub fn wins(&self, side: Side) -> u32 {
        match side {
            Side::Red => self.red,
            Side::Yellow => self.yellow,
        }
    }
}

/// Failures the server reports back to the requesting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    NoSuchMatch,
    MatchFull,
    ServerFull,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::NoSuchMatch => write!(f, "no such match"),
            ErrorCode::MatchFull => write!(f, "match is full"),
            ErrorCode::ServerFull => write!(f, "server is full"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Packet {
    NewGame,
    JoinGame {
        match_id: MatchId,
    },
    LeaveGame {
        match_id: MatchId,
        side: Side,
    },
    /// First one on a connection binds it; later ones are moves.
    Input {
        match_id: MatchId,
        side: Side,
        column: i32,
    },

    Joined {
        match_id: MatchId,
        side: Side,
    },
    Left {
        match_id: MatchId,
    },
    Error {
        code: ErrorCode,
    },
    State {
        turn: Side,
        board: Grid,
        score: Score,
    },
}

/// Returns an all-empty grid.
pub fn empty_grid() -> Grid {
    [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE]
}
