use crate::network::ServerEvent;
use log::{debug, info, warn};
use shared::{empty_grid, Cell, ErrorCode, Grid, MatchId, Score, Side};

/// Where the session with the server currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Playing,
    Rejected(ErrorCode),
    Left,
    Disconnected,
}

/// Client view of one match, rebuilt from server snapshots.
#[derive(Debug, Clone)]
pub struct ClientGameState {
    pub match_id: Option<MatchId>,
    pub side: Option<Side>,
    pub turn: Side,
    pub board: Grid,
    pub score: Score,
    pub status: ConnectionStatus,
    pub last_error: Option<ErrorCode>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            match_id: None,
            side: None,
            turn: Side::Red,
            board: empty_grid(),
            score: Score::default(),
            status: ConnectionStatus::Connecting,
            last_error: None,
        }
    }

    pub fn apply_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Joined { match_id, side } => {
                info!("Playing match {} as {}", match_id, side);
                self.match_id = Some(match_id);
                self.side = Some(side);
                self.status = ConnectionStatus::Playing;
            }

            ServerEvent::State { turn, board, score } => {
                if score != self.score {
                    info!("Score is now red {} : {} yellow", score.red, score.yellow);
                }
                debug!("State update, {} to move", turn);
                self.turn = turn;
                self.board = board;
                self.score = score;
            }

            ServerEvent::Error(code) => {
                warn!("Server error: {}", code);
                self.last_error = Some(code);
                // An error before the seat is confirmed ends the session.
                if self.match_id.is_none() {
                    self.status = ConnectionStatus::Rejected(code);
                }
            }

            ServerEvent::Left { match_id } => {
                info!("Left match {}", match_id);
                self.status = ConnectionStatus::Left;
            }

            ServerEvent::Disconnected => {
                if self.status == ConnectionStatus::Playing || self.status == ConnectionStatus::Connecting {
                    self.status = ConnectionStatus::Disconnected;
                }
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == ConnectionStatus::Playing
    }

    pub fn is_my_turn(&self) -> bool {
        self.is_playing() && self.side == Some(self.turn)
    }

    /// Number of pieces on the board for each side.
    pub fn piece_counts(&self) -> (usize, usize) {
        self.board
            .iter()
            .flatten()
            .fold((0, 0), |(red, yellow), cell| match cell {
                Cell::Red => (red + 1, yellow),
                Cell::Yellow => (red, yellow + 1),
                Cell::Empty => (red, yellow),
            })
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
