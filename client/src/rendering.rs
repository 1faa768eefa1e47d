use crate::game::{ClientGameState, ConnectionStatus};
use crate::input::BoardLayout;
use macroquad::prelude::*;
use shared::{Cell, Side, BOARD_SIZE};

const BACKGROUND: Color = Color {
    r: 0.10,
    g: 0.10,
    b: 0.10,
    a: 1.0,
};
const BOARD_BLUE: Color = Color {
    r: 0.10,
    g: 0.25,
    b: 0.65,
    a: 1.0,
};
const HOLE: Color = Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};
const PIECE_RED: Color = Color {
    r: 0.90,
    g: 0.20,
    b: 0.20,
    a: 1.0,
};
const PIECE_YELLOW: Color = Color {
    r: 0.95,
    g: 0.85,
    b: 0.20,
    a: 1.0,
};

fn side_color(side: Side) -> Color {
    match side {
        Side::Red => PIECE_RED,
        Side::Yellow => PIECE_YELLOW,
    }
}

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    pub fn render(&self, state: &ClientGameState, layout: &BoardLayout) {
        clear_background(BACKGROUND);

        self.draw_board(state, layout);
        self.draw_hover(state, layout);
        self.draw_header(state);
    }

    fn draw_board(&self, state: &ClientGameState, layout: &BoardLayout) {
        let extent = layout.board_extent();
        draw_rectangle(layout.origin_x, layout.origin_y, extent, extent, BOARD_BLUE);

        let radius = layout.cell_size * 0.4;
        for (row, cells) in state.board.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let (x, y) = layout.cell_center(row, col);
                let color = match cell {
                    Cell::Empty => HOLE,
                    Cell::Red => PIECE_RED,
                    Cell::Yellow => PIECE_YELLOW,
                };
                draw_circle(x, y, radius, color);
            }
        }

        for col in 0..BOARD_SIZE {
            let (x, _) = layout.cell_center(0, col);
            let label = (col + 1).to_string();
            draw_text(&label, x - 4.0, layout.origin_y + extent + 20.0, 20.0, GRAY);
        }
    }

    /// Ghost piece above the column under the cursor on our turn.
    fn draw_hover(&self, state: &ClientGameState, layout: &BoardLayout) {
        let Some(side) = state.side else {
            return;
        };
        if !state.is_my_turn() {
            return;
        }

        let (mouse_x, _) = mouse_position();
        if let Some(column) = layout.column_at(mouse_x) {
            let (x, _) = layout.cell_center(BOARD_SIZE - 1, (column - 1) as usize);
            let y = layout.origin_y - layout.cell_size * 0.3;
            let mut color = side_color(side);
            color.a = 0.5;
            draw_circle(x, y, layout.cell_size * 0.25, color);
        }
    }

    fn draw_header(&self, state: &ClientGameState) {
        let match_text = match state.match_id {
            Some(id) => format!("Match {}", id),
            None => "No match".to_string(),
        };
        draw_text(&match_text, 10.0, 20.0, 20.0, WHITE);

        if let Some(side) = state.side {
            draw_text(&format!("You: {}", side), 10.0, 42.0, 20.0, side_color(side));
        }

        let score_text = format!("Red {}  -  {} Yellow", state.score.red, state.score.yellow);
        draw_text(&score_text, screen_width() / 2.0 - 80.0, 20.0, 20.0, WHITE);

        let (status_text, status_color) = match state.status {
            ConnectionStatus::Connecting => ("Connecting...".to_string(), GRAY),
            ConnectionStatus::Playing if state.is_my_turn() => ("Your turn".to_string(), GREEN),
            ConnectionStatus::Playing => (format!("{} to move", state.turn), side_color(state.turn)),
            ConnectionStatus::Rejected(code) => (format!("Rejected: {}", code), RED),
            ConnectionStatus::Left => ("Left the match".to_string(), GRAY),
            ConnectionStatus::Disconnected => ("Disconnected".to_string(), RED),
        };
        draw_text(&status_text, screen_width() - 200.0, 20.0, 20.0, status_color);
        draw_text("Q: quit", screen_width() - 200.0, 42.0, 16.0, GRAY);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
