//! Mouse and keyboard handling, mapped to board columns

use crate::network::UserCommand;
use macroquad::prelude::*;
use shared::BOARD_SIZE;

const MARGIN: f32 = 40.0;
const HEADER_HEIGHT: f32 = 60.0;

/// Screen placement of the board: top-left corner and square cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardLayout {
    pub origin_x: f32,
    pub origin_y: f32,
    pub cell_size: f32,
}

impl BoardLayout {
    /// Largest square board that fits the window below the header, centered
    /// horizontally.
    pub fn fit(width: f32, height: f32) -> Self {
        let available_w = (width - 2.0 * MARGIN).max(0.0);
        let available_h = (height - HEADER_HEIGHT - MARGIN).max(0.0);
        let cell_size = available_w.min(available_h) / BOARD_SIZE as f32;
        let board_size = cell_size * BOARD_SIZE as f32;

        Self {
            origin_x: (width - board_size) / 2.0,
            origin_y: HEADER_HEIGHT,
            cell_size,
        }
    }

    pub fn board_extent(&self) -> f32 {
        self.cell_size * BOARD_SIZE as f32
    }

    /// 1-based column under screen x, or `None` outside the board.
    pub fn column_at(&self, x: f32) -> Option<i32> {
        if self.cell_size <= 0.0 {
            return None;
        }
        let offset = x - self.origin_x;
        if offset < 0.0 || offset >= self.board_extent() {
            return None;
        }
        Some((offset / self.cell_size) as i32 + 1)
    }

    /// Center of the cell at `row` (0 is the bottom) and 0-based `col`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f32, f32) {
        let x = self.origin_x + (col as f32 + 0.5) * self.cell_size;
        let y = self.origin_y + (BOARD_SIZE as f32 - row as f32 - 0.5) * self.cell_size;
        (x, y)
    }
}

/// Turns raw frame input into commands for the network thread.
pub struct InputManager {
    prev_mouse_down: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            prev_mouse_down: false,
        }
    }

    pub fn update(&mut self, layout: &BoardLayout) -> Option<UserCommand> {
        if is_key_pressed(KeyCode::Q) || is_key_pressed(KeyCode::Escape) {
            return Some(UserCommand::Quit);
        }

        // Act on the press edge only, so holding the button drops one piece.
        let mouse_down = is_mouse_button_down(MouseButton::Left);
        let clicked = mouse_down && !self.prev_mouse_down;
        self.prev_mouse_down = mouse_down;

        if !clicked {
            return None;
        }
        let (x, _) = mouse_position();
        layout.column_at(x).map(UserCommand::Drop)
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_fit_square_board() {
        let layout = BoardLayout::fit(800.0, 600.0);
        // Height is the limit: 600 - 60 - 40 = 500
        assert_approx_eq!(layout.cell_size, 62.5);
        assert_approx_eq!(layout.board_extent(), 500.0);
        assert_approx_eq!(layout.origin_x, 150.0);
        assert_approx_eq!(layout.origin_y, HEADER_HEIGHT);
    }

    #[test]
    fn test_column_at_edges() {
        let layout = BoardLayout::fit(800.0, 600.0);
        assert_eq!(layout.column_at(149.0), None);
        assert_eq!(layout.column_at(150.0), Some(1));
        assert_eq!(layout.column_at(212.0), Some(1));
        assert_eq!(layout.column_at(213.0), Some(2));
        assert_eq!(layout.column_at(649.0), Some(8));
        assert_eq!(layout.column_at(650.0), None);
    }

    #[test]
    fn test_cell_center_bottom_row() {
        let layout = BoardLayout::fit(800.0, 600.0);
        let (x, y) = layout.cell_center(0, 0);
        assert_approx_eq!(x, 150.0 + 31.25);
        assert_approx_eq!(y, 60.0 + 500.0 - 31.25);

        let (_, top) = layout.cell_center(BOARD_SIZE - 1, 0);
        assert_approx_eq!(top, 60.0 + 31.25);
    }

    #[test]
    fn test_tiny_window_has_no_columns() {
        let layout = BoardLayout::fit(50.0, 50.0);
        assert_approx_eq!(layout.cell_size, 0.0);
        assert_eq!(layout.column_at(25.0), None);
    }

    #[test]
    fn test_input_manager_creation() {
        let input_manager = InputManager::new();
        assert!(!input_manager.prev_mouse_down);
    }
}
