//! Board engine: piece drops, gravity and win detection on the 8x8 grid
//!
//! Rows are indexed from the bottom (row 0) to the top (row 7). A drop enters
//! at the top row and the gravity pass settles it onto the highest occupied
//! cell of its column.

use shared::{empty_grid, Cell, Grid, Side, BOARD_SIZE};
use std::collections::VecDeque;

use crate::error::MoveError;

/// Number of aligned pieces that wins a round.
pub const WIN_LENGTH: u8 = 4;

const TOP_ROW: usize = BOARD_SIZE - 1;

/// Forward search directions as (row, col) steps: right, up-right, up, up-left.
///
/// Every line on the board is covered by exactly one of these, so a streak is
/// only ever extended forward and never counted twice.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 1), (1, 0), (1, -1)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: Grid,
}

impl Board {
    pub fn new() -> Self {
        Self { cells: empty_grid() }
    }

    pub fn from_grid(cells: Grid) -> Self {
        Self { cells }
    }

    pub fn grid(&self) -> &Grid {
        &self.cells
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    pub fn clear(&mut self) {
        self.cells = empty_grid();
    }

    pub fn is_full(&self) -> bool {
        self.cells[TOP_ROW].iter().all(|cell| !cell.is_empty())
    }

    /// Drops a piece for `side` into the 1-based `column` and settles the board.
    ///
    /// A full or out-of-range column leaves the board untouched.
    pub fn apply_drop(&mut self, column: i32, side: Side) -> Result<(), MoveError> {
        let col = Self::column_index(column)?;
        if !self.cells[TOP_ROW][col].is_empty() {
            return Err(MoveError::ColumnFull(column));
        }

        self.cells[TOP_ROW][col] = side.into();
        self.apply_gravity();
        Ok(())
    }

    /// Converts a 1-based wire column into a 0-based index.
    pub fn column_index(column: i32) -> Result<usize, MoveError> {
        if (1..=BOARD_SIZE as i32).contains(&column) {
            Ok((column - 1) as usize)
        } else {
            Err(MoveError::ColumnOutOfRange(column))
        }
    }

    /// Shifts every piece down to the lowest free slot of its column while
    /// keeping the relative order of pieces within the column.
    pub fn apply_gravity(&mut self) {
        for col in 0..BOARD_SIZE {
            let mut landing = 0;
            for row in 0..BOARD_SIZE {
                let cell = self.cells[row][col];
                if cell.is_empty() {
                    continue;
                }
                if row != landing {
                    self.cells[landing][col] = cell;
                    self.cells[row][col] = Cell::Empty;
                }
                landing += 1;
            }
        }
    }

    /// Returns true if `side` owns four or more aligned cells in any row,
    /// column or diagonal.
    ///
    /// Breadth-first search seeded from every cell owned by `side`. Each node
    /// carries the direction that produced it and the streak length along that
    /// direction. `best` records the longest streak seen per (cell, direction);
    /// a node is only queued when it improves on that record, which bounds
    /// revisits and guarantees termination.
    pub fn detect_win(&self, side: Side) -> bool {
        let target = Cell::from(side);
        let mut best = [[[0u8; DIRECTIONS.len()]; BOARD_SIZE]; BOARD_SIZE];
        let mut queue = VecDeque::new();

        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if self.cells[row][col] == target {
                    queue.push_back(StreakNode {
                        row,
                        col,
                        direction: None,
                        streak: 1,
                    });
                }
            }
        }

        while let Some(node) = queue.pop_front() {
            if node.streak >= WIN_LENGTH {
                return true;
            }

            for (direction, (d_row, d_col)) in DIRECTIONS.iter().enumerate() {
                let Some((row, col)) = offset(node.row, node.col, *d_row, *d_col) else {
                    continue;
                };
                if self.cells[row][col] != target {
                    continue;
                }

                let streak = if node.direction == Some(direction) {
                    node.streak + 1
                } else {
                    2
                };
                if streak <= best[row][col][direction] {
                    continue;
                }
                best[row][col][direction] = streak;

                if streak >= WIN_LENGTH {
                    return true;
                }
                queue.push_back(StreakNode {
                    row,
                    col,
                    direction: Some(direction),
                    streak,
                });
            }
        }

        false
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct StreakNode {
    row: usize,
    col: usize,
    direction: Option<usize>,
    streak: u8,
}

fn offset(row: usize, col: usize, d_row: isize, d_col: isize) -> Option<(usize, usize)> {
    let row = row.checked_add_signed(d_row)?;
    let col = col.checked_add_signed(d_col)?;
    (row < BOARD_SIZE && col < BOARD_SIZE).then_some((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(cells: &[(usize, usize, Side)]) -> Board {
        let mut grid = empty_grid();
        for (row, col, side) in cells {
            grid[*row][*col] = (*side).into();
        }
        Board::from_grid(grid)
    }

    fn has_floaters(board: &Board) -> bool {
        (0..BOARD_SIZE).any(|col| {
            (1..BOARD_SIZE).any(|row| {
                !board.cell(row, col).is_empty() && board.cell(row - 1, col).is_empty()
            })
        })
    }

    #[test]
    fn test_drop_lands_on_bottom_row() {
        let mut board = Board::new();
        board.apply_drop(3, Side::Red).unwrap();

        assert_eq!(board.cell(0, 2), Cell::Red);
        assert_eq!(board.cell(TOP_ROW, 2), Cell::Empty);
    }

    #[test]
    fn test_drops_stack_in_order() {
        let mut board = Board::new();
        board.apply_drop(1, Side::Red).unwrap();
        board.apply_drop(1, Side::Yellow).unwrap();
        board.apply_drop(1, Side::Red).unwrap();

        assert_eq!(board.cell(0, 0), Cell::Red);
        assert_eq!(board.cell(1, 0), Cell::Yellow);
        assert_eq!(board.cell(2, 0), Cell::Red);
        assert_eq!(board.cell(3, 0), Cell::Empty);
    }

    #[test]
    fn test_column_out_of_range() {
        let mut board = Board::new();
        assert_eq!(
            board.apply_drop(0, Side::Red),
            Err(MoveError::ColumnOutOfRange(0))
        );
        assert_eq!(
            board.apply_drop(9, Side::Red),
            Err(MoveError::ColumnOutOfRange(9))
        );
        assert_eq!(
            board.apply_drop(-1, Side::Red),
            Err(MoveError::ColumnOutOfRange(-1))
        );
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_full_column_is_rejected_without_change() {
        let mut board = Board::new();
        for i in 0..BOARD_SIZE {
            let side = if i % 2 == 0 { Side::Red } else { Side::Yellow };
            board.apply_drop(8, side).unwrap();
        }
        let before = board.clone();

        assert_eq!(board.apply_drop(8, Side::Red), Err(MoveError::ColumnFull(8)));
        assert_eq!(board, before);
    }

    #[test]
    fn test_gravity_compacts_preserving_order() {
        let mut board = board_with(&[
            (6, 4, Side::Red),
            (3, 4, Side::Yellow),
            (7, 4, Side::Yellow),
        ]);
        board.apply_gravity();

        assert_eq!(board.cell(0, 4), Cell::Yellow);
        assert_eq!(board.cell(1, 4), Cell::Red);
        assert_eq!(board.cell(2, 4), Cell::Yellow);
        assert!(!has_floaters(&board));
    }

    #[test]
    fn test_no_floaters_after_many_drops() {
        let mut board = Board::new();
        let columns = [1, 4, 4, 2, 8, 4, 5, 1, 3, 3, 6, 7, 2, 4, 8, 8];
        for (i, column) in columns.iter().enumerate() {
            let side = if i % 2 == 0 { Side::Red } else { Side::Yellow };
            board.apply_drop(*column, side).unwrap();
            assert!(!has_floaters(&board), "floater after drop {}", i);
        }
    }

    #[test]
    fn test_is_full() {
        let mut board = Board::new();
        for column in 1..=8 {
            for row in 0..BOARD_SIZE {
                let side = if (row + column as usize) % 2 == 0 {
                    Side::Red
                } else {
                    Side::Yellow
                };
                assert!(!board.is_full());
                board.apply_drop(column, side).unwrap();
            }
        }
        assert!(board.is_full());
    }

    #[test]
    fn test_empty_board_has_no_win() {
        let board = Board::new();
        assert!(!board.detect_win(Side::Red));
        assert!(!board.detect_win(Side::Yellow));
    }

    #[test]
    fn test_horizontal_runs() {
        let three = board_with(&[(0, 2, Side::Red), (0, 3, Side::Red), (0, 4, Side::Red)]);
        assert!(!three.detect_win(Side::Red));

        let four = board_with(&[
            (2, 0, Side::Red),
            (2, 1, Side::Red),
            (2, 2, Side::Red),
            (2, 3, Side::Red),
        ]);
        assert!(four.detect_win(Side::Red));
        assert!(!four.detect_win(Side::Yellow));

        let five = board_with(&[
            (5, 3, Side::Yellow),
            (5, 4, Side::Yellow),
            (5, 5, Side::Yellow),
            (5, 6, Side::Yellow),
            (5, 7, Side::Yellow),
        ]);
        assert!(five.detect_win(Side::Yellow));
    }

    #[test]
    fn test_vertical_runs() {
        let three = board_with(&[(0, 7, Side::Yellow), (1, 7, Side::Yellow), (2, 7, Side::Yellow)]);
        assert!(!three.detect_win(Side::Yellow));

        let four = board_with(&[
            (3, 1, Side::Yellow),
            (4, 1, Side::Yellow),
            (5, 1, Side::Yellow),
            (6, 1, Side::Yellow),
        ]);
        assert!(four.detect_win(Side::Yellow));

        let five = board_with(&[
            (0, 0, Side::Red),
            (1, 0, Side::Red),
            (2, 0, Side::Red),
            (3, 0, Side::Red),
            (4, 0, Side::Red),
        ]);
        assert!(five.detect_win(Side::Red));
    }

    #[test]
    fn test_rising_diagonal_runs() {
        let three = board_with(&[(0, 0, Side::Red), (1, 1, Side::Red), (2, 2, Side::Red)]);
        assert!(!three.detect_win(Side::Red));

        let four = board_with(&[
            (1, 3, Side::Red),
            (2, 4, Side::Red),
            (3, 5, Side::Red),
            (4, 6, Side::Red),
        ]);
        assert!(four.detect_win(Side::Red));

        let five = board_with(&[
            (3, 3, Side::Yellow),
            (4, 4, Side::Yellow),
            (5, 5, Side::Yellow),
            (6, 6, Side::Yellow),
            (7, 7, Side::Yellow),
        ]);
        assert!(five.detect_win(Side::Yellow));
    }

    #[test]
    fn test_falling_diagonal_runs() {
        let three = board_with(&[(0, 7, Side::Red), (1, 6, Side::Red), (2, 5, Side::Red)]);
        assert!(!three.detect_win(Side::Red));

        let four = board_with(&[
            (4, 0, Side::Yellow),
            (3, 1, Side::Yellow),
            (2, 2, Side::Yellow),
            (1, 3, Side::Yellow),
        ]);
        assert!(four.detect_win(Side::Yellow));

        let five = board_with(&[
            (7, 0, Side::Red),
            (6, 1, Side::Red),
            (5, 2, Side::Red),
            (4, 3, Side::Red),
            (3, 4, Side::Red),
        ]);
        assert!(five.detect_win(Side::Red));
    }

    #[test]
    fn test_broken_run_is_not_a_win() {
        let board = board_with(&[
            (0, 0, Side::Red),
            (0, 1, Side::Red),
            (0, 2, Side::Yellow),
            (0, 3, Side::Red),
            (0, 4, Side::Red),
        ]);
        assert!(!board.detect_win(Side::Red));
    }

    #[test]
    fn test_bent_path_is_not_a_win() {
        // Seven connected red cells, never four in one line.
        let board = board_with(&[
            (0, 0, Side::Red),
            (0, 1, Side::Red),
            (0, 2, Side::Red),
            (1, 2, Side::Red),
            (2, 2, Side::Red),
            (2, 3, Side::Red),
            (3, 3, Side::Red),
        ]);
        assert!(!board.detect_win(Side::Red));
    }

    #[test]
    fn test_run_resting_on_opponent_pieces() {
        let board = board_with(&[
            (0, 2, Side::Red),
            (0, 3, Side::Red),
            (0, 4, Side::Red),
            (0, 5, Side::Yellow),
            (1, 2, Side::Yellow),
            (1, 3, Side::Yellow),
            (1, 4, Side::Yellow),
            (1, 5, Side::Yellow),
        ]);
        assert!(board.detect_win(Side::Yellow));
        assert!(!board.detect_win(Side::Red));
    }

    #[test]
    fn test_win_through_drops() {
        let mut board = Board::new();
        for column in [2, 3, 4] {
            board.apply_drop(column, Side::Red).unwrap();
            assert!(!board.detect_win(Side::Red));
        }
        board.apply_drop(5, Side::Red).unwrap();
        assert!(board.detect_win(Side::Red));
    }

    #[test]
    fn test_full_alternating_board_terminates() {
        let mut grid = empty_grid();
        for (row, cells) in grid.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = if (row / 2 + col) % 2 == 0 {
                    Cell::Red
                } else {
                    Cell::Yellow
                };
            }
        }
        let board = Board::from_grid(grid);

        // Pairs of rows repeat, so no vertical run exceeds two; rows alternate.
        assert!(!board.detect_win(Side::Red));
        assert!(!board.detect_win(Side::Yellow));
    }
}
