//! The 9x9 puzzle grid and conflict records.

use serde::{Deserialize, Serialize};

use crate::core::constants::{BOX_SIZE, GRID_SIZE};
use crate::core::errors::SudokuError;

/// A 9x9 digit grid. Zero marks an empty cell; 1-9 are placed digits.
///
/// Construction is range-checked, so a `PuzzleGrid` in hand always satisfies
/// the shape and value contract. Rule conformance (no duplicate digits in a
/// unit) is a separate question answered by [`crate::sudoku::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleGrid([[u8; GRID_SIZE]; GRID_SIZE]);

impl PuzzleGrid {
    /// Creates an empty grid.
    pub fn empty() -> Self {
        Self([[0; GRID_SIZE]; GRID_SIZE])
    }

    /// Creates a grid from row-major digit rows.
    ///
    /// # Errors
    ///
    /// Returns [`SudokuError::InvalidInput`] when any value lies outside 0-9.
    pub fn from_rows(rows: [[u8; GRID_SIZE]; GRID_SIZE]) -> Result<Self, SudokuError> {
        for (r, row) in rows.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if value > 9 {
                    return Err(SudokuError::invalid_input(format!(
                        "digit {value} at ({r}, {c}) out of range 0-9"
                    )));
                }
            }
        }
        Ok(Self(rows))
    }

    /// Parses a grid from text.
    ///
    /// Accepts 81 cells in row-major order where `1`-`9` are digits and `.`
    /// or `0` mark empty cells. Whitespace and `/` row separators are
    /// ignored, so both `"3.5...1.8/..."` and an 81-character string parse.
    ///
    /// # Errors
    ///
    /// Returns [`SudokuError::InvalidInput`] when the text does not contain
    /// exactly 81 cells or carries an unexpected character.
    pub fn parse(text: &str) -> Result<Self, SudokuError> {
        let mut cells = Vec::with_capacity(GRID_SIZE * GRID_SIZE);
        for ch in text.chars() {
            match ch {
                '.' | '0' => cells.push(0),
                '1'..='9' => cells.push(ch as u8 - b'0'),
                '/' | ' ' | '\n' | '\r' | '\t' => {}
                other => {
                    return Err(SudokuError::invalid_input(format!(
                        "unexpected character {other:?} in grid text"
                    )));
                }
            }
        }
        if cells.len() != GRID_SIZE * GRID_SIZE {
            return Err(SudokuError::invalid_input(format!(
                "expected 81 cells, got {}",
                cells.len()
            )));
        }

        let mut rows = [[0u8; GRID_SIZE]; GRID_SIZE];
        for (i, value) in cells.into_iter().enumerate() {
            rows[i / GRID_SIZE][i % GRID_SIZE] = value;
        }
        Ok(Self(rows))
    }

    /// Returns the digit at the given cell.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.0[row][col]
    }

    /// Sets the digit at the given cell.
    ///
    /// # Panics
    ///
    /// Panics when `value` exceeds 9; the checked entry points are
    /// [`PuzzleGrid::from_rows`] and [`PuzzleGrid::parse`].
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        assert!(value <= 9, "digit {value} out of range 0-9");
        self.0[row][col] = value;
    }

    /// Returns the row-major digit rows.
    pub fn rows(&self) -> &[[u8; GRID_SIZE]; GRID_SIZE] {
        &self.0
    }

    /// Number of nonzero cells.
    pub fn clue_count(&self) -> usize {
        self.0.iter().flatten().filter(|&&v| v != 0).count()
    }

    /// True when no cell is empty.
    pub fn is_complete(&self) -> bool {
        self.0.iter().flatten().all(|&v| v != 0)
    }

    /// Positions of all nonzero cells in row-major order.
    pub fn filled_positions(&self) -> Vec<(usize, usize)> {
        let mut positions = Vec::new();
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                if self.0[row][col] != 0 {
                    positions.push((row, col));
                }
            }
        }
        positions
    }

    /// Top-left cell of the box containing `(row, col)`.
    #[inline]
    pub(crate) fn box_origin(row: usize, col: usize) -> (usize, usize) {
        ((row / BOX_SIZE) * BOX_SIZE, (col / BOX_SIZE) * BOX_SIZE)
    }
}

impl std::fmt::Display for PuzzleGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for &value in row {
                if value == 0 {
                    write!(f, ".")?;
                } else {
                    write!(f, "{value}")?;
                }
            }
        }
        Ok(())
    }
}

/// The unit in which a duplicated digit was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Duplicate within a row.
    Row,
    /// Duplicate within a column.
    Column,
    /// Duplicate within a 3x3 box.
    Box,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::Row => write!(f, "row"),
            ConflictKind::Column => write!(f, "column"),
            ConflictKind::Box => write!(f, "box"),
        }
    }
}

/// A rule violation: the digit at `(row, col)` duplicates another digit in
/// its row, column or box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Row of the conflicting cell.
    pub row: usize,
    /// Column of the conflicting cell.
    pub col: usize,
    /// The duplicated digit.
    pub value: u8,
    /// The unit the duplicate was found in.
    pub kind: ConflictKind,
}
