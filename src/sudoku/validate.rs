//! Rule validation for digit grids.
//!
//! All checks here are read-only queries against an immutable grid with an
//! explicit excluded cell, so validation is idempotent, never mutates its
//! input and is safe to run repeatedly or concurrently.

use serde::{Deserialize, Serialize};

use crate::core::constants::{BOX_SIZE, GRID_SIZE, MIN_CLUES};
use crate::sudoku::grid::{Conflict, ConflictKind, PuzzleGrid};
use crate::sudoku::solve;

/// Tests whether `digit` can occupy `(row, col)` without duplicating a digit
/// in its row, column or box. The cell itself is excluded from the
/// comparison, so the query is equally valid for an occupied cell asking
/// "may I keep my value" and an empty cell asking "may I take this value".
pub fn placement_is_valid(grid: &PuzzleGrid, row: usize, col: usize, digit: u8) -> bool {
    conflict_kind(grid, row, col, digit).is_none()
}

/// Finds the unit in which `digit` at `(row, col)` would duplicate an
/// existing digit, checking rows, then columns, then boxes.
///
/// Returns `None` when the placement is rule-conformant.
pub fn conflict_kind(
    grid: &PuzzleGrid,
    row: usize,
    col: usize,
    digit: u8,
) -> Option<ConflictKind> {
    for j in 0..GRID_SIZE {
        if j != col && grid.get(row, j) == digit {
            return Some(ConflictKind::Row);
        }
    }

    for i in 0..GRID_SIZE {
        if i != row && grid.get(i, col) == digit {
            return Some(ConflictKind::Column);
        }
    }

    let (box_row, box_col) = PuzzleGrid::box_origin(row, col);
    for i in box_row..box_row + BOX_SIZE {
        for j in box_col..box_col + BOX_SIZE {
            if (i, j) != (row, col) && grid.get(i, j) == digit {
                return Some(ConflictKind::Box);
            }
        }
    }

    None
}

/// Scans the grid in row-major order and reports every nonzero cell that
/// duplicates another digit in its row, column or box.
pub fn find_conflicts(grid: &PuzzleGrid) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let digit = grid.get(row, col);
            if digit == 0 {
                continue;
            }
            if let Some(kind) = conflict_kind(grid, row, col, digit) {
                conflicts.push(Conflict {
                    row,
                    col,
                    value: digit,
                    kind,
                });
            }
        }
    }
    conflicts
}

/// Overall assessment of a recognized grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleAssessment {
    /// True when the grid carries no rule conflicts.
    pub is_valid: bool,
    /// Every rule violation found.
    pub conflicts: Vec<Conflict>,
    /// True when the solver completed the grid from a scratch copy.
    pub solvable: bool,
    /// Number of nonzero cells.
    pub clue_count: usize,
    /// Rough confidence that the grid is a usable puzzle: the clue count
    /// relative to the 17-clue minimum, promoted to 1.0 when the grid is
    /// both valid and solvable.
    pub confidence: f32,
}

/// Assesses a recognized grid: conflicts, solvability and a coarse
/// confidence. The input grid is never mutated; solvability runs on a copy.
pub fn assess(grid: &PuzzleGrid) -> PuzzleAssessment {
    let conflicts = find_conflicts(grid);
    let is_valid = conflicts.is_empty();
    let solvable = solve::is_solvable(grid);
    let clue_count = grid.clue_count();

    let confidence = if is_valid && solvable {
        1.0
    } else {
        (clue_count as f32 / MIN_CLUES as f32).min(1.0)
    };

    PuzzleAssessment {
        is_valid,
        conflicts,
        solvable,
        clue_count,
        confidence,
    }
}
