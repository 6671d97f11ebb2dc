//! Solving hints and conflict correction suggestions.

use serde::{Deserialize, Serialize};

use crate::core::constants::GRID_SIZE;
use crate::sudoku::grid::{Conflict, PuzzleGrid};
use crate::sudoku::solve::candidates;

/// How much reasoning a hint demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintDifficulty {
    /// A single candidate remains.
    Easy,
    /// Two candidates remain.
    Medium,
}

/// A hint for an empty cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hint {
    /// The cell the hint applies to.
    pub position: (usize, usize),
    /// Rule-valid digits for the cell.
    pub candidates: Vec<u8>,
    /// Hint difficulty.
    pub difficulty: HintDifficulty,
}

/// Collects hints for empty cells with at most two rule-valid candidates,
/// easiest first.
pub fn solving_hints(grid: &PuzzleGrid) -> Vec<Hint> {
    let mut hints = Vec::new();
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            if grid.get(row, col) != 0 {
                continue;
            }
            let cands = candidates(grid, row, col);
            let difficulty = match cands.len() {
                1 => HintDifficulty::Easy,
                2 => HintDifficulty::Medium,
                _ => continue,
            };
            hints.push(Hint {
                position: (row, col),
                candidates: cands,
                difficulty,
            });
        }
    }
    hints.sort_by_key(|h| h.candidates.len());
    hints
}

/// A replacement proposal for a conflicting cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionSuggestion {
    /// The conflicting cell.
    pub position: (usize, usize),
    /// The digit currently recorded there.
    pub current_digit: u8,
    /// Digits that would not violate the rules if placed instead.
    pub suggested_digits: Vec<u8>,
}

/// For each reported conflict, lists the digits that could replace the
/// conflicting value without breaking the rules. The conflicting cell is
/// cleared on a scratch copy before enumerating candidates.
pub fn correction_suggestions(
    grid: &PuzzleGrid,
    conflicts: &[Conflict],
) -> Vec<CorrectionSuggestion> {
    conflicts
        .iter()
        .map(|conflict| {
            let mut scratch = *grid;
            scratch.set(conflict.row, conflict.col, 0);
            CorrectionSuggestion {
                position: (conflict.row, conflict.col),
                current_digit: conflict.value,
                suggested_digits: candidates(&scratch, conflict.row, conflict.col),
            }
        })
        .collect()
}
