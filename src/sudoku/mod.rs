//! Sudoku domain logic: the digit grid, rule validation, hints and the
//! backtracking solver.

pub mod grid;
pub mod hints;
pub mod solve;
pub mod validate;

pub use grid::{Conflict, ConflictKind, PuzzleGrid};
pub use hints::{CorrectionSuggestion, Hint, HintDifficulty, correction_suggestions, solving_hints};
pub use solve::{SolveReport, candidates, is_solvable, solve, solve_with_limits};
pub use validate::{PuzzleAssessment, assess, conflict_kind, find_conflicts, placement_is_valid};
