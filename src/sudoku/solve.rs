//! Backtracking search over a 9x9 grid.
//!
//! The search is deterministic: it always fills the first empty cell in
//! row-major order and tries digits 1-9 ascending, so identical input yields
//! the identical first solution. A node-visit ceiling bounds the search; the
//! recursion depth is bounded by one frame per empty cell.

use tracing::debug;

use crate::core::config::SolverConfig;
use crate::core::constants::GRID_SIZE;
use crate::sudoku::grid::PuzzleGrid;
use crate::sudoku::validate::placement_is_valid;

/// Outcome of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveReport {
    /// True when the grid was completed.
    pub solved: bool,
    /// Number of search nodes expanded.
    pub nodes_visited: usize,
    /// True when the search was abandoned at the node ceiling rather than
    /// exhausted.
    pub budget_exhausted: bool,
}

enum Search {
    Solved,
    Exhausted,
    Aborted,
}

/// Solves the grid in place under the default limits.
///
/// On success the grid holds the completed solution; on failure (exhausted
/// or aborted) the grid is restored to its input state. Callers that only
/// need a solvability answer should use [`is_solvable`], which works on a
/// scratch copy.
pub fn solve(grid: &mut PuzzleGrid) -> SolveReport {
    solve_with_limits(grid, &SolverConfig::default())
}

/// Solves the grid in place under explicit limits.
pub fn solve_with_limits(grid: &mut PuzzleGrid, limits: &SolverConfig) -> SolveReport {
    let mut nodes = 0usize;
    let status = solve_from(grid, limits, &mut nodes, 0);
    let report = SolveReport {
        solved: matches!(status, Search::Solved),
        nodes_visited: nodes,
        budget_exhausted: matches!(status, Search::Aborted),
    };
    debug!(
        solved = report.solved,
        nodes = report.nodes_visited,
        aborted = report.budget_exhausted,
        "backtracking search finished"
    );
    report
}

/// Tests solvability on a scratch copy, leaving the caller's grid untouched.
pub fn is_solvable(grid: &PuzzleGrid) -> bool {
    let mut scratch = *grid;
    solve(&mut scratch).solved
}

fn solve_from(
    grid: &mut PuzzleGrid,
    limits: &SolverConfig,
    nodes: &mut usize,
    depth: usize,
) -> Search {
    *nodes += 1;
    if *nodes > limits.max_node_visits || depth > limits.max_depth {
        return Search::Aborted;
    }

    let Some((row, col)) = first_empty(grid) else {
        return Search::Solved;
    };

    for digit in 1..=9u8 {
        if !placement_is_valid(grid, row, col, digit) {
            continue;
        }
        grid.set(row, col, digit);
        match solve_from(grid, limits, nodes, depth + 1) {
            Search::Solved => return Search::Solved,
            Search::Exhausted => grid.set(row, col, 0),
            Search::Aborted => {
                grid.set(row, col, 0);
                return Search::Aborted;
            }
        }
    }

    Search::Exhausted
}

fn first_empty(grid: &PuzzleGrid) -> Option<(usize, usize)> {
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            if grid.get(row, col) == 0 {
                return Some((row, col));
            }
        }
    }
    None
}

/// Rule-valid digits for an empty cell. Returns an empty list for an
/// occupied cell.
pub fn candidates(grid: &PuzzleGrid, row: usize, col: usize) -> Vec<u8> {
    if grid.get(row, col) != 0 {
        return Vec::new();
    }
    (1..=9u8)
        .filter(|&digit| placement_is_valid(grid, row, col, digit))
        .collect()
}
