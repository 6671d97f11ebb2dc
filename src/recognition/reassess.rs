//! Constraint-driven reassessment of conflicting detections.
//!
//! After the initial recognition pass the detected grid is checked against
//! the Sudoku rules. Conflicting cells recorded with low confidence get one
//! second look: every recognition method is rerun on the cell image, the
//! candidates are filtered to those the current grid permits, and the best
//! survivor replaces the detection. A cell with no permissible candidate is
//! cleared and left to the solver. High-confidence conflicts are trusted as
//! read and only reported.

use tracing::{debug, info};

use crate::core::traits::GlyphRecognizer;
use crate::processors::cells::CellImage;
use crate::recognition::ensemble::DigitRecognitionEnsemble;
use crate::recognition::{CellDetection, RecognitionSource};
use crate::sudoku::grid::{Conflict, PuzzleGrid};
use crate::sudoku::validate::{find_conflicts, placement_is_valid};

/// Reassesses conflicting low-confidence detections in place.
///
/// A single pass over the conflicts found in the initial detections, in
/// row-major order. Corrections update the working grid immediately, so
/// later conflicts in the same pass see them.
///
/// # Arguments
///
/// * `ensemble` - The recognition ensemble to rerun methods with.
/// * `detections` - The 9x9 detections from the initial pass; modified in
///   place.
/// * `cells` - The 9x9 normalized cell images the detections came from.
///
/// # Returns
///
/// The conflict list of the *original* detections, before any correction.
pub fn reassess_detections<R: GlyphRecognizer>(
    ensemble: &DigitRecognitionEnsemble<R>,
    detections: &mut [Vec<CellDetection>],
    cells: &[Vec<CellImage>],
) -> Vec<Conflict> {
    let mut grid = PuzzleGrid::empty();
    for row in detections.iter() {
        for detection in row {
            let (r, c) = detection.position;
            grid.set(r, c, detection.digit);
        }
    }

    let conflicts = find_conflicts(&grid);
    if conflicts.is_empty() {
        return conflicts;
    }
    info!(count = conflicts.len(), "reassessing rule conflicts");

    for conflict in &conflicts {
        let (row, col) = (conflict.row, conflict.col);
        let detection = &detections[row][col];
        if detection.confidence >= ensemble.config().reassess_below {
            debug!(
                row,
                col,
                digit = detection.digit,
                confidence = detection.confidence,
                "conflicting cell trusted, leaving unchanged"
            );
            continue;
        }

        let replacement = best_valid_candidate(ensemble, &grid, &cells[row][col], row, col);
        let (digit, confidence, source) = match replacement {
            Some(candidate) => {
                info!(
                    row,
                    col,
                    old = conflict.value,
                    new = candidate.0,
                    "reassessment replaced conflicting digit"
                );
                candidate
            }
            None => {
                info!(row, col, old = conflict.value, "no rule-valid candidate, clearing cell");
                (0, 0.0, RecognitionSource::RuleValidation)
            }
        };

        detections[row][col] = CellDetection {
            digit,
            confidence,
            sources: vec![source],
            position: (row, col),
        };
        grid.set(row, col, digit);
    }

    conflicts
}

/// Reruns every method on the cell and keeps the highest-confidence
/// candidate the current grid permits at `(row, col)`.
fn best_valid_candidate<R: GlyphRecognizer>(
    ensemble: &DigitRecognitionEnsemble<R>,
    grid: &PuzzleGrid,
    cell: &CellImage,
    row: usize,
    col: usize,
) -> Option<(u8, f32, RecognitionSource)> {
    ensemble
        .candidate_sweep(cell)
        .into_iter()
        .filter(|c| placement_is_valid(grid, row, col, c.digit))
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map(|c| (c.digit, c.confidence, c.source))
}
