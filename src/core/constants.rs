//! Constants used throughout the Sudoku vision pipeline.
//!
//! Every threshold a stage depends on is named here and doubles as the
//! default for the corresponding [`crate::core::config`] field, so the
//! numbers are testable and overridable in one place.

/// Cells per row and per column of the puzzle.
pub const GRID_SIZE: usize = 9;

/// Cells per side of a 3x3 box.
pub const BOX_SIZE: usize = 3;

/// Minimum clue count for a well-posed puzzle.
pub const MIN_CLUES: usize = 17;

/// Intensity below which a pixel counts as dark (ink).
pub const DARK_LEVEL: u8 = 127;

/// Edge length of the canonical perspective-corrected grid image.
pub const CANONICAL_SIZE: u32 = 450;

/// Minimum area, in squared pixels, a candidate boundary quadrilateral must
/// enclose.
pub const MIN_GRID_AREA: f32 = 10_000.0;

/// Fraction of a contour's perimeter used as the Douglas-Peucker tolerance
/// when approximating it by a polygon.
pub const POLY_EPSILON_RATIO: f32 = 0.02;

/// Edge length of a normalized cell image.
pub const CELL_SIZE: u32 = 100;

/// Maximum gap, in pixels, between flagged profile positions merged into one
/// line group.
pub const LINE_GROUP_GAP: u32 = 3;

/// Margin, in pixels, applied inside detected line boundaries when cropping.
pub const CELL_MARGIN: u32 = 2;

/// Minimum line groups per axis for structure-guided cell extraction; a 9x9
/// grid nominally produces ten.
pub const MIN_LINE_GROUPS: usize = 8;

/// Distance from the image edge, in pixels, within which an outermost
/// detected line counts as the boundary itself.
pub const EDGE_SNAP: u32 = 5;

/// Inward bias, in pixels, for the outermost cell centers during uniform
/// extraction.
pub const BORDER_BIAS: i64 = 6;

/// Fraction of the cell size cropped around the cell center during uniform
/// extraction.
pub const CELL_CROP_RATIO: f32 = 0.8;

/// Dark-pixel fraction below which a cell is classified empty. A ratio
/// exactly at this value counts as content.
pub const EMPTY_DARK_RATIO: f32 = 0.005;

/// Model confidence above which the learned recognizer is trusted outright.
pub const MODEL_TRUST_THRESHOLD: f32 = 0.6;

/// Confidence multiplier for a trusted model candidate.
pub const MODEL_BOOST: f32 = 1.1;

/// Confidence multiplier when two or more methods agree on a digit.
pub const AGREEMENT_BOOST: f32 = 1.2;

/// Confidence multiplier when only a single method produced the winner.
pub const SINGLE_METHOD_PENALTY: f32 = 0.9;

/// Upper bound on any fused confidence.
pub const CONFIDENCE_CAP: f32 = 0.99;

/// Minimum normalized cross-correlation score for an accepted template
/// match.
pub const TEMPLATE_ACCEPT: f32 = 0.5;

/// Minimum confidence accepted from the enhanced-recovery path.
pub const RECOVERY_ACCEPT: f32 = 0.3;

/// Conflicting detections below this confidence are reassessed; at or above
/// it they are trusted as read.
pub const REASSESS_BELOW: f32 = 0.8;

/// Nonzero detections below this confidence are reported as uncertain.
pub const UNCERTAIN_BELOW: f32 = 0.7;

/// Hard ceiling on backtracking node expansions before the search is
/// abandoned.
pub const MAX_NODE_VISITS: usize = 100_000;

/// Maximum backtracking recursion depth, one frame per empty cell.
pub const MAX_SEARCH_DEPTH: usize = 81;
