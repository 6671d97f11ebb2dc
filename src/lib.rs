//! # Sudoku Vision
//!
//! A Rust library that extracts a 9x9 Sudoku puzzle from a photographed
//! grid, resolves uncertain readings against the puzzle's own rules, and
//! completes it by backtracking search.
//!
//! ## Pipeline
//!
//! - **Preprocessing**: grayscale, blur, adaptive threshold, morphology
//! - **Grid localization**: boundary contour detection and perspective
//!   correction onto a canonical square
//! - **Structure analysis**: separator line positions from pixel density
//!   profiles
//! - **Cell extraction**: line-guided or uniform cropping with fixed-size
//!   normalization
//! - **Recognition ensemble**: a learned glyph recognizer fused with
//!   template matching, plus an enhanced-recovery fallback
//! - **Rule validation and reassessment**: conflicting low-confidence reads
//!   are re-derived under Sudoku constraints
//! - **Solving**: deterministic backtracking with an explicit node ceiling
//!
//! The learned recognizer is an external capability consumed through the
//! [`core::GlyphRecognizer`] trait; everything else is self-contained.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sudoku_vision::prelude::*;
//!
//! # fn run(recognizer: impl GlyphRecognizer) -> Result<(), SudokuError> {
//! let pipeline = SudokuPipeline::new(recognizer);
//! let report = pipeline.process_path("puzzle.jpg")?;
//!
//! println!("{}", report.original_grid);
//! if let Some(solved) = &report.solved_grid {
//!     println!("solved:\n{solved}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The solver and validator are usable on their own:
//!
//! ```rust
//! use sudoku_vision::sudoku::{PuzzleGrid, assess, solve};
//!
//! let mut grid = PuzzleGrid::empty();
//! assert!(assess(&grid).is_valid);
//! assert!(solve(&mut grid).solved);
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod recognition;
pub mod sudoku;
pub mod utils;

pub use crate::core::{PipelineConfig, SudokuError};
pub use crate::pipeline::{PipelineReport, SudokuPipeline};

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::core::{
        GlyphCandidate, GlyphRecognizer, PipelineConfig, SensitivityProfile, SudokuError,
    };
    pub use crate::pipeline::{PipelineReport, SudokuPipeline};
    pub use crate::recognition::{CellDetection, RecognitionSource};
    pub use crate::sudoku::{Conflict, ConflictKind, PuzzleGrid, SolveReport};
}

/// Initializes the tracing subscriber for logging.
///
/// Sets up the environment-filtered formatting subscriber; typically called
/// once at application start.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
