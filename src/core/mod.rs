//! Core building blocks of the Sudoku vision pipeline.
//!
//! This module contains the pieces the rest of the crate is built from:
//! - Named constants for every tunable threshold
//! - Configuration structures with validation
//! - The error taxonomy
//! - The trait seam to the external learned recognizer

pub mod config;
pub mod constants;
pub mod errors;
pub mod traits;

pub use config::{ConfigError, GeometryConfig, PipelineConfig, RecognitionConfig, SolverConfig};
pub use constants::*;
pub use errors::{ProcessingStage, SudokuError};
pub use traits::{DIGIT_ALPHABET, GlyphCandidate, GlyphRecognizer, SensitivityProfile};
