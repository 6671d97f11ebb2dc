//! Error types for the Sudoku vision pipeline.
//!
//! The recognition path is failure-tolerant by design: stages degrade to
//! blank cells, fallback grids or zero-confidence detections instead of
//! returning errors. The variants here cover the conditions that *are*
//! surfaced to the caller: unreadable input images, caller contract
//! violations and configuration problems.

use thiserror::Error;

/// Stage of the pipeline an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while preparing the input image.
    Preprocessing,
    /// Error occurred while locating the puzzle boundary.
    GridLocalization,
    /// Error occurred while analyzing grid line structure.
    StructureAnalysis,
    /// Error occurred while extracting cell images.
    CellExtraction,
    /// Error occurred during digit recognition.
    Recognition,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Preprocessing => write!(f, "preprocessing"),
            ProcessingStage::GridLocalization => write!(f, "grid localization"),
            ProcessingStage::StructureAnalysis => write!(f, "structure analysis"),
            ProcessingStage::CellExtraction => write!(f, "cell extraction"),
            ProcessingStage::Recognition => write!(f, "recognition"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Errors surfaced by the Sudoku vision pipeline.
#[derive(Error, Debug)]
pub enum SudokuError {
    /// The input image could not be decoded. This is the single fatal input
    /// condition; everything downstream degrades instead of failing.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred in a specific pipeline stage.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage the error occurred in.
        stage: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A caller contract violation: malformed grid shape, digit outside 0-9,
    /// or an otherwise unusable argument.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// A configuration problem.
    #[error(transparent)]
    Config(#[from] crate::core::config::ConfigError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl SudokuError {
    /// Creates an error for a specific pipeline stage with context.
    ///
    /// # Arguments
    ///
    /// * `stage` - The stage the error occurred in.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error.
    pub fn processing(
        stage: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a recognition-stage error with context.
    pub fn recognition(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing(ProcessingStage::Recognition, context, error)
    }

    /// Creates an invalid-input error from a message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}
