//! Digit recognition: template matching, the recognition ensemble and
//! constraint-driven reassessment.

pub mod ensemble;
pub mod reassess;
pub mod template;

pub use ensemble::{DigitRecognitionEnsemble, MethodCandidate, fuse_candidates};
pub use reassess::reassess_detections;
pub use template::TemplateMatcher;

use serde::{Deserialize, Serialize};

/// The method that produced (or failed to produce) a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionSource {
    /// The cell carried no ink worth recognizing.
    EmptyDetection,
    /// The learned glyph recognizer.
    Model,
    /// Normalized cross-correlation against the reference glyphs.
    Template,
    /// The histogram-equalization recovery path.
    EnhancedRecovery,
    /// Reassessment cleared the cell because no candidate satisfied the
    /// rules.
    RuleValidation,
    /// No method produced a candidate.
    NoDetection,
}

impl std::fmt::Display for RecognitionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            RecognitionSource::EmptyDetection => "empty_detection",
            RecognitionSource::Model => "model",
            RecognitionSource::Template => "template",
            RecognitionSource::EnhancedRecovery => "enhanced_recovery",
            RecognitionSource::RuleValidation => "rule_validation",
            RecognitionSource::NoDetection => "no_detection",
        };
        write!(f, "{tag}")
    }
}

/// The recognition result for one cell.
///
/// Created once per cell during the initial pass and replaced at most once
/// by reassessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellDetection {
    /// The detected digit; 0 means empty.
    pub digit: u8,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// The methods that agreed on this digit, in ranking order.
    pub sources: Vec<RecognitionSource>,
    /// `(row, col)` of the cell.
    pub position: (usize, usize),
}
