//! The seam between the pipeline and the learned glyph recognizer.
//!
//! The recognition capability itself is an external collaborator; the
//! pipeline consumes it through [`GlyphRecognizer`] and never assumes more
//! than this interface. Implementations wrap whatever model serves the
//! deployment (an ONNX session, a remote service, a test stub).

use image::GrayImage;

use crate::core::errors::SudokuError;

/// The digits a Sudoku cell may carry; the recognizer is restricted to these.
pub const DIGIT_ALPHABET: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];

/// A single ranked candidate returned by the learned recognizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphCandidate {
    /// The recognized digit, 1-9.
    pub digit: u8,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Detection sensitivity settings passed to the learned recognizer.
///
/// The ensemble calls the recognizer with [`SensitivityProfile::fine`] first
/// and retries once with [`SensitivityProfile::relaxed`] when no candidate
/// comes back, so implementations must honor at least these two profiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensitivityProfile {
    /// Minimum confidence for a recognized glyph.
    pub text_threshold: f32,
    /// Low-bound score for region proposals.
    pub low_text: f32,
    /// Minimum relative width of a detectable glyph.
    pub width_threshold: f32,
    /// Minimum relative height of a detectable glyph.
    pub height_threshold: f32,
}

impl SensitivityProfile {
    /// The primary profile: tuned to pick up small, thin digits.
    pub fn fine() -> Self {
        Self {
            text_threshold: 0.5,
            low_text: 0.3,
            width_threshold: 0.005,
            height_threshold: 0.005,
        }
    }

    /// The fallback profile: less aggressive, closer to recognizer defaults.
    pub fn relaxed() -> Self {
        Self {
            text_threshold: 0.7,
            low_text: 0.4,
            width_threshold: 0.1,
            height_threshold: 0.1,
        }
    }
}

/// A learned digit recognizer consumed as a black box.
///
/// Implementations must be reentrant: the pipeline is invoked once per image
/// but the capability may be shared across invocations, hence the
/// `Send + Sync` bound.
pub trait GlyphRecognizer: Send + Sync {
    /// Recognizes digits in a normalized cell image.
    ///
    /// # Arguments
    ///
    /// * `image` - Normalized cell image, dark digit on light background.
    /// * `allowlist` - Digits the recognizer may report; the ensemble always
    ///   passes [`DIGIT_ALPHABET`].
    /// * `profile` - Detection sensitivity settings.
    ///
    /// # Returns
    ///
    /// All candidates found, in no particular order; empty when nothing was
    /// recognized. Candidates outside the allowlist are discarded by the
    /// caller.
    ///
    /// # Errors
    ///
    /// Implementations wrap model failures with
    /// [`SudokuError::recognition`](crate::core::errors::SudokuError::recognition);
    /// the ensemble treats a failed call as "no candidate" and falls through
    /// to its other methods.
    fn recognize_digits(
        &self,
        image: &GrayImage,
        allowlist: &[u8],
        profile: &SensitivityProfile,
    ) -> Result<Vec<GlyphCandidate>, SudokuError>;
}

impl<T: GlyphRecognizer + ?Sized> GlyphRecognizer for &T {
    fn recognize_digits(
        &self,
        image: &GrayImage,
        allowlist: &[u8],
        profile: &SensitivityProfile,
    ) -> Result<Vec<GlyphCandidate>, SudokuError> {
        (**self).recognize_digits(image, allowlist, profile)
    }
}
