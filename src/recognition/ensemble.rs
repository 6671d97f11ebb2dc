//! Per-cell recognition ensemble.
//!
//! Each cell runs through an emptiness gate, the learned recognizer (with a
//! relaxed-profile retry), the template matcher, a pure fusion step over the
//! collected candidates, and an enhanced-recovery fallback for cells that
//! carry ink no method could read directly.

use std::collections::BTreeMap;

use image::GrayImage;
use imageproc::contrast::{ThresholdType, equalize_histogram, otsu_level, threshold};
use tracing::{debug, warn};

use crate::core::config::RecognitionConfig;
use crate::core::traits::{DIGIT_ALPHABET, GlyphRecognizer, SensitivityProfile};
use crate::processors::cells::CellImage;
use crate::recognition::template::TemplateMatcher;
use crate::recognition::{CellDetection, RecognitionSource};
use crate::utils::image::{dark_ratio, enforce_dark_on_light};

/// One method's vote for a digit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodCandidate {
    /// The method that produced the candidate.
    pub source: RecognitionSource,
    /// The proposed digit, 1-9.
    pub digit: u8,
    /// The method's confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Fuses ranked method candidates into a single decision.
///
/// The rule list, in order:
/// 1. A model candidate above the trust threshold wins outright and gets the
///    model boost.
/// 2. Otherwise the digit with the most votes wins, ties broken by summed
///    confidence.
/// 3. Two or more agreeing methods boost the average confidence; a single
///    method takes a penalty.
///
/// All boosted confidences are capped. Returns `None` when no candidate was
/// offered.
pub fn fuse_candidates(
    candidates: &[MethodCandidate],
    config: &RecognitionConfig,
) -> Option<(u8, f32, Vec<RecognitionSource>)> {
    if candidates.is_empty() {
        return None;
    }

    if let Some(model) = candidates
        .iter()
        .find(|c| c.source == RecognitionSource::Model)
    {
        if model.confidence > config.model_trust_threshold {
            let confidence = (model.confidence * config.model_boost).min(config.confidence_cap);
            return Some((model.digit, confidence, vec![RecognitionSource::Model]));
        }
    }

    #[derive(Default)]
    struct Tally {
        votes: usize,
        confidence_sum: f32,
        sources: Vec<RecognitionSource>,
    }

    let mut tallies: BTreeMap<u8, Tally> = BTreeMap::new();
    for candidate in candidates {
        let tally = tallies.entry(candidate.digit).or_default();
        tally.votes += 1;
        tally.confidence_sum += candidate.confidence;
        tally.sources.push(candidate.source);
    }

    let (digit, tally) = tallies
        .into_iter()
        .max_by(|(_, a), (_, b)| {
            a.votes
                .cmp(&b.votes)
                .then(a.confidence_sum.total_cmp(&b.confidence_sum))
        })?;

    let average = tally.confidence_sum / tally.votes as f32;
    let confidence = if tally.votes >= 2 {
        (average * config.agreement_boost).min(config.confidence_cap)
    } else {
        average * config.single_method_penalty
    };

    Some((digit, confidence, tally.sources))
}

/// Multi-method digit recognition for normalized cells.
#[derive(Debug)]
pub struct DigitRecognitionEnsemble<R> {
    recognizer: R,
    matcher: TemplateMatcher,
    config: RecognitionConfig,
}

impl<R: GlyphRecognizer> DigitRecognitionEnsemble<R> {
    /// Creates an ensemble around a learned recognizer.
    pub fn new(recognizer: R, config: RecognitionConfig) -> Self {
        let matcher = TemplateMatcher::new(&config);
        Self {
            recognizer,
            matcher,
            config,
        }
    }

    /// The recognition configuration in effect.
    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Classifies one cell.
    ///
    /// Never fails: a cell nothing can read degrades to an empty detection
    /// with zero confidence.
    pub fn recognize_cell(&self, cell: &CellImage) -> CellDetection {
        let position = (cell.row, cell.col);
        let ink = dark_ratio(&cell.image);

        // Inclusive on the has-content side: a ratio exactly at the
        // threshold is treated as a digit.
        if ink < self.config.empty_dark_ratio {
            return CellDetection {
                digit: 0,
                confidence: 1.0,
                sources: vec![RecognitionSource::EmptyDetection],
                position,
            };
        }

        let mut candidates = Vec::with_capacity(2);
        if let Some(model) = self.model_best(&cell.image) {
            candidates.push(model);
        }
        if let Some(template) = self.template_best(&cell.image) {
            candidates.push(template);
        }

        if let Some((digit, confidence, sources)) = fuse_candidates(&candidates, &self.config) {
            return CellDetection {
                digit,
                confidence,
                sources,
                position,
            };
        }

        if ink > self.config.empty_dark_ratio {
            if let Some(recovered) = self.enhanced_recovery(cell) {
                debug!(
                    row = cell.row,
                    col = cell.col,
                    digit = recovered.digit,
                    "enhanced recovery rescued cell"
                );
                return CellDetection {
                    digit: recovered.digit,
                    confidence: recovered.confidence,
                    sources: vec![RecognitionSource::EnhancedRecovery],
                    position,
                };
            }
        }

        CellDetection {
            digit: 0,
            confidence: 0.0,
            sources: vec![RecognitionSource::NoDetection],
            position,
        }
    }

    /// Every candidate the available methods can produce for a cell; used by
    /// reassessment.
    pub fn candidate_sweep(&self, cell: &CellImage) -> Vec<MethodCandidate> {
        let mut candidates = Vec::with_capacity(3);
        if let Some(model) = self.model_best(&cell.image) {
            candidates.push(model);
        }
        if let Some(template) = self.template_best(&cell.image) {
            candidates.push(template);
        }
        if let Some(recovered) = self.enhanced_recovery(cell) {
            candidates.push(recovered);
        }
        candidates
    }

    /// Best model candidate, retrying once with the relaxed profile.
    fn model_best(&self, image: &GrayImage) -> Option<MethodCandidate> {
        self.query_model(image, &SensitivityProfile::fine())
            .or_else(|| self.query_model(image, &SensitivityProfile::relaxed()))
    }

    fn query_model(
        &self,
        image: &GrayImage,
        profile: &SensitivityProfile,
    ) -> Option<MethodCandidate> {
        let candidates = match self
            .recognizer
            .recognize_digits(image, &DIGIT_ALPHABET, profile)
        {
            Ok(candidates) => candidates,
            // The recognizer is best-effort: a failed call reads as "no
            // candidate" and the ensemble falls through.
            Err(err) => {
                warn!(error = %err, "glyph recognizer failed");
                return None;
            }
        };

        candidates
            .into_iter()
            .filter(|c| DIGIT_ALPHABET.contains(&c.digit))
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(|c| MethodCandidate {
                source: RecognitionSource::Model,
                digit: c.digit,
                confidence: c.confidence,
            })
    }

    /// Best template candidate above the acceptance score.
    fn template_best(&self, image: &GrayImage) -> Option<MethodCandidate> {
        self.matcher
            .best_match(image)
            .map(|(digit, score)| MethodCandidate {
                source: RecognitionSource::Template,
                digit,
                confidence: score,
            })
    }

    /// Reruns both recognizers on a contrast-enhanced rendition of the cell.
    ///
    /// The raw crop is histogram-equalized, thresholded at its Otsu level
    /// and renormalized; the first recognizer (model preferred) clearing the
    /// recovery floor wins.
    fn enhanced_recovery(&self, cell: &CellImage) -> Option<MethodCandidate> {
        let equalized = equalize_histogram(&cell.raw);
        let level = otsu_level(&equalized);
        let mut enhanced = threshold(&equalized, level, ThresholdType::Binary);
        enforce_dark_on_light(&mut enhanced);

        if let Some(model) = self.model_best(&enhanced) {
            if model.confidence > self.config.recovery_accept {
                return Some(MethodCandidate {
                    source: RecognitionSource::EnhancedRecovery,
                    digit: model.digit,
                    confidence: model.confidence,
                });
            }
        }
        if let Some(template) = self.template_best(&enhanced) {
            if template.confidence > self.config.recovery_accept {
                return Some(MethodCandidate {
                    source: RecognitionSource::EnhancedRecovery,
                    digit: template.digit,
                    confidence: template.confidence,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::SudokuError;
    use crate::core::traits::GlyphCandidate;
    use crate::recognition::template::render_cell_glyph;
    use image::Luma;
    use std::sync::Mutex;

    /// A recognizer stub that replies with a fixed candidate list and
    /// records the profiles it was called with.
    struct StubRecognizer {
        replies: Vec<GlyphCandidate>,
        calls: Mutex<Vec<SensitivityProfile>>,
    }

    impl StubRecognizer {
        fn with(replies: Vec<GlyphCandidate>) -> Self {
            Self {
                replies,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn silent() -> Self {
            Self::with(Vec::new())
        }
    }

    impl GlyphRecognizer for StubRecognizer {
        fn recognize_digits(
            &self,
            _image: &GrayImage,
            _allowlist: &[u8],
            profile: &SensitivityProfile,
        ) -> Result<Vec<GlyphCandidate>, SudokuError> {
            self.calls.lock().unwrap().push(*profile);
            Ok(self.replies.clone())
        }
    }

    fn cell_from(image: GrayImage) -> CellImage {
        CellImage {
            raw: image.clone(),
            image,
            row: 0,
            col: 0,
        }
    }

    fn blank_cell() -> CellImage {
        cell_from(GrayImage::from_pixel(100, 100, Luma([255])))
    }

    fn glyph_cell(digit: u8) -> CellImage {
        cell_from(render_cell_glyph(digit, 100))
    }

    fn config() -> RecognitionConfig {
        RecognitionConfig::default()
    }

    #[test]
    fn fusion_trusts_confident_model() {
        let candidates = [
            MethodCandidate {
                source: RecognitionSource::Model,
                digit: 7,
                confidence: 0.8,
            },
            MethodCandidate {
                source: RecognitionSource::Template,
                digit: 3,
                confidence: 0.95,
            },
        ];
        let (digit, confidence, sources) = fuse_candidates(&candidates, &config()).unwrap();
        assert_eq!(digit, 7);
        assert!((confidence - 0.88).abs() < 1e-4);
        assert_eq!(sources, vec![RecognitionSource::Model]);
    }

    #[test]
    fn fusion_caps_boosted_confidence() {
        let candidates = [MethodCandidate {
            source: RecognitionSource::Model,
            digit: 2,
            confidence: 0.95,
        }];
        let (_, confidence, _) = fuse_candidates(&candidates, &config()).unwrap();
        assert_eq!(confidence, 0.99);
    }

    #[test]
    fn fusion_rewards_agreement() {
        let candidates = [
            MethodCandidate {
                source: RecognitionSource::Model,
                digit: 4,
                confidence: 0.5,
            },
            MethodCandidate {
                source: RecognitionSource::Template,
                digit: 4,
                confidence: 0.7,
            },
        ];
        let (digit, confidence, sources) = fuse_candidates(&candidates, &config()).unwrap();
        assert_eq!(digit, 4);
        // Average 0.6 boosted by 1.2.
        assert!((confidence - 0.72).abs() < 1e-4);
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn fusion_penalizes_single_method() {
        let candidates = [MethodCandidate {
            source: RecognitionSource::Template,
            digit: 6,
            confidence: 0.8,
        }];
        let (digit, confidence, sources) = fuse_candidates(&candidates, &config()).unwrap();
        assert_eq!(digit, 6);
        assert!((confidence - 0.72).abs() < 1e-4);
        assert_eq!(sources, vec![RecognitionSource::Template]);
    }

    #[test]
    fn fusion_breaks_vote_ties_by_summed_confidence() {
        let candidates = [
            MethodCandidate {
                source: RecognitionSource::Model,
                digit: 1,
                confidence: 0.4,
            },
            MethodCandidate {
                source: RecognitionSource::Template,
                digit: 9,
                confidence: 0.55,
            },
        ];
        let (digit, _, _) = fuse_candidates(&candidates, &config()).unwrap();
        assert_eq!(digit, 9);
    }

    #[test]
    fn fusion_of_nothing_is_none() {
        assert!(fuse_candidates(&[], &config()).is_none());
    }

    #[test]
    fn empty_cell_short_circuits() {
        let ensemble = DigitRecognitionEnsemble::new(StubRecognizer::silent(), config());
        let detection = ensemble.recognize_cell(&blank_cell());
        assert_eq!(detection.digit, 0);
        assert_eq!(detection.confidence, 1.0);
        assert_eq!(detection.sources, vec![RecognitionSource::EmptyDetection]);
        // The gate must fire before any recognizer call.
        assert!(ensemble.recognizer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn dark_ratio_exactly_at_threshold_is_not_empty() {
        // 50 of 10,000 pixels dark: ratio exactly 0.005.
        let mut image = GrayImage::from_pixel(100, 100, Luma([255]));
        for i in 0..50u32 {
            image.put_pixel(i % 100, i / 100, Luma([0]));
        }
        let ensemble = DigitRecognitionEnsemble::new(StubRecognizer::silent(), config());
        let detection = ensemble.recognize_cell(&cell_from(image));
        assert_ne!(detection.sources, vec![RecognitionSource::EmptyDetection]);
    }

    #[test]
    fn unreadable_ink_degrades_to_no_detection() {
        // Scattered ink above the recovery threshold that matches no glyph.
        let mut image = GrayImage::from_pixel(100, 100, Luma([255]));
        for x in 0..100 {
            image.put_pixel(x, 50, Luma([0]));
        }
        let ensemble = DigitRecognitionEnsemble::new(StubRecognizer::silent(), config());
        let detection = ensemble.recognize_cell(&cell_from(image));
        assert_eq!(detection.digit, 0);
        assert_eq!(detection.confidence, 0.0);
        assert_eq!(detection.sources, vec![RecognitionSource::NoDetection]);
    }

    #[test]
    fn confident_model_wins_cell() {
        let stub = StubRecognizer::with(vec![GlyphCandidate {
            digit: 8,
            confidence: 0.9,
        }]);
        let ensemble = DigitRecognitionEnsemble::new(stub, config());
        let detection = ensemble.recognize_cell(&glyph_cell(3));
        assert_eq!(detection.digit, 8);
        assert_eq!(detection.sources, vec![RecognitionSource::Model]);
        assert_eq!(detection.confidence, 0.99);
    }

    #[test]
    fn template_carries_cell_when_model_is_silent() {
        let ensemble = DigitRecognitionEnsemble::new(StubRecognizer::silent(), config());
        let detection = ensemble.recognize_cell(&glyph_cell(5));
        assert_eq!(detection.digit, 5);
        assert_eq!(detection.sources, vec![RecognitionSource::Template]);
        assert!(detection.confidence > 0.4);
    }

    #[test]
    fn silent_model_is_retried_with_relaxed_profile() {
        let ensemble = DigitRecognitionEnsemble::new(StubRecognizer::silent(), config());
        ensemble.recognize_cell(&glyph_cell(5));
        let calls = ensemble.recognizer.calls.lock().unwrap();
        assert_eq!(calls[0], SensitivityProfile::fine());
        assert_eq!(calls[1], SensitivityProfile::relaxed());
    }

    #[test]
    fn agreement_between_model_and_template_boosts() {
        let stub = StubRecognizer::with(vec![GlyphCandidate {
            digit: 5,
            confidence: 0.5,
        }]);
        let ensemble = DigitRecognitionEnsemble::new(stub, config());
        let detection = ensemble.recognize_cell(&glyph_cell(5));
        assert_eq!(detection.digit, 5);
        assert_eq!(detection.sources.len(), 2);
        assert!(detection.confidence > 0.6);
    }

    #[test]
    fn candidate_sweep_collects_all_methods() {
        let stub = StubRecognizer::with(vec![GlyphCandidate {
            digit: 5,
            confidence: 0.8,
        }]);
        let ensemble = DigitRecognitionEnsemble::new(stub, config());
        let candidates = ensemble.candidate_sweep(&glyph_cell(5));
        assert!(
            candidates
                .iter()
                .any(|c| c.source == RecognitionSource::Model)
        );
        assert!(
            candidates
                .iter()
                .any(|c| c.source == RecognitionSource::Template)
        );
        assert!(
            candidates
                .iter()
                .any(|c| c.source == RecognitionSource::EnhancedRecovery)
        );
    }
}
