//! The end-to-end Sudoku pipeline.
//!
//! Wires the stages together: preprocess, localize, analyze structure,
//! extract cells, recognize each cell, reassess conflicts against the
//! Sudoku rules, and finally solve. The output is a single serializable
//! [`PipelineReport`].

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::config::PipelineConfig;
use crate::core::constants::GRID_SIZE;
use crate::core::errors::SudokuError;
use crate::core::traits::GlyphRecognizer;
use crate::processors::cells::CellExtractor;
use crate::processors::localize::GridLocalizer;
use crate::processors::preprocess::ImagePreprocessor;
use crate::processors::structure::GridStructureAnalyzer;
use crate::recognition::ensemble::DigitRecognitionEnsemble;
use crate::recognition::reassess::reassess_detections;
use crate::recognition::{CellDetection, RecognitionSource};
use crate::sudoku::grid::{Conflict, PuzzleGrid};
use crate::sudoku::solve::solve_with_limits;
use crate::sudoku::validate::find_conflicts;
use crate::utils::image::{decode_gray_image, dynamic_to_gray, load_gray_image};

/// The complete result of processing one puzzle image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// The recognized grid, zeros for empty cells.
    pub original_grid: PuzzleGrid,
    /// The completed grid, absent when the puzzle was invalid or the search
    /// failed.
    pub solved_grid: Option<PuzzleGrid>,
    /// Positions of all recognized clues, row-major.
    pub given_positions: Vec<(usize, usize)>,
    /// Per-cell recognition confidence.
    pub confidence_scores: [[f32; GRID_SIZE]; GRID_SIZE],
    /// Per-cell method tags.
    pub recognition_sources: Vec<Vec<Vec<RecognitionSource>>>,
    /// Clue cells whose confidence stayed below the uncertainty threshold.
    pub uncertain_cells: Vec<(usize, usize)>,
    /// Rule conflicts found before reassessment.
    pub validation_conflicts: Vec<Conflict>,
    /// Wall-clock processing time in seconds.
    pub processing_time: f64,
    /// True when the grid carries at least the minimum clue count and no
    /// rule conflicts.
    pub valid_puzzle: bool,
    /// True when the solver completed the grid. Despite the name this
    /// records solution *existence* only; uniqueness is not verified.
    pub unique_solution: bool,
    /// Mean confidence over the recognized clues.
    pub accuracy_estimate: f32,
    /// True when a puzzle boundary was detected and perspective-corrected.
    pub grid_detected: bool,
}

/// The image-to-solution pipeline.
///
/// Holds the stateless stage objects and the recognition ensemble; one
/// pipeline instance can process any number of images sequentially.
#[derive(Debug)]
pub struct SudokuPipeline<R> {
    config: PipelineConfig,
    preprocessor: ImagePreprocessor,
    localizer: GridLocalizer,
    analyzer: GridStructureAnalyzer,
    extractor: CellExtractor,
    ensemble: DigitRecognitionEnsemble<R>,
}

impl<R: GlyphRecognizer> SudokuPipeline<R> {
    /// Creates a pipeline with the default configuration.
    pub fn new(recognizer: R) -> Self {
        // The default configuration is statically valid.
        Self::assemble(recognizer, PipelineConfig::default())
    }

    /// Creates a pipeline with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `config` fails validation.
    pub fn with_config(recognizer: R, config: PipelineConfig) -> Result<Self, SudokuError> {
        config.validate()?;
        Ok(Self::assemble(recognizer, config))
    }

    fn assemble(recognizer: R, config: PipelineConfig) -> Self {
        Self {
            preprocessor: ImagePreprocessor::new(),
            localizer: GridLocalizer::new(config.geometry.clone()),
            analyzer: GridStructureAnalyzer::new(config.geometry.clone()),
            extractor: CellExtractor::new(config.geometry.clone()),
            ensemble: DigitRecognitionEnsemble::new(recognizer, config.recognition.clone()),
            config,
        }
    }

    /// Processes an image file.
    ///
    /// # Errors
    ///
    /// Returns [`SudokuError::ImageLoad`] when the file cannot be decoded;
    /// everything downstream degrades instead of failing.
    pub fn process_path(&self, path: impl AsRef<Path>) -> Result<PipelineReport, SudokuError> {
        let gray = load_gray_image(path.as_ref())?;
        Ok(self.run(gray))
    }

    /// Processes an encoded image held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`SudokuError::ImageLoad`] when the buffer cannot be decoded.
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<PipelineReport, SudokuError> {
        let gray = decode_gray_image(bytes)?;
        Ok(self.run(gray))
    }

    /// Processes an already-decoded image.
    pub fn process_image(&self, image: &DynamicImage) -> PipelineReport {
        self.run(dynamic_to_gray(image))
    }

    fn run(&self, gray: GrayImage) -> PipelineReport {
        let started = Instant::now();
        info!(
            width = gray.width(),
            height = gray.height(),
            "processing puzzle image"
        );

        let binary = self.preprocessor.run(&gray);
        let canonical = self.localizer.localize(&binary);
        let structure = self.analyzer.analyze(&canonical.image);
        let cells = self.extractor.extract(&canonical.image, &structure);

        let mut detections: Vec<Vec<CellDetection>> = cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| self.ensemble.recognize_cell(cell))
                    .collect()
            })
            .collect();

        let validation_conflicts = reassess_detections(&self.ensemble, &mut detections, &cells);

        self.assemble_report(
            &detections,
            validation_conflicts,
            canonical.grid_detected,
            started,
        )
    }

    fn assemble_report(
        &self,
        detections: &[Vec<CellDetection>],
        validation_conflicts: Vec<Conflict>,
        grid_detected: bool,
        started: Instant,
    ) -> PipelineReport {
        let mut original_grid = PuzzleGrid::empty();
        let mut confidence_scores = [[0.0f32; GRID_SIZE]; GRID_SIZE];
        let mut recognition_sources = Vec::with_capacity(GRID_SIZE);
        let mut uncertain_cells = Vec::new();
        let mut confidence_total = 0.0f32;
        let mut clue_count = 0usize;

        for (row, detection_row) in detections.iter().enumerate() {
            let mut sources_row = Vec::with_capacity(GRID_SIZE);
            for (col, detection) in detection_row.iter().enumerate() {
                original_grid.set(row, col, detection.digit);
                confidence_scores[row][col] = detection.confidence;
                sources_row.push(detection.sources.clone());

                if detection.digit > 0 {
                    clue_count += 1;
                    confidence_total += detection.confidence;
                    if detection.confidence < self.config.recognition.uncertain_below {
                        uncertain_cells.push((row, col));
                    }
                }
            }
            recognition_sources.push(sources_row);
        }

        let accuracy_estimate = if clue_count > 0 {
            confidence_total / clue_count as f32
        } else {
            0.0
        };

        let valid_puzzle = clue_count >= self.config.solver.min_clues
            && find_conflicts(&original_grid).is_empty();

        let mut solved_grid = None;
        if valid_puzzle {
            let mut solution = original_grid;
            let report = solve_with_limits(&mut solution, &self.config.solver);
            if report.solved {
                solved_grid = Some(solution);
            }
        }
        let unique_solution = solved_grid.is_some();

        let processing_time = started.elapsed().as_secs_f64();
        info!(
            clues = clue_count,
            accuracy = accuracy_estimate,
            valid = valid_puzzle,
            solved = unique_solution,
            seconds = processing_time,
            "pipeline finished"
        );

        PipelineReport {
            original_grid,
            solved_grid,
            given_positions: original_grid.filled_positions(),
            confidence_scores,
            recognition_sources,
            uncertain_cells,
            validation_conflicts,
            processing_time,
            valid_puzzle,
            unique_solution,
            accuracy_estimate,
            grid_detected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::SudokuError;
    use crate::core::traits::{GlyphCandidate, SensitivityProfile};
    use crate::recognition::template::render_cell_glyph;
    use image::imageops::{self, FilterType};
    use image::Luma;

    /// Cell pitch of the synthetic test grid.
    const PITCH: u32 = 49;

    /// A deterministic stand-in for the learned recognizer: classifies by
    /// pixel agreement against bounding-box-normalized renderings of the
    /// nine glyphs.
    struct OracleRecognizer {
        references: Vec<(u8, GrayImage)>,
    }

    impl OracleRecognizer {
        fn new() -> Self {
            let references = (1..=9u8)
                .filter_map(|digit| {
                    bbox_normalize(&render_cell_glyph(digit, 100)).map(|img| (digit, img))
                })
                .collect();
            Self { references }
        }
    }

    impl GlyphRecognizer for OracleRecognizer {
        fn recognize_digits(
            &self,
            image: &GrayImage,
            _allowlist: &[u8],
            _profile: &SensitivityProfile,
        ) -> Result<Vec<GlyphCandidate>, SudokuError> {
            let Some(probe) = bbox_normalize(image) else {
                return Ok(Vec::new());
            };
            let best = self
                .references
                .iter()
                .map(|(digit, reference)| (*digit, agreement(&probe, reference)))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            Ok(best
                .map(|(digit, confidence)| GlyphCandidate { digit, confidence })
                .into_iter()
                .collect())
        }
    }

    /// Crops an image to its ink bounding box and resizes to 64x64 binary.
    fn bbox_normalize(image: &GrayImage) -> Option<GrayImage> {
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0u32, 0u32);
        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0[0] < 127 {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        if min_x > max_x {
            return None;
        }
        let crop = imageops::crop_imm(image, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
            .to_image();
        let resized = imageops::resize(&crop, 64, 64, FilterType::CatmullRom);
        Some(imageproc::contrast::threshold(
            &resized,
            127,
            imageproc::contrast::ThresholdType::Binary,
        ))
    }

    /// Fraction of pixels two equally-sized binary images agree on.
    fn agreement(a: &GrayImage, b: &GrayImage) -> f32 {
        let total = (a.width() * a.height()) as f32;
        let matching = a
            .pixels()
            .zip(b.pixels())
            .filter(|(pa, pb)| pa.0[0] == pb.0[0])
            .count();
        matching as f32 / total
    }

    /// Renders a complete 450x450 puzzle image: 3-px grid lines on a 49-px
    /// pitch and a glyph digit centered in each clue cell.
    fn render_puzzle(grid: &PuzzleGrid) -> GrayImage {
        let mut img = GrayImage::from_pixel(450, 450, Luma([255]));
        for k in 0..=9u32 {
            for t in 0..3 {
                let p = k * PITCH + t;
                for o in 0..450 {
                    img.put_pixel(o, p, Luma([0]));
                    img.put_pixel(p, o, Luma([0]));
                }
            }
        }
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let digit = grid.get(row, col);
                if digit == 0 {
                    continue;
                }
                let glyph = render_cell_glyph(digit, 27);
                let x0 = col as u32 * PITCH + 11;
                let y0 = row as u32 * PITCH + 11;
                for (x, y, pixel) in glyph.enumerate_pixels() {
                    if pixel.0[0] < 127 {
                        img.put_pixel(x0 + x, y0 + y, Luma([0]));
                    }
                }
            }
        }
        img
    }

    fn scenario_grid() -> PuzzleGrid {
        PuzzleGrid::parse(
            "3.5...1.8/.9..5172./.7.23.645/..7.42.81/.8....9../1.9....7./.324.8517/.1...54../6...9.8..",
        )
        .unwrap()
    }

    #[test]
    fn full_pipeline_reads_and_solves_a_synthetic_puzzle() {
        let expected = scenario_grid();
        let image = DynamicImage::ImageLuma8(render_puzzle(&expected));
        let pipeline = SudokuPipeline::new(OracleRecognizer::new());

        let report = pipeline.process_image(&image);

        assert!(report.grid_detected);
        assert_eq!(report.original_grid, expected);
        assert_eq!(report.given_positions.len(), 38);
        assert!(report.valid_puzzle);
        assert!(report.validation_conflicts.is_empty());
        assert!(report.uncertain_cells.is_empty());
        assert!(report.accuracy_estimate > 0.7);
        assert!(report.processing_time >= 0.0);

        // The solver output must complete the givens.
        assert!(report.unique_solution);
        let solved = report.solved_grid.expect("solved grid");
        assert!(solved.is_complete());
        assert!(find_conflicts(&solved).is_empty());
        for (row, col) in expected.filled_positions() {
            assert_eq!(solved.get(row, col), expected.get(row, col));
        }
    }

    #[test]
    fn empty_cells_are_classified_by_the_emptiness_gate() {
        let expected = scenario_grid();
        let image = DynamicImage::ImageLuma8(render_puzzle(&expected));
        let pipeline = SudokuPipeline::new(OracleRecognizer::new());
        let report = pipeline.process_image(&image);

        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                if expected.get(row, col) == 0 {
                    assert_eq!(
                        report.recognition_sources[row][col],
                        vec![RecognitionSource::EmptyDetection],
                        "cell ({row}, {col})"
                    );
                    assert_eq!(report.confidence_scores[row][col], 1.0);
                }
            }
        }
    }

    #[test]
    fn featureless_image_degrades_to_an_empty_report() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(300, 300, Luma([255])));
        let pipeline = SudokuPipeline::new(OracleRecognizer::new());
        let report = pipeline.process_image(&blank);

        assert!(!report.grid_detected);
        assert_eq!(report.original_grid, PuzzleGrid::empty());
        assert!(report.given_positions.is_empty());
        assert!(!report.valid_puzzle);
        assert!(!report.unique_solution);
        assert!(report.solved_grid.is_none());
        assert_eq!(report.accuracy_estimate, 0.0);
    }

    #[test]
    fn unreadable_bytes_surface_an_image_load_error() {
        let pipeline = SudokuPipeline::new(OracleRecognizer::new());
        let err = pipeline.process_bytes(&[1, 2, 3, 4]).unwrap_err();
        assert!(matches!(err, SudokuError::ImageLoad(_)));
    }

    #[test]
    fn missing_file_surfaces_an_image_load_error() {
        let pipeline = SudokuPipeline::new(OracleRecognizer::new());
        let err = pipeline
            .process_path("/nonexistent/puzzle.png")
            .unwrap_err();
        assert!(matches!(err, SudokuError::ImageLoad(_)));
    }

    #[test]
    fn report_serializes_to_json() {
        let expected = scenario_grid();
        let image = DynamicImage::ImageLuma8(render_puzzle(&expected));
        let pipeline = SudokuPipeline::new(OracleRecognizer::new());
        let report = pipeline.process_image(&image);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"original_grid\""));
        assert!(json.contains("\"unique_solution\":true"));
        let back: PipelineReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.original_grid, report.original_grid);
    }

    #[test]
    fn rejected_configuration_is_surfaced() {
        let mut config = PipelineConfig::default();
        config.geometry.cell_size = 0;
        let result = SudokuPipeline::with_config(OracleRecognizer::new(), config);
        assert!(result.is_err());
    }
}
