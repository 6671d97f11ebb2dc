//! Configuration for the Sudoku vision pipeline.
//!
//! Every tunable threshold is collected here, grouped by the part of the
//! pipeline it steers. Defaults come from [`crate::core::constants`]; a
//! configuration loaded from JSON is checked with
//! [`PipelineConfig::validate`] before use.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::constants::*;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A parameter that must be a ratio lies outside `[0, 1]`.
    #[error("{name} must lie in [0, 1], got {value}")]
    RatioOutOfRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// A dimension or limit that must be positive is zero.
    #[error("{name} must be greater than 0")]
    ZeroLimit {
        /// Name of the offending parameter.
        name: &'static str,
    },

    /// A configuration combination that cannot work.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// A message describing the problem.
        message: String,
    },
}

/// Geometry parameters: grid localization, structure analysis and cell
/// extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Edge length of the canonical perspective-corrected grid image.
    pub canonical_size: u32,
    /// Minimum area a candidate boundary quadrilateral must enclose.
    pub min_grid_area: f32,
    /// Fraction of the contour perimeter used as polygon approximation
    /// tolerance.
    pub poly_epsilon_ratio: f32,
    /// Edge length of a normalized cell image.
    pub cell_size: u32,
    /// Maximum gap between profile positions merged into one line group.
    pub line_group_gap: u32,
    /// Margin applied inside detected line boundaries when cropping.
    pub cell_margin: u32,
    /// Minimum line groups per axis for structure-guided extraction.
    pub min_line_groups: usize,
    /// Distance from the image edge within which an outermost line counts as
    /// the boundary.
    pub edge_snap: u32,
    /// Inward bias for outermost cell centers during uniform extraction.
    pub border_bias: i64,
    /// Fraction of the cell size cropped around the cell center.
    pub cell_crop_ratio: f32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            canonical_size: CANONICAL_SIZE,
            min_grid_area: MIN_GRID_AREA,
            poly_epsilon_ratio: POLY_EPSILON_RATIO,
            cell_size: CELL_SIZE,
            line_group_gap: LINE_GROUP_GAP,
            cell_margin: CELL_MARGIN,
            min_line_groups: MIN_LINE_GROUPS,
            edge_snap: EDGE_SNAP,
            border_bias: BORDER_BIAS,
            cell_crop_ratio: CELL_CROP_RATIO,
        }
    }
}

/// Recognition parameters: emptiness gating, ensemble fusion and
/// reassessment thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Dark-pixel fraction below which a cell is classified empty.
    pub empty_dark_ratio: f32,
    /// Model confidence above which the learned recognizer is trusted
    /// outright.
    pub model_trust_threshold: f32,
    /// Confidence multiplier for a trusted model candidate.
    pub model_boost: f32,
    /// Confidence multiplier when two or more methods agree.
    pub agreement_boost: f32,
    /// Confidence multiplier when a single method produced the winner.
    pub single_method_penalty: f32,
    /// Upper bound on any fused confidence.
    pub confidence_cap: f32,
    /// Minimum normalized cross-correlation score for a template match.
    pub template_accept: f32,
    /// Minimum confidence accepted from enhanced recovery.
    pub recovery_accept: f32,
    /// Conflicting detections below this confidence are reassessed.
    pub reassess_below: f32,
    /// Nonzero detections below this confidence are reported as uncertain.
    pub uncertain_below: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            empty_dark_ratio: EMPTY_DARK_RATIO,
            model_trust_threshold: MODEL_TRUST_THRESHOLD,
            model_boost: MODEL_BOOST,
            agreement_boost: AGREEMENT_BOOST,
            single_method_penalty: SINGLE_METHOD_PENALTY,
            confidence_cap: CONFIDENCE_CAP,
            template_accept: TEMPLATE_ACCEPT,
            recovery_accept: RECOVERY_ACCEPT,
            reassess_below: REASSESS_BELOW,
            uncertain_below: UNCERTAIN_BELOW,
        }
    }
}

/// Solver limits and puzzle validity parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Hard ceiling on node expansions before the search is abandoned.
    pub max_node_visits: usize,
    /// Maximum recursion depth.
    pub max_depth: usize,
    /// Minimum number of clues for a puzzle to be considered well-posed.
    pub min_clues: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_node_visits: MAX_NODE_VISITS,
            max_depth: MAX_SEARCH_DEPTH,
            min_clues: MIN_CLUES,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Geometry parameters.
    pub geometry: GeometryConfig,
    /// Recognition parameters.
    pub recognition: RecognitionConfig,
    /// Solver parameters.
    pub solver: SolverConfig,
}

impl PipelineConfig {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// `Ok(())` when every parameter is usable, or the first [`ConfigError`]
    /// encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geometry.canonical_size == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "geometry.canonical_size",
            });
        }
        if self.geometry.cell_size == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "geometry.cell_size",
            });
        }
        check_ratio("geometry.cell_crop_ratio", self.geometry.cell_crop_ratio)?;
        check_ratio("recognition.empty_dark_ratio", self.recognition.empty_dark_ratio)?;
        check_ratio(
            "recognition.model_trust_threshold",
            self.recognition.model_trust_threshold,
        )?;
        check_ratio("recognition.confidence_cap", self.recognition.confidence_cap)?;
        check_ratio("recognition.template_accept", self.recognition.template_accept)?;
        check_ratio("recognition.recovery_accept", self.recognition.recovery_accept)?;
        check_ratio("recognition.reassess_below", self.recognition.reassess_below)?;
        check_ratio("recognition.uncertain_below", self.recognition.uncertain_below)?;
        if self.solver.max_node_visits == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "solver.max_node_visits",
            });
        }
        if self.solver.max_depth == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "solver.max_depth",
            });
        }
        if self.geometry.canonical_size < self.geometry.cell_size {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "canonical size {} is smaller than cell size {}",
                    self.geometry.canonical_size, self.geometry.cell_size
                ),
            });
        }
        Ok(())
    }
}

fn check_ratio(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::RatioOutOfRange { name, value });
    }
    Ok(())
}
