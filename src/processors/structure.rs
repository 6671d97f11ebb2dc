//! Grid line structure analysis.
//!
//! Projects the canonical grid image onto each axis by counting dark pixels
//! per row and per column. Positions whose count exceeds twice the axis mean
//! are grid-line samples; consecutive samples collapse into one
//! [`LineGroup`] per physical line. A 9x9 grid should produce ten groups per
//! axis; fewer than eight on either axis marks the structure unreliable and
//! cell extraction falls back to uniform division.

use image::GrayImage;
use tracing::debug;

use crate::core::config::GeometryConfig;
use crate::core::constants::DARK_LEVEL;

/// Multiplier over the axis mean a profile position must exceed to count as
/// a grid-line sample.
const LINE_FLAG_FACTOR: f32 = 2.0;

/// One detected grid line on an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineGroup {
    /// Mean position of the line's profile samples, in pixels.
    pub center: u32,
    /// Number of consecutive samples the line spans, in pixels.
    pub thickness: u32,
}

/// Detected line structure of a canonical grid image.
#[derive(Debug, Clone)]
pub struct GridStructure {
    /// Horizontal lines, ordered top to bottom.
    pub horizontal: Vec<LineGroup>,
    /// Vertical lines, ordered left to right.
    pub vertical: Vec<LineGroup>,
}

impl GridStructure {
    /// True when both axes carry at least `min_groups` detected lines.
    pub fn is_reliable(&self, min_groups: usize) -> bool {
        self.horizontal.len() >= min_groups && self.vertical.len() >= min_groups
    }

    /// The thickest detected line, used as the inset when cropping cells.
    /// At least 1 even when no lines were detected.
    pub fn line_thickness(&self) -> u32 {
        self.horizontal
            .iter()
            .chain(self.vertical.iter())
            .map(|g| g.thickness)
            .max()
            .unwrap_or(1)
            .max(1)
    }
}

/// Locates grid separator lines from pixel density profiles.
#[derive(Debug, Clone, Default)]
pub struct GridStructureAnalyzer {
    config: GeometryConfig,
}

impl GridStructureAnalyzer {
    /// Creates an analyzer with the given geometry configuration.
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    /// Analyzes the line structure of a canonical grid image.
    pub fn analyze(&self, grid: &GrayImage) -> GridStructure {
        let (width, height) = grid.dimensions();

        let mut row_counts = vec![0u32; height as usize];
        let mut col_counts = vec![0u32; width as usize];
        for (x, y, pixel) in grid.enumerate_pixels() {
            if pixel.0[0] < DARK_LEVEL {
                row_counts[y as usize] += 1;
                col_counts[x as usize] += 1;
            }
        }

        let structure = GridStructure {
            horizontal: self.group_lines(&row_counts),
            vertical: self.group_lines(&col_counts),
        };
        debug!(
            horizontal = structure.horizontal.len(),
            vertical = structure.vertical.len(),
            reliable = structure.is_reliable(self.config.min_line_groups),
            "grid structure analyzed"
        );
        structure
    }

    /// Flags profile positions above twice the axis mean and merges runs
    /// with gaps up to `line_group_gap` into line groups.
    fn group_lines(&self, counts: &[u32]) -> Vec<LineGroup> {
        if counts.is_empty() {
            return Vec::new();
        }
        let mean = counts.iter().map(|&c| c as f64).sum::<f64>() / counts.len() as f64;
        let cutoff = mean * LINE_FLAG_FACTOR as f64;

        let flagged: Vec<u32> = counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c as f64 > cutoff)
            .map(|(i, _)| i as u32)
            .collect();

        let mut groups = Vec::new();
        let mut current: Vec<u32> = Vec::new();
        for &pos in &flagged {
            match current.last() {
                Some(&last) if pos - last <= self.config.line_group_gap => current.push(pos),
                Some(_) => {
                    groups.push(Self::close_group(&current));
                    current = vec![pos];
                }
                None => current.push(pos),
            }
        }
        if !current.is_empty() {
            groups.push(Self::close_group(&current));
        }
        groups
    }

    fn close_group(positions: &[u32]) -> LineGroup {
        let center = positions.iter().sum::<u32>() / positions.len() as u32;
        LineGroup {
            center,
            thickness: positions.len() as u32,
        }
    }
}
