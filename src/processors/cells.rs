//! Cell image extraction and normalization.
//!
//! Two extraction strategies live behind [`CellExtractor::extract`]:
//! line-based cropping when the structure analyzer found enough separator
//! lines, and uniform division with border-biased centers otherwise. The
//! selection rule is deterministic. Every crop is normalized to a fixed
//! resolution with dark-digit-on-light-background polarity; an empty or
//! invalid crop becomes a synthetic blank cell instead of an error.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::contrast::{ThresholdType, threshold};
use itertools::Itertools;
use tracing::debug;

use crate::core::config::GeometryConfig;
use crate::core::constants::{DARK_LEVEL, GRID_SIZE};
use crate::processors::structure::GridStructure;
use crate::utils::image::enforce_dark_on_light;

/// Mean intensity below which a border strip counts as a solid line.
const BORDER_SCRUB_MEAN: f32 = 100.0;

/// Intensity spread below which a border strip counts as solid rather than
/// digit ink crossing the border.
const BORDER_SCRUB_DEVIATION: f32 = 50.0;

/// A normalized cell image.
#[derive(Debug, Clone)]
pub struct CellImage {
    /// The resized grayscale crop before binarization; kept for enhanced
    /// recovery.
    pub raw: GrayImage,
    /// The normalized binary cell, dark digit on light background.
    pub image: GrayImage,
    /// Row of the cell in the grid.
    pub row: usize,
    /// Column of the cell in the grid.
    pub col: usize,
}

/// Crops and normalizes the 81 cell images of a canonical grid.
#[derive(Debug, Clone, Default)]
pub struct CellExtractor {
    config: GeometryConfig,
}

impl CellExtractor {
    /// Creates an extractor with the given geometry configuration.
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    /// Extracts all 81 cells, row-major.
    ///
    /// Uses line-based cropping when `structure` is reliable on both axes,
    /// uniform division otherwise.
    pub fn extract(&self, canonical: &GrayImage, structure: &GridStructure) -> Vec<Vec<CellImage>> {
        if structure.is_reliable(self.config.min_line_groups) {
            debug!("extracting cells along detected grid lines");
            self.extract_line_based(canonical, structure)
        } else {
            debug!("grid structure unreliable, extracting cells uniformly");
            self.extract_uniform(canonical)
        }
    }

    /// Crops cells between detected separator lines.
    fn extract_line_based(
        &self,
        canonical: &GrayImage,
        structure: &GridStructure,
    ) -> Vec<Vec<CellImage>> {
        let (width, height) = canonical.dimensions();
        let rows = self.boundaries(structure.horizontal.iter().map(|g| g.center), height);
        let cols = self.boundaries(structure.vertical.iter().map(|g| g.center), width);
        let inset = structure.line_thickness() / 2 + self.config.cell_margin;

        (0..GRID_SIZE)
            .map(|row| {
                (0..GRID_SIZE)
                    .map(|col| {
                        let crop = self.crop_between(canonical, &rows, &cols, row, col, inset);
                        self.normalize(crop, row, col)
                    })
                    .collect()
            })
            .collect()
    }

    /// Sorted line positions with boundaries synthesized at the image edges
    /// when the outermost detected lines sit too far inside.
    fn boundaries(&self, centers: impl Iterator<Item = u32>, extent: u32) -> Vec<u32> {
        let mut positions: Vec<u32> = centers.sorted().collect();
        if positions.first().is_some_and(|&first| first > self.config.edge_snap) {
            positions.insert(0, 0);
        }
        if positions
            .last()
            .is_some_and(|&last| last + self.config.edge_snap < extent - 1)
        {
            positions.push(extent - 1);
        }
        positions
    }

    /// The crop for one cell between its bounding separator lines, or `None`
    /// when the boundaries leave no room.
    fn crop_between(
        &self,
        canonical: &GrayImage,
        rows: &[u32],
        cols: &[u32],
        row: usize,
        col: usize,
        inset: u32,
    ) -> Option<GrayImage> {
        if row + 1 >= rows.len() || col + 1 >= cols.len() {
            return None;
        }
        let y1 = rows[row] + inset;
        let y2 = rows[row + 1].saturating_sub(inset);
        let x1 = cols[col] + inset;
        let x2 = cols[col + 1].saturating_sub(inset);
        if y2 <= y1 || x2 <= x1 {
            return None;
        }
        Some(imageops::crop_imm(canonical, x1, y1, x2 - x1, y2 - y1).to_image())
    }

    /// Crops cells from nine equal bands per axis, biasing the outermost
    /// rows' and columns' centers inward to dodge residual border ink.
    fn extract_uniform(&self, canonical: &GrayImage) -> Vec<Vec<CellImage>> {
        let (width, height) = canonical.dimensions();
        let cell_height = height / GRID_SIZE as u32;
        let cell_width = width / GRID_SIZE as u32;
        let window_height = (cell_height as f32 * self.config.cell_crop_ratio) as u32;
        let window_width = (cell_width as f32 * self.config.cell_crop_ratio) as u32;

        (0..GRID_SIZE)
            .map(|row| {
                (0..GRID_SIZE)
                    .map(|col| {
                        let center_y = self.biased_center(row, cell_height);
                        let center_x = self.biased_center(col, cell_width);
                        let crop = crop_window(
                            canonical,
                            center_x,
                            center_y,
                            window_width,
                            window_height,
                        );
                        self.normalize(crop, row, col)
                    })
                    .collect()
            })
            .collect()
    }

    /// Center of band `index`, shifted inward for the two outermost bands on
    /// each side.
    fn biased_center(&self, index: usize, band: u32) -> i64 {
        let center = index as i64 * band as i64 + band as i64 / 2;
        if index <= 1 {
            center + self.config.border_bias
        } else if index >= GRID_SIZE - 2 {
            center - self.config.border_bias
        } else {
            center
        }
    }

    /// Normalizes a crop to the fixed cell resolution; `None` becomes a
    /// blank placeholder.
    fn normalize(&self, crop: Option<GrayImage>, row: usize, col: usize) -> CellImage {
        let size = self.config.cell_size;
        let Some(crop) = crop.filter(|c| c.width() > 0 && c.height() > 0) else {
            let blank = GrayImage::from_pixel(size, size, Luma([255]));
            return CellImage {
                raw: blank.clone(),
                image: blank,
                row,
                col,
            };
        };

        let raw = imageops::resize(&crop, size, size, FilterType::CatmullRom);
        let mut scrubbed = raw.clone();
        scrub_border_artifacts(&mut scrubbed);
        let mut binary = threshold(&scrubbed, DARK_LEVEL, ThresholdType::Binary);
        enforce_dark_on_light(&mut binary);

        CellImage {
            raw,
            image: binary,
            row,
            col,
        }
    }
}

/// Clears 1-px border strips that are solid dark lines. A strip is cleared
/// only when it is both dark on average and nearly uniform, so digit strokes
/// touching the border survive.
pub(crate) fn scrub_border_artifacts(image: &mut GrayImage) {
    let (width, height) = image.dimensions();
    if width < 10 || height < 10 {
        return;
    }

    let row_pixels = |img: &GrayImage, y: u32| (0..width).map(|x| img.get_pixel(x, y).0[0]).collect::<Vec<_>>();
    let col_pixels = |img: &GrayImage, x: u32| (0..height).map(|y| img.get_pixel(x, y).0[0]).collect::<Vec<_>>();

    let strips: [(bool, u32, Vec<u8>); 4] = [
        (true, 0, row_pixels(image, 0)),
        (true, height - 1, row_pixels(image, height - 1)),
        (false, 0, col_pixels(image, 0)),
        (false, width - 1, col_pixels(image, width - 1)),
    ];

    for (is_row, pos, pixels) in strips {
        if !is_solid_dark(&pixels) {
            continue;
        }
        if is_row {
            for x in 0..width {
                image.put_pixel(x, pos, Luma([255]));
            }
        } else {
            for y in 0..height {
                image.put_pixel(pos, y, Luma([255]));
            }
        }
    }
}

fn is_solid_dark(pixels: &[u8]) -> bool {
    if pixels.is_empty() {
        return false;
    }
    let n = pixels.len() as f32;
    let mean = pixels.iter().map(|&p| p as f32).sum::<f32>() / n;
    let variance = pixels
        .iter()
        .map(|&p| (p as f32 - mean).powi(2))
        .sum::<f32>()
        / n;
    mean < BORDER_SCRUB_MEAN && variance.sqrt() < BORDER_SCRUB_DEVIATION
}

/// Crops a window centered on (`center_x`, `center_y`), clamped to the image
/// bounds. Returns `None` when the clamped window is empty.
fn crop_window(
    image: &GrayImage,
    center_x: i64,
    center_y: i64,
    window_width: u32,
    window_height: u32,
) -> Option<GrayImage> {
    let (width, height) = image.dimensions();
    let x1 = (center_x - window_width as i64 / 2).max(0) as u32;
    let y1 = (center_y - window_height as i64 / 2).max(0) as u32;
    let x2 = ((center_x + window_width as i64 / 2).max(0) as u32).min(width);
    let y2 = ((center_y + window_height as i64 / 2).max(0) as u32).min(height);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::structure::{GridStructureAnalyzer, LineGroup};

    fn lines(spacing: u32, count: u32) -> Vec<LineGroup> {
        (0..count)
            .map(|k| LineGroup {
                center: k * spacing,
                thickness: 2,
            })
            .collect()
    }

    /// A 450x450 grid image with 2-px lines every 49 px and a dark blob in
    /// cell (4, 4).
    fn grid_with_center_blob() -> GrayImage {
        let mut img = GrayImage::from_pixel(450, 450, Luma([255]));
        for k in 0..=9u32 {
            for t in 0..2 {
                let p = k * 49 + t;
                for o in 0..450 {
                    img.put_pixel(o, p, Luma([0]));
                    img.put_pixel(p, o, Luma([0]));
                }
            }
        }
        // Blob roughly centered in cell (4, 4): band 196..245.
        for y in 210..235 {
            for x in 210..235 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        img
    }

    #[test]
    fn line_based_extraction_yields_81_cells() {
        let img = grid_with_center_blob();
        let structure = GridStructureAnalyzer::default().analyze(&img);
        assert!(structure.is_reliable(8));

        let cells = CellExtractor::default().extract(&img, &structure);
        assert_eq!(cells.len(), GRID_SIZE);
        assert!(cells.iter().all(|row| row.len() == GRID_SIZE));
        let size = GeometryConfig::default().cell_size;
        assert_eq!(cells[0][0].image.dimensions(), (size, size));
    }

    #[test]
    fn blob_lands_in_its_cell_and_nowhere_else() {
        let img = grid_with_center_blob();
        let structure = GridStructureAnalyzer::default().analyze(&img);
        let cells = CellExtractor::default().extract(&img, &structure);

        let dark = |cell: &CellImage| crate::utils::image::dark_ratio(&cell.image);
        assert!(dark(&cells[4][4]) > 0.05, "blob missing from its cell");
        assert!(dark(&cells[4][5]) < 0.01, "blob leaked into neighbor");
        assert!(dark(&cells[0][0]) < 0.01, "grid lines leaked into cell");
    }

    #[test]
    fn uniform_extraction_yields_81_cells() {
        let img = GrayImage::from_pixel(450, 450, Luma([255]));
        let structure = GridStructure {
            horizontal: vec![],
            vertical: vec![],
        };
        let cells = CellExtractor::default().extract(&img, &structure);
        assert_eq!(cells.len(), GRID_SIZE);
        assert!(
            cells
                .iter()
                .flatten()
                .all(|c| crate::utils::image::dark_ratio(&c.image) == 0.0)
        );
    }

    #[test]
    fn uniform_extraction_is_selected_below_group_minimum() {
        let img = GrayImage::from_pixel(450, 450, Luma([255]));
        let structure = GridStructure {
            horizontal: lines(49, 7),
            vertical: lines(49, 10),
        };
        // Seven horizontal groups: unreliable, must not panic on missing
        // boundaries.
        let cells = CellExtractor::default().extract(&img, &structure);
        assert_eq!(cells.len(), GRID_SIZE);
    }

    #[test]
    fn degenerate_boundaries_produce_blank_cells() {
        let img = GrayImage::from_pixel(40, 40, Luma([0]));
        let structure = GridStructure {
            // Lines 1 px apart leave no room between insets.
            horizontal: lines(1, 10),
            vertical: lines(1, 10),
        };
        let cells = CellExtractor::default().extract(&img, &structure);
        let size = GeometryConfig::default().cell_size;
        for cell in cells.iter().flatten() {
            assert_eq!(cell.image.dimensions(), (size, size));
        }
    }

    #[test]
    fn solid_border_line_is_scrubbed() {
        let mut img = GrayImage::from_pixel(50, 50, Luma([255]));
        for x in 0..50 {
            img.put_pixel(x, 0, Luma([10]));
        }
        scrub_border_artifacts(&mut img);
        assert!((0..50).all(|x| img.get_pixel(x, 0).0[0] == 255));
    }

    #[test]
    fn digit_stroke_crossing_border_is_kept() {
        let mut img = GrayImage::from_pixel(50, 50, Luma([255]));
        // A stroke touches the border for a few pixels: high spread.
        for x in 20..26 {
            img.put_pixel(x, 0, Luma([0]));
        }
        scrub_border_artifacts(&mut img);
        assert_eq!(img.get_pixel(22, 0).0[0], 0);
    }

    #[test]
    fn dark_majority_cell_is_inverted_to_dark_on_light() {
        let mut img = GrayImage::from_pixel(450, 450, Luma([20]));
        // One light patch.
        for y in 200..220 {
            for x in 200..220 {
                img.put_pixel(x, y, Luma([240]));
            }
        }
        let structure = GridStructure {
            horizontal: vec![],
            vertical: vec![],
        };
        let cells = CellExtractor::default().extract(&img, &structure);
        for cell in cells.iter().flatten() {
            assert!(
                crate::utils::image::dark_ratio(&cell.image) <= 0.5,
                "cell ({}, {}) kept light-on-dark polarity",
                cell.row,
                cell.col
            );
        }
    }
}
