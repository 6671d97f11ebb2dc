//! Template matching against fixed reference glyphs.
//!
//! The nine reference glyphs are 5x7 dot-matrix digits scaled to the
//! template resolution. Matching normalizes the cell to the same resolution
//! and polarity (glyph bright on dark) and scores it with normalized
//! cross-correlation; only scores above the configured floor are accepted.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use once_cell::sync::Lazy;

use crate::core::config::RecognitionConfig;

/// Template width in pixels.
pub const TEMPLATE_WIDTH: u32 = 30;

/// Template height in pixels.
pub const TEMPLATE_HEIGHT: u32 = 40;

/// 5x7 dot-matrix patterns for digits 1-9. `#` marks a lit dot.
const GLYPH_PATTERNS: [[&str; 7]; 9] = [
    [
        "..#..", //
        ".##..", //
        "..#..", //
        "..#..", //
        "..#..", //
        "..#..", //
        ".###.",
    ],
    [
        ".###.", //
        "#...#", //
        "....#", //
        "...#.", //
        "..#..", //
        ".#...", //
        "#####",
    ],
    [
        "#####", //
        "...#.", //
        "..#..", //
        "...#.", //
        "....#", //
        "#...#", //
        ".###.",
    ],
    [
        "...#.", //
        "..##.", //
        ".#.#.", //
        "#..#.", //
        "#####", //
        "...#.", //
        "...#.",
    ],
    [
        "#####", //
        "#....", //
        "####.", //
        "....#", //
        "....#", //
        "#...#", //
        ".###.",
    ],
    [
        "..##.", //
        ".#...", //
        "#....", //
        "####.", //
        "#...#", //
        "#...#", //
        ".###.",
    ],
    [
        "#####", //
        "....#", //
        "...#.", //
        "..#..", //
        ".#...", //
        ".#...", //
        ".#...",
    ],
    [
        ".###.", //
        "#...#", //
        "#...#", //
        ".###.", //
        "#...#", //
        "#...#", //
        ".###.",
    ],
    [
        ".###.", //
        "#...#", //
        "#...#", //
        ".####", //
        "....#", //
        "...#.", //
        ".##..",
    ],
];

/// The reference glyphs, bright on dark, at template resolution.
static TEMPLATES: Lazy<Vec<(u8, GrayImage)>> = Lazy::new(|| {
    GLYPH_PATTERNS
        .iter()
        .enumerate()
        .map(|(i, pattern)| {
            let digit = (i + 1) as u8;
            (digit, render_glyph(pattern, TEMPLATE_WIDTH, TEMPLATE_HEIGHT))
        })
        .collect()
});

/// Renders a dot-matrix pattern as a bright-on-dark image of the given size.
fn render_glyph(pattern: &[&str; 7], width: u32, height: u32) -> GrayImage {
    let mut dots = GrayImage::new(5, 7);
    for (y, row) in pattern.iter().enumerate() {
        for (x, ch) in row.bytes().enumerate() {
            let value = if ch == b'#' { 255 } else { 0 };
            dots.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }
    imageops::resize(&dots, width, height, FilterType::Nearest)
}

/// Recognizes digits by normalized cross-correlation against the reference
/// glyphs.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    accept: f32,
}

impl TemplateMatcher {
    /// Creates a matcher using the configured acceptance score.
    pub fn new(config: &RecognitionConfig) -> Self {
        Self {
            accept: config.template_accept,
        }
    }

    /// Scores a normalized cell against every reference glyph.
    ///
    /// # Arguments
    ///
    /// * `cell` - Normalized cell image, dark digit on light background.
    ///
    /// # Returns
    ///
    /// The best-matching digit and its correlation score, or `None` when no
    /// glyph scores above the acceptance floor.
    pub fn best_match(&self, cell: &GrayImage) -> Option<(u8, f32)> {
        let mut probe = imageops::resize(cell, TEMPLATE_WIDTH, TEMPLATE_HEIGHT, FilterType::CatmullRom);

        // Templates are bright on dark; flip the cell to match.
        let sum: u64 = probe.pixels().map(|p| p.0[0] as u64).sum();
        let mean = sum / (TEMPLATE_WIDTH * TEMPLATE_HEIGHT) as u64;
        if mean > 127 {
            imageops::invert(&mut probe);
        }

        let mut best: Option<(u8, f32)> = None;
        for (digit, template) in TEMPLATES.iter() {
            let result = match_template(
                &probe,
                template,
                MatchTemplateMethod::CrossCorrelationNormalized,
            );
            let score = result.get_pixel(0, 0).0[0];
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((*digit, score));
            }
        }

        best.filter(|&(_, score)| score > self.accept)
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(&RecognitionConfig::default())
    }
}

/// Renders a glyph the way a cell image carries it: dark digit on a light
/// background at the given size. Exposed for tests and synthetic grids.
#[cfg(test)]
pub(crate) fn render_cell_glyph(digit: u8, size: u32) -> GrayImage {
    let pattern = &GLYPH_PATTERNS[(digit - 1) as usize];
    let mut img = render_glyph(pattern, size, size);
    imageops::invert(&mut img);
    img
}
