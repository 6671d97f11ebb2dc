//! Input image preparation.
//!
//! Produces the binary image the rest of the geometric pipeline works on:
//! grayscale, light Gaussian blur against sensor noise, adaptive threshold
//! to survive uneven lighting, and a morphological opening to seal small
//! gaps in the dark grid lines. Polarity after this stage is dark ink on a
//! light background.

use image::GrayImage;
use imageproc::contrast::adaptive_threshold;
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::open;
use tracing::debug;

/// Sigma of the denoising blur; matches a 3x3 Gaussian kernel.
const BLUR_SIGMA: f32 = 0.8;

/// Radius of the adaptive threshold neighborhood (an 11x11 block).
const THRESHOLD_BLOCK_RADIUS: u32 = 5;

/// Prepares an input image for grid detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Creates a preprocessor.
    pub fn new() -> Self {
        Self
    }

    /// Converts a grayscale photograph into a cleaned binary image.
    ///
    /// # Arguments
    ///
    /// * `image` - The grayscale input image.
    ///
    /// # Returns
    ///
    /// A binary image with dark features on a light background.
    pub fn run(&self, image: &GrayImage) -> GrayImage {
        let blurred = gaussian_blur_f32(image, BLUR_SIGMA);
        let thresholded = adaptive_threshold(&blurred, THRESHOLD_BLOCK_RADIUS);
        // Opening on a dark-on-light image grows the ink first, sealing
        // sub-3px breaks in the grid lines, then restores its thickness.
        let cleaned = open(&thresholded, Norm::LInf, 1);
        debug!(
            width = cleaned.width(),
            height = cleaned.height(),
            "preprocessing complete"
        );
        cleaned
    }
}
