//! Utility functions for image loading and measurement.
//!
//! Loading is the single place an input can fail fatally; everything here
//! that operates on an already-decoded image is total.

use std::path::Path;

use image::{DynamicImage, GrayImage};

use crate::core::constants::DARK_LEVEL;
use crate::core::errors::SudokuError;

/// Converts a DynamicImage to an 8-bit grayscale image.
pub fn dynamic_to_gray(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Loads an image from a file path and converts it to grayscale.
///
/// # Arguments
///
/// * `path` - Path of the image file to load.
///
/// # Errors
///
/// Returns [`SudokuError::ImageLoad`] if the file cannot be decoded.
pub fn load_gray_image(path: &Path) -> Result<GrayImage, SudokuError> {
    let img = image::open(path).map_err(SudokuError::ImageLoad)?;
    Ok(dynamic_to_gray(&img))
}

/// Decodes an in-memory image buffer and converts it to grayscale.
///
/// # Arguments
///
/// * `bytes` - Encoded image data in any format the `image` crate decodes.
///
/// # Errors
///
/// Returns [`SudokuError::ImageLoad`] if the buffer cannot be decoded.
pub fn decode_gray_image(bytes: &[u8]) -> Result<GrayImage, SudokuError> {
    let img = image::load_from_memory(bytes).map_err(SudokuError::ImageLoad)?;
    Ok(dynamic_to_gray(&img))
}

/// Counts pixels darker than [`DARK_LEVEL`].
pub fn dark_pixel_count(image: &GrayImage) -> usize {
    image.pixels().filter(|p| p.0[0] < DARK_LEVEL).count()
}

/// Fraction of pixels darker than [`DARK_LEVEL`], in `[0, 1]`.
///
/// Returns 0.0 for an empty image.
pub fn dark_ratio(image: &GrayImage) -> f32 {
    let total = (image.width() * image.height()) as usize;
    if total == 0 {
        return 0.0;
    }
    dark_pixel_count(image) as f32 / total as f32
}

/// Inverts an image in place when the majority of its pixels are dark,
/// enforcing dark-digit-on-light-background polarity.
pub fn enforce_dark_on_light(image: &mut GrayImage) {
    let total = (image.width() * image.height()) as usize;
    if dark_pixel_count(image) * 2 > total {
        image::imageops::invert(image);
    }
}
