//! Perspective rectification for grayscale grid images.
//!
//! The localizer hands this module the four corners of a detected puzzle
//! quadrilateral; the output is that region rendered onto a canonical
//! square. Rendering uses inverse mapping, so only the square-to-quad
//! direction of the homography is ever needed, and for a square source
//! domain that matrix has a closed form: the square's unit parameterization
//! pins the projective coefficients directly, with no linear system to
//! solve and no matrix to invert.

use image::GrayImage;
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use crate::core::errors::SudokuError;

/// Intensity used for destination pixels that map outside the source image.
/// The pipeline works on light-background images, so out-of-bounds regions
/// must not read as ink.
const BACKGROUND: u8 = 255;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2f {
    /// X coordinate of the point.
    pub x: f32,
    /// Y coordinate of the point.
    pub y: f32,
}

impl Point2f {
    /// Creates a new point with the given coordinates.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Warps the quadrilateral spanned by `corners` onto a `size`x`size` square.
///
/// Corners must be ordered top-left, top-right, bottom-right, bottom-left.
///
/// # Arguments
///
/// * `src_image` - The source image to warp.
/// * `corners` - The four ordered corners of the region to rectify.
/// * `size` - Edge length of the square output image.
///
/// # Errors
///
/// Returns an error if the corner configuration is degenerate and no
/// homography exists, or if `size` leaves no square to map.
pub fn warp_to_square(
    src_image: &GrayImage,
    corners: &[Point2f; 4],
    size: u32,
) -> Result<GrayImage, SudokuError> {
    if size < 2 {
        return Err(SudokuError::invalid_input(
            "target size must be at least 2 pixels",
        ));
    }

    let to_source = square_to_quad(corners, (size - 1) as f32)?;
    Ok(render_warped(src_image, &to_source, size, size))
}

/// Builds the homography taking canonical square coordinates onto the
/// detected quadrilateral.
///
/// The square corners `(0,0)`, `(far,0)`, `(far,far)`, `(0,far)` land on
/// the quad's top-left, top-right, bottom-right and bottom-left corners. A
/// parallelogram needs only the affine part; otherwise the two projective
/// coefficients follow from how far the quad deviates from one.
///
/// # Errors
///
/// Returns an error when the corners are collinear and span no area.
fn square_to_quad(corners: &[Point2f; 4], far: f32) -> Result<Matrix3<f32>, SudokuError> {
    let [tl, tr, br, bl] = corners;

    // Deviation of the fourth corner from the parallelogram the first three
    // would close; zero in both axes means the mapping is affine.
    let skew_x = tl.x - tr.x + br.x - bl.x;
    let skew_y = tl.y - tr.y + br.y - bl.y;

    let (g, h) = if skew_x.abs() < f32::EPSILON && skew_y.abs() < f32::EPSILON {
        (0.0, 0.0)
    } else {
        let dx1 = tr.x - br.x;
        let dy1 = tr.y - br.y;
        let dx2 = bl.x - br.x;
        let dy2 = bl.y - br.y;
        let den = dx1 * dy2 - dx2 * dy1;
        if den.abs() < f32::EPSILON {
            return Err(SudokuError::invalid_input(
                "corner configuration is collinear",
            ));
        }
        (
            (skew_x * dy2 - skew_y * dx2) / den,
            (dx1 * skew_y - dy1 * skew_x) / den,
        )
    };

    // Unit-square parameterization, rescaled so the square spans `far`
    // pixels per side.
    Ok(Matrix3::new(
        (tr.x - tl.x + g * tr.x) / far,
        (bl.x - tl.x + h * bl.x) / far,
        tl.x,
        (tr.y - tl.y + g * tr.y) / far,
        (bl.y - tl.y + h * bl.y) / far,
        tl.y,
        g / far,
        h / far,
        1.0,
    ))
}

/// Renders the destination image by projecting every pixel through
/// `to_source` and sampling the photograph with bilinear interpolation.
///
/// Rows are processed in parallel; each row exclusively owns its slice of
/// the output buffer.
fn render_warped(
    src_image: &GrayImage,
    to_source: &Matrix3<f32>,
    dst_width: u32,
    dst_height: u32,
) -> GrayImage {
    let mut dst_image = GrayImage::new(dst_width, dst_height);
    let (src_width, src_height) = src_image.dimensions();
    let buffer: &mut [u8] = dst_image.as_mut();

    buffer
        .par_chunks_mut(dst_width as usize)
        .enumerate()
        .for_each(|(dst_y, row_buffer)| {
            for (dst_x, out) in row_buffer.iter_mut().enumerate() {
                let dst_point = Vector3::new(dst_x as f32, dst_y as f32, 1.0);
                let src_point = to_source * dst_point;

                let mut value = BACKGROUND;
                if src_point.z.abs() > f32::EPSILON {
                    let src_x = src_point.x / src_point.z;
                    let src_y = src_point.y / src_point.z;

                    if src_x >= 0.0
                        && src_y >= 0.0
                        && src_x < (src_width - 1) as f32
                        && src_y < (src_height - 1) as f32
                    {
                        value = bilinear_interpolate(src_image, src_x, src_y);
                    }
                }

                *out = value;
            }
        });

    dst_image
}

/// Samples an intensity at fractional coordinates by interpolating the four
/// neighboring pixels.
fn bilinear_interpolate(image: &GrayImage, x: f32, y: f32) -> u8 {
    let x1 = x.floor() as u32;
    let y1 = y.floor() as u32;
    let x2 = (x1 + 1).min(image.width() - 1);
    let y2 = (y1 + 1).min(image.height() - 1);

    let dx = x - x1 as f32;
    let dy = y - y1 as f32;

    let p11 = image.get_pixel(x1, y1).0[0] as f32;
    let p12 = image.get_pixel(x1, y2).0[0] as f32;
    let p21 = image.get_pixel(x2, y1).0[0] as f32;
    let p22 = image.get_pixel(x2, y2).0[0] as f32;

    let val = (1.0 - dx) * (1.0 - dy) * p11
        + dx * (1.0 - dy) * p21
        + (1.0 - dx) * dy * p12
        + dx * dy * p22;
    val.round().clamp(0.0, 255.0) as u8
}
