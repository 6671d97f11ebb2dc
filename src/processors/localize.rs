//! Puzzle boundary detection and perspective correction.
//!
//! Traces the external contours of the inked features, keeps the largest one
//! that approximates to a quadrilateral of sufficient area, and warps that
//! quadrilateral onto a fixed canonical square. Localization never fails: an
//! image with no acceptable boundary passes through unchanged with
//! `grid_detected` cleared, and downstream stages fall back to uniform cell
//! geometry.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use tracing::{debug, warn};

use crate::core::config::GeometryConfig;
use crate::utils::transform::{Point2f, warp_to_square};

/// A perspective-corrected square grid image, or the unmodified input when
/// no boundary was found.
#[derive(Debug, Clone)]
pub struct CanonicalGrid {
    /// The (possibly warped) grid image.
    pub image: GrayImage,
    /// True when a boundary quadrilateral was detected and warped.
    pub grid_detected: bool,
}

/// Locates the puzzle quadrilateral and rectifies it.
#[derive(Debug, Clone, Default)]
pub struct GridLocalizer {
    config: GeometryConfig,
}

impl GridLocalizer {
    /// Creates a localizer with the given geometry configuration.
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    /// Finds the puzzle boundary in a preprocessed binary image and warps it
    /// to the canonical square.
    ///
    /// # Arguments
    ///
    /// * `binary` - Preprocessed image, dark ink on light background.
    ///
    /// # Returns
    ///
    /// The canonical grid. When no quadrilateral with area above the
    /// configured minimum exists, the input image is returned unchanged with
    /// `grid_detected = false`.
    pub fn localize(&self, binary: &GrayImage) -> CanonicalGrid {
        let Some(corners) = self.find_boundary(binary) else {
            warn!("no grid boundary detected, using entire image");
            return CanonicalGrid {
                image: binary.clone(),
                grid_detected: false,
            };
        };

        match warp_to_square(binary, &corners, self.config.canonical_size) {
            Ok(image) => CanonicalGrid {
                image,
                grid_detected: true,
            },
            // Degenerate corner sets cannot be warped; degrade like a miss.
            Err(err) => {
                warn!(error = %err, "perspective correction failed, using entire image");
                CanonicalGrid {
                    image: binary.clone(),
                    grid_detected: false,
                }
            }
        }
    }

    /// Returns the ordered corners of the largest acceptable quadrilateral.
    fn find_boundary(&self, binary: &GrayImage) -> Option<[Point2f; 4]> {
        // Contours trace foreground (nonzero) pixels, so flip the dark ink
        // to white first.
        let mut inverted = binary.clone();
        image::imageops::invert(&mut inverted);

        let contours = find_contours::<u32>(&inverted);
        let mut best: Option<(f32, Vec<Point2f>)> = None;

        for contour in &contours {
            if contour.border_type != BorderType::Outer || contour.points.len() < 4 {
                continue;
            }

            let outline: Vec<Point2f> = contour
                .points
                .iter()
                .map(|p| Point2f::new(p.x as f32, p.y as f32))
                .collect();
            let epsilon = self.config.poly_epsilon_ratio * perimeter(&outline);
            let polygon = approximate_polygon(&outline, epsilon);
            if polygon.len() != 4 {
                continue;
            }

            let area = polygon_area(&polygon);
            if area < self.config.min_grid_area {
                continue;
            }
            if best.as_ref().map_or(true, |(best_area, _)| area > *best_area) {
                best = Some((area, polygon));
            }
        }

        let (area, polygon) = best?;
        debug!(area, "grid boundary detected");
        Some(order_corners(&polygon))
    }
}

/// Total edge length of a closed contour.
fn perimeter(points: &[Point2f]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            (points[j].x - points[i].x).hypot(points[j].y - points[i].y)
        })
        .sum()
}

/// Simplifies a traced contour with the Douglas-Peucker algorithm.
///
/// Border following starts and ends on adjacent pixels, so when the two
/// anchor points of the simplification collapse within `epsilon` the closing
/// vertex is dropped; a clean quadrilateral outline then reduces to exactly
/// its four corners.
fn approximate_polygon(points: &[Point2f], epsilon: f32) -> Vec<Point2f> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;
    split_at_farthest(points, 0, points.len() - 1, epsilon, &mut kept);

    let mut simplified: Vec<Point2f> = points
        .iter()
        .zip(&kept)
        .filter_map(|(&p, &keep)| keep.then_some(p))
        .collect();

    if simplified.len() > 1 {
        let first = simplified[0];
        let last = simplified[simplified.len() - 1];
        if (last.x - first.x).hypot(last.y - first.y) <= epsilon {
            simplified.pop();
        }
    }
    simplified
}

/// Marks the point farthest from the chord `points[start]..points[end]` as
/// kept and recurses into both halves, as long as the deviation exceeds
/// `epsilon`.
fn split_at_farthest(
    points: &[Point2f],
    start: usize,
    end: usize,
    epsilon: f32,
    kept: &mut [bool],
) {
    if end - start <= 1 {
        return;
    }

    let mut farthest = start;
    let mut max_deviation = 0.0f32;
    for i in start + 1..end {
        let deviation = chord_distance(points[i], points[start], points[end]);
        if deviation > max_deviation {
            max_deviation = deviation;
            farthest = i;
        }
    }

    if max_deviation > epsilon {
        kept[farthest] = true;
        split_at_farthest(points, start, farthest, epsilon, kept);
        split_at_farthest(points, farthest, end, epsilon, kept);
    }
}

/// Perpendicular distance from `point` to the line through `a` and `b`,
/// falling back to point distance when the chord has zero length.
fn chord_distance(point: Point2f, a: Point2f, b: Point2f) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = dx.hypot(dy);
    if length == 0.0 {
        return (point.x - a.x).hypot(point.y - a.y);
    }
    ((point.x - a.x) * dy - (point.y - a.y) * dx).abs() / length
}

/// Shoelace area of a closed polygon.
fn polygon_area(points: &[Point2f]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f32;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area.abs() / 2.0
}

/// Orders four corners as top-left, top-right, bottom-right, bottom-left.
///
/// The top-left corner minimizes x + y and the bottom-right maximizes it;
/// the top-right maximizes x - y and the bottom-left minimizes it.
fn order_corners(polygon: &[Point2f]) -> [Point2f; 4] {
    debug_assert_eq!(polygon.len(), 4);

    let mut top_left = polygon[0];
    let mut top_right = polygon[0];
    let mut bottom_right = polygon[0];
    let mut bottom_left = polygon[0];
    for p in &polygon[1..] {
        if p.x + p.y < top_left.x + top_left.y {
            top_left = *p;
        }
        if p.x + p.y > bottom_right.x + bottom_right.y {
            bottom_right = *p;
        }
        if p.x - p.y > top_right.x - top_right.y {
            top_right = *p;
        }
        if p.x - p.y < bottom_left.x - bottom_left.y {
            bottom_left = *p;
        }
    }

    [top_left, top_right, bottom_right, bottom_left]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Draws a dark hollow rectangle on a light canvas.
    fn frame_image(size: u32, left: u32, top: u32, right: u32, bottom: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(size, size, Luma([255]));
        for x in left..=right {
            for t in 0..3 {
                img.put_pixel(x, top + t, Luma([0]));
                img.put_pixel(x, bottom - t, Luma([0]));
            }
        }
        for y in top..=bottom {
            for t in 0..3 {
                img.put_pixel(left + t, y, Luma([0]));
                img.put_pixel(right - t, y, Luma([0]));
            }
        }
        img
    }

    /// Traces the outline of an axis-aligned square, pixel by pixel, the way
    /// border following emits it: closed, ending adjacent to the start.
    fn square_outline(origin: f32, side: f32) -> Vec<Point2f> {
        let far = origin + side;
        let steps = side as u32;
        let mut points = Vec::new();
        for i in 0..steps {
            points.push(Point2f::new(origin + i as f32, origin));
        }
        for i in 0..steps {
            points.push(Point2f::new(far, origin + i as f32));
        }
        for i in 0..steps {
            points.push(Point2f::new(far - i as f32, far));
        }
        for i in 0..steps {
            points.push(Point2f::new(origin, far - i as f32));
        }
        points
    }

    #[test]
    fn detects_and_warps_a_square_frame() {
        let img = frame_image(300, 40, 40, 260, 260);
        let localizer = GridLocalizer::default();
        let canonical = localizer.localize(&img);
        assert!(canonical.grid_detected);
        let size = GeometryConfig::default().canonical_size;
        assert_eq!(canonical.image.dimensions(), (size, size));
    }

    #[test]
    fn blank_image_passes_through_unchanged() {
        let img = GrayImage::from_pixel(200, 200, Luma([255]));
        let canonical = GridLocalizer::default().localize(&img);
        assert!(!canonical.grid_detected);
        assert_eq!(canonical.image, img);
    }

    #[test]
    fn small_frame_is_rejected_by_area_threshold() {
        // 40x40 frame encloses 1,600 px^2, far below the minimum.
        let img = frame_image(200, 80, 80, 120, 120);
        let canonical = GridLocalizer::default().localize(&img);
        assert!(!canonical.grid_detected);
        assert_eq!(canonical.image, img);
    }

    #[test]
    fn square_outline_simplifies_to_its_corners() {
        let outline = square_outline(10.0, 40.0);
        let epsilon = 0.02 * perimeter(&outline);
        let polygon = approximate_polygon(&outline, epsilon);
        assert_eq!(polygon.len(), 4);
        let [tl, tr, br, bl] = order_corners(&polygon);
        assert_eq!((tl.x, tl.y), (10.0, 10.0));
        assert_eq!((tr.x, tr.y), (50.0, 10.0));
        assert_eq!((br.x, br.y), (50.0, 50.0));
        assert_eq!((bl.x, bl.y), (10.0, 50.0));
    }

    #[test]
    fn jagged_outline_keeps_its_deviating_vertex() {
        // An L-shaped outline: the notch corner deviates far beyond epsilon
        // and must survive simplification.
        let outline = vec![
            Point2f::new(0.0, 0.0),
            Point2f::new(50.0, 0.0),
            Point2f::new(50.0, 25.0),
            Point2f::new(25.0, 25.0),
            Point2f::new(25.0, 50.0),
            Point2f::new(0.0, 50.0),
            Point2f::new(0.0, 1.0),
        ];
        let polygon = approximate_polygon(&outline, 2.0);
        assert_eq!(polygon.len(), 6);
    }

    #[test]
    fn chord_distance_measures_perpendicular_deviation() {
        let a = Point2f::new(0.0, 0.0);
        let b = Point2f::new(10.0, 0.0);
        assert_eq!(chord_distance(Point2f::new(5.0, 4.0), a, b), 4.0);
        assert_eq!(chord_distance(Point2f::new(5.0, 0.0), a, b), 0.0);
        // Zero-length chord falls back to point distance.
        assert_eq!(chord_distance(Point2f::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn corner_ordering_is_stable() {
        let polygon = vec![
            Point2f::new(10.0, 90.0),
            Point2f::new(90.0, 90.0),
            Point2f::new(10.0, 10.0),
            Point2f::new(90.0, 10.0),
        ];
        let [tl, tr, br, bl] = order_corners(&polygon);
        assert_eq!((tl.x, tl.y), (10.0, 10.0));
        assert_eq!((tr.x, tr.y), (90.0, 10.0));
        assert_eq!((br.x, br.y), (90.0, 90.0));
        assert_eq!((bl.x, bl.y), (10.0, 90.0));
    }

    #[test]
    fn polygon_area_of_unit_square() {
        let square = vec![
            Point2f::new(0.0, 0.0),
            Point2f::new(10.0, 0.0),
            Point2f::new(10.0, 10.0),
            Point2f::new(0.0, 10.0),
        ];
        assert_eq!(polygon_area(&square), 100.0);
    }

    #[test]
    fn perimeter_of_closed_square() {
        let square = vec![
            Point2f::new(0.0, 0.0),
            Point2f::new(10.0, 0.0),
            Point2f::new(10.0, 10.0),
            Point2f::new(0.0, 10.0),
        ];
        assert_eq!(perimeter(&square), 40.0);
    }
}
