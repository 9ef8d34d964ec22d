//! Canny edge detection on an already-smoothed intensity image.
//!
//! `imageproc::edges::canny` applies its own fixed Gaussian blur
//! (sigma 1.4) before computing gradients, which would stack on top of the
//! configurable smoothing stage. This module runs the remaining Canny
//! steps directly on the smoothed input:
//!
//! 1. Sobel gradients and L1 gradient magnitude (`|gx| + |gy|`).
//! 2. Non-maximum suppression along the quantized gradient direction.
//! 3. Hysteresis: strong pixels seed a flood fill over 8-connected weak
//!    pixels.
//!
//! The hysteresis flood fill bounds-checks every neighbor and visits all
//! eight of them (see <https://github.com/image-rs/imageproc/issues/705>
//! for the upstream border panic this avoids).

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Value written for edge pixels.
pub const EDGE: u8 = 255;

/// Detect edges in a pre-smoothed grayscale image.
///
/// Returns a binary image: [`EDGE`] for edge pixels, 0 elsewhere. Images
/// narrower or shorter than 3 pixels have no interior and produce an
/// empty edge map.
#[must_use = "returns the binary edge map"]
pub fn canny(smoothed: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (width, height) = smoothed.dimensions();
    if width < 3 || height < 3 {
        return GrayImage::new(width, height);
    }

    let gx: Image<Luma<i16>> = filter_clamped(smoothed, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(smoothed, kernel::SOBEL_VERTICAL_3X3);
    let magnitude: Image<Luma<f32>> = Image::from_fn(width, height, |x, y| {
        let h = f32::from(gx.get_pixel(x, y)[0]);
        let v = f32::from(gy.get_pixel(x, y)[0]);
        Luma([h.abs() + v.abs()])
    });

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// Offsets of the two neighbors along the gradient direction.
///
/// The direction is quantized to 0°, 45°, 90° or 135°.
fn gradient_neighbors(x_gradient: f32, y_gradient: f32) -> [(i64, i64); 2] {
    let mut angle = y_gradient.atan2(x_gradient).to_degrees();
    if angle < 0.0 {
        angle += 180.0;
    }

    if (22.5..67.5).contains(&angle) {
        [(1, 1), (-1, -1)]
    } else if (67.5..112.5).contains(&angle) {
        [(0, -1), (0, 1)]
    } else if (112.5..157.5).contains(&angle) {
        [(-1, 1), (1, -1)]
    } else {
        [(-1, 0), (1, 0)]
    }
}

/// Keep only pixels that are local maxima along their gradient direction.
///
/// The one-pixel border is always suppressed.
fn non_maximum_suppression(
    magnitude: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    let (width, height) = magnitude.dimensions();
    let mut out = Image::from_pixel(width, height, Luma([0.0]));
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let value = magnitude.get_pixel(x, y)[0];
            let neighbors = gradient_neighbors(
                f32::from(gx.get_pixel(x, y)[0]),
                f32::from(gy.get_pixel(x, y)[0]),
            );
            let is_maximum = neighbors.iter().all(|&(dx, dy)| {
                let (nx, ny) = offset(x, y, dx, dy);
                value >= magnitude.get_pixel(nx, ny)[0]
            });
            if is_maximum {
                out.put_pixel(x, y, Luma([value]));
            }
        }
    }
    out
}

/// Neighbor coordinate for an interior pixel; callers guarantee the result
/// stays inside the image.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn offset(x: u32, y: u32, dx: i64, dy: i64) -> (u32, u32) {
    ((x as i64 + dx) as u32, (y as i64 + dy) as u32)
}

/// Keep strong pixels and the weak pixels 8-connected to them.
///
/// Non-recursive depth-first flood fill seeded from every interior pixel
/// at or above `high_threshold`.
fn hysteresis(input: &Image<Luma<f32>>, low_threshold: f32, high_threshold: f32) -> GrayImage {
    const NEIGHBORS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    let (width, height) = input.dimensions();
    let mut out = GrayImage::new(width, height);
    let mut stack = Vec::new();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if input.get_pixel(x, y)[0] < high_threshold || out.get_pixel(x, y)[0] == EDGE {
                continue;
            }
            out.put_pixel(x, y, Luma([EDGE]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBORS {
                    let nx = i64::from(cx) + dx;
                    let ny = i64::from(cy) + dy;
                    let (Ok(nx), Ok(ny)) = (u32::try_from(nx), u32::try_from(ny)) else {
                        continue;
                    };
                    if nx >= width || ny >= height {
                        continue;
                    }
                    if input.get_pixel(nx, ny)[0] >= low_threshold
                        && out.get_pixel(nx, ny)[0] != EDGE
                    {
                        out.put_pixel(nx, ny, Luma([EDGE]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_count(edges: &GrayImage) -> u32 {
        edges.pixels().map(|p| u32::from(p.0[0] == EDGE)).sum()
    }

    /// A strong edge one pixel from the left border must not panic when
    /// the flood fill reaches column 0.
    #[test]
    fn border_edge_does_not_panic() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x == 1 { Luma([255]) } else { Luma([0]) });
        let _edges = canny(&img, 1.0, 2.0);
    }

    #[test]
    fn output_dimensions_match_input() {
        let edges = canny(&GrayImage::new(17, 31), 50.0, 150.0);
        assert_eq!(edges.dimensions(), (17, 31));
    }

    #[test]
    fn tiny_images_have_no_edges() {
        for (w, h) in [(0, 0), (1, 5), (2, 2), (5, 2)] {
            let img = GrayImage::from_fn(w, h, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
            let edges = canny(&img, 1.0, 2.0);
            assert_eq!(edges.dimensions(), (w, h));
            assert_eq!(edge_count(&edges), 0);
        }
    }

    #[test]
    fn sharp_edge_detected() {
        let img = GrayImage::from_fn(20, 20, |x, _y| if x < 10 { Luma([0]) } else { Luma([255]) });
        let edges = canny(&img, 50.0, 150.0);
        assert!(edge_count(&edges) > 0, "expected edges at sharp boundary");
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = GrayImage::from_pixel(20, 20, Luma([90]));
        assert_eq!(edge_count(&canny(&img, 1.0, 2.0)), 0);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn only_binary_values() {
        let img = GrayImage::from_fn(20, 20, |x, y| Luma([((x * 13 + y * 7) % 256) as u8]));
        let edges = canny(&img, 20.0, 60.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == EDGE));
    }

    #[test]
    fn weak_edges_need_a_strong_neighbor() {
        // A faint step (gradient well below the high threshold) on its own
        // is discarded.
        let img = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([100]) } else { Luma([110]) });
        let edges = canny(&img, 1.0, 1000.0);
        assert_eq!(edge_count(&edges), 0);
    }

    #[test]
    fn diagonal_step_clears_default_thresholds() {
        // Sobel gives gx = gy = 120 across this step: 240 in L1, only
        // about 170 in L2.
        let img = GrayImage::from_fn(40, 40, |x, y| Luma([if x + y < 40 { 0 } else { 40 }]));
        let edges = canny(&img, 80.0, 180.0);
        assert!(edge_count(&edges) > 0);
        assert_eq!(edges.get_pixel(20, 20).0[0], EDGE);
    }

    #[test]
    fn gradient_neighbors_quantize_direction() {
        assert_eq!(gradient_neighbors(1.0, 0.0), [(-1, 0), (1, 0)]);
        assert_eq!(gradient_neighbors(0.0, 1.0), [(0, -1), (0, 1)]);
        assert_eq!(gradient_neighbors(1.0, 1.0), [(1, 1), (-1, -1)]);
        assert_eq!(gradient_neighbors(-1.0, 1.0), [(-1, 1), (1, -1)]);
    }
}
