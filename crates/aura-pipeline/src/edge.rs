//! Edge extraction: intensity, smoothing, and Canny hysteresis.
//!
//! Produces the binary edge map that contour tracing consumes. White
//! pixels (255) are edges and black pixels (0) are background.

use image::GrayImage;

use crate::types::RgbImage;

/// Minimum allowed gradient threshold.
///
/// A low threshold of zero treats every pixel with any gradient as a
/// potential edge, producing an edge map so dense that the sketch turns
/// into a solid smear.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Clamp a threshold pair to `MIN_THRESHOLD <= low <= high`.
#[must_use]
pub fn clamp_thresholds(low_threshold: f32, high_threshold: f32) -> (f32, f32) {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    (low, high)
}

/// Detect edges in a smoothed intensity image.
///
/// Pixels with gradient magnitude at or above `high_threshold` are
/// definite edges; those between `low_threshold` and `high_threshold` are
/// edges only if connected to a definite edge. Thresholds are clamped by
/// [`clamp_thresholds`] first.
#[must_use = "returns the binary edge map"]
pub fn detect_edges(smoothed: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (low, high) = clamp_thresholds(low_threshold, high_threshold);
    crate::canny::canny(smoothed, low, high)
}

/// Full edge extraction from an RGB source: intensity, Gaussian smoothing
/// with a `kernel_size` kernel, then [`detect_edges`].
#[must_use = "returns the binary edge map"]
pub fn extract_edges(
    source: &RgbImage,
    kernel_size: u32,
    low_threshold: f32,
    high_threshold: f32,
) -> GrayImage {
    let intensity = crate::grayscale::to_intensity(source);
    let smoothed = crate::blur::gaussian_blur(&intensity, kernel_size);
    detect_edges(&smoothed, low_threshold, high_threshold)
}

/// Count edge pixels (value == 255).
#[must_use]
pub fn count_edge_pixels(edges: &GrayImage) -> u64 {
    edges
        .pixels()
        .map(|p| u64::from(p.0[0] == crate::canny::EDGE))
        .sum()
}
