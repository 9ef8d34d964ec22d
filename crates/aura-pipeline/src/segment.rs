//! Color segmentation: quantize an image to its dominant colors.
//!
//! This module defines the [`ColorClusterer`] trait for pluggable color
//! clustering algorithms and the [`ColorClustererKind`] enum for selecting
//! which algorithm to use at runtime, mirroring the contour tracer
//! strategy in [`crate::contour`].
//!
//! The default algorithm is k-means with Lloyd iterations in RGB space.
//! Initial centers are pixels picked by a seeded `SipHash` counter stream,
//! so a pinned seed always yields the same quantization.

use std::hash::Hasher;

use image::Rgb;
use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

use crate::types::{RevealConfig, RgbImage};

/// Parameters for one clustering run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Requested number of clusters (K).
    pub cluster_count: usize,
    /// Maximum Lloyd iterations per attempt.
    pub max_iterations: u32,
    /// Stop once no centroid moves further than this in RGB space.
    pub epsilon: f32,
    /// Independent attempts from different initial centers.
    pub attempts: u32,
    /// Seed for initial center selection.
    pub seed: u64,
}

impl ClusterParams {
    /// Extract the clustering parameters from a pipeline config.
    #[must_use]
    pub const fn from_config(config: &RevealConfig) -> Self {
        Self {
            cluster_count: config.cluster_count,
            max_iterations: config.cluster_max_iterations,
            epsilon: config.cluster_epsilon,
            attempts: config.cluster_attempts,
            seed: config.cluster_seed,
        }
    }
}

/// An image whose every pixel is one of a small set of palette colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedImage {
    image: RgbImage,
    palette: Vec<Rgb<u8>>,
}

impl QuantizedImage {
    /// The quantized raster, same dimensions as the source.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Distinct colors used by the quantized raster, in cluster order.
    #[must_use]
    pub fn palette(&self) -> &[Rgb<u8>] {
        &self.palette
    }

    /// Consume and return the quantized raster.
    #[must_use]
    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Trait for color clustering strategies.
///
/// Implementations must be pure functions of the image and parameters.
pub trait ColorClusterer {
    /// Quantize `image` to at most `params.cluster_count` colors.
    fn quantize(&self, image: &RgbImage, params: &ClusterParams) -> QuantizedImage;
}

/// Selects which color clustering algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorClustererKind {
    /// k-means (Lloyd iterations) with seeded random initial centers and
    /// best-of-N attempts by compactness.
    #[default]
    KMeans,
}

impl ColorClusterer for ColorClustererKind {
    fn quantize(&self, image: &RgbImage, params: &ClusterParams) -> QuantizedImage {
        match *self {
            Self::KMeans => kmeans_quantize(image, params),
        }
    }
}

type Color = [f32; 3];

fn distance_sq(a: Color, b: Color) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    db.mul_add(db, dr.mul_add(dr, dg * dg))
}

/// Index of the nearest center. Ties go to the lowest index.
fn nearest(color: Color, centers: &[Color]) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (i, &center) in centers.iter().enumerate() {
        let d = distance_sq(color, center);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Deterministic index stream keyed by seed and attempt number.
struct SeededSampler {
    seed: u64,
}

impl SeededSampler {
    const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Index in `0..len` for the given attempt and slot. `len` must be
    /// non-zero.
    fn index(&self, attempt: u32, slot: usize, len: usize) -> usize {
        let mut hasher = SipHasher13::new_with_keys(self.seed, u64::from(attempt));
        hasher.write_u64(u64::try_from(slot).unwrap_or(u64::MAX));
        let len = u64::try_from(len).unwrap_or(u64::MAX);
        usize::try_from(hasher.finish() % len).unwrap_or(0)
    }
}

/// Result of one k-means attempt.
struct Clustering {
    centers: Vec<Color>,
    labels: Vec<usize>,
    compactness: f64,
}

/// Assign every pixel to its nearest center, returning the compactness
/// (sum of squared distances).
fn assign(pixels: &[Color], centers: &[Color], labels: &mut [usize]) -> f64 {
    pixels
        .iter()
        .zip(labels.iter_mut())
        .map(|(&pixel, label)| {
            let (index, d) = nearest(pixel, centers);
            *label = index;
            f64::from(d)
        })
        .sum()
}

/// Recompute centers as cluster means. Empty clusters keep their center.
/// Returns the new centers and the largest center movement.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn update(pixels: &[Color], labels: &[usize], centers: &[Color]) -> (Vec<Color>, f32) {
    let mut sums = vec![[0.0f64; 3]; centers.len()];
    let mut counts = vec![0u64; centers.len()];
    for (&pixel, &label) in pixels.iter().zip(labels) {
        for (sum, channel) in sums[label].iter_mut().zip(pixel) {
            *sum += f64::from(channel);
        }
        counts[label] += 1;
    }

    let mut shift = 0.0f32;
    let next = centers
        .iter()
        .zip(sums.iter().zip(&counts))
        .map(|(&old, (sum, &count))| {
            if count == 0 {
                return old;
            }
            let n = count as f64;
            let center = [
                (sum[0] / n) as f32,
                (sum[1] / n) as f32,
                (sum[2] / n) as f32,
            ];
            shift = shift.max(distance_sq(old, center).sqrt());
            center
        })
        .collect();
    (next, shift)
}

fn lloyd(pixels: &[Color], mut centers: Vec<Color>, params: &ClusterParams) -> Clustering {
    let mut labels = vec![0; pixels.len()];
    for iteration in 0..params.max_iterations {
        assign(pixels, &centers, &mut labels);
        let (next, shift) = update(pixels, &labels, &centers);
        centers = next;
        if shift <= params.epsilon {
            tracing::trace!(iteration, shift, "k-means converged");
            break;
        }
    }
    let compactness = assign(pixels, &centers, &mut labels);
    Clustering {
        centers,
        labels,
        compactness,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_rgb(center: Color) -> Rgb<u8> {
    Rgb(center.map(|c| c.round().clamp(0.0, 255.0) as u8))
}

fn kmeans_quantize(image: &RgbImage, params: &ClusterParams) -> QuantizedImage {
    let pixels: Vec<Color> = image
        .pixels()
        .map(|p| p.0.map(f32::from))
        .collect();
    if pixels.is_empty() {
        return QuantizedImage {
            image: image.clone(),
            palette: Vec::new(),
        };
    }

    let k = params.cluster_count.clamp(1, pixels.len());
    let sampler = SeededSampler::new(params.seed);

    let mut best: Option<Clustering> = None;
    for attempt in 0..params.attempts.max(1) {
        let initial = (0..k)
            .map(|slot| pixels[sampler.index(attempt, slot, pixels.len())])
            .collect();
        let clustering = lloyd(&pixels, initial, params);
        tracing::trace!(attempt, compactness = clustering.compactness, "k-means attempt");
        if best
            .as_ref()
            .is_none_or(|b| clustering.compactness < b.compactness)
        {
            best = Some(clustering);
        }
    }
    let Some(best) = best else {
        return QuantizedImage {
            image: image.clone(),
            palette: Vec::new(),
        };
    };

    let colors: Vec<Rgb<u8>> = best.centers.iter().copied().map(to_rgb).collect();
    let mut used = vec![false; colors.len()];
    for &label in &best.labels {
        used[label] = true;
    }
    let mut palette: Vec<Rgb<u8>> = Vec::with_capacity(colors.len());
    for (color, _) in colors.iter().zip(&used).filter(|(_, u)| **u) {
        if !palette.contains(color) {
            palette.push(*color);
        }
    }

    let mut quantized = image.clone();
    for (pixel, &label) in quantized.pixels_mut().zip(&best.labels) {
        *pixel = colors[label];
    }

    tracing::debug!(
        requested = params.cluster_count,
        palette = palette.len(),
        compactness = best.compactness,
        "color quantization finished"
    );

    QuantizedImage {
        image: quantized,
        palette,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(cluster_count: usize) -> ClusterParams {
        ClusterParams {
            cluster_count,
            ..ClusterParams::from_config(&RevealConfig::default())
        }
    }

    fn split_image() -> RgbImage {
        RgbImage::from_fn(10, 6, |x, _| {
            if x < 4 {
                Rgb([200, 30, 30])
            } else {
                Rgb([20, 40, 220])
            }
        })
    }

    #[test]
    fn params_from_default_config() {
        let p = ClusterParams::from_config(&RevealConfig::default());
        assert_eq!(p.cluster_count, 8);
        assert_eq!(p.max_iterations, 15);
        assert_eq!(p.attempts, 5);
        assert!((p.epsilon - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn uniform_black_is_unchanged() {
        let img = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let q = ColorClustererKind::KMeans.quantize(&img, &params(2));
        assert_eq!(q.image(), &img);
        assert_eq!(q.palette(), &[Rgb([0, 0, 0])]);
    }

    #[test]
    fn two_color_image_is_reproduced() {
        let img = split_image();
        let q = ColorClustererKind::KMeans.quantize(&img, &params(2));
        assert_eq!(q.image(), &img);
        assert_eq!(q.palette().len(), 2);
    }

    #[test]
    fn every_pixel_is_a_palette_color() {
        let img = RgbImage::from_fn(16, 16, |x, y| {
            Rgb([
                u8::try_from(x * 16).unwrap(),
                u8::try_from(y * 16).unwrap(),
                128,
            ])
        });
        let q = ColorClustererKind::KMeans.quantize(&img, &params(4));
        assert_eq!(q.image().dimensions(), img.dimensions());
        assert!(q.palette().len() <= 4);
        assert!(!q.palette().is_empty());
        for pixel in q.image().pixels() {
            assert!(q.palette().contains(pixel), "{pixel:?} not in palette");
        }
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let img = RgbImage::from_fn(12, 12, |x, y| {
            Rgb([
                u8::try_from((x * 21 + y * 3) % 256).unwrap(),
                u8::try_from((y * 19) % 256).unwrap(),
                u8::try_from((x * y) % 256).unwrap(),
            ])
        });
        let a = ColorClustererKind::KMeans.quantize(&img, &params(5));
        let b = ColorClustererKind::KMeans.quantize(&img, &params(5));
        assert_eq!(a, b);
    }

    #[test]
    fn more_clusters_than_pixels() {
        let img = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let q = ColorClustererKind::KMeans.quantize(&img, &params(8));
        assert!(q.palette().len() <= 2);
        for pixel in q.image().pixels() {
            assert!(q.palette().contains(pixel));
        }
    }

    #[test]
    fn empty_image_has_empty_palette() {
        let img = RgbImage::new(0, 0);
        let q = ColorClustererKind::KMeans.quantize(&img, &params(3));
        assert!(q.palette().is_empty());
        assert_eq!(q.into_image().dimensions(), (0, 0));
    }

    #[test]
    fn sampler_is_stable_and_in_range() {
        let sampler = SeededSampler::new(42);
        for slot in 0..32 {
            let i = sampler.index(1, slot, 7);
            assert!(i < 7);
            assert_eq!(i, sampler.index(1, slot, 7));
        }
    }

    #[test]
    fn nearest_breaks_ties_low() {
        let centers = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        assert_eq!(nearest([10.0, 10.0, 10.0], &centers).0, 0);
    }
}
