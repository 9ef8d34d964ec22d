//! Contour tracing: extract ordered boundary traces from a binary edge map.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! which algorithm to use at runtime.
//!
//! # Strategy pattern
//!
//! Different tracing algorithms produce different geometry from the same
//! edge map. The trait/enum design keeps the concrete algorithm a
//! configuration choice rather than a fixed dependency of the stroke
//! sequencer.

use image::GrayImage;
use imageproc::contours::BorderType;
use serde::{Deserialize, Serialize};

use crate::types::{Contour, Point};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`,
    /// keeping only outermost outer borders.
    ///
    /// On 1-pixel-wide Canny edges the outer border walks both sides of
    /// each edge line, so every edge is sketched as a closed loop.
    #[default]
    BorderFollowing,
}

/// How many traced points each contour keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourFidelity {
    /// Every traced boundary pixel.
    #[default]
    Full,
    /// Straight horizontal, vertical and diagonal runs collapsed to their
    /// end points.
    Simplified,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary edge map (white pixels = edges, black = background).
/// Output: outer boundary contours, each with at least 2 points, in no
/// particular order relative to each other.
pub trait ContourTracer {
    /// Trace contours in the given binary edge map.
    fn trace(&self, edges: &GrayImage, fidelity: ContourFidelity) -> Vec<Contour>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, edges: &GrayImage, fidelity: ContourFidelity) -> Vec<Contour> {
        let traced = match *self {
            Self::BorderFollowing => trace_outer_borders(edges),
        };

        traced
            .into_iter()
            .map(|contour| match fidelity {
                ContourFidelity::Full => contour,
                ContourFidelity::Simplified => crate::simplify::collapse_collinear(&contour),
            })
            .filter(|contour| contour.len() >= 2)
            .collect()
    }
}

/// Suzuki-Abe border following, outermost outer borders only.
///
/// Hole borders and outer borders nested inside another component are
/// dropped, matching "external contours only" retrieval.
fn trace_outer_borders(edges: &GrayImage) -> Vec<Contour> {
    let contours: Vec<imageproc::contours::Contour<i32>> =
        imageproc::contours::find_contours(edges);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            Contour::new(
                c.points
                    .into_iter()
                    .map(|p| Point::new(p.x, p.y))
                    .collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_rect(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(
            ContourTracerKind::default(),
            ContourTracerKind::BorderFollowing
        );
        assert_eq!(ContourFidelity::default(), ContourFidelity::Full);
    }

    #[test]
    fn empty_image_produces_no_contours() {
        let img = GrayImage::new(10, 10);
        let result = ContourTracerKind::BorderFollowing.trace(&img, ContourFidelity::Full);
        assert!(result.is_empty());
    }

    #[test]
    fn single_pixel_contour_is_filtered_out() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(5, 5, image::Luma([255]));
        let result = ContourTracerKind::BorderFollowing.trace(&img, ContourFidelity::Full);
        assert!(result.is_empty());
    }

    #[test]
    fn rectangle_produces_one_outer_contour() {
        let mut img = GrayImage::new(20, 20);
        filled_rect(&mut img, 5, 5, 15, 15);
        let result = ContourTracerKind::BorderFollowing.trace(&img, ContourFidelity::Full);
        assert_eq!(result.len(), 1);
        // The perimeter of a 10x10 block has 36 boundary pixels.
        assert!((36..=37).contains(&result[0].len()), "got {}", result[0].len());
        for p in result[0].points() {
            assert!((5..15).contains(&p.x) && (5..15).contains(&p.y));
        }
    }

    #[test]
    fn trace_points_are_8_connected() {
        let mut img = GrayImage::new(20, 20);
        filled_rect(&mut img, 3, 4, 12, 9);
        let result = ContourTracerKind::BorderFollowing.trace(&img, ContourFidelity::Full);
        for contour in &result {
            for pair in contour.points().windows(2) {
                let dx = (pair[0].x - pair[1].x).abs();
                let dy = (pair[0].y - pair[1].y).abs();
                assert!(dx <= 1 && dy <= 1, "gap between {:?} and {:?}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn holes_and_nested_components_are_ignored() {
        // A square ring with a dot inside the hole: only the ring's outer
        // border is top-level.
        let mut img = GrayImage::new(30, 30);
        filled_rect(&mut img, 2, 2, 28, 28);
        for y in 6..24 {
            for x in 6..24 {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
        filled_rect(&mut img, 12, 12, 16, 16);

        let result = ContourTracerKind::BorderFollowing.trace(&img, ContourFidelity::Full);
        assert_eq!(result.len(), 1);
        assert!(result[0].points().iter().all(|p| p.x == 2
            || p.x == 27
            || p.y == 2
            || p.y == 27));
    }

    #[test]
    fn separate_components_each_traced() {
        let mut img = GrayImage::new(30, 10);
        filled_rect(&mut img, 1, 1, 6, 6);
        filled_rect(&mut img, 20, 2, 26, 8);
        let result = ContourTracerKind::BorderFollowing.trace(&img, ContourFidelity::Full);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn simplified_rectangle_keeps_corners_only() {
        let mut img = GrayImage::new(20, 20);
        filled_rect(&mut img, 5, 5, 15, 15);
        let full = ContourTracerKind::BorderFollowing.trace(&img, ContourFidelity::Full);
        let simplified =
            ContourTracerKind::BorderFollowing.trace(&img, ContourFidelity::Simplified);
        assert_eq!(simplified.len(), 1);
        assert!(simplified[0].len() < full[0].len());
        assert!(simplified[0].len() <= 5, "got {:?}", simplified[0]);
        let corners = [
            Point::new(5, 5),
            Point::new(14, 5),
            Point::new(14, 14),
            Point::new(5, 14),
        ];
        for corner in &corners[1..] {
            assert!(simplified[0].points().contains(corner), "missing {corner:?}");
        }
    }
}
