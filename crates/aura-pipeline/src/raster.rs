//! Mutable rasters written during the drawing phase.
//!
//! [`Canvas`] accumulates black strokes on white; [`RevealMask`]
//! accumulates the wider stroke regions under which quantized color is
//! revealed. Both only ever gain set pixels. Their mutating methods are
//! crate-private so the [`StrokeSequencer`](crate::StrokeSequencer) that
//! owns the [`Sketch`] is their only writer.
//!
//! Lines are rasterized by stamping a disc of diameter `width` at every
//! Bresenham point between the end points. A wider line stamped along the
//! same points always covers a narrower one.

use image::{GrayImage, Luma, Rgb};
use imageproc::drawing::BresenhamLineIter;

use crate::types::{Dimensions, Point, RgbImage, StrokeEvent};

/// Canvas background.
pub const PAPER: Rgb<u8> = Rgb([255, 255, 255]);

/// Stroke color.
pub const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// Mask value for revealed pixels.
pub const REVEALED: u8 = 255;

/// Pixel offsets covered by a disc of diameter `width` centered on a
/// point. Always contains the center.
#[allow(clippy::cast_possible_truncation)]
fn disc_offsets(width: u32) -> Vec<(i32, i32)> {
    let radius = f64::from(width) / 2.0;
    let reach = radius.floor() as i32;
    let mut offsets = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if f64::from(dx * dx + dy * dy) <= radius * radius {
                offsets.push((dx, dy));
            }
        }
    }
    if offsets.is_empty() {
        offsets.push((0, 0));
    }
    offsets
}

/// Visit every in-bounds pixel covered by a `width`-thick line from
/// `start` to `end`.
#[allow(clippy::cast_precision_loss)]
fn stamp_line(
    bounds: (u32, u32),
    start: Point,
    end: Point,
    width: u32,
    mut plot: impl FnMut(u32, u32),
) {
    let offsets = disc_offsets(width);
    let mut stamp = |cx: i32, cy: i32| {
        for &(dx, dy) in &offsets {
            let (Ok(x), Ok(y)) = (u32::try_from(cx + dx), u32::try_from(cy + dy)) else {
                continue;
            };
            if x < bounds.0 && y < bounds.1 {
                plot(x, y);
            }
        }
    };

    stamp(start.x, start.y);
    let line = BresenhamLineIter::new(
        (start.x as f32, start.y as f32),
        (end.x as f32, end.y as f32),
    );
    for (x, y) in line {
        stamp(x, y);
    }
    stamp(end.x, end.y);
}

/// White RGB raster accumulating black strokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    /// A fully white canvas.
    #[must_use]
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            image: RgbImage::from_pixel(dimensions.width, dimensions.height, PAPER),
        }
    }

    /// The canvas pixels.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Whether the pixel at `(x, y)` has been drawn on.
    #[must_use]
    pub fn is_inked(&self, x: u32, y: u32) -> bool {
        self.image
            .get_pixel_checked(x, y)
            .is_some_and(|p| *p != PAPER)
    }

    /// Number of drawn-on pixels.
    #[must_use]
    pub fn inked_count(&self) -> u64 {
        self.image.pixels().map(|p| u64::from(*p != PAPER)).sum()
    }

    pub(crate) fn draw_line(&mut self, start: Point, end: Point, width: u32) {
        let image = &mut self.image;
        stamp_line(image.dimensions(), start, end, width, |x, y| {
            image.put_pixel(x, y, INK);
        });
    }
}

/// Single-channel raster marking where quantized color shows through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealMask {
    image: GrayImage,
}

impl RevealMask {
    /// An empty mask.
    #[must_use]
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            image: GrayImage::new(dimensions.width, dimensions.height),
        }
    }

    /// The mask pixels (0 or [`REVEALED`]).
    #[must_use]
    pub const fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Whether the pixel at `(x, y)` is revealed.
    #[must_use]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel_checked(x, y).is_some_and(|p| p.0[0] != 0)
    }

    /// Number of revealed pixels.
    #[must_use]
    pub fn set_count(&self) -> u64 {
        self.image.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
    }

    pub(crate) fn draw_line(&mut self, start: Point, end: Point, width: u32) {
        let image = &mut self.image;
        stamp_line(image.dimensions(), start, end, width, |x, y| {
            image.put_pixel(x, y, Luma([REVEALED]));
        });
    }
}

/// Per-run drawing context: the canvas and reveal mask of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sketch {
    canvas: Canvas,
    mask: RevealMask,
}

impl Sketch {
    /// A blank sketch: white canvas, empty mask.
    #[must_use]
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            canvas: Canvas::new(dimensions),
            mask: RevealMask::new(dimensions),
        }
    }

    /// The stroke canvas.
    #[must_use]
    pub const fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// The reveal mask.
    #[must_use]
    pub const fn mask(&self) -> &RevealMask {
        &self.mask
    }

    /// Draw one stroke event on both rasters.
    pub(crate) fn apply(&mut self, event: &StrokeEvent) {
        self.canvas
            .draw_line(event.start, event.end, event.stroke_width);
        self.mask.draw_line(event.start, event.end, event.mask_width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn event(start: (i32, i32), end: (i32, i32)) -> StrokeEvent {
        StrokeEvent {
            start: Point::new(start.0, start.1),
            end: Point::new(end.0, end.1),
            stroke_width: 2,
            mask_width: 4,
        }
    }

    #[test]
    fn new_sketch_is_blank() {
        let sketch = Sketch::new(dims(8, 5));
        assert_eq!(sketch.canvas().image().dimensions(), (8, 5));
        assert!(sketch.canvas().image().pixels().all(|p| *p == PAPER));
        assert_eq!(sketch.canvas().inked_count(), 0);
        assert_eq!(sketch.mask().set_count(), 0);
    }

    #[test]
    fn disc_offsets_by_width() {
        assert_eq!(disc_offsets(0), vec![(0, 0)]);
        assert_eq!(disc_offsets(1), vec![(0, 0)]);
        assert_eq!(disc_offsets(2).len(), 5);
        assert_eq!(disc_offsets(4).len(), 13);
    }

    #[test]
    fn wider_disc_contains_narrower() {
        let narrow = disc_offsets(2);
        let wide = disc_offsets(4);
        assert!(narrow.iter().all(|o| wide.contains(o)));
    }

    #[test]
    fn horizontal_line_is_drawn() {
        let mut canvas = Canvas::new(dims(20, 10));
        canvas.draw_line(Point::new(2, 5), Point::new(12, 5), 1);
        for x in 2..=12 {
            assert!(canvas.is_inked(x, 5), "missing pixel at x={x}");
        }
        assert_eq!(canvas.inked_count(), 11);
    }

    #[test]
    fn out_of_bounds_is_clipped() {
        let mut mask = RevealMask::new(dims(5, 5));
        mask.draw_line(Point::new(-3, 2), Point::new(8, 2), 4);
        assert!(mask.is_set(0, 2));
        assert!(mask.is_set(4, 2));
        assert!(!mask.is_set(5, 2));
    }

    #[test]
    fn mask_covers_canvas_after_every_event() {
        let mut sketch = Sketch::new(dims(30, 30));
        let events = [
            event((1, 1), (20, 3)),
            event((20, 3), (25, 25)),
            event((0, 29), (29, 0)),
            event((15, 15), (15, 15)),
        ];
        for e in &events {
            sketch.apply(e);
            for (x, y, _) in sketch.canvas().image().enumerate_pixels() {
                if sketch.canvas().is_inked(x, y) {
                    assert!(sketch.mask().is_set(x, y), "({x}, {y}) inked but not revealed");
                }
            }
        }
        assert!(sketch.mask().set_count() > sketch.canvas().inked_count());
    }

    #[test]
    fn counts_never_decrease() {
        let mut sketch = Sketch::new(dims(16, 16));
        let mut last = (0, 0);
        for i in 0..10 {
            sketch.apply(&event((i, 0), (15 - i, 15)));
            let now = (sketch.canvas().inked_count(), sketch.mask().set_count());
            assert!(now.0 >= last.0 && now.1 >= last.1);
            last = now;
        }
    }

    #[test]
    fn degenerate_line_stamps_one_disc() {
        let mut canvas = Canvas::new(dims(9, 9));
        canvas.draw_line(Point::new(4, 4), Point::new(4, 4), 2);
        assert_eq!(canvas.inked_count(), 5);
    }
}
