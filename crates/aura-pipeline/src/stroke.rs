//! Stroke sequencing: turn contours into paced line draws.
//!
//! [`StrokePlan`] lists the stroke events for a contour set without
//! touching any raster. [`StrokeSequencer`] replays that plan onto its own
//! [`Sketch`], producing a composited drawing [`Frame`] every
//! `batch_size` events.
//!
//! A trailing partial batch is flushed as one extra drawing frame, so the
//! last drawing frame always shows every stroke and the wipe starts from
//! it.

use std::time::Duration;

use crate::raster::Sketch;
use crate::segment::QuantizedImage;
use crate::types::{Contour, Dimensions, Frame, FramePhase, RevealConfig, RgbImage, StrokeEvent};

/// Ordered stroke events for a contour set.
///
/// For each contour of length `L`, in order, events connect
/// `point[i - skip]` to `point[i]` for `i = skip, 2 * skip, ...` while
/// `i < L`. Contours shorter than `skip + 1` points yield nothing and a
/// trailing remainder shorter than `skip` is dropped.
#[derive(Debug, Clone)]
pub struct StrokePlan<'a> {
    contours: &'a [Contour],
    skip: usize,
    stroke_width: u32,
    mask_width: u32,
    contour: usize,
    next: usize,
}

impl<'a> StrokePlan<'a> {
    /// Plan strokes over `contours` using the stride and widths in
    /// `config`.
    #[must_use]
    pub fn new(contours: &'a [Contour], config: &RevealConfig) -> Self {
        let skip = config.point_skip.max(1);
        Self {
            contours,
            skip,
            stroke_width: config.stroke_width,
            mask_width: config.mask_width,
            contour: 0,
            next: skip,
        }
    }
}

impl Iterator for StrokePlan<'_> {
    type Item = StrokeEvent;

    fn next(&mut self) -> Option<StrokeEvent> {
        loop {
            let points = self.contours.get(self.contour)?.points();
            if self.next < points.len() {
                let event = StrokeEvent {
                    start: points[self.next - self.skip],
                    end: points[self.next],
                    stroke_width: self.stroke_width,
                    mask_width: self.mask_width,
                };
                self.next += self.skip;
                return Some(event);
            }
            self.contour += 1;
            self.next = self.skip;
        }
    }
}

/// Draws a stroke plan onto a fresh [`Sketch`], one event at a time.
///
/// As an iterator it yields a drawing frame after every `batch_size`
/// events, plus one final frame for a trailing partial batch. A run with
/// no events yields no frames. The sequencer is not restartable: build a
/// new one for a new run.
#[derive(Debug)]
pub struct StrokeSequencer<'a> {
    plan: StrokePlan<'a>,
    quantized: &'a QuantizedImage,
    sketch: Sketch,
    batch_size: usize,
    hold: Duration,
    events_drawn: usize,
    pending: usize,
    frames_emitted: usize,
}

impl<'a> StrokeSequencer<'a> {
    /// Start a run over `contours`, revealing colors from `quantized`.
    ///
    /// The sketch takes the dimensions of `quantized`.
    #[must_use]
    pub fn new(
        contours: &'a [Contour],
        quantized: &'a QuantizedImage,
        config: &RevealConfig,
    ) -> Self {
        Self {
            plan: StrokePlan::new(contours, config),
            quantized,
            sketch: Sketch::new(Dimensions::of(quantized.image())),
            batch_size: config.batch_size.max(1),
            hold: config.draw_delay,
            events_drawn: 0,
            pending: 0,
            frames_emitted: 0,
        }
    }

    /// Draw the next stroke event, returning it, or `None` when the plan
    /// is exhausted.
    pub fn step(&mut self) -> Option<StrokeEvent> {
        let event = self.plan.next()?;
        self.sketch.apply(&event);
        self.events_drawn += 1;
        self.pending += 1;
        tracing::trace!(start = ?event.start, end = ?event.end, "stroke");
        Some(event)
    }

    /// Composite the current sketch state into a displayable image.
    #[must_use]
    pub fn current_frame(&self) -> RgbImage {
        crate::reveal::compose(&self.sketch, self.quantized)
    }

    /// The canvas and reveal mask drawn so far.
    #[must_use]
    pub const fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    /// Number of stroke events drawn so far.
    #[must_use]
    pub const fn events_drawn(&self) -> usize {
        self.events_drawn
    }

    /// Number of drawing frames yielded so far.
    #[must_use]
    pub const fn frames_emitted(&self) -> usize {
        self.frames_emitted
    }

    /// Finish the drawing phase, returning the frozen sketch.
    #[must_use]
    pub fn into_sketch(self) -> Sketch {
        self.sketch
    }

    fn emit(&mut self) -> Frame {
        let frame = Frame {
            phase: FramePhase::Drawing,
            index: self.frames_emitted,
            image: self.current_frame(),
            hold: self.hold,
        };
        tracing::trace!(
            index = frame.index,
            events = self.events_drawn,
            "drawing frame"
        );
        self.frames_emitted += 1;
        self.pending = 0;
        frame
    }
}

impl Iterator for StrokeSequencer<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            if self.step().is_none() {
                return (self.pending > 0).then(|| self.emit());
            }
            if self.pending >= self.batch_size {
                return Some(self.emit());
            }
        }
    }
}
