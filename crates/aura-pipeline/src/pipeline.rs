//! Run orchestration: analysis, frame sequencing, and delivery to a sink.
//!
//! A run has two halves. [`Analysis::new`] computes everything derived
//! from the source image exactly once (quantized colors, edge map,
//! contours). [`Analysis::frames`] then lazily yields the drawing frames
//! followed by the wipe frames, and [`drive`] forwards them to a
//! [`FrameSink`] until the sequence ends or the sink asks to stop.
//!
//! ```no_run
//! # use aura_pipeline::{Analysis, PipelineError, RevealConfig, RgbImage};
//! # fn run(image: RgbImage) -> Result<(), PipelineError> {
//! let analysis = Analysis::new(image, RevealConfig::default())?;
//! let mut frames: Vec<aura_pipeline::Frame> = Vec::new();
//! let outcome = aura_pipeline::drive(analysis.frames(), &mut frames);
//! assert_eq!(outcome.frames(), frames.len());
//! # Ok(())
//! # }
//! ```

use std::ops::ControlFlow;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::contour::ContourTracer;
use crate::segment::{ClusterParams, ColorClusterer, QuantizedImage};
use crate::stroke::StrokeSequencer;
use crate::types::{Contour, Dimensions, Frame, PipelineError, RevealConfig, RgbImage};
use crate::wipe::WipeSequence;

/// Everything derived from one source image, computed once.
///
/// Immutable after construction; any number of runs may read it
/// concurrently, each drawing into its own sketch.
#[derive(Debug, Clone)]
pub struct Analysis {
    config: RevealConfig,
    source: RgbImage,
    quantized: QuantizedImage,
    edges: GrayImage,
    contours: Vec<Contour>,
}

impl Analysis {
    /// Validate `config` and analyze `source`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] before any analysis runs
    /// if a parameter is out of range.
    #[tracing::instrument(
        skip_all,
        fields(width = source.width(), height = source.height())
    )]
    pub fn new(source: RgbImage, config: RevealConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let quantized = quantize(&source, &config);
        let edges = detect_edges(&source, &config);
        let contours = trace_contours(&edges, &config);

        Ok(Self::from_parts(config, source, quantized, edges, contours))
    }

    /// Assemble an analysis from precomputed stages. Callers guarantee
    /// a validated config and that `quantized` matches `source` in size.
    pub(crate) const fn from_parts(
        config: RevealConfig,
        source: RgbImage,
        quantized: QuantizedImage,
        edges: GrayImage,
        contours: Vec<Contour>,
    ) -> Self {
        Self {
            config,
            source,
            quantized,
            edges,
            contours,
        }
    }

    /// The validated configuration this analysis was built with.
    #[must_use]
    pub const fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// The true-color source image.
    #[must_use]
    pub const fn source(&self) -> &RgbImage {
        &self.source
    }

    /// The color-quantized source.
    #[must_use]
    pub const fn quantized(&self) -> &QuantizedImage {
        &self.quantized
    }

    /// The binary edge map contours were traced from.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Traced contours in extraction order.
    #[must_use]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Source image dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.source)
    }

    /// A fresh stroke sequencer over this analysis.
    #[must_use]
    pub fn strokes(&self) -> StrokeSequencer<'_> {
        StrokeSequencer::new(&self.contours, &self.quantized, &self.config)
    }

    /// The closing wipe from `last_frame` into the source image.
    pub(crate) const fn wipe_from(&self, last_frame: RgbImage) -> WipeSequence<'_> {
        WipeSequence::from_parts(last_frame, &self.source, &self.config)
    }

    /// The complete frame sequence for one run: drawing frames, then
    /// `wipe_steps + 1` wipe frames.
    #[must_use]
    pub fn frames(&self) -> Frames<'_> {
        Frames {
            analysis: self,
            phase: Phase::Drawing(self.strokes()),
        }
    }
}

/// Quantize the source to its dominant colors.
#[tracing::instrument(skip_all, fields(k = config.cluster_count))]
pub(crate) fn quantize(source: &RgbImage, config: &RevealConfig) -> QuantizedImage {
    config
        .clusterer
        .quantize(source, &ClusterParams::from_config(config))
}

/// Extract the binary edge map.
#[tracing::instrument(skip_all)]
pub(crate) fn detect_edges(source: &RgbImage, config: &RevealConfig) -> GrayImage {
    let edges = crate::edge::extract_edges(
        source,
        config.blur_kernel_size,
        config.gradient_low,
        config.gradient_high,
    );
    tracing::debug!(
        edge_pixels = crate::edge::count_edge_pixels(&edges),
        "edges detected"
    );
    edges
}

/// Trace contours from the edge map.
#[tracing::instrument(skip_all)]
pub(crate) fn trace_contours(edges: &GrayImage, config: &RevealConfig) -> Vec<Contour> {
    let contours = config
        .contour_tracer
        .trace(edges, config.contour_fidelity);
    if contours.is_empty() {
        tracing::info!("no contours traced; the sketch will stay blank");
    } else {
        tracing::debug!(count = contours.len(), "contours traced");
    }
    contours
}

#[derive(Debug)]
enum Phase<'a> {
    Drawing(StrokeSequencer<'a>),
    Wipe(WipeSequence<'a>),
    Done,
}

/// Lazy frame sequence of one run, in display order.
///
/// Drawing frames come first. When drawing ends, the current composite
/// (all white if nothing was drawn) seeds the wipe.
#[derive(Debug)]
pub struct Frames<'a> {
    analysis: &'a Analysis,
    phase: Phase<'a>,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            match &mut self.phase {
                Phase::Drawing(sequencer) => {
                    if let Some(frame) = sequencer.next() {
                        return Some(frame);
                    }
                    tracing::debug!(
                        events = sequencer.events_drawn(),
                        frames = sequencer.frames_emitted(),
                        "drawing finished"
                    );
                    let last = sequencer.current_frame();
                    self.phase = Phase::Wipe(self.analysis.wipe_from(last));
                }
                Phase::Wipe(wipe) => {
                    if let Some(frame) = wipe.next() {
                        return Some(frame);
                    }
                    self.phase = Phase::Done;
                }
                Phase::Done => return None,
            }
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every frame was delivered.
    Completed {
        /// Frames delivered.
        frames: usize,
    },
    /// The sink asked to stop early.
    Stopped {
        /// Frames delivered, including the one that triggered the stop.
        frames: usize,
    },
}

impl RunOutcome {
    /// Frames delivered to the sink.
    #[must_use]
    pub const fn frames(&self) -> usize {
        match *self {
            Self::Completed { frames } | Self::Stopped { frames } => frames,
        }
    }

    /// Whether the run delivered every frame.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Receives frames in display order.
pub trait FrameSink {
    /// Accept one frame. Returning [`ControlFlow::Break`] stops the run
    /// before the next frame is produced.
    fn emit(&mut self, frame: Frame) -> ControlFlow<()>;

    /// Called once after the last frame, whether or not the run
    /// completed.
    fn finish(&mut self, outcome: &RunOutcome) {
        let _ = outcome;
    }
}

/// Collects every frame.
impl FrameSink for Vec<Frame> {
    fn emit(&mut self, frame: Frame) -> ControlFlow<()> {
        self.push(frame);
        ControlFlow::Continue(())
    }
}

/// Forward frames to `sink`, counting them in `delivered`.
pub(crate) fn forward<S: FrameSink + ?Sized>(
    frames: impl Iterator<Item = Frame>,
    sink: &mut S,
    delivered: &mut usize,
) -> ControlFlow<()> {
    for frame in frames {
        *delivered += 1;
        sink.emit(frame)?;
    }
    ControlFlow::Continue(())
}

/// Deliver `frames` to `sink`, then signal completion.
pub fn drive<S: FrameSink + ?Sized>(
    frames: impl Iterator<Item = Frame>,
    sink: &mut S,
) -> RunOutcome {
    let mut delivered = 0;
    let outcome = match forward(frames, sink, &mut delivered) {
        ControlFlow::Continue(()) => RunOutcome::Completed { frames: delivered },
        ControlFlow::Break(()) => RunOutcome::Stopped { frames: delivered },
    };
    tracing::info!(frames = delivered, completed = outcome.is_completed(), "run finished");
    sink.finish(&outcome);
    outcome
}
