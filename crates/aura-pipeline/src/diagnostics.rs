//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`run_with_diagnostics`] performs a full run from encoded bytes to a
//! [`FrameSink`] and records how long each stage took and what it
//! produced. Useful for tuning thresholds, cluster counts and stroke
//! pacing.
//!
//! Time is read through the [`Clock`] trait so callers (and tests) choose
//! the time source. [`SystemClock`] uses the `web-time` crate, which maps
//! to `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! The drawing and wipe stages stream frames to the sink as they are
//! produced, so their durations include time spent inside the sink.

use std::ops::ControlFlow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{Analysis, FrameSink, RunOutcome};
use crate::types::{Contour, Dimensions, PipelineError, RevealConfig, duration_serde};

/// Source of monotonic time.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: color quantization.
    pub segmentation: StageDiagnostics,
    /// Stage 2: intensity, smoothing and Canny edge detection.
    pub edge_detection: StageDiagnostics,
    /// Stage 3: contour tracing.
    pub contour_tracing: StageDiagnostics,
    /// Stage 4: stroke drawing and reveal compositing.
    pub drawing: StageDiagnostics,
    /// Stage 5: closing wipe (`None` if the sink stopped the run first).
    pub wipe: Option<StageDiagnostics>,
    /// Total wall-clock duration of the entire run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Color quantization metrics.
    Segmentation {
        /// Requested cluster count.
        requested_clusters: usize,
        /// Distinct colors actually used.
        palette_size: usize,
        /// Clustering attempts run.
        attempts: u32,
    },
    /// Edge detection metrics.
    EdgeDetection {
        /// Smoothing kernel side length.
        kernel_size: u32,
        /// Low threshold (after clamping).
        low_threshold: f32,
        /// High threshold (after clamping).
        high_threshold: f32,
        /// Number of edge pixels in the output.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Contour tracing metrics.
    ContourTracing {
        /// Number of contours kept.
        contour_count: usize,
        /// Total number of points across all contours.
        total_point_count: usize,
        /// Minimum points in any single contour.
        min_contour_points: usize,
        /// Maximum points in any single contour.
        max_contour_points: usize,
        /// Mean points per contour.
        mean_contour_points: f64,
    },
    /// Drawing phase metrics.
    Drawing {
        /// Stroke events drawn.
        stroke_events: usize,
        /// Drawing frames produced.
        frames: usize,
        /// Canvas pixels inked at the end of drawing.
        inked_pixels: u64,
        /// Mask pixels revealed at the end of drawing.
        revealed_pixels: u64,
    },
    /// Wipe phase metrics.
    Wipe {
        /// Configured wipe steps.
        steps: u32,
        /// Feather band height in rows.
        feather: u32,
        /// Wipe frames produced.
        frames: usize,
    },
}

/// High-level summary counts for the entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of contours traced.
    pub contour_count: usize,
    /// Stroke events drawn.
    pub stroke_events: usize,
    /// How the run ended.
    pub outcome: RunOutcome,
}

/// Run the full pipeline on encoded image bytes, collecting per-stage
/// diagnostics.
///
/// The configuration is validated before decoding. Frames go to `sink`
/// exactly as [`drive`](crate::drive) would deliver them, followed by
/// [`FrameSink::finish`].
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an out-of-range
/// parameter, [`PipelineError::AssetMissing`] for empty input, and
/// [`PipelineError::ImageDecode`] for undecodable input. No frame is
/// emitted on error.
pub fn run_with_diagnostics<C: Clock, S: FrameSink + ?Sized>(
    image_bytes: &[u8],
    config: &RevealConfig,
    clock: &C,
    sink: &mut S,
) -> Result<PipelineDiagnostics, PipelineError> {
    config.validate()?;
    let total_start = clock.now();

    let start = clock.now();
    let source = crate::grayscale::decode(image_bytes)?;
    let dimensions = Dimensions::of(&source);
    let decode = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
        },
    };

    let start = clock.now();
    let quantized = crate::pipeline::quantize(&source, config);
    let segmentation = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Segmentation {
            requested_clusters: config.cluster_count,
            palette_size: quantized.palette().len(),
            attempts: config.cluster_attempts,
        },
    };

    let start = clock.now();
    let edges = crate::pipeline::detect_edges(&source, config);
    let (low_threshold, high_threshold) =
        crate::edge::clamp_thresholds(config.gradient_low, config.gradient_high);
    let edge_detection = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::EdgeDetection {
            kernel_size: config.blur_kernel_size,
            low_threshold,
            high_threshold,
            edge_pixel_count: crate::edge::count_edge_pixels(&edges),
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    let start = clock.now();
    let contours = crate::pipeline::trace_contours(&edges, config);
    let stats = contour_stats(&contours);
    let contour_tracing = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::ContourTracing {
            contour_count: contours.len(),
            total_point_count: stats.total,
            min_contour_points: stats.min,
            max_contour_points: stats.max,
            mean_contour_points: stats.mean,
        },
    };

    let analysis = Analysis::from_parts(config.clone(), source, quantized, edges, contours);
    let mut delivered = 0;

    let start = clock.now();
    let mut sequencer = analysis.strokes();
    let flow = crate::pipeline::forward(sequencer.by_ref(), sink, &mut delivered);
    let stroke_events = sequencer.events_drawn();
    let drawing = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Drawing {
            stroke_events,
            frames: sequencer.frames_emitted(),
            inked_pixels: sequencer.sketch().canvas().inked_count(),
            revealed_pixels: sequencer.sketch().mask().set_count(),
        },
    };

    let (wipe, flow) = match flow {
        ControlFlow::Break(()) => (None, flow),
        ControlFlow::Continue(()) => {
            let start = clock.now();
            let before = delivered;
            let frames = analysis.wipe_from(sequencer.current_frame());
            let flow = crate::pipeline::forward(frames, sink, &mut delivered);
            let wipe = StageDiagnostics {
                duration: clock.elapsed(&start),
                metrics: StageMetrics::Wipe {
                    steps: config.wipe_steps,
                    feather: config.feather,
                    frames: delivered - before,
                },
            };
            (Some(wipe), flow)
        }
    };

    let outcome = match flow {
        ControlFlow::Continue(()) => RunOutcome::Completed { frames: delivered },
        ControlFlow::Break(()) => RunOutcome::Stopped { frames: delivered },
    };
    sink.finish(&outcome);

    Ok(PipelineDiagnostics {
        decode,
        segmentation,
        edge_detection,
        contour_tracing,
        drawing,
        wipe,
        total_duration: clock.elapsed(&total_start),
        summary: PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            contour_count: analysis.contours().len(),
            stroke_events,
            outcome,
        },
    })
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![
            ("Decode", &self.decode),
            ("Segmentation", &self.segmentation),
            ("Edge Detection", &self.edge_detection),
            ("Contour Tracing", &self.contour_tracing),
            ("Drawing", &self.drawing),
        ];
        if let Some(ref wipe) = self.wipe {
            stages.push(("Wipe", wipe));
        }

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        let ending = match self.summary.outcome {
            RunOutcome::Completed { .. } => "completed",
            RunOutcome::Stopped { .. } => "stopped by sink",
        };
        lines.push(format!(
            "Contours: {}  |  Strokes: {}  |  Frames: {} ({ending})",
            self.summary.contour_count,
            self.summary.stroke_events,
            self.summary.outcome.frames(),
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Segmentation {
            requested_clusters,
            palette_size,
            attempts,
        } => format!("k={requested_clusters} colors={palette_size} attempts={attempts}"),
        StageMetrics::EdgeDetection {
            kernel_size,
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "kernel={kernel_size} low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::ContourTracing {
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
            mean_contour_points,
        } => format!(
            "{contour_count} contours, {total_point_count} pts (min={min_contour_points} max={max_contour_points} mean={mean_contour_points:.1})",
        ),
        StageMetrics::Drawing {
            stroke_events,
            frames,
            inked_pixels,
            revealed_pixels,
        } => format!(
            "{stroke_events} strokes, {frames} frames, ink={inked_pixels} revealed={revealed_pixels}",
        ),
        StageMetrics::Wipe {
            steps,
            feather,
            frames,
        } => format!("steps={steps} feather={feather} frames={frames}"),
    }
}

/// Statistics for a set of contours.
struct ContourStats {
    total: usize,
    min: usize,
    max: usize,
    mean: f64,
}

fn contour_stats(contours: &[Contour]) -> ContourStats {
    let total: usize = contours.iter().map(Contour::len).sum();
    let min = contours.iter().map(Contour::len).min().unwrap_or(0);
    let max = contours.iter().map(Contour::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if contours.is_empty() {
        0.0
    } else {
        total as f64 / contours.len() as f64
    };
    ContourStats {
        total,
        min,
        max,
        mean,
    }
}
