//! Shared types for the aura sketch-then-reveal pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contour::{ContourFidelity, ContourTracerKind};
use crate::segment::ColorClustererKind;

/// Re-export `GrayImage` so downstream crates can reference the edge map
/// and reveal mask without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference source images
/// and frames without depending on `image` directly.
pub use image::RgbImage;

/// Serde support for `std::time::Duration` as fractional seconds.
pub(crate) mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A 2D point on the pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from the left edge).
    pub x: i32,
    /// Row (pixels from the top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An ordered trace of points along one connected edge boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a new contour from points in trace order.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the contour.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an RGB raster.
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// One atomic line draw connecting two contour points.
///
/// The same segment is drawn on the canvas at `stroke_width` and on the
/// reveal mask at `mask_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrokeEvent {
    /// Segment start.
    pub start: Point,
    /// Segment end.
    pub end: Point,
    /// Canvas line thickness in pixels.
    pub stroke_width: u32,
    /// Reveal mask line thickness in pixels.
    pub mask_width: u32,
}

/// Which part of the animation a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramePhase {
    /// Incremental stroke drawing with color revealed under the strokes.
    Drawing,
    /// Closing bottom-up wipe into the source image.
    Wipe,
}

/// A displayable RGB frame handed to a [`FrameSink`](crate::FrameSink).
///
/// Frames are ephemeral: the pipeline does not retain them after emission.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Phase that produced this frame.
    pub phase: FramePhase,
    /// Zero-based position of this frame within its phase.
    pub index: usize,
    /// Frame pixels, same dimensions as the source image.
    pub image: RgbImage,
    /// How long the sink should display the frame before the next one.
    ///
    /// A pacing hint only: the pipeline itself never sleeps.
    pub hold: Duration,
}

/// Configuration for the sketch-then-reveal pipeline.
///
/// Defaults give a brisk pen sketch over eight colors. Call
/// [`validate`](Self::validate) (done automatically by
/// [`Analysis::new`](crate::Analysis::new)) before running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Number of dominant colors (k-means clusters). The effective palette
    /// may be smaller when the image has fewer distinct colors.
    pub cluster_count: usize,

    /// Maximum Lloyd iterations per clustering attempt.
    pub cluster_max_iterations: u32,

    /// Early-stop threshold: iteration ends once no centroid moves further
    /// than this distance in RGB space.
    pub cluster_epsilon: f32,

    /// Number of clustering attempts from different initial centers. The
    /// most compact result wins.
    pub cluster_attempts: u32,

    /// Seed for the initial-center sample stream.
    pub cluster_seed: u64,

    /// Which color clustering algorithm to use.
    pub clusterer: ColorClustererKind,

    /// Side length of the Gaussian smoothing kernel applied before edge
    /// detection. Must be odd; 1 disables smoothing.
    pub blur_kernel_size: u32,

    /// Hysteresis low threshold. Gradient magnitudes between
    /// `gradient_low` and `gradient_high` are edges only if connected to a
    /// strong edge.
    pub gradient_low: f32,

    /// Hysteresis high threshold. Gradient magnitudes at or above this are
    /// definite edges.
    pub gradient_high: f32,

    /// Which contour tracing algorithm to use.
    pub contour_tracer: ContourTracerKind,

    /// Whether traced contours keep every pixel or collapse straight runs.
    pub contour_fidelity: ContourFidelity,

    /// Draw every `point_skip`-th point pair of each contour.
    pub point_skip: usize,

    /// Canvas line thickness in pixels.
    pub stroke_width: u32,

    /// Reveal mask line thickness in pixels. Must exceed `stroke_width`
    /// so color spills slightly past each stroke.
    pub mask_width: u32,

    /// Stroke events drawn between two emitted drawing frames.
    pub batch_size: usize,

    /// Number of wipe steps; the wipe emits `wipe_steps + 1` frames.
    pub wipe_steps: u32,

    /// Height in rows of the feathered band above the wipe front.
    pub feather: u32,

    /// Display time hint for each drawing frame.
    #[serde(with = "duration_serde")]
    pub draw_delay: Duration,

    /// Display time hint for each wipe frame.
    #[serde(with = "duration_serde")]
    pub wipe_delay: Duration,
}

impl RevealConfig {
    /// Default number of color clusters.
    pub const DEFAULT_CLUSTER_COUNT: usize = 8;
    /// Default maximum Lloyd iterations.
    pub const DEFAULT_CLUSTER_MAX_ITERATIONS: u32 = 15;
    /// Default centroid movement early-stop threshold.
    pub const DEFAULT_CLUSTER_EPSILON: f32 = 1.0;
    /// Default number of clustering attempts.
    pub const DEFAULT_CLUSTER_ATTEMPTS: u32 = 5;
    /// Default clustering seed.
    pub const DEFAULT_CLUSTER_SEED: u64 = 0;
    /// Default smoothing kernel size.
    pub const DEFAULT_BLUR_KERNEL_SIZE: u32 = 5;
    /// Default hysteresis low threshold.
    pub const DEFAULT_GRADIENT_LOW: f32 = 80.0;
    /// Default hysteresis high threshold.
    pub const DEFAULT_GRADIENT_HIGH: f32 = 180.0;
    /// Default contour point stride.
    pub const DEFAULT_POINT_SKIP: usize = 5;
    /// Default canvas line thickness.
    pub const DEFAULT_STROKE_WIDTH: u32 = 2;
    /// Default reveal mask line thickness.
    pub const DEFAULT_MASK_WIDTH: u32 = 4;
    /// Default stroke events per drawing frame.
    pub const DEFAULT_BATCH_SIZE: usize = 18;
    /// Default wipe step count.
    pub const DEFAULT_WIPE_STEPS: u32 = 35;
    /// Default feather band height.
    pub const DEFAULT_FEATHER: u32 = 40;
    /// Default drawing frame hold, in milliseconds.
    pub const DEFAULT_DRAW_DELAY_MS: u64 = 30;
    /// Default wipe frame hold, in milliseconds.
    pub const DEFAULT_WIPE_DELAY_MS: u64 = 30;

    /// Check every parameter range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first
    /// out-of-range parameter.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.cluster_count < 1 {
            return Err(invalid("cluster_count must be at least 1"));
        }
        if self.cluster_max_iterations < 1 {
            return Err(invalid("cluster_max_iterations must be at least 1"));
        }
        if !self.cluster_epsilon.is_finite() || self.cluster_epsilon < 0.0 {
            return Err(invalid(format!(
                "cluster_epsilon must be finite and non-negative, got {}",
                self.cluster_epsilon
            )));
        }
        if self.cluster_attempts < 1 {
            return Err(invalid("cluster_attempts must be at least 1"));
        }
        if self.blur_kernel_size % 2 == 0 {
            return Err(invalid(format!(
                "blur_kernel_size must be odd, got {}",
                self.blur_kernel_size
            )));
        }
        for (name, value) in [
            ("gradient_low", self.gradient_low),
            ("gradient_high", self.gradient_high),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.gradient_low > self.gradient_high {
            return Err(invalid(format!(
                "gradient_low ({}) must not exceed gradient_high ({})",
                self.gradient_low, self.gradient_high
            )));
        }
        if self.point_skip < 1 {
            return Err(invalid("point_skip must be at least 1"));
        }
        if self.stroke_width < 1 {
            return Err(invalid("stroke_width must be at least 1"));
        }
        if self.mask_width <= self.stroke_width {
            return Err(invalid(format!(
                "mask_width ({}) must exceed stroke_width ({})",
                self.mask_width, self.stroke_width
            )));
        }
        if self.batch_size < 1 {
            return Err(invalid("batch_size must be at least 1"));
        }
        if self.wipe_steps < 1 {
            return Err(invalid("wipe_steps must be at least 1"));
        }
        Ok(())
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            cluster_count: Self::DEFAULT_CLUSTER_COUNT,
            cluster_max_iterations: Self::DEFAULT_CLUSTER_MAX_ITERATIONS,
            cluster_epsilon: Self::DEFAULT_CLUSTER_EPSILON,
            cluster_attempts: Self::DEFAULT_CLUSTER_ATTEMPTS,
            cluster_seed: Self::DEFAULT_CLUSTER_SEED,
            clusterer: ColorClustererKind::default(),
            blur_kernel_size: Self::DEFAULT_BLUR_KERNEL_SIZE,
            gradient_low: Self::DEFAULT_GRADIENT_LOW,
            gradient_high: Self::DEFAULT_GRADIENT_HIGH,
            contour_tracer: ContourTracerKind::default(),
            contour_fidelity: ContourFidelity::default(),
            point_skip: Self::DEFAULT_POINT_SKIP,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            mask_width: Self::DEFAULT_MASK_WIDTH,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            wipe_steps: Self::DEFAULT_WIPE_STEPS,
            feather: Self::DEFAULT_FEATHER,
            draw_delay: Duration::from_millis(Self::DEFAULT_DRAW_DELAY_MS),
            wipe_delay: Duration::from_millis(Self::DEFAULT_WIPE_DELAY_MS),
        }
    }
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig(message.into())
}

/// Errors that can occur before or during a pipeline run.
///
/// Every variant is reported before any frame is emitted: there is no
/// partial frame sequence on failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The source image is absent (empty data or an unreadable file).
    #[error("source image is missing: {0}")]
    AssetMissing(String),

    /// The source image data could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// A configuration parameter is out of range.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// Two rasters that must share dimensions do not.
    #[error(
        "raster dimensions differ: expected {}x{}, got {}x{}",
        .expected.width, .expected.height, .actual.width, .actual.height
    )]
    DimensionMismatch {
        /// Dimensions of the reference raster.
        expected: Dimensions,
        /// Dimensions of the offending raster.
        actual: Dimensions,
    },
}
