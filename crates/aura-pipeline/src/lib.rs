//! aura-pipeline: sketch-then-reveal animation pipeline (sans-IO).
//!
//! Turns a still image into an animated frame sequence:
//! color quantization + edge extraction -> contour tracing -> paced
//! stroke drawing with color revealed under the strokes -> feathered
//! bottom-up wipe into the true-color source.
//!
//! This crate has **no I/O dependencies**: it works on in-memory rasters
//! or encoded bytes and hands frames to a caller-supplied [`FrameSink`].
//! Pacing is a hint on each [`Frame`]; the pipeline never sleeps.

pub mod blur;
pub mod canny;
pub mod contour;
pub mod diagnostics;
pub mod edge;
pub mod grayscale;
pub mod pipeline;
pub mod raster;
pub mod reveal;
pub mod segment;
pub mod simplify;
pub mod stroke;
pub mod types;
pub mod wipe;

pub use contour::{ContourFidelity, ContourTracer, ContourTracerKind};
pub use pipeline::{Analysis, FrameSink, Frames, RunOutcome, drive};
pub use raster::{Canvas, RevealMask, Sketch};
pub use segment::{ClusterParams, ColorClusterer, ColorClustererKind, QuantizedImage};
pub use stroke::{StrokePlan, StrokeSequencer};
pub use types::{
    Contour, Dimensions, Frame, FramePhase, GrayImage, PipelineError, Point, RevealConfig,
    RgbImage, StrokeEvent,
};
pub use wipe::WipeSequence;

/// Run the whole animation for a decoded image.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Quantize colors (pluggable clusterer)
/// 3. Extract edges: intensity, Gaussian smoothing, Canny
/// 4. Trace outer contours (pluggable tracer)
/// 5. Draw strokes, emitting a revealed frame every `batch_size` events
/// 6. Wipe the last drawing frame into the source
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if a parameter is out of
/// range. No frame is emitted in that case.
pub fn run<S: FrameSink + ?Sized>(
    image: RgbImage,
    config: RevealConfig,
    sink: &mut S,
) -> Result<RunOutcome, PipelineError> {
    let analysis = Analysis::new(image, config)?;
    Ok(drive(analysis.frames(), sink))
}

/// Decode `image_bytes` (PNG, JPEG, BMP, WebP, ...) and [`run`] it.
///
/// The configuration is checked before decoding.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an out-of-range
/// parameter, [`PipelineError::AssetMissing`] if `image_bytes` is empty,
/// or [`PipelineError::ImageDecode`] if the format is unrecognized.
pub fn run_bytes<S: FrameSink + ?Sized>(
    image_bytes: &[u8],
    config: RevealConfig,
    sink: &mut S,
) -> Result<RunOutcome, PipelineError> {
    config.validate()?;
    let image = grayscale::decode(image_bytes)?;
    run(image, config, sink)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    /// Left half black, right half white: one strong vertical edge.
    fn sharp_edge_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn run_bytes_empty_input() {
        let mut frames: Vec<Frame> = Vec::new();
        let result = run_bytes(&[], RevealConfig::default(), &mut frames);
        assert!(matches!(result, Err(PipelineError::AssetMissing(_))));
    }

    #[test]
    fn run_bytes_corrupt_input() {
        let mut frames: Vec<Frame> = Vec::new();
        let result = run_bytes(&[0xFF, 0x00], RevealConfig::default(), &mut frames);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
        assert!(frames.is_empty());
    }

    #[test]
    fn run_bytes_checks_config_first() {
        let config = RevealConfig {
            point_skip: 0,
            ..RevealConfig::default()
        };
        let mut frames: Vec<Frame> = Vec::new();
        let result = run_bytes(&[0xFF, 0x00], config, &mut frames);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn sharp_edge_is_sketched_then_revealed() {
        let png = encode_png(&sharp_edge_image(40, 40));
        let mut frames: Vec<Frame> = Vec::new();
        let outcome = run_bytes(&png, RevealConfig::default(), &mut frames).unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.frames(), frames.len());
        assert!(frames.iter().any(|f| f.phase == FramePhase::Drawing));
        assert_eq!(
            frames
                .iter()
                .filter(|f| f.phase == FramePhase::Wipe)
                .count(),
            36
        );
        assert_eq!(frames.last().unwrap().image, sharp_edge_image(40, 40));
    }

    #[test]
    fn uniform_image_runs_wipe_only() {
        let image = RgbImage::from_pixel(20, 20, image::Rgb([128, 128, 128]));
        let mut frames: Vec<Frame> = Vec::new();
        let outcome = run(image, RevealConfig::default(), &mut frames).unwrap();
        assert_eq!(outcome, RunOutcome::Completed { frames: 36 });
        assert!(frames.iter().all(|f| f.phase == FramePhase::Wipe));
    }
}
