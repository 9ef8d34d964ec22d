//! aura: render a sketch-then-reveal animation as a PNG frame sequence.
//!
//! Reads an image, draws its edges stroke by stroke while revealing
//! quantized color underneath, then wipes into the original. Every frame
//! is written to the output directory as `frame-NNNNN.png`, ready for an
//! encoder such as `ffmpeg -framerate 33 -i frame-%05d.png`.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin aura -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Logging goes to stderr and honors `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use aura_pipeline::diagnostics::SystemClock;
use aura_pipeline::{
    ContourFidelity, Frame, FrameSink, PipelineError, RevealConfig, RunOutcome,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Animate an image as a pen sketch that reveals its colors.
#[derive(Parser)]
#[command(name = "aura", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Directory the PNG frames are written to (created if missing).
    #[arg(long, default_value = "frames")]
    out_dir: PathBuf,

    /// Number of dominant colors.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_CLUSTER_COUNT)]
    clusters: usize,

    /// Maximum k-means iterations per attempt.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_CLUSTER_MAX_ITERATIONS)]
    cluster_iterations: u32,

    /// k-means early-stop distance in RGB units.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_CLUSTER_EPSILON)]
    cluster_epsilon: f32,

    /// k-means attempts; the most compact wins.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_CLUSTER_ATTEMPTS)]
    cluster_attempts: u32,

    /// Seed for k-means initial centers.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_CLUSTER_SEED)]
    seed: u64,

    /// Gaussian smoothing kernel size (odd; 1 disables smoothing).
    #[arg(long, default_value_t = RevealConfig::DEFAULT_BLUR_KERNEL_SIZE)]
    blur_kernel: u32,

    /// Canny low threshold.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_GRADIENT_LOW)]
    gradient_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_GRADIENT_HIGH)]
    gradient_high: f32,

    /// Collapse straight contour runs before stroking.
    #[arg(long)]
    simplify: bool,

    /// Connect every N-th contour point.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_POINT_SKIP)]
    point_skip: usize,

    /// Pen line width in pixels.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_STROKE_WIDTH)]
    stroke_width: u32,

    /// Color reveal width in pixels (must exceed the stroke width).
    #[arg(long, default_value_t = RevealConfig::DEFAULT_MASK_WIDTH)]
    mask_width: u32,

    /// Strokes drawn between frames.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Steps in the closing wipe.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_WIPE_STEPS)]
    wipe_steps: u32,

    /// Height of the wipe's soft edge in rows.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_FEATHER)]
    feather: u32,

    /// Drawing frame display time in milliseconds.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_DRAW_DELAY_MS)]
    draw_delay_ms: u64,

    /// Wipe frame display time in milliseconds.
    #[arg(long, default_value_t = RevealConfig::DEFAULT_WIPE_DELAY_MS)]
    wipe_delay_ms: u64,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Sleep each frame's display time after writing it.
    #[arg(long)]
    realtime: bool,

    /// Stop after writing this many frames.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_frames: Option<usize>,

    /// Print per-stage diagnostics after the run.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long, requires = "diagnostics")]
    json: bool,
}

impl Cli {
    fn config(&self) -> Result<RevealConfig, String> {
        if let Some(ref json) = self.config_json {
            return serde_json::from_str(json).map_err(|e| format!("Invalid --config-json: {e}"));
        }
        Ok(RevealConfig {
            cluster_count: self.clusters,
            cluster_max_iterations: self.cluster_iterations,
            cluster_epsilon: self.cluster_epsilon,
            cluster_attempts: self.cluster_attempts,
            cluster_seed: self.seed,
            blur_kernel_size: self.blur_kernel,
            gradient_low: self.gradient_low,
            gradient_high: self.gradient_high,
            contour_fidelity: if self.simplify {
                ContourFidelity::Simplified
            } else {
                ContourFidelity::Full
            },
            point_skip: self.point_skip,
            stroke_width: self.stroke_width,
            mask_width: self.mask_width,
            batch_size: self.batch_size,
            wipe_steps: self.wipe_steps,
            feather: self.feather,
            draw_delay: Duration::from_millis(self.draw_delay_ms),
            wipe_delay: Duration::from_millis(self.wipe_delay_ms),
            ..RevealConfig::default()
        })
    }
}

/// [`FrameSink`] writing numbered PNG files.
struct PngSink {
    out_dir: PathBuf,
    realtime: bool,
    max_frames: Option<usize>,
    written: usize,
    error: Option<image::ImageError>,
}

impl PngSink {
    fn new(out_dir: &Path, realtime: bool, max_frames: Option<usize>) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
            realtime,
            max_frames,
            written: 0,
            error: None,
        }
    }
}

impl FrameSink for PngSink {
    fn emit(&mut self, frame: Frame) -> ControlFlow<()> {
        let path = self.out_dir.join(format!("frame-{:05}.png", self.written));
        if let Err(e) = frame.image.save(&path) {
            tracing::error!(path = %path.display(), "failed to write frame: {e}");
            self.error = Some(e);
            return ControlFlow::Break(());
        }
        self.written += 1;
        tracing::debug!(
            path = %path.display(),
            phase = ?frame.phase,
            index = frame.index,
            "frame written"
        );

        if self.realtime {
            std::thread::sleep(frame.hold);
        }
        if self.max_frames.is_some_and(|max| self.written >= max) {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn finish(&mut self, outcome: &RunOutcome) {
        tracing::info!(
            frames = self.written,
            out_dir = %self.out_dir.display(),
            completed = outcome.is_completed(),
            "frames written"
        );
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>, PipelineError> {
    std::fs::read(path)
        .map_err(|e| PipelineError::AssetMissing(format!("{}: {e}", path.display())))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match cli.config() {
        Ok(config) => config,
        Err(msg) => {
            tracing::error!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!("{e}");
        return ExitCode::FAILURE;
    }

    let image_bytes = match read_image(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        image = %cli.image_path.display(),
        bytes = image_bytes.len(),
        "image loaded"
    );
    tracing::debug!(?config, "pipeline config");

    if let Err(e) = std::fs::create_dir_all(&cli.out_dir) {
        tracing::error!("Error creating {}: {e}", cli.out_dir.display());
        return ExitCode::FAILURE;
    }

    let mut sink = PngSink::new(&cli.out_dir, cli.realtime, cli.max_frames);

    if cli.diagnostics {
        let diagnostics = match aura_pipeline::diagnostics::run_with_diagnostics(
            &image_bytes,
            &config,
            &SystemClock,
            &mut sink,
        ) {
            Ok(diagnostics) => diagnostics,
            Err(e) => {
                tracing::error!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        };
        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    tracing::error!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }
    } else if let Err(e) = aura_pipeline::run_bytes(&image_bytes, config, &mut sink) {
        tracing::error!("Pipeline error: {e}");
        return ExitCode::FAILURE;
    }

    if sink.error.is_some() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
