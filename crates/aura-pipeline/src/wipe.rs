//! Closing wipe: fade the last drawing frame into the source image from
//! the bottom up.
//!
//! At step `s` of `N` the bottom `round(s / N * H)` rows show the source
//! exactly. The `feather` rows above them ramp linearly from the drawing
//! toward the source, and everything higher shows the drawing unchanged.
//! Blending is per row: every pixel in a row shares one alpha.

use std::time::Duration;

use crate::types::{Dimensions, Frame, FramePhase, PipelineError, RevealConfig, RgbImage};

/// Rows fully revealed at `step` of `steps`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn reveal_height(step: u32, steps: u32, height: u32) -> u32 {
    if steps == 0 {
        return height;
    }
    let fraction = f64::from(step.min(steps)) / f64::from(steps);
    (fraction * f64::from(height)).round() as u32
}

/// Per-row source weight for a wipe with `reveal_height` rows revealed.
///
/// The band above the revealed rows starts at
/// `band_top = max(height - reveal_height - feather, 0)` and row `r` in it
/// gets `(r - band_top) / feather`, so the top of the band is always 0.
/// No band is applied while nothing is revealed.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn row_alphas(height: u32, reveal_height: u32, feather: u32) -> Vec<f32> {
    let revealed_from = height.saturating_sub(reveal_height);
    let band_top = revealed_from.saturating_sub(feather);
    (0..height)
        .map(|row| {
            if row >= revealed_from {
                1.0
            } else if reveal_height > 0 && feather > 0 && row >= band_top {
                (row - band_top) as f32 / feather as f32
            } else {
                0.0
            }
        })
        .collect()
}

/// Blend `frame` toward `source` row by row.
///
/// Both images must share dimensions and `alphas` must hold one entry per
/// row. Output is `round(frame * (1 - alpha) + source * alpha)`.
#[must_use = "returns the blended frame"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blend_rows(frame: &RgbImage, source: &RgbImage, alphas: &[f32]) -> RgbImage {
    let mut out = frame.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let alpha = alphas.get(y as usize).copied().unwrap_or(0.0);
        if alpha <= 0.0 {
            continue;
        }
        let Some(target) = source.get_pixel_checked(x, y) else {
            continue;
        };
        for (channel, &s) in pixel.0.iter_mut().zip(&target.0) {
            let f = f32::from(*channel);
            let blended = (f32::from(s) - f).mul_add(alpha, f);
            *channel = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// One wipe frame: `frame` blended into `source` at `step` of `steps`.
#[must_use = "returns the wipe frame"]
pub fn wipe_frame(
    frame: &RgbImage,
    source: &RgbImage,
    step: u32,
    steps: u32,
    feather: u32,
) -> RgbImage {
    let height = frame.height();
    let alphas = row_alphas(height, reveal_height(step, steps, height), feather);
    blend_rows(frame, source, &alphas)
}

/// Lazy sequence of the `steps + 1` wipe frames.
///
/// Step 0 is the drawing frame unchanged and the last step is the source.
#[derive(Debug)]
pub struct WipeSequence<'a> {
    from: RgbImage,
    source: &'a RgbImage,
    steps: u32,
    feather: u32,
    hold: Duration,
    step: u32,
    done: bool,
}

impl<'a> WipeSequence<'a> {
    /// Wipe from `from` into `source` with the step count, feather and
    /// delay in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DimensionMismatch`] if the two images
    /// differ in size, or [`PipelineError::InvalidConfig`] if
    /// `wipe_steps` is zero.
    pub fn new(
        from: RgbImage,
        source: &'a RgbImage,
        config: &RevealConfig,
    ) -> Result<Self, PipelineError> {
        let expected = Dimensions::of(source);
        let actual = Dimensions::of(&from);
        if expected != actual {
            return Err(PipelineError::DimensionMismatch { expected, actual });
        }
        if config.wipe_steps < 1 {
            return Err(PipelineError::InvalidConfig(
                "wipe_steps must be at least 1".to_string(),
            ));
        }
        Ok(Self::from_parts(from, source, config))
    }

    /// Construct without checks; callers guarantee matching dimensions
    /// and a validated config.
    pub(crate) const fn from_parts(
        from: RgbImage,
        source: &'a RgbImage,
        config: &RevealConfig,
    ) -> Self {
        Self {
            from,
            source,
            steps: config.wipe_steps,
            feather: config.feather,
            hold: config.wipe_delay,
            step: 0,
            done: false,
        }
    }

    fn remaining(&self) -> usize {
        if self.done {
            0
        } else {
            (self.steps - self.step.min(self.steps)) as usize + 1
        }
    }
}

impl Iterator for WipeSequence<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }
        let step = self.step;
        let image = wipe_frame(&self.from, self.source, step, self.steps, self.feather);
        tracing::trace!(step, steps = self.steps, "wipe frame");
        if step >= self.steps {
            self.done = true;
        } else {
            self.step += 1;
        }
        Some(Frame {
            phase: FramePhase::Wipe,
            index: step as usize,
            image,
            hold: self.hold,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for WipeSequence<'_> {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;

    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn config(wipe_steps: u32, feather: u32) -> RevealConfig {
        RevealConfig {
            wipe_steps,
            feather,
            ..RevealConfig::default()
        }
    }

    #[test]
    fn reveal_height_endpoints() {
        assert_eq!(reveal_height(0, 35, 480), 0);
        assert_eq!(reveal_height(35, 35, 480), 480);
        assert_eq!(reveal_height(1, 4, 10), 3);
        assert_eq!(reveal_height(2, 4, 10), 5);
    }

    #[test]
    fn no_band_before_reveal_starts() {
        assert!(row_alphas(50, 0, 40).iter().all(|&a| a.abs() < f32::EPSILON));
    }

    #[test]
    fn feather_band_ramps_linearly() {
        // H = 100, 20 rows revealed, 10-row band: rows 70..80 ramp.
        let alphas = row_alphas(100, 20, 10);
        assert!(alphas[..70].iter().all(|&a| a.abs() < f32::EPSILON));
        for (i, &a) in alphas[70..80].iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let expected = i as f32 / 10.0;
            assert!((a - expected).abs() < 1e-6, "row {}: {a}", 70 + i);
        }
        assert!(alphas[80..].iter().all(|&a| (a - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn band_clipped_at_top_starts_from_zero() {
        // 10 - 6 - 8 would start the band above row 0; it starts at row 0.
        let alphas = row_alphas(10, 6, 8);
        assert!(alphas[0].abs() < f32::EPSILON);
        assert!((alphas[3] - 3.0 / 8.0).abs() < 1e-6);
        assert!((alphas[4] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_feather_is_a_hard_edge() {
        let alphas = row_alphas(10, 3, 0);
        assert_eq!(&alphas[..7], &[0.0; 7]);
        assert_eq!(&alphas[7..], &[1.0; 3]);
    }

    #[test]
    fn blend_rounds_half_way() {
        let frame = RgbImage::from_pixel(1, 2, WHITE);
        let source = RgbImage::from_pixel(1, 2, BLACK);
        let out = blend_rows(&frame, &source, &[0.5, 0.25]);
        assert_eq!(out.get_pixel(0, 0), &Rgb([128, 128, 128]));
        assert_eq!(out.get_pixel(0, 1), &Rgb([191, 191, 191]));
    }

    #[test]
    fn sequence_starts_at_frame_and_ends_at_source() {
        let from = RgbImage::from_fn(8, 20, |x, _| Rgb([255, u8::try_from(x * 10).unwrap(), 0]));
        let source = RgbImage::from_fn(8, 20, |_, y| Rgb([0, 0, u8::try_from(y * 12).unwrap()]));
        let frames: Vec<_> = WipeSequence::new(from.clone(), &source, &config(7, 5))
            .unwrap()
            .collect();
        assert_eq!(frames.len(), 8);
        assert_eq!(frames[0].image, from);
        assert_eq!(frames[7].image, source);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.phase, FramePhase::Wipe);
            assert_eq!(frame.index, i);
        }
    }

    #[test]
    fn revealed_rows_grow_monotonically() {
        let from = RgbImage::from_pixel(4, 30, WHITE);
        let source = RgbImage::from_pixel(4, 30, BLACK);
        let mut last = 0;
        for frame in WipeSequence::new(from, &source, &config(10, 4)).unwrap() {
            let black_rows = (0..30)
                .filter(|&y| frame.image.get_pixel(0, y) == &BLACK)
                .count();
            assert!(black_rows >= last);
            last = black_rows;
        }
        assert_eq!(last, 30);
    }

    #[test]
    fn exact_size() {
        let img = RgbImage::new(3, 3);
        let mut wipe = WipeSequence::new(img.clone(), &img, &config(4, 2)).unwrap();
        assert_eq!(wipe.len(), 5);
        wipe.next();
        wipe.next();
        assert_eq!(wipe.len(), 3);
        assert_eq!(wipe.by_ref().count(), 3);
        assert_eq!(wipe.len(), 0);
        assert!(wipe.next().is_none());
    }

    #[test]
    fn single_step_wipe() {
        let from = RgbImage::from_pixel(2, 2, WHITE);
        let source = RgbImage::from_pixel(2, 2, BLACK);
        let frames: Vec<_> = WipeSequence::new(from.clone(), &source, &config(1, 40))
            .unwrap()
            .collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].image, from);
        assert_eq!(frames[1].image, source);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let from = RgbImage::new(4, 4);
        let source = RgbImage::new(2, 3);
        let err = WipeSequence::new(from, &source, &config(3, 1)).unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch { .. }));
    }

    #[test]
    fn rejects_zero_steps() {
        let img = RgbImage::new(2, 2);
        let err = WipeSequence::new(img.clone(), &img, &config(0, 1)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn frames_carry_wipe_delay() {
        let img = RgbImage::new(2, 2);
        let cfg = RevealConfig {
            wipe_delay: Duration::from_millis(70),
            ..config(2, 1)
        };
        let wipe = WipeSequence::new(img.clone(), &img, &cfg).unwrap();
        assert!(wipe.map(|f| f.hold).all(|h| h == Duration::from_millis(70)));
    }
}
