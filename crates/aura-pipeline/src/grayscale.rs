//! Image decoding and intensity conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGB
//! source raster, plus the single-channel intensity image that edge
//! detection works on.

use image::GrayImage;

use crate::types::{PipelineError, RgbImage};

/// Decode raw image bytes into an RGB raster.
///
/// Supports whatever the `image` crate can decode with the enabled
/// formats. Alpha is discarded.
///
/// # Errors
///
/// Returns [`PipelineError::AssetMissing`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::AssetMissing(
            "input image data is empty".to_string(),
        ));
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Convert an RGB raster to intensity.
///
/// Uses the standard luminance weighting (green brightest, blue darkest).
#[must_use = "returns the intensity image"]
pub fn to_intensity(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}
