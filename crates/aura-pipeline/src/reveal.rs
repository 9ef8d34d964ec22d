//! Reveal compositing: show quantized color under the stroke mask.
//!
//! Revealed pixels take exactly the quantized color and all others take
//! exactly the canvas value.

use image::{GrayImage, Rgb};

use crate::raster::Sketch;
use crate::segment::QuantizedImage;
use crate::types::RgbImage;

/// Quantized color where the mask is set, black elsewhere.
#[must_use = "returns the masked color layer"]
pub fn masked_color_layer(mask: &GrayImage, quantized: &RgbImage) -> RgbImage {
    RgbImage::from_fn(quantized.width(), quantized.height(), |x, y| {
        if mask.get_pixel_checked(x, y).is_some_and(|m| m.0[0] != 0) {
            *quantized.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Composite a sketch over quantized color into a displayable frame.
///
/// The frame has the canvas dimensions. Pure function of its inputs.
#[must_use = "returns the composited frame"]
pub fn compose(sketch: &Sketch, quantized: &QuantizedImage) -> RgbImage {
    let canvas = sketch.canvas().image();
    let mask = sketch.mask().image();
    let color = quantized.image();
    let mut frame = canvas.clone();
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        let revealed = mask.get_pixel_checked(x, y).is_some_and(|m| m.0[0] != 0);
        if let (true, Some(c)) = (revealed, color.get_pixel_checked(x, y)) {
            *pixel = *c;
        }
    }
    frame
}
