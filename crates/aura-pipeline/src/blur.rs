//! Gaussian smoothing for noise reduction before edge detection.
//!
//! The smoothing strength is configured as a square kernel size (3, 5,
//! 7, ...). [`sigma_for_kernel`] converts it to the standard deviation
//! that [`imageproc::filter::gaussian_blur_f32`] expects, using the usual
//! `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule so a 5×5 kernel smooths the
//! way a 5×5 Gaussian filter conventionally does.

use image::GrayImage;

/// Standard deviation matching a Gaussian kernel of side `kernel_size`.
///
/// Only meaningful for odd sizes of at least 3.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    let k = kernel_size as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Smooth a grayscale image with a Gaussian kernel of side `kernel_size`.
///
/// Kernel sizes of 0 or 1 return the image unchanged.
#[must_use = "returns the smoothed image"]
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma_for_kernel(kernel_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single bright column on black: the blur spreads it sideways.
    fn bright_column() -> GrayImage {
        GrayImage::from_fn(15, 9, |x, _| image::Luma([if x == 7 { 240 } else { 0 }]))
    }

    #[test]
    fn sigma_for_common_kernels() {
        assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-6);
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
        assert!((sigma_for_kernel(7) - 1.4).abs() < 1e-6);
    }

    #[test]
    fn sigma_grows_with_kernel() {
        assert!(sigma_for_kernel(9) > sigma_for_kernel(7));
    }

    #[test]
    fn kernel_one_and_zero_are_identity() {
        let column = bright_column();
        assert_eq!(gaussian_blur(&column, 1), column);
        assert_eq!(gaussian_blur(&column, 0), column);
    }

    #[test]
    fn keeps_dimensions() {
        let smoothed = gaussian_blur(&GrayImage::new(23, 6), 5);
        assert_eq!(smoothed.dimensions(), (23, 6));
    }

    #[test]
    fn spreads_a_bright_column() {
        let smoothed = gaussian_blur(&bright_column(), 5);
        let center = smoothed.get_pixel(7, 4).0[0];
        let neighbor = smoothed.get_pixel(8, 4).0[0];
        assert!(center < 240, "peak should drop, got {center}");
        assert!(neighbor > 0, "neighbor should brighten, got {neighbor}");
        assert!(neighbor < center);
    }

    #[test]
    fn larger_kernel_spreads_further() {
        let narrow = gaussian_blur(&bright_column(), 3);
        let wide = gaussian_blur(&bright_column(), 7);
        assert!(wide.get_pixel(7, 4).0[0] < narrow.get_pixel(7, 4).0[0]);
    }

    #[test]
    fn flat_field_stays_flat() {
        let flat = GrayImage::from_pixel(12, 12, image::Luma([77]));
        let smoothed = gaussian_blur(&flat, 7);
        assert!(
            smoothed
                .pixels()
                .all(|p| (i16::from(p.0[0]) - 77).abs() <= 1)
        );
    }
}
