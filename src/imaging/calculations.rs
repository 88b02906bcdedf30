//! Pure calculation functions for dimensions and sizes.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Output dimensions for fitting `original` into `max_width`.
///
/// Images already narrow enough keep their own dimensions. Wider images get
/// `max_width` and a height of `round(max_width / aspect)`, where
/// `aspect = width / height`. The result may have a zero height for extreme
/// aspect ratios; callers reject that.
///
/// ```
/// # use image_preview::imaging::{Dimensions, calculate_target_dimensions};
/// let fitted = calculate_target_dimensions(Dimensions::new(2000, 1000), 1000);
/// assert_eq!(fitted, Dimensions::new(1000, 500));
///
/// let untouched = calculate_target_dimensions(Dimensions::new(640, 480), 1000);
/// assert_eq!(untouched, Dimensions::new(640, 480));
/// ```
pub fn calculate_target_dimensions(original: Dimensions, max_width: u32) -> Dimensions {
    if original.width <= max_width {
        return original;
    }

    let aspect = original.width as f64 / original.height as f64;
    let height = (max_width as f64 / aspect).round() as u32;
    Dimensions::new(max_width, height)
}

/// Percent saved relative to the original, `(original - candidate) / original * 100`.
///
/// Negative when the candidate is larger. Zero for an empty original.
pub fn reduction_percent(original_size: usize, candidate_size: usize) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - candidate_size as f64) / original_size as f64 * 100.0
}

/// Downsampling factor applied before SSIM so that the shorter side lands near
/// 256 px. Never below 1.
pub fn ssim_downsample_factor(dims: Dimensions) -> u32 {
    let short_side = dims.width.min(dims.height) as f64;
    ((short_side / 256.0).round() as u32).max(1)
}
