//! Resampling engine: decode, fit to width, sharpen.
//!
//! One [`Resampler`] value owns the filter and sharpening settings. Callers
//! build it once and hand it to the pipeline; nothing here is global.

use super::backend::{DecodeError, Dimensions, PixelBuffer};
use super::calculations::calculate_target_dimensions;
use super::params::{ResizeSpec, Sharpening};
use super::rust_backend;
use crate::types::SourceImage;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResampleError {
    #[error("cannot resample: {0}")]
    Decode(#[from] DecodeError),
    #[error("max width must be at least 1 pixel")]
    ZeroMaxWidth,
    #[error("computed target size {width}x{height} is empty")]
    InvalidGeometry { width: u32, height: u32 },
}

/// High-quality resize with an unsharp-mask correction pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resampler {
    filter: FilterType,
    sharpening: Option<Sharpening>,
}

impl Resampler {
    /// Lanczos3 followed by `sharpening`.
    pub fn new(sharpening: Sharpening) -> Self {
        Self {
            filter: FilterType::Lanczos3,
            sharpening: Some(sharpening),
        }
    }

    /// Lanczos3 with no correction pass.
    pub fn without_sharpening() -> Self {
        Self {
            filter: FilterType::Lanczos3,
            sharpening: None,
        }
    }

    pub fn sharpening(&self) -> Option<Sharpening> {
        self.sharpening
    }

    /// Decode `image` and fit it to `spec`.
    pub fn resample(
        &self,
        image: &SourceImage,
        spec: &ResizeSpec,
    ) -> Result<PixelBuffer, ResampleError> {
        let decoded = rust_backend::decode(image.bytes())?;
        self.resample_decoded(&decoded, spec)
    }

    /// Fit an already decoded image to `spec`.
    ///
    /// Images narrower than `spec.max_width` still go through the full
    /// resample + sharpen pass at their own size, so every candidate starts
    /// from the same kind of raster.
    pub fn resample_decoded(
        &self,
        decoded: &DynamicImage,
        spec: &ResizeSpec,
    ) -> Result<PixelBuffer, ResampleError> {
        if spec.max_width == 0 {
            return Err(ResampleError::ZeroMaxWidth);
        }

        let original = Dimensions::new(decoded.width(), decoded.height());
        if original.is_empty() {
            return Err(ResampleError::InvalidGeometry {
                width: original.width,
                height: original.height,
            });
        }

        let target = calculate_target_dimensions(original, spec.max_width);
        if target.is_empty() {
            return Err(ResampleError::InvalidGeometry {
                width: target.width,
                height: target.height,
            });
        }

        let mut rgba = decoded.to_rgba8();
        premultiply(&mut rgba);
        let resized = imageops::resize(&rgba, target.width, target.height, self.filter);
        let finished = match self.sharpening {
            Some(sharpening) => unsharp_mask(&resized, sharpening),
            None => unpremultiplied(resized),
        };

        Ok(PixelBuffer::from_rgba(finished))
    }

    /// Plain resize to exact dimensions, no sharpening. Used to bring a
    /// reference image to a candidate's size before scoring.
    pub fn resize_exact(&self, buffer: &PixelBuffer, target: Dimensions) -> PixelBuffer {
        if buffer.dimensions() == target {
            return buffer.clone();
        }
        let mut rgba = buffer.as_rgba().clone();
        premultiply(&mut rgba);
        let resized = imageops::resize(&rgba, target.width, target.height, self.filter);
        PixelBuffer::from_rgba(unpremultiplied(resized))
    }
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(Sharpening::resample_correction())
    }
}

/// Scale colour by alpha so filters never pull in the colour of transparent
/// pixels.
fn premultiply(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let a = u16::from(px[3]);
        for c in 0..3 {
            px[c] = ((u16::from(px[c]) * a + 127) / 255) as u8;
        }
    }
}

/// Straight colour of one premultiplied channel. Fully transparent pixels
/// come out black.
fn unpremultiply_channel(value: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        return 0;
    }
    let (v, a) = (u32::from(value), u32::from(alpha));
    ((v * 255 + a / 2) / a).min(255) as u8
}

fn unpremultiplied(mut image: RgbaImage) -> RgbaImage {
    for px in image.pixels_mut() {
        let a = px[3];
        for c in 0..3 {
            px[c] = unpremultiply_channel(px[c], a);
        }
    }
    image
}

/// Sharpen the colour channels of a premultiplied image against a
/// Gaussian-blurred copy and return it with straight alpha.
///
/// Both the pixel and its blurred neighbourhood are compared in straight
/// colour, so transparent surroundings don't darken visible edges. Alpha is
/// left as it is.
fn unsharp_mask(image: &RgbaImage, sharpening: Sharpening) -> RgbaImage {
    if sharpening.amount <= 0.0 || sharpening.radius <= 0.0 {
        return unpremultiplied(image.clone());
    }

    let blurred = imageops::blur(image, sharpening.radius);
    let gain = sharpening.gain();
    let threshold = i32::from(sharpening.threshold);

    let mut out = image.clone();
    for (px, soft) in out.pixels_mut().zip(blurred.pixels()) {
        let alpha = px[3];
        for c in 0..3 {
            let sharp = unpremultiply_channel(px[c], alpha);
            let smooth = unpremultiply_channel(soft[c], soft[3]);
            let diff = i32::from(sharp) - i32::from(smooth);
            px[c] = if alpha > 0 && diff.abs() > threshold {
                let sharpened = f32::from(sharp) + gain * diff as f32;
                sharpened.round().clamp(0.0, 255.0) as u8
            } else {
                sharp
            };
        }
    }
    out
}
