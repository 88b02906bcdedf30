//! Structural similarity (SSIM) between two RGBA buffers.
//!
//! Both images are reduced to 8-bit luma, box-downsampled so the short side
//! lands near 256 px, and compared over every 11×11 window (stride 1). Window
//! sums come from integral images, so cost is linear in pixel count regardless
//! of window size. The reported value is the mean SSIM over all windows.
//!
//! ```text
//! SSIM(x, y) = (2·μx·μy + C1)(2·σxy + C2) / ((μx² + μy² + C1)(σx² + σy² + C2))
//! C1 = (K1·L)²   C2 = (K2·L)²   K1 = 0.01   K2 = 0.03   L = 255
//! ```

use super::backend::{Dimensions, PixelBuffer};
use super::calculations::ssim_downsample_factor;
use super::resample::Resampler;
use crate::types::TargetFormat;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("cannot score a {width}x{height} image")]
    ZeroArea { width: u32, height: u32 },
    #[error("reference is {reference} but candidate is {candidate}")]
    DimensionMismatch {
        reference: Dimensions,
        candidate: Dimensions,
    },
    #[error("failed to decode {format} candidate: {reason}")]
    Decode {
        format: TargetFormat,
        reason: String,
    },
}

impl ScoreError {
    /// Short machine-readable name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreError::ZeroArea { .. } => "zero-area",
            ScoreError::DimensionMismatch { .. } => "dimension-mismatch",
            ScoreError::Decode { .. } => "decode",
        }
    }
}

/// Mean SSIM, clamped to `[0, 1]`. `1.0` means identical under the metric.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct QualityScore(f64);

impl QualityScore {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Metric constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsimParams {
    pub window: u32,
    pub k1: f64,
    pub k2: f64,
    pub dynamic_range: f64,
    pub downsample: bool,
}

impl Default for SsimParams {
    fn default() -> Self {
        Self {
            window: 11,
            k1: 0.01,
            k2: 0.03,
            dynamic_range: 255.0,
            downsample: true,
        }
    }
}

/// Score `candidate` against `reference` with the default parameters.
///
/// The candidate's dimensions win: a reference of a different size is
/// resampled to match before comparison.
pub fn score(reference: &PixelBuffer, candidate: &PixelBuffer) -> Result<QualityScore, ScoreError> {
    score_with(reference, candidate, &SsimParams::default())
}

pub fn score_with(
    reference: &PixelBuffer,
    candidate: &PixelBuffer,
    params: &SsimParams,
) -> Result<QualityScore, ScoreError> {
    for dims in [reference.dimensions(), candidate.dimensions()] {
        if dims.is_empty() {
            return Err(ScoreError::ZeroArea {
                width: dims.width,
                height: dims.height,
            });
        }
    }

    if reference.dimensions() == candidate.dimensions() {
        return mean_ssim(reference, candidate, params).map(QualityScore::new);
    }

    let matched = Resampler::without_sharpening().resize_exact(reference, candidate.dimensions());
    mean_ssim(&matched, candidate, params).map(QualityScore::new)
}

/// Raw mean SSIM of two equally sized buffers. Not clamped.
pub fn mean_ssim(
    reference: &PixelBuffer,
    candidate: &PixelBuffer,
    params: &SsimParams,
) -> Result<f64, ScoreError> {
    let dims = candidate.dimensions();
    if reference.dimensions() != dims {
        return Err(ScoreError::DimensionMismatch {
            reference: reference.dimensions(),
            candidate: dims,
        });
    }
    if dims.is_empty() {
        return Err(ScoreError::ZeroArea {
            width: dims.width,
            height: dims.height,
        });
    }

    let mut x = Plane::luma(reference);
    let mut y = Plane::luma(candidate);
    if params.downsample {
        let factor = ssim_downsample_factor(dims);
        x = x.downsample(factor);
        y = y.downsample(factor);
    }

    Ok(windowed_mean(&x, &y, params))
}

/// Single-channel f64 image.
#[derive(Debug, Clone)]
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Plane {
    /// Integer Rec. 601 luma, alpha ignored.
    fn luma(buffer: &PixelBuffer) -> Self {
        let data = buffer
            .as_raw()
            .chunks_exact(4)
            .map(|px| {
                let (r, g, b) = (u32::from(px[0]), u32::from(px[1]), u32::from(px[2]));
                ((77 * r + 150 * g + 29 * b + 128) >> 8) as f64
            })
            .collect();
        Self {
            width: buffer.width() as usize,
            height: buffer.height() as usize,
            data,
        }
    }

    /// Average non-overlapping `factor`×`factor` blocks. Trailing rows and
    /// columns that don't fill a block are dropped.
    fn downsample(self, factor: u32) -> Self {
        let f = factor as usize;
        let (width, height) = (self.width / f, self.height / f);
        if f <= 1 || width == 0 || height == 0 {
            return self;
        }

        let norm = (f * f) as f64;
        let mut data = Vec::with_capacity(width * height);
        for by in 0..height {
            for bx in 0..width {
                let mut sum = 0.0;
                for row in by * f..(by + 1) * f {
                    let start = row * self.width + bx * f;
                    sum += self.data[start..start + f].iter().sum::<f64>();
                }
                data.push(sum / norm);
            }
        }
        Self {
            width,
            height,
            data,
        }
    }
}

/// Summed-area table with a zero row and column in front.
struct Integral {
    stride: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn build(width: usize, height: usize, value: impl Fn(usize) -> f64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for row in 0..height {
            let mut running = 0.0;
            for col in 0..width {
                running += value(row * width + col);
                sums[(row + 1) * stride + col + 1] = sums[row * stride + col + 1] + running;
            }
        }
        Self { stride, sums }
    }

    /// Sum over the `size`×`size` window with top-left corner `(x, y)`.
    fn window(&self, x: usize, y: usize, size: usize) -> f64 {
        let s = self.stride;
        let (x1, y1) = (x + size, y + size);
        self.sums[y1 * s + x1] - self.sums[y * s + x1] - self.sums[y1 * s + x] + self.sums[y * s + x]
    }
}

fn windowed_mean(x: &Plane, y: &Plane, params: &SsimParams) -> f64 {
    let (w, h) = (x.width, x.height);
    let size = (params.window as usize).min(w).min(h).max(1);
    let n = (size * size) as f64;

    let c1 = (params.k1 * params.dynamic_range).powi(2);
    let c2 = (params.k2 * params.dynamic_range).powi(2);

    let sx = Integral::build(w, h, |i| x.data[i]);
    let sy = Integral::build(w, h, |i| y.data[i]);
    let sxx = Integral::build(w, h, |i| x.data[i] * x.data[i]);
    let syy = Integral::build(w, h, |i| y.data[i] * y.data[i]);
    let sxy = Integral::build(w, h, |i| x.data[i] * y.data[i]);

    let mut total = 0.0;
    let mut count = 0usize;
    for top in 0..=(h - size) {
        for left in 0..=(w - size) {
            let mu_x = sx.window(left, top, size) / n;
            let mu_y = sy.window(left, top, size) / n;
            let var_x = sxx.window(left, top, size) / n - mu_x * mu_x;
            let var_y = syy.window(left, top, size) / n - mu_y * mu_y;
            let cov = sxy.window(left, top, size) / n - mu_x * mu_y;

            let numerator = (2.0 * mu_x * mu_y + c1) * (2.0 * cov + c2);
            let denominator = (mu_x * mu_x + mu_y * mu_y + c1) * (var_x + var_y + c2);
            total += numerator / denominator;
            count += 1;
        }
    }

    total / count as f64
}
