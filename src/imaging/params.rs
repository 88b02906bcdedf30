//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They sit between
//! the [`pipeline`](crate::pipeline) (which decides what to produce) and the
//! [`backend`](super::backend) / [`resample`](super::resample) modules (which do
//! the pixel work), so a backend can be swapped without touching the caller.
//!
//! ## Types
//!
//! - [`Quality`]: Encoding quality in `0.0..=1.0` (default 0.99). Clamped on construction.
//! - [`Sharpening`]: Unsharp-mask parameters applied after resampling.
//! - [`ResizeSpec`]: The maximum output width for one pipeline invocation.

use serde::{Deserialize, Serialize};

/// Quality setting for encoding, as a fraction in `0.0..=1.0`.
///
/// Codecs that think in percent get [`Quality::percent`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(f32);

impl Quality {
    /// Near-maximal quality used for every format by default.
    pub const DEFAULT: Quality = Quality(0.99);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::DEFAULT;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the 1–100 scale JPEG encoders expect.
    pub fn percent(self) -> u8 {
        ((self.0 * 100.0).round() as u8).clamp(1, 100)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Unsharp-mask parameters.
///
/// - `amount`: strength in percent (160 = add 1.6× the high-frequency detail)
/// - `radius`: sigma of the Gaussian blur the detail is measured against
/// - `threshold`: minimum per-channel difference (0–255) before a pixel is touched
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Sharpening {
    pub amount: f32,
    pub radius: f32,
    pub threshold: u8,
}

impl Sharpening {
    /// The correction applied after every resample.
    pub fn resample_correction() -> Self {
        Self {
            amount: 160.0,
            radius: 0.6,
            threshold: 1,
        }
    }

    /// Multiplier applied to the detail layer.
    pub fn gain(self) -> f32 {
        self.amount / 100.0
    }
}

impl Default for Sharpening {
    fn default() -> Self {
        Self::resample_correction()
    }
}

/// Resize constraint for one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    pub max_width: u32,
}

impl ResizeSpec {
    pub fn new(max_width: u32) -> Self {
        Self { max_width }
    }
}
