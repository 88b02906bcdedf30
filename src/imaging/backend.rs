//! Encoder backend trait and shared pixel types.
//!
//! The [`FormatEncoder`] trait is the one seam every codec backend plugs into:
//! given pixels, a target format and a quality, produce bytes. The pipeline
//! only ever talks to this trait, so a backend can be swapped (or mocked)
//! without touching orchestration.
//!
//! The production implementation is
//! [`RustEncoder`](super::rust_backend::RustEncoder).

use super::params::Quality;
use crate::types::TargetFormat;
use image::RgbaImage;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The source bytes could not be turned into an image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("source image is empty")]
    Empty,
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("failed to decode image: {0}")]
    Malformed(String),
}

/// One format's encode failed. Carries the format so a failure can be reported
/// on its own without the surrounding branch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{format} encoding is not available in this build")]
    Unsupported { format: TargetFormat },
    #[error("{format}: invalid pixel buffer {width}x{height} ({len} bytes)")]
    InvalidBuffer {
        format: TargetFormat,
        width: u32,
        height: u32,
        len: usize,
    },
    #[error("{format} encode failed: {reason}")]
    Codec {
        format: TargetFormat,
        reason: String,
    },
}

impl EncodeError {
    pub fn format(&self) -> TargetFormat {
        match self {
            EncodeError::Unsupported { format }
            | EncodeError::InvalidBuffer { format, .. }
            | EncodeError::Codec { format, .. } => *format,
        }
    }

    /// Short machine-readable name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            EncodeError::Unsupported { .. } => "unsupported",
            EncodeError::InvalidBuffer { .. } => "invalid-buffer",
            EncodeError::Codec { .. } => "codec",
        }
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Decoded raster: interleaved RGBA, 8 bits per channel.
///
/// Read-only once built. The pipeline shares one of these across every encode
/// branch by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Wrap raw RGBA bytes. Returns `None` unless `data.len() == width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if data.len() != expected {
            return None;
        }
        RgbaImage::from_raw(width, height, data).map(Self::from_rgba)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    /// True when every pixel has full alpha.
    pub fn is_opaque(&self) -> bool {
        self.image.pixels().all(|p| p[3] == u8::MAX)
    }
}

/// Trait for encoder backends.
///
/// `Sync` because the pipeline calls one encoder from every rayon branch at
/// once.
pub trait FormatEncoder: Sync {
    /// Encode `buffer` as `format`. Must be deterministic for equal inputs.
    fn encode(
        &self,
        buffer: &PixelBuffer,
        format: TargetFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError>;
}

impl<E: FormatEncoder + ?Sized> FormatEncoder for &E {
    fn encode(
        &self,
        buffer: &PixelBuffer,
        format: TargetFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError> {
        (**self).encode(buffer, format, quality)
    }
}
