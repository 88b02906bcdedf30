//! Default encoder backend and the decode helpers shared by the pipeline.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify (header only) | `image::ImageDecoder::dimensions` + EXIF orientation |
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders), auto-oriented |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → WebP (lossy) | `webp` (libwebp) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |

use super::backend::{DecodeError, Dimensions, EncodeError, FormatEncoder, PixelBuffer};
use super::params::Quality;
use crate::types::TargetFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::metadata::Orientation;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader};
use std::io::Cursor;

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Whether `orientation` turns the stored image on its side.
fn swaps_axes(orientation: Orientation) -> bool {
    matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    )
}

/// Read the displayed width and height without decoding pixels.
///
/// EXIF orientations that rotate by a quarter turn swap the stored axes.
pub fn identify(bytes: &[u8]) -> Result<Dimensions, DecodeError> {
    let mut decoder = reader(bytes)?
        .into_decoder()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let (width, height) = decoder.dimensions();
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let dims = if swaps_axes(orientation) {
        Dimensions::new(height, width)
    } else {
        Dimensions::new(width, height)
    };
    if dims.is_empty() {
        return Err(DecodeError::Malformed(format!("image has no pixels ({dims})")));
    }
    Ok(dims)
}

/// Fully decode an image, format guessed from its signature, upright per its
/// EXIF orientation.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    let mut decoder = reader(bytes)?
        .into_decoder()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut image =
        DynamicImage::from_decoder(decoder).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Encoder backend built on the `image` crate plus libwebp.
///
/// See the [module docs](self) for the crate-to-format mapping. Formats can be
/// switched off with [`RustEncoder::with_formats`], which makes the rest fail
/// with [`EncodeError::Unsupported`] the way a runtime without that codec would.
#[derive(Debug, Clone)]
pub struct RustEncoder {
    enabled: Vec<TargetFormat>,
}

impl RustEncoder {
    pub fn new() -> Self {
        Self {
            enabled: TargetFormat::ALL.to_vec(),
        }
    }

    /// Only encode `formats`; everything else reports as unsupported.
    pub fn with_formats(formats: &[TargetFormat]) -> Self {
        Self {
            enabled: formats.to_vec(),
        }
    }

    pub fn supports(&self, format: TargetFormat) -> bool {
        self.enabled.contains(&format)
    }
}

impl Default for RustEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(buffer: &PixelBuffer, format: TargetFormat) -> Result<(), EncodeError> {
    let dims = buffer.dimensions();
    let expected = dims.area() * 4;
    if dims.is_empty() || buffer.as_raw().len() as u64 != expected {
        return Err(EncodeError::InvalidBuffer {
            format,
            width: dims.width,
            height: dims.height,
            len: buffer.as_raw().len(),
        });
    }
    Ok(())
}

/// Drop alpha by compositing onto black, as a canvas does on JPEG export.
fn flatten_onto_black(buffer: &PixelBuffer) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(buffer.as_raw().len() / 4 * 3);
    for px in buffer.as_raw().chunks_exact(4) {
        let alpha = u16::from(px[3]);
        for &c in &px[..3] {
            rgb.push(((u16::from(c) * alpha + 127) / 255) as u8);
        }
    }
    rgb
}

/// Strip the alpha channel outright. Only valid for opaque buffers.
fn strip_alpha(buffer: &PixelBuffer) -> Vec<u8> {
    buffer
        .as_raw()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}

fn encode_jpeg(buffer: &PixelBuffer, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    let rgb = flatten_onto_black(buffer);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.percent())
        .write_image(&rgb, buffer.width(), buffer.height(), ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::Codec {
            format: TargetFormat::Jpeg,
            reason: e.to_string(),
        })?;
    Ok(out)
}

fn encode_webp(buffer: &PixelBuffer, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    let encoder = webp::Encoder::from_rgba(buffer.as_raw(), buffer.width(), buffer.height());
    let memory = encoder
        .encode_simple(false, quality.value() * 100.0)
        .map_err(|e| EncodeError::Codec {
            format: TargetFormat::WebP,
            reason: format!("{e:?}"),
        })?;
    Ok(memory.to_vec())
}

/// Lossless; `quality` has nothing to tune here and is ignored.
fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Default, PngFilter::Adaptive);
    let result = if buffer.is_opaque() {
        let rgb = strip_alpha(buffer);
        encoder.write_image(&rgb, buffer.width(), buffer.height(), ExtendedColorType::Rgb8)
    } else {
        encoder.write_image(
            buffer.as_raw(),
            buffer.width(),
            buffer.height(),
            ExtendedColorType::Rgba8,
        )
    };
    result.map_err(|e| EncodeError::Codec {
        format: TargetFormat::Png,
        reason: e.to_string(),
    })?;
    Ok(out)
}

impl FormatEncoder for RustEncoder {
    fn encode(
        &self,
        buffer: &PixelBuffer,
        format: TargetFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError> {
        if !self.supports(format) {
            return Err(EncodeError::Unsupported { format });
        }
        validate(buffer, format)?;

        match format {
            TargetFormat::Jpeg => encode_jpeg(buffer, quality),
            TargetFormat::WebP => encode_webp(buffer, quality),
            TargetFormat::Png => encode_png(buffer),
        }
    }
}
