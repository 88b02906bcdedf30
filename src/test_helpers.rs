//! Shared test utilities for the image-preview test suite.
//!
//! Synthetic images built in memory, so tests never depend on fixture files.
//! Everything here is deterministic: the same call always produces the same
//! pixels and the same encoded bytes.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = source_png(&noise_image(200, 100));
//! let buffer = gradient_buffer(64, 64);
//! ```

use crate::imaging::PixelBuffer;
use crate::types::SourceImage;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Pixel data
// =========================================================================

/// Smooth opaque gradient: red follows x, green follows y.
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

/// Opaque high-frequency noise from a fixed-seed LCG.
///
/// Hard for lossy codecs, so encoded sizes and scores actually differ
/// between formats.
pub fn noise_image(width: u32, height: u32) -> RgbaImage {
    let mut state: u32 = 0x2545_f491;
    RgbaImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        Rgba([next(), next(), next(), 255])
    })
}

pub fn gradient_buffer(width: u32, height: u32) -> PixelBuffer {
    PixelBuffer::from_rgba(gradient_image(width, height))
}

pub fn noise_buffer(width: u32, height: u32) -> PixelBuffer {
    PixelBuffer::from_rgba(noise_image(width, height))
}

// =========================================================================
// Encoded sources
// =========================================================================

fn encode(image: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => image::DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .write_to(&mut out, format)
            .unwrap(),
        _ => image.write_to(&mut out, format).unwrap(),
    }
    out.into_inner()
}

/// A gradient PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient_image(width, height), ImageFormat::Png)
}

/// A gradient JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient_image(width, height), ImageFormat::Jpeg)
}

/// A JPEG whose stored pixels are `width`x`height`, left half red and right
/// half blue, tagged with EXIF `orientation` (1-8).
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let halves = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    let jpeg = encode(&halves, ImageFormat::Jpeg);

    // Big-endian TIFF with a single IFD entry: Orientation, SHORT, count 1.
    let mut tiff = b"MM\x00\x2a\x00\x00\x00\x08\x00\x01\x01\x12\x00\x03\x00\x00\x00\x01".to_vec();
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

    let payload_len = (2 + 6 + tiff.len()) as u16;
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&payload_len.to_be_bytes());
    out.extend_from_slice(b"Exif\x00\x00");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Wrap an image as a PNG source.
pub fn source_png(image: &RgbaImage) -> SourceImage {
    SourceImage::new(encode(image, ImageFormat::Png), "image/png")
}
