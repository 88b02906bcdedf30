//! High-level image operations.
//!
//! These functions combine calculations with backend execution: one function
//! per pipeline step, each working on a single image or a single branch.

use super::backend::{DecodeError, Dimensions, EncodeError, FormatEncoder, PixelBuffer};
use super::params::Quality;
use super::rust_backend;
use super::ssim::{QualityScore, ScoreError, score};
use crate::types::{EncodedCandidate, SourceImage, TargetFormat};

/// Report the source's dimensions from its header.
///
/// Rejects empty buffers and content types outside `image/*` before touching
/// the bytes.
pub fn probe(image: &SourceImage) -> Result<Dimensions, DecodeError> {
    if image.bytes().is_empty() {
        return Err(DecodeError::Empty);
    }
    if !image.is_image() {
        return Err(DecodeError::UnsupportedContentType(
            image.content_type().to_string(),
        ));
    }
    rust_backend::identify(image.bytes())
}

/// Encode one branch and wrap the bytes as a candidate.
pub fn encode_candidate<E: FormatEncoder + ?Sized>(
    encoder: &E,
    buffer: &PixelBuffer,
    format: TargetFormat,
    quality: Quality,
    source: &SourceImage,
) -> Result<EncodedCandidate, EncodeError> {
    let bytes = encoder.encode(buffer, format, quality)?;
    if bytes.is_empty() {
        return Err(EncodeError::Codec {
            format,
            reason: "encoder produced no bytes".into(),
        });
    }

    Ok(EncodedCandidate {
        format,
        byte_size: bytes.len(),
        bytes,
        width: buffer.width(),
        height: buffer.height(),
        is_original_format: format
            .mime_type()
            .eq_ignore_ascii_case(source.content_type().trim()),
    })
}

/// Decode a candidate's bytes back to RGBA for scoring.
pub fn decode_candidate(candidate: &EncodedCandidate) -> Result<PixelBuffer, ScoreError> {
    rust_backend::decode(&candidate.bytes)
        .map(|img| PixelBuffer::from_rgba(img.to_rgba8()))
        .map_err(|e| ScoreError::Decode {
            format: candidate.format,
            reason: e.to_string(),
        })
}

/// Decode a candidate and score it against `reference`.
pub fn score_candidate(
    reference: &PixelBuffer,
    candidate: &EncodedCandidate,
) -> Result<QualityScore, ScoreError> {
    let decoded = decode_candidate(candidate)?;
    score(reference, &decoded)
}
