//! # Image Preview
//!
//! Turns one source image into a set of web-ready previews and tells you how
//! each one compares. The source is scaled down to a maximum width, encoded as
//! JPEG, WebP and PNG in parallel, and every encoding is scored for visual
//! fidelity with SSIM.
//!
//! # Architecture: Fan-Out Pipeline
//!
//! ```text
//! 1. Probe      bytes     →  Dimensions      (header only)
//! 2. Resample   bytes     →  PixelBuffer     (Lanczos3 + unsharp mask)
//! 3. Encode     buffer    →  3 candidates    (one branch per format, parallel)
//! 4. Score      candidate →  QualityScore    (SSIM, parallel)
//! ```
//!
//! Steps 1 and 2 run once and are fatal when they fail. Steps 3 and 4 run per
//! format and fail alone: a broken WebP encoder costs you the WebP candidate
//! and nothing else. See [`pipeline`] for the details.
//!
//! ```no_run
//! use image_preview::{SourceImage, generate_previews};
//!
//! let source = SourceImage::from_path("photo.jpg".as_ref())?;
//! let outcome = generate_previews(&source, 1200)?;
//! for result in &outcome.report().results {
//!     println!("{} {}", result.candidate.label(), result.quality_score);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestration: probe, resample, parallel encode and score, report |
//! | [`imaging`] | Image operations: probe, resample, encoders (libwebp for WebP), SSIM |
//! | [`types`] | Boundary types: [`SourceImage`], [`TargetFormat`], [`EncodedCandidate`] |
//! | [`config`] | `config.toml` loading and validation |
//! | [`output`] | CLI output formatting, text and JSON |
//!
//! # Design Decisions
//!
//! ## Encoder Behind a Trait
//!
//! Encoding goes through [`imaging::FormatEncoder`]. Production uses
//! [`imaging::RustEncoder`]; tests swap in a mock that records calls, fails on
//! demand or sleeps to shuffle completion order. The pipeline never knows.
//!
//! ## Pure-Rust Decoding and Resampling, libwebp for WebP
//!
//! The `image` crate handles decoding, Lanczos3 resampling and JPEG/PNG
//! encoding. Lossy WebP comes from `libwebp` through the `webp` crate, since
//! `image` only writes lossless WebP. There is no ImageMagick and no shelling
//! out.
//!
//! ## Results in a Fixed Order
//!
//! Candidates come back as JPEG, WebP, PNG regardless of which branch
//! finished first. Rayon's indexed `collect` gives this for free, so the order
//! is a property of the code and not of scheduling luck.
//!
//! ## No Candidates Is Not an Error
//!
//! When every branch fails the pipeline still returns a report, tagged
//! [`pipeline::PreviewOutcome::NoCandidates`], so callers can say "nothing
//! could be generated" and still show why.

pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod types;

pub use pipeline::{
    PipelineError, PipelineReport, PreviewOutcome, PreviewPipeline, generate_previews,
};
pub use types::{EncodedCandidate, SourceImage, TargetFormat};

#[cfg(test)]
pub(crate) mod test_helpers;
