//! Image processing: decode, resample, encode and score.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Probe** | `image::ImageDecoder::dimensions` (header only, EXIF-oriented) |
//! | **Resample** | premultiplied Lanczos3 + unsharp mask on RGB |
//! | **Encode** | [`FormatEncoder`] → [`RustEncoder`] (`image` for JPEG and PNG, libwebp for WebP) |
//! | **Score** | mean SSIM over 11×11 luma windows |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and size math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`FormatEncoder`] trait + [`RustEncoder`]
//! - **Resample**: the [`Resampler`] engine
//! - **SSIM**: the quality metric
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod resample;
pub mod rust_backend;
pub mod ssim;

pub use backend::{DecodeError, Dimensions, EncodeError, FormatEncoder, PixelBuffer};
pub use calculations::{calculate_target_dimensions, reduction_percent};
pub use operations::{decode_candidate, encode_candidate, probe, score_candidate};
pub use params::{Quality, ResizeSpec, Sharpening};
pub use resample::{ResampleError, Resampler};
pub use rust_backend::RustEncoder;
pub use ssim::{QualityScore, ScoreError, score};
