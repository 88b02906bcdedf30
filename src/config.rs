//! Preview configuration.
//!
//! Loaded from an optional `config.toml`. Every key has a default, so a file
//! only needs the values it wants to change. Unknown keys are rejected to catch
//! typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! max_width = 1200          # Widest allowed output, in pixels
//!
//! [encoding]
//! quality = 0.99            # 0.0 - 1.0, applied to every format
//!
//! [sharpening]
//! amount = 160.0            # Unsharp-mask strength, percent
//! radius = 0.6              # Gaussian sigma
//! threshold = 1             # Minimum difference (0-255) before sharpening
//!
//! [scoring]
//! reference = "resampled"   # "resampled" or "original"
//!
//! [processing]
//! max_threads = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```

use crate::imaging::{Quality, Sharpening};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything one preview run can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Images wider than this are scaled down to it.
    pub max_width: u32,
    /// Encoder settings shared by every format.
    pub encoding: EncodingConfig,
    /// Correction pass applied after resampling.
    pub sharpening: Sharpening,
    /// What candidates are compared against.
    pub scoring: ScoringConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_width: 1200,
            encoding: EncodingConfig::default(),
            sharpening: Sharpening::resample_correction(),
            scoring: ScoringConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl PreviewConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_width == 0 {
            return Err(ConfigError::Validation(
                "max_width must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.encoding.quality) {
            return Err(ConfigError::Validation(
                "encoding.quality must be between 0.0 and 1.0".into(),
            ));
        }
        if self.sharpening.amount.is_nan() || self.sharpening.amount < 0.0 {
            return Err(ConfigError::Validation(
                "sharpening.amount must not be negative".into(),
            ));
        }
        if self.sharpening.radius.is_nan() || self.sharpening.radius < 0.0 {
            return Err(ConfigError::Validation(
                "sharpening.radius must not be negative".into(),
            ));
        }
        if self.processing.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.encoding.quality)
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// Fraction in `0.0..=1.0`. PNG ignores it.
    pub quality: f32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            quality: Quality::DEFAULT.value(),
        }
    }
}

/// Which image candidates are scored against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreReference {
    /// The resampled buffer the candidates were encoded from. Measures
    /// encoding loss only.
    #[default]
    Resampled,
    /// The freshly decoded source, resampled to candidate size. Measures
    /// resampling and encoding loss together.
    Original,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub reference: ScoreReference,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_threads
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<PreviewConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: PreviewConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// A documented `config.toml` with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r##"# image-preview configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Images wider than this are scaled down to it, keeping their aspect ratio.
# Narrower images keep their size but still go through the resample pass.
max_width = 1200

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# Quality from 0.0 (smallest) to 1.0 (best), used for JPEG and WebP.
# PNG is lossless and ignores it.
quality = 0.99

# ---------------------------------------------------------------------------
# Sharpening after resample (unsharp mask)
# ---------------------------------------------------------------------------
[sharpening]
# Strength in percent of the detail layer added back.
amount = 160.0
# Gaussian sigma of the blur the detail is measured against.
radius = 0.6
# Per-channel difference (0-255) below which pixels are left alone.
threshold = 1

# ---------------------------------------------------------------------------
# Quality scoring (SSIM)
# ---------------------------------------------------------------------------
[scoring]
# "resampled": compare against the resized image the candidates came from.
# "original":  compare against the source image, scaled to candidate size.
reference = "resampled"

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of parallel workers. Omit for auto (= number of CPU cores).
# Values above the core count are clamped down.
# max_threads = 4
"##
}
