//! Boundary types shared by the pipeline, the encoders and the CLI.
//!
//! [`SourceImage`] is what callers hand in; [`EncodedCandidate`] is what comes
//! back out, one per [`TargetFormat`].

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Output formats the pipeline tries, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpeg,
    WebP,
    Png,
}

impl TargetFormat {
    /// Every format, in the order results are reported.
    pub const ALL: [TargetFormat; 3] = [TargetFormat::Jpeg, TargetFormat::WebP, TargetFormat::Png];

    pub fn mime_type(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "image/jpeg",
            TargetFormat::WebP => "image/webp",
            TargetFormat::Png => "image/png",
        }
    }

    /// Human-readable label shown next to a candidate.
    pub fn label(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "JPEG",
            TargetFormat::WebP => "WebP",
            TargetFormat::Png => "PNG",
        }
    }

    /// File extension, taken from the MIME subtype.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::WebP => "webp",
            TargetFormat::Png => "png",
        }
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.mime_type().eq_ignore_ascii_case(mime.trim()))
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The caller's image: raw bytes plus the content type it was declared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    bytes: Vec<u8>,
    content_type: String,
}

impl SourceImage {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Read a file and infer its content type.
    ///
    /// The file signature wins; the extension is only consulted when the
    /// signature is unknown. Anything unrecognised is declared as
    /// `application/octet-stream` and rejected later by the pipeline.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let content_type = image::guess_format(&bytes)
            .or_else(|_| image::ImageFormat::from_path(path))
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");
        Ok(Self::new(bytes, content_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the declared type is an image type at all.
    pub fn is_image(&self) -> bool {
        self.content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

/// One encoded output, owned by the pipeline once its branch finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCandidate {
    pub format: TargetFormat,
    pub bytes: Vec<u8>,
    pub byte_size: usize,
    pub width: u32,
    pub height: u32,
    /// The output has the same MIME type as the source.
    pub is_original_format: bool,
}

impl EncodedCandidate {
    /// `"JPEG"`, or `"JPEG resized"` when the candidate keeps the source format.
    pub fn label(&self) -> String {
        if self.is_original_format {
            format!("{} resized", self.format.label())
        } else {
            self.format.label().to_string()
        }
    }

    /// Download name in the form `compressed_webp_12.3KB.webp`.
    pub fn suggested_filename(&self) -> String {
        let ext = self.format.extension();
        format!(
            "compressed_{}_{:.1}KB.{}",
            ext,
            self.byte_size as f64 / 1024.0,
            ext
        )
    }
}
