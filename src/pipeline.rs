//! Preview generation: one source image in, scored candidates out.
//!
//! ## Stages
//!
//! ```text
//! probe ──► resample ──┬─► encode JPEG ─┐      ┌─► score JPEG ─┐
//!                      ├─► encode WebP ─┼─ ─ ─►├─► score WebP ─┼─► report
//!                      └─► encode PNG  ─┘      └─► score PNG  ─┘
//! ```
//!
//! Probing and resampling run once; a failure there ends the run with a
//! [`PipelineError`]. Encoding and scoring fan out per [`TargetFormat`] and
//! every branch stands alone: a branch that fails is recorded as a
//! [`BranchFailure`] and its siblings carry on. Nothing is retried.
//!
//! ## Parallel Processing
//!
//! Both fan-outs run on the [rayon](https://docs.rs/rayon) thread pool. The
//! resampled buffer is borrowed read-only by every branch. Rayon's indexed
//! `collect` puts results back in [`TargetFormat::ALL`] order no matter which
//! branch finishes first.

use crate::config::{PreviewConfig, ScoreReference};
use crate::imaging::rust_backend::{self, RustEncoder};
use crate::imaging::{
    DecodeError, Dimensions, EncodeError, FormatEncoder, PixelBuffer, Quality, QualityScore,
    ResampleError, Resampler, ResizeSpec, ScoreError, encode_candidate, probe,
    reduction_percent, score_candidate,
};
use crate::types::{EncodedCandidate, SourceImage, TargetFormat};
use rayon::prelude::*;
use std::borrow::Cow;
use thiserror::Error;
use tracing::{debug, warn};

/// A failure that stops the whole run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Resample(#[from] ResampleError),
}

/// A candidate that encoded and scored.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewResult {
    pub candidate: EncodedCandidate,
    /// Percent saved against the source file. Negative when larger.
    pub reduction_percent: f64,
    pub quality_score: QualityScore,
}

/// Where in its branch a format failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStage {
    Encode,
    Score,
}

impl BranchStage {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchStage::Encode => "encode",
            BranchStage::Score => "score",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BranchError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Score(#[from] ScoreError),
}

/// Why one format is missing from the results.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchFailure {
    pub format: TargetFormat,
    pub error: BranchError,
    /// The encoded output when only scoring failed, for callers that can live
    /// without a score.
    pub candidate: Option<EncodedCandidate>,
}

impl BranchFailure {
    pub fn stage(&self) -> BranchStage {
        match self.error {
            BranchError::Encode(_) => BranchStage::Encode,
            BranchError::Score(_) => BranchStage::Score,
        }
    }

    /// Short machine-readable error name, e.g. `unsupported` or `decode`.
    pub fn kind(&self) -> &'static str {
        match &self.error {
            BranchError::Encode(e) => e.kind(),
            BranchError::Score(e) => e.kind(),
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Source dimensions as probed.
    pub original: Dimensions,
    /// Dimensions every candidate was encoded at.
    pub resampled: Dimensions,
    pub original_size: usize,
    pub source_content_type: String,
    /// Successful candidates in [`TargetFormat::ALL`] order.
    pub results: Vec<PreviewResult>,
    /// Failed branches in [`TargetFormat::ALL`] order.
    pub failures: Vec<BranchFailure>,
}

impl PipelineReport {
    pub fn result_for(&self, format: TargetFormat) -> Option<&PreviewResult> {
        self.results.iter().find(|r| r.candidate.format == format)
    }

    pub fn failure_for(&self, format: TargetFormat) -> Option<&BranchFailure> {
        self.failures.iter().find(|f| f.format == format)
    }

    /// The candidate that kept the source's format, if any.
    pub fn original_format_result(&self) -> Option<&PreviewResult> {
        self.results.iter().find(|r| r.candidate.is_original_format)
    }
}

/// Outcome of a run that got past resampling.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutcome {
    /// At least one candidate encoded and scored.
    Candidates(PipelineReport),
    /// Every branch failed; the report holds only diagnostics.
    NoCandidates(PipelineReport),
}

impl PreviewOutcome {
    pub fn report(&self) -> &PipelineReport {
        match self {
            PreviewOutcome::Candidates(report) | PreviewOutcome::NoCandidates(report) => report,
        }
    }

    pub fn into_report(self) -> PipelineReport {
        match self {
            PreviewOutcome::Candidates(report) | PreviewOutcome::NoCandidates(report) => report,
        }
    }

    pub fn has_candidates(&self) -> bool {
        matches!(self, PreviewOutcome::Candidates(_))
    }
}

/// The preview pipeline with its encoder backend and resampling engine.
pub struct PreviewPipeline<E: FormatEncoder = RustEncoder> {
    encoder: E,
    resampler: Resampler,
    quality: Quality,
    reference: ScoreReference,
}

impl PreviewPipeline<RustEncoder> {
    pub fn new() -> Self {
        Self::with_encoder(RustEncoder::new())
    }

    /// Build a pipeline from config values.
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new()
            .resampler(Resampler::new(config.sharpening))
            .quality(config.quality())
            .reference(config.scoring.reference)
    }
}

impl Default for PreviewPipeline<RustEncoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FormatEncoder> PreviewPipeline<E> {
    /// Use a specific encoder backend (allows testing with a mock).
    pub fn with_encoder(encoder: E) -> Self {
        Self {
            encoder,
            resampler: Resampler::default(),
            quality: Quality::default(),
            reference: ScoreReference::default(),
        }
    }

    pub fn resampler(mut self, resampler: Resampler) -> Self {
        self.resampler = resampler;
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn reference(mut self, reference: ScoreReference) -> Self {
        self.reference = reference;
        self
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Run the whole pipeline for one image.
    #[tracing::instrument(
        skip(self, image),
        fields(content_type = image.content_type(), bytes = image.byte_size())
    )]
    pub fn generate_previews(
        &self,
        image: &SourceImage,
        spec: ResizeSpec,
    ) -> Result<PreviewOutcome, PipelineError> {
        let original = probe(image)?;
        debug!(%original, "probed source");

        let decoded = rust_backend::decode(image.bytes()).map_err(ResampleError::from)?;
        let buffer = self.resampler.resample_decoded(&decoded, &spec)?;
        let resampled = buffer.dimensions();
        debug!(%resampled, max_width = spec.max_width, "resampled source");

        let reference = match self.reference {
            ScoreReference::Resampled => Cow::Borrowed(&buffer),
            ScoreReference::Original => Cow::Owned(PixelBuffer::from_rgba(decoded.to_rgba8())),
        };
        drop(decoded);

        let mut failures = Vec::new();

        let encoded: Vec<(TargetFormat, Result<EncodedCandidate, EncodeError>)> = TargetFormat::ALL
            .par_iter()
            .map(|&format| {
                let outcome = encode_candidate(&self.encoder, &buffer, format, self.quality, image);
                (format, outcome)
            })
            .collect();

        let mut candidates = Vec::with_capacity(encoded.len());
        for (format, outcome) in encoded {
            match outcome {
                Ok(candidate) => {
                    debug!(%format, bytes = candidate.byte_size, "encoded");
                    candidates.push(candidate);
                }
                Err(error) => {
                    warn!(%format, %error, "encode failed");
                    failures.push(BranchFailure {
                        format,
                        error: error.into(),
                        candidate: None,
                    });
                }
            }
        }

        let scored: Vec<(EncodedCandidate, Result<QualityScore, ScoreError>)> = candidates
            .into_par_iter()
            .map(|candidate| {
                let score = score_candidate(&reference, &candidate);
                (candidate, score)
            })
            .collect();

        let mut results = Vec::with_capacity(scored.len());
        for (candidate, score) in scored {
            let format = candidate.format;
            match score {
                Ok(quality_score) => {
                    debug!(%format, score = quality_score.value(), "scored");
                    results.push(PreviewResult {
                        reduction_percent: reduction_percent(
                            image.byte_size(),
                            candidate.byte_size,
                        ),
                        quality_score,
                        candidate,
                    });
                }
                Err(error) => {
                    warn!(%format, %error, "scoring failed");
                    failures.push(BranchFailure {
                        format,
                        error: error.into(),
                        candidate: Some(candidate),
                    });
                }
            }
        }
        failures.sort_by_key(|f| f.format);

        let report = PipelineReport {
            original,
            resampled,
            original_size: image.byte_size(),
            source_content_type: image.content_type().to_string(),
            results,
            failures,
        };

        if report.results.is_empty() {
            warn!(failures = report.failures.len(), "no candidates produced");
            Ok(PreviewOutcome::NoCandidates(report))
        } else {
            Ok(PreviewOutcome::Candidates(report))
        }
    }
}

/// Run the default pipeline: pure-Rust encoders, quality 0.99, standard
/// sharpening, scored against the resampled image.
pub fn generate_previews(
    image: &SourceImage,
    max_width: u32,
) -> Result<PreviewOutcome, PipelineError> {
    PreviewPipeline::new().generate_previews(image, ResizeSpec::new(max_width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockEncoder;
    use crate::test_helpers::{gradient_image, jpeg_with_orientation, noise_image, source_png};
    use std::time::Duration;

    fn formats(report: &PipelineReport) -> Vec<TargetFormat> {
        report.results.iter().map(|r| r.candidate.format).collect()
    }

    #[test]
    fn mock_pipeline_returns_all_formats_in_order() {
        let pipeline = PreviewPipeline::with_encoder(MockEncoder::new());
        let source = source_png(&gradient_image(300, 200));

        let outcome = pipeline
            .generate_previews(&source, ResizeSpec::new(150))
            .unwrap();
        assert!(outcome.has_candidates());

        let report = outcome.report();
        assert_eq!(formats(report), TargetFormat::ALL.to_vec());
        assert_eq!(report.original, Dimensions::new(300, 200));
        assert_eq!(report.resampled, Dimensions::new(150, 100));
        assert!(report.failures.is_empty());
    }

    #[test]
    fn every_branch_encodes_the_same_buffer() {
        let pipeline = PreviewPipeline::with_encoder(MockEncoder::new()).quality(Quality::new(0.7));
        let source = source_png(&gradient_image(400, 100));

        pipeline
            .generate_previews(&source, ResizeSpec::new(200))
            .unwrap();

        let ops = pipeline.encoder().get_operations();
        assert_eq!(ops.len(), 3);
        for op in ops {
            assert_eq!((op.width, op.height), (200, 50));
            assert_eq!(op.quality, 0.7);
        }
    }

    #[test]
    fn failed_format_is_isolated() {
        let pipeline =
            PreviewPipeline::with_encoder(MockEncoder::failing(&[TargetFormat::WebP]));
        let source = source_png(&gradient_image(64, 64));

        let report = pipeline
            .generate_previews(&source, ResizeSpec::new(64))
            .unwrap()
            .into_report();

        assert_eq!(formats(&report), vec![TargetFormat::Jpeg, TargetFormat::Png]);
        assert_eq!(report.failures.len(), 1);
        let failure = report.failure_for(TargetFormat::WebP).unwrap();
        assert_eq!(failure.stage(), BranchStage::Encode);
        assert_eq!(failure.kind(), "unsupported");
        assert!(failure.message().contains("WebP"));
        assert!(failure.candidate.is_none());
    }

    #[test]
    fn all_formats_failing_is_not_fatal() {
        let pipeline = PreviewPipeline::with_encoder(MockEncoder::failing(&TargetFormat::ALL));
        let source = source_png(&gradient_image(16, 16));

        let outcome = pipeline
            .generate_previews(&source, ResizeSpec::new(100))
            .unwrap();

        assert!(!outcome.has_candidates());
        let PreviewOutcome::NoCandidates(report) = outcome else {
            panic!("expected NoCandidates");
        };
        assert!(report.results.is_empty());
        let failed: Vec<_> = report.failures.iter().map(|f| f.format).collect();
        assert_eq!(failed, TargetFormat::ALL.to_vec());
    }

    #[test]
    fn order_is_stable_under_completion_jitter() {
        let encoder = MockEncoder::with_delays(&[
            (TargetFormat::Jpeg, Duration::from_millis(60)),
            (TargetFormat::WebP, Duration::from_millis(30)),
            (TargetFormat::Png, Duration::from_millis(0)),
        ]);
        let pipeline = PreviewPipeline::with_encoder(encoder);
        let source = source_png(&gradient_image(32, 32));

        let report = pipeline
            .generate_previews(&source, ResizeSpec::new(32))
            .unwrap()
            .into_report();
        assert_eq!(formats(&report), TargetFormat::ALL.to_vec());
    }

    #[test]
    fn original_format_is_flagged() {
        let pipeline = PreviewPipeline::with_encoder(MockEncoder::new());
        let source = source_png(&gradient_image(20, 20));

        let report = pipeline
            .generate_previews(&source, ResizeSpec::new(20))
            .unwrap()
            .into_report();
        let original = report.original_format_result().unwrap();
        assert_eq!(original.candidate.format, TargetFormat::Png);
        assert_eq!(original.candidate.label(), "PNG resized");
        assert!(!report.result_for(TargetFormat::Jpeg).unwrap().candidate.is_original_format);
    }

    #[test]
    fn reduction_is_relative_to_source_size() {
        let pipeline = PreviewPipeline::with_encoder(MockEncoder::new());
        let source = source_png(&noise_image(40, 40));

        let report = pipeline
            .generate_previews(&source, ResizeSpec::new(20))
            .unwrap()
            .into_report();
        for result in &report.results {
            let expected = reduction_percent(source.byte_size(), result.candidate.byte_size);
            assert_eq!(result.reduction_percent, expected);
        }
    }

    #[test]
    fn lossless_mock_scores_one_against_resampled() {
        let pipeline = PreviewPipeline::with_encoder(MockEncoder::new());
        let source = source_png(&noise_image(50, 40));

        let report = pipeline
            .generate_previews(&source, ResizeSpec::new(50))
            .unwrap()
            .into_report();
        for result in &report.results {
            assert!((result.quality_score.value() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn original_reference_measures_resampling_loss() {
        let source = source_png(&noise_image(120, 80));

        let against_resampled = PreviewPipeline::with_encoder(MockEncoder::new())
            .generate_previews(&source, ResizeSpec::new(60))
            .unwrap()
            .into_report();
        let against_original = PreviewPipeline::with_encoder(MockEncoder::new())
            .reference(ScoreReference::Original)
            .generate_previews(&source, ResizeSpec::new(60))
            .unwrap()
            .into_report();

        let png = TargetFormat::Png;
        let resampled_score = against_resampled.result_for(png).unwrap().quality_score;
        let original_score = against_original.result_for(png).unwrap().quality_score;
        assert!(original_score < resampled_score);
    }

    #[test]
    fn rotated_photo_is_fitted_by_displayed_width() {
        let source = SourceImage::new(jpeg_with_orientation(200, 100, 6), "image/jpeg");
        let report = PreviewPipeline::with_encoder(MockEncoder::new())
            .generate_previews(&source, ResizeSpec::new(150))
            .unwrap()
            .into_report();

        assert_eq!(report.original, Dimensions::new(100, 200));
        assert_eq!(report.resampled, Dimensions::new(100, 200));
    }

    #[test]
    fn non_image_content_type_is_fatal() {
        let mut source = source_png(&gradient_image(8, 8));
        source = SourceImage::new(source.bytes().to_vec(), "text/plain");
        let err = PreviewPipeline::with_encoder(MockEncoder::new())
            .generate_previews(&source, ResizeSpec::new(8))
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::Decode(DecodeError::UnsupportedContentType("text/plain".into()))
        );
    }

    #[test]
    fn empty_source_is_fatal() {
        let source = SourceImage::new(Vec::new(), "image/png");
        let err = generate_previews(&source, 100).unwrap_err();
        assert_eq!(err, PipelineError::Decode(DecodeError::Empty));
    }

    #[test]
    fn zero_max_width_is_fatal() {
        let source = source_png(&gradient_image(8, 8));
        let err = PreviewPipeline::with_encoder(MockEncoder::new())
            .generate_previews(&source, ResizeSpec::new(0))
            .unwrap_err();
        assert_eq!(err, PipelineError::Resample(ResampleError::ZeroMaxWidth));
    }

    #[test]
    fn encoder_errors_skip_scoring() {
        let pipeline = PreviewPipeline::with_encoder(MockEncoder::failing(&[TargetFormat::Png]));
        let source = source_png(&gradient_image(10, 10));
        let report = pipeline
            .generate_previews(&source, ResizeSpec::new(10))
            .unwrap()
            .into_report();
        assert!(report.result_for(TargetFormat::Png).is_none());
        assert_eq!(
            report.failure_for(TargetFormat::Png).unwrap().stage(),
            BranchStage::Encode
        );
    }

    /// Encoder that returns bytes no decoder accepts for one format.
    struct GarbageEncoder {
        garbage: TargetFormat,
        inner: MockEncoder,
    }

    impl FormatEncoder for GarbageEncoder {
        fn encode(
            &self,
            buffer: &PixelBuffer,
            format: TargetFormat,
            quality: Quality,
        ) -> Result<Vec<u8>, EncodeError> {
            if format == self.garbage {
                return Ok(vec![0xde, 0xad, 0xbe, 0xef]);
            }
            self.inner.encode(buffer, format, quality)
        }
    }

    #[test]
    fn scoring_failure_keeps_candidate_in_diagnostics() {
        let pipeline = PreviewPipeline::with_encoder(GarbageEncoder {
            garbage: TargetFormat::Jpeg,
            inner: MockEncoder::new(),
        });
        let source = source_png(&gradient_image(10, 10));

        let report = pipeline
            .generate_previews(&source, ResizeSpec::new(10))
            .unwrap()
            .into_report();

        assert_eq!(formats(&report), vec![TargetFormat::WebP, TargetFormat::Png]);
        let failure = report.failure_for(TargetFormat::Jpeg).unwrap();
        assert_eq!(failure.stage(), BranchStage::Score);
        assert_eq!(failure.kind(), "decode");
        assert_eq!(failure.candidate.as_ref().unwrap().byte_size, 4);
    }
}
