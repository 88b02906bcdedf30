//! CLI output formatting for preview runs.
//!
//! # Output Format
//!
//! ```text
//! Source: image/png, 2000x1000, 5859.4 KB
//! Resized to 1000x500
//!
//! Candidates
//! JPEG
//!     Size: 212.7 KB (96% smaller)
//!     SSIM: 0.9731
//!     Save as: compressed_jpeg_212.7KB.jpeg
//! PNG resized
//!     Size: 1466.2 KB (75% smaller)
//!     SSIM: 1.0000
//!     Save as: compressed_png_1466.2KB.png
//!
//! Failed
//! WebP
//!     Stage: encode (codec)
//!     Error: WebP encode failed: out of memory
//! ```
//!
//! A candidate that encoded but could not be scored is listed under `Failed`
//! with its size and `SSIM: Error`. A run where every branch failed starts
//! with `Nothing could be generated`.
//!
//! # Architecture
//!
//! [`format_report`] returns `Vec<String>` for testability and
//! [`print_report`] writes it to stdout. [`report_json`] renders the same
//! information as JSON. Format functions are pure: no I/O, no side effects.

use crate::imaging::{Dimensions, QualityScore};
use crate::pipeline::{BranchFailure, PreviewOutcome};
use crate::types::{EncodedCandidate, TargetFormat};
use serde::Serialize;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Bytes as kilobytes with one decimal.
fn format_kb(bytes: usize) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Whole-percent size change against the source.
///
/// ```text
/// 42% smaller
/// 13% larger     // candidate bigger than the source
/// ```
fn format_reduction(percent: f64) -> String {
    if percent < 0.0 {
        format!("{:.0}% larger", -percent)
    } else {
        format!("{:.0}% smaller", percent)
    }
}

fn format_score(score: Option<QualityScore>) -> String {
    match score {
        Some(s) => s.to_string(),
        None => "Error".to_string(),
    }
}

fn candidate_lines(
    candidate: &EncodedCandidate,
    reduction: f64,
    score: Option<QualityScore>,
) -> Vec<String> {
    vec![
        candidate.label(),
        format!(
            "{}Size: {} ({})",
            indent(1),
            format_kb(candidate.byte_size),
            format_reduction(reduction)
        ),
        format!("{}SSIM: {}", indent(1), format_score(score)),
        format!("{}Save as: {}", indent(1), candidate.suggested_filename()),
    ]
}

fn failure_lines(failure: &BranchFailure, original_size: usize) -> Vec<String> {
    let mut lines = vec![
        failure.format.label().to_string(),
        format!(
            "{}Stage: {} ({})",
            indent(1),
            failure.stage().as_str(),
            failure.kind()
        ),
        format!("{}Error: {}", indent(1), failure.message()),
    ];
    if let Some(candidate) = &failure.candidate {
        let reduction = crate::imaging::reduction_percent(original_size, candidate.byte_size);
        lines.push(format!(
            "{}Size: {} ({})",
            indent(1),
            format_kb(candidate.byte_size),
            format_reduction(reduction)
        ));
        lines.push(format!("{}SSIM: {}", indent(1), format_score(None)));
    }
    lines
}

/// Format a finished run for the terminal.
pub fn format_report(outcome: &PreviewOutcome) -> Vec<String> {
    let report = outcome.report();
    let mut lines = Vec::new();

    if !outcome.has_candidates() {
        lines.push("Nothing could be generated".to_string());
        lines.push(String::new());
    }

    lines.push(format!(
        "Source: {}, {}, {}",
        report.source_content_type,
        report.original,
        format_kb(report.original_size)
    ));
    lines.push(format!("Resized to {}", report.resampled));

    if !report.results.is_empty() {
        lines.push(String::new());
        lines.push("Candidates".to_string());
        for result in &report.results {
            lines.extend(candidate_lines(
                &result.candidate,
                result.reduction_percent,
                Some(result.quality_score),
            ));
        }
    }

    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for failure in &report.failures {
            lines.extend(failure_lines(failure, report.original_size));
        }
    }

    lines
}

/// Print a finished run to stdout.
pub fn print_report(outcome: &PreviewOutcome) {
    for line in format_report(outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Debug, Serialize)]
struct ReportJson<'a> {
    has_candidates: bool,
    source_content_type: &'a str,
    original: Dimensions,
    resampled: Dimensions,
    original_size: usize,
    results: Vec<CandidateJson>,
    failures: Vec<FailureJson>,
}

#[derive(Debug, Serialize)]
struct CandidateJson {
    format: TargetFormat,
    label: String,
    filename: String,
    byte_size: usize,
    width: u32,
    height: u32,
    reduction_percent: f64,
    is_original_format: bool,
    /// `null` when scoring failed.
    quality_score: Option<QualityScore>,
}

#[derive(Debug, Serialize)]
struct FailureJson {
    format: TargetFormat,
    stage: &'static str,
    kind: &'static str,
    message: String,
    /// Present when only scoring failed.
    candidate: Option<CandidateJson>,
}

fn candidate_json(
    candidate: &EncodedCandidate,
    reduction_percent: f64,
    quality_score: Option<QualityScore>,
) -> CandidateJson {
    CandidateJson {
        format: candidate.format,
        label: candidate.label(),
        filename: candidate.suggested_filename(),
        byte_size: candidate.byte_size,
        width: candidate.width,
        height: candidate.height,
        reduction_percent,
        is_original_format: candidate.is_original_format,
        quality_score,
    }
}

/// Render a finished run as pretty-printed JSON. Candidate bytes are left out.
pub fn report_json(outcome: &PreviewOutcome) -> Result<String, serde_json::Error> {
    let report = outcome.report();
    let json = ReportJson {
        has_candidates: outcome.has_candidates(),
        source_content_type: &report.source_content_type,
        original: report.original,
        resampled: report.resampled,
        original_size: report.original_size,
        results: report
            .results
            .iter()
            .map(|r| candidate_json(&r.candidate, r.reduction_percent, Some(r.quality_score)))
            .collect(),
        failures: report
            .failures
            .iter()
            .map(|f| FailureJson {
                format: f.format,
                stage: f.stage().as_str(),
                kind: f.kind(),
                message: f.message(),
                candidate: f.candidate.as_ref().map(|c| {
                    let reduction =
                        crate::imaging::reduction_percent(report.original_size, c.byte_size);
                    candidate_json(c, reduction, None)
                }),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{EncodeError, ScoreError};
    use crate::pipeline::{PipelineReport, PreviewResult};

    fn candidate(format: TargetFormat, byte_size: usize, original: bool) -> EncodedCandidate {
        EncodedCandidate {
            format,
            bytes: vec![0; byte_size],
            byte_size,
            width: 1000,
            height: 500,
            is_original_format: original,
        }
    }

    fn result(format: TargetFormat, byte_size: usize, reduction: f64, score: f64) -> PreviewResult {
        PreviewResult {
            candidate: candidate(format, byte_size, format == TargetFormat::Png),
            reduction_percent: reduction,
            quality_score: QualityScore::new(score),
        }
    }

    fn report(results: Vec<PreviewResult>, failures: Vec<BranchFailure>) -> PipelineReport {
        PipelineReport {
            original: Dimensions::new(2000, 1000),
            resampled: Dimensions::new(1000, 500),
            original_size: 10240,
            source_content_type: "image/png".to_string(),
            results,
            failures,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn format_kb_one_decimal() {
        assert_eq!(format_kb(1024), "1.0 KB");
        assert_eq!(format_kb(1536), "1.5 KB");
        assert_eq!(format_kb(0), "0.0 KB");
    }

    #[test]
    fn format_reduction_whole_percent() {
        assert_eq!(format_reduction(42.4), "42% smaller");
        assert_eq!(format_reduction(0.0), "0% smaller");
    }

    #[test]
    fn format_reduction_negative_is_larger() {
        assert_eq!(format_reduction(-12.6), "13% larger");
    }

    #[test]
    fn format_score_four_decimals_or_error() {
        assert_eq!(format_score(Some(QualityScore::new(0.98765))), "0.9877");
        assert_eq!(format_score(None), "Error");
    }

    // =========================================================================
    // Text report
    // =========================================================================

    #[test]
    fn report_lists_candidates_in_order() {
        let outcome = PreviewOutcome::Candidates(report(
            vec![
                result(TargetFormat::Jpeg, 2048, 80.0, 0.97),
                result(TargetFormat::WebP, 1024, 90.0, 0.96),
                result(TargetFormat::Png, 5120, 50.0, 1.0),
            ],
            vec![],
        ));
        let lines = format_report(&outcome);

        assert_eq!(lines[0], "Source: image/png, 2000x1000, 10.0 KB");
        assert_eq!(lines[1], "Resized to 1000x500");
        assert_eq!(lines[3], "Candidates");
        assert_eq!(lines[4], "JPEG");
        assert_eq!(lines[5], "    Size: 2.0 KB (80% smaller)");
        assert_eq!(lines[6], "    SSIM: 0.9700");
        assert_eq!(lines[7], "    Save as: compressed_jpeg_2.0KB.jpeg");
        assert_eq!(lines[8], "WebP");
        assert_eq!(lines[12], "PNG resized");
        assert!(!lines.contains(&"Failed".to_string()));
    }

    #[test]
    fn report_shows_encode_failure() {
        let outcome = PreviewOutcome::Candidates(report(
            vec![result(TargetFormat::Jpeg, 2048, 80.0, 0.97)],
            vec![BranchFailure {
                format: TargetFormat::WebP,
                error: EncodeError::Unsupported {
                    format: TargetFormat::WebP,
                }
                .into(),
                candidate: None,
            }],
        ));
        let lines = format_report(&outcome);
        let failed = lines.iter().position(|l| l == "Failed").unwrap();

        assert_eq!(lines[failed + 1], "WebP");
        assert_eq!(lines[failed + 2], "    Stage: encode (unsupported)");
        assert_eq!(
            lines[failed + 3],
            "    Error: WebP encoding is not available in this build"
        );
        assert_eq!(lines.len(), failed + 4);
    }

    #[test]
    fn score_failure_shows_size_and_error_score() {
        let outcome = PreviewOutcome::Candidates(report(
            vec![result(TargetFormat::Png, 5120, 50.0, 1.0)],
            vec![BranchFailure {
                format: TargetFormat::Jpeg,
                error: ScoreError::Decode {
                    format: TargetFormat::Jpeg,
                    reason: "truncated".into(),
                }
                .into(),
                candidate: Some(candidate(TargetFormat::Jpeg, 15360, false)),
            }],
        ));
        let lines = format_report(&outcome);
        let failed = lines.iter().position(|l| l == "Failed").unwrap();

        assert_eq!(lines[failed + 2], "    Stage: score (decode)");
        assert_eq!(lines[failed + 4], "    Size: 15.0 KB (50% larger)");
        assert_eq!(lines[failed + 5], "    SSIM: Error");
    }

    #[test]
    fn no_candidates_has_distinct_header() {
        let failures = TargetFormat::ALL
            .iter()
            .map(|&format| BranchFailure {
                format,
                error: EncodeError::Unsupported { format }.into(),
                candidate: None,
            })
            .collect();
        let outcome = PreviewOutcome::NoCandidates(report(vec![], failures));
        let lines = format_report(&outcome);

        assert_eq!(lines[0], "Nothing could be generated");
        assert!(!lines.contains(&"Candidates".to_string()));
        assert_eq!(lines.iter().filter(|l| l.starts_with("    Stage:")).count(), 3);
    }

    // =========================================================================
    // JSON report
    // =========================================================================

    #[test]
    fn json_report_has_results_and_failures() {
        let outcome = PreviewOutcome::Candidates(report(
            vec![result(TargetFormat::Jpeg, 2048, 80.0, 0.97)],
            vec![BranchFailure {
                format: TargetFormat::Png,
                error: ScoreError::ZeroArea {
                    width: 0,
                    height: 0,
                }
                .into(),
                candidate: Some(candidate(TargetFormat::Png, 4096, true)),
            }],
        ));
        let json: serde_json::Value =
            serde_json::from_str(&report_json(&outcome).unwrap()).unwrap();

        assert_eq!(json["has_candidates"], true);
        assert_eq!(json["original"]["width"], 2000);
        assert_eq!(json["resampled"]["height"], 500);

        let jpeg = &json["results"][0];
        assert_eq!(jpeg["format"], "jpeg");
        assert_eq!(jpeg["label"], "JPEG");
        assert_eq!(jpeg["filename"], "compressed_jpeg_2.0KB.jpeg");
        assert_eq!(jpeg["quality_score"], 0.97);
        assert!(jpeg.get("bytes").is_none());

        let png = &json["failures"][0];
        assert_eq!(png["format"], "png");
        assert_eq!(png["stage"], "score");
        assert_eq!(png["kind"], "zero-area");
        assert_eq!(png["candidate"]["label"], "PNG resized");
        assert!(png["candidate"]["quality_score"].is_null());
    }

    #[test]
    fn json_report_flags_no_candidates() {
        let outcome = PreviewOutcome::NoCandidates(report(vec![], vec![]));
        let json: serde_json::Value =
            serde_json::from_str(&report_json(&outcome).unwrap()).unwrap();
        assert_eq!(json["has_candidates"], false);
        assert_eq!(json["results"].as_array().unwrap().len(), 0);
    }
}
