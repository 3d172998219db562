//! Analysis orchestrator: preprocess -> features -> gate -> classify -> report.
//!
//! Composes trait objects so the whole flow runs against mock
//! preprocessors in tests. Each call owns its intermediate grid; the
//! analyzer holds only immutable configuration and can be shared across
//! threads.

use std::sync::LazyLock;
use std::time::Instant;

use tracing::{debug, info};

use super::classify::classify;
use super::features::extract_features;
use super::gate::ValidityGate;
use super::preprocess::{GrayscalePreprocessor, ImagePreprocessor};
use super::report::{assemble_rejection, assemble_report};
use super::types::{AnalysisOutcome, FeatureVector};
use super::upload::check_upload;
use super::AnalysisError;
use crate::config::AnalyzerConfig;

pub struct XrayAnalyzer {
    preprocessor: Box<dyn ImagePreprocessor>,
    gate: ValidityGate,
}

impl XrayAnalyzer {
    pub fn new(preprocessor: Box<dyn ImagePreprocessor>, gate: ValidityGate) -> Self {
        Self { preprocessor, gate }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            Box::new(
                GrayscalePreprocessor::with_target_size(config.target_size)
                    .with_max_input_dimension(config.max_input_dimension),
            ),
            ValidityGate::new(config.gate),
        )
    }

    pub fn gate(&self) -> &ValidityGate {
        &self.gate
    }

    /// Run the full pipeline on raw upload bytes.
    ///
    /// Undecodable bytes are an error; a decodable image that fails the
    /// validity gate is `Ok(AnalysisOutcome::Rejected)`.
    pub fn analyze(&self, image_bytes: &[u8]) -> Result<AnalysisOutcome, AnalysisError> {
        let started = Instant::now();

        // The grid is dropped as soon as the scalars are out.
        let features = {
            let grid = self.preprocessor.preprocess(image_bytes)?;
            debug!(size = grid.size(), "Grid ready");
            extract_features(&grid)?
        };

        self.analyze_features(features, started)
    }

    /// Gate, classify and report on already-extracted features.
    pub fn analyze_features(
        &self,
        features: FeatureVector,
        started: Instant,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let gate_report = self.gate.evaluate(&features);
        if !gate_report.is_admissible() {
            let rejected = assemble_rejection(&gate_report, started.elapsed());
            info!(
                reasons = ?rejected.reasons,
                elapsed = %rejected.processing_time,
                "Analysis: image rejected"
            );
            return Ok(AnalysisOutcome::Rejected(rejected));
        }

        let predictions = classify(&features);
        let report = assemble_report(&predictions, features, started.elapsed())?;

        info!(
            analysis_id = %report.analysis_id,
            primary = %report.analysis.primary_finding,
            confidence = report.confidence,
            findings = report.findings.len(),
            elapsed = %report.processing_time,
            "Analysis: complete"
        );

        Ok(AnalysisOutcome::Accepted(Box::new(report)))
    }

    /// Enforce the upload policy, then analyze.
    pub fn analyze_upload(&self, image_bytes: &[u8]) -> Result<AnalysisOutcome, AnalysisError> {
        let mime = check_upload(image_bytes)?;
        debug!(mime, bytes = image_bytes.len(), "Upload accepted");
        self.analyze(image_bytes)
    }
}

impl Default for XrayAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}

static DEFAULT_ANALYZER: LazyLock<XrayAnalyzer> = LazyLock::new(XrayAnalyzer::default);

/// Analyze with the default configuration.
pub fn analyze(image_bytes: &[u8]) -> Result<AnalysisOutcome, AnalysisError> {
    DEFAULT_ANALYZER.analyze(image_bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::thread;

    use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma};

    use super::super::preprocess::{MockImagePreprocessor, NormalizedImage};
    use super::super::types::ImageQuality;
    use super::*;
    use crate::config::{GateThresholds, TARGET_SIZE};

    fn encode(gray: GrayImage, format: ImageFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut cursor, format)
            .unwrap();
        cursor.into_inner()
    }

    fn encode_png(gray: GrayImage) -> Vec<u8> {
        encode(gray, ImageFormat::Png)
    }

    /// Full-size image of horizontal bands `band` rows tall, alternating `a` and `b`.
    fn bands(band: u32, a: u8, b: u8) -> GrayImage {
        ImageBuffer::from_fn(TARGET_SIZE, TARGET_SIZE, |_, y| {
            Luma([if (y / band) % 2 == 0 { a } else { b }])
        })
    }

    fn banded_png(band: u32, a: u8, b: u8) -> Vec<u8> {
        encode_png(bands(band, a, b))
    }

    fn labels(outcome: &AnalysisOutcome) -> Vec<(String, u8)> {
        outcome
            .report()
            .unwrap()
            .findings
            .iter()
            .map(|f| (f.condition.clone(), f.confidence))
            .collect()
    }

    // ── rejection ──

    #[test]
    fn flat_gray_is_rejected_not_error() {
        let bytes = encode_png(GrayImage::from_pixel(TARGET_SIZE, TARGET_SIZE, Luma([128])));
        let outcome = analyze(&bytes).unwrap();

        assert!(!outcome.is_valid_xray());
        let rejected = outcome.rejection().unwrap();
        assert!(rejected.reasons.contains(&"contrast".to_string()));

        let json = outcome.to_json().unwrap();
        assert_eq!(json["isValidXray"], false);
        assert!(json.get("findings").is_none());
    }

    #[test]
    fn lopsided_image_rejected_on_symmetry_only() {
        let bytes = encode_png(ImageBuffer::from_fn(TARGET_SIZE, TARGET_SIZE, |x, _| {
            Luma([if x < TARGET_SIZE / 2 { 30 } else { 220 }])
        }));
        let outcome = analyze(&bytes).unwrap();
        assert_eq!(outcome.rejection().unwrap().reasons, vec!["symmetry"]);
    }

    // ── accepted ──

    #[test]
    fn dark_high_contrast_image_reports_pneumonia_and_consolidation() {
        let outcome = analyze(&banded_png(56, 10, 120)).unwrap();
        assert!(outcome.is_valid_xray());
        assert_eq!(
            labels(&outcome),
            vec![("Pneumonia".to_string(), 82), ("Consolidation".to_string(), 72)]
        );

        let report = outcome.report().unwrap();
        assert_eq!(report.confidence, 82);
        assert_eq!(report.analysis.primary_finding, "Pneumonia");
        assert_eq!(report.analysis.additional_findings, vec!["Consolidation"]);
        assert!(!report.recommendations.is_empty());
        assert!((report.features.symmetry - 1.0).abs() < 1e-9);
    }

    #[test]
    fn busy_mid_gray_image_reports_cardiomegaly_only() {
        let outcome = analyze(&banded_png(8, 90, 160)).unwrap();
        assert_eq!(labels(&outcome), vec![("Cardiomegaly".to_string(), 68)]);
        let report = outcome.report().unwrap();
        assert_eq!(report.image_quality, ImageQuality::Good);
        assert!(report.analysis.additional_findings.is_empty());
    }

    #[test]
    fn unremarkable_image_is_normal() {
        let outcome = analyze(&banded_png(56, 100, 170)).unwrap();
        assert_eq!(labels(&outcome), vec![("Normal".to_string(), 85)]);
        let report = outcome.report().unwrap();
        assert_eq!(report.analysis.primary_finding, "Normal");
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn findings_are_sorted_and_bounded() {
        let outcome = analyze(&banded_png(56, 10, 120)).unwrap();
        let report = outcome.report().unwrap();
        assert!(report.findings.len() <= 3);
        assert!(report
            .findings
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        assert_eq!(report.confidence, report.findings[0].confidence);
    }

    #[test]
    fn analysis_is_deterministic_apart_from_id_and_time() {
        let bytes = banded_png(8, 90, 160);
        let first = analyze(&bytes).unwrap();
        let second = analyze(&bytes).unwrap();
        let (a, b) = (first.report().unwrap(), second.report().unwrap());
        assert_eq!(a.features, b.features);
        assert_eq!(a.findings, b.findings);
        assert_eq!(a.recommendations, b.recommendations);
        assert_ne!(a.analysis_id, b.analysis_id);
    }

    #[test]
    fn non_square_upload_is_stretched_and_analyzed() {
        let bytes = encode_png(ImageBuffer::from_fn(448, 300, |_, y| {
            Luma([if (y / 75) % 2 == 0 { 100 } else { 170 }])
        }));
        let outcome = analyze(&bytes).unwrap();
        assert!(outcome.is_valid_xray());
    }

    #[test]
    fn jpeg_upload_is_analyzed() {
        let bytes = encode(bands(56, 100, 170), ImageFormat::Jpeg);
        let outcome = XrayAnalyzer::default().analyze_upload(&bytes).unwrap();
        let report = outcome.report().unwrap();
        let expected = (100.0 + 170.0) / 2.0 / 255.0;
        assert!(
            (report.features.brightness - expected).abs() < 0.02,
            "brightness {}",
            report.features.brightness
        );
        assert!(report.features.contrast > 0.1);
    }

    #[test]
    fn lossless_webp_matches_png() {
        let webp = encode(bands(56, 10, 120), ImageFormat::WebP);
        let from_webp = analyze(&webp).unwrap();
        let from_png = analyze(&banded_png(56, 10, 120)).unwrap();
        assert_eq!(
            from_webp.report().unwrap().features,
            from_png.report().unwrap().features
        );
        assert_eq!(labels(&from_webp), labels(&from_png));
    }

    // ── errors ──

    #[test]
    fn oversized_dimensions_are_invalid_input() {
        let config = AnalyzerConfig {
            max_input_dimension: 128,
            ..AnalyzerConfig::default()
        };
        let err = XrayAnalyzer::from_config(&config)
            .analyze(&banded_png(56, 100, 170))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)), "got {err:?}");
    }

    #[test]
    fn garbage_bytes_are_decode_error() {
        let err = analyze(b"this is not an image at all").unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn empty_bytes_are_decode_error() {
        assert!(matches!(analyze(&[]), Err(AnalysisError::Decode(_))));
    }

    #[test]
    fn mock_failure_propagates() {
        let analyzer = XrayAnalyzer::new(
            Box::new(MockImagePreprocessor::failing()),
            ValidityGate::default(),
        );
        assert!(matches!(analyzer.analyze(&[1, 2, 3]), Err(AnalysisError::Decode(_))));
    }

    // ── seams ──

    #[test]
    fn mock_grid_flows_through_pipeline() {
        let grid = NormalizedImage::from_fn(32, |_, y| if (y / 8) % 2 == 0 { 0.05 } else { 0.45 })
            .unwrap();
        let analyzer = XrayAnalyzer::new(
            Box::new(MockImagePreprocessor::returning(grid)),
            ValidityGate::default(),
        );
        let outcome = analyzer.analyze(&[]).unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.findings[0].condition, "Pneumonia");
    }

    #[test]
    fn analyze_features_skips_preprocessing() {
        let features = FeatureVector {
            brightness: 0.7,
            contrast: 0.08,
            edge_density: 0.02,
            histogram: [0, 0, 0, 0, 0, 10, 10, 0, 0, 0],
            symmetry: 0.95,
        };
        let outcome = XrayAnalyzer::default()
            .analyze_features(features, Instant::now())
            .unwrap();
        assert_eq!(
            outcome.report().unwrap().findings[0].condition,
            "Pleural_Effusion"
        );
    }

    #[test]
    fn dark_skewed_features_yield_pneumonia_then_consolidation() {
        let features = FeatureVector {
            brightness: 0.2,
            contrast: 0.2,
            edge_density: 0.02,
            histogram: [1000, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            symmetry: 0.9,
        };
        let outcome = XrayAnalyzer::default()
            .analyze_features(features, Instant::now())
            .unwrap();
        assert_eq!(
            labels(&outcome),
            vec![("Pneumonia".to_string(), 82), ("Consolidation".to_string(), 72)]
        );
        assert_eq!(outcome.to_json().unwrap()["confidence"], 82);
    }

    #[test]
    fn stricter_gate_from_config_rejects() {
        let config = AnalyzerConfig {
            gate: GateThresholds {
                min_symmetry: 0.999_999,
                ..GateThresholds::default()
            },
            ..AnalyzerConfig::default()
        };
        let analyzer = XrayAnalyzer::from_config(&config);
        // Left edge a little darker than the rest.
        let bytes = encode_png(ImageBuffer::from_fn(TARGET_SIZE, TARGET_SIZE, |x, y| {
            let base: u8 = if x < 100 { 90 } else { 110 };
            let band: u8 = if (y / 8) % 2 == 0 { 0 } else { 60 };
            Luma([base + band])
        }));
        let outcome = analyzer.analyze(&bytes).unwrap();
        assert!(outcome.rejection().unwrap().reasons.contains(&"symmetry".to_string()));
    }

    #[test]
    fn upload_path_enforces_policy() {
        let analyzer = XrayAnalyzer::default();
        let err = analyzer.analyze_upload(b"GIF89a tiny").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));

        let outcome = analyzer.analyze_upload(&banded_png(56, 100, 170)).unwrap();
        assert!(outcome.is_valid_xray());
    }

    #[test]
    fn analyzer_is_shareable_across_threads() {
        let analyzer = Arc::new(XrayAnalyzer::default());
        let bytes = Arc::new(banded_png(8, 90, 160));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let analyzer = Arc::clone(&analyzer);
                let bytes = Arc::clone(&bytes);
                thread::spawn(move || analyzer.analyze(&bytes).unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for outcome in &results {
            assert_eq!(
                outcome.report().unwrap().findings,
                results[0].report().unwrap().findings
            );
        }
    }
}
