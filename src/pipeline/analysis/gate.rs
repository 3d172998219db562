//! Validity gate: coarse "does this look like a chest X-ray" check.
//!
//! A conjunction of four fixed ranges. It rejects blank, flat-colour and
//! strongly lopsided pictures; it says nothing about medical content and
//! is not diagnostic.

use tracing::warn;

use super::types::FeatureVector;
use crate::config::GateThresholds;

/// User-facing text for a rejected upload.
pub const INVALID_XRAY_MESSAGE: &str =
    "The uploaded image does not appear to be a valid chest X-ray. Please upload a clear frontal chest X-ray image.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCheck {
    Brightness,
    Contrast,
    Symmetry,
    EdgeDensity,
}

impl GateCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Symmetry => "symmetry",
            Self::EdgeDensity => "edge_density",
        }
    }
}

/// Per-check verdicts for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateReport {
    pub valid_brightness: bool,
    pub valid_contrast: bool,
    pub valid_symmetry: bool,
    pub valid_edges: bool,
}

impl GateReport {
    pub fn is_admissible(&self) -> bool {
        self.valid_brightness && self.valid_contrast && self.valid_symmetry && self.valid_edges
    }

    pub fn failed_checks(&self) -> Vec<GateCheck> {
        [
            (self.valid_brightness, GateCheck::Brightness),
            (self.valid_contrast, GateCheck::Contrast),
            (self.valid_symmetry, GateCheck::Symmetry),
            (self.valid_edges, GateCheck::EdgeDensity),
        ]
        .into_iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, check)| check)
        .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidityGate {
    thresholds: GateThresholds,
}

impl ValidityGate {
    pub fn new(thresholds: GateThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GateThresholds {
        &self.thresholds
    }

    /// Evaluate all four checks. NaN fails every comparison it takes part in.
    pub fn evaluate(&self, features: &FeatureVector) -> GateReport {
        let t = &self.thresholds;
        let report = GateReport {
            valid_brightness: features.brightness > t.min_brightness
                && features.brightness < t.max_brightness,
            valid_contrast: features.contrast > t.min_contrast
                && features.contrast < t.max_contrast,
            valid_symmetry: features.symmetry > t.min_symmetry,
            valid_edges: features.edge_density > t.min_edge_density,
        };

        if !report.is_admissible() {
            let failed: Vec<&str> = report.failed_checks().iter().map(|c| c.as_str()).collect();
            warn!(
                brightness = features.brightness,
                contrast = features.contrast,
                symmetry = features.symmetry,
                edge_density = features.edge_density,
                failed = ?failed,
                "Image rejected by validity gate"
            );
        }

        report
    }

    pub fn admits(&self, features: &FeatureVector) -> bool {
        self.evaluate(features).is_admissible()
    }
}
