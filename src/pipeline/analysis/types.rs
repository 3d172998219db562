use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HISTOGRAM_BINS;

/// Five descriptors derived from exactly one normalized image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    /// Mean intensity, [0, 1].
    pub brightness: f64,
    /// Population standard deviation of intensities.
    pub contrast: f64,
    /// Mean Sobel gradient magnitude.
    pub edge_density: f64,
    /// Sample counts per 0.1-wide intensity bin; bin 9 includes 1.0.
    pub histogram: [u32; HISTOGRAM_BINS],
    /// 1 - |mean(left half) - mean(right half)|.
    pub symmetry: f64,
}

impl FeatureVector {
    /// Name of the first non-finite scalar, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("edge_density", self.edge_density),
            ("symmetry", self.symmetry),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }

    pub fn histogram_total(&self) -> u64 {
        self.histogram.iter().map(|&c| c as u64).sum()
    }
}

/// A condition emitted by the rule classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionPrediction {
    pub condition: String,
    /// Integer percentage, 0-100.
    pub confidence: u8,
}

impl ConditionPrediction {
    pub fn new(condition: impl Into<String>, confidence: u8) -> Self {
        Self {
            condition: condition.into(),
            confidence: confidence.min(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Coarse technical quality of the upload. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// A prediction enriched with its static description and severity tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub condition: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

/// Narrative block of an accepted report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub primary_finding: String,
    pub additional_findings: Vec<String>,
    pub summary: String,
    pub technical_notes: String,
    pub disclaimer: String,
}

/// Full result for an image that passed the validity gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub is_valid_xray: bool,
    pub confidence: u8,
    pub image_quality: ImageQuality,
    pub analysis: AnalysisSummary,
    /// At most three, confidence descending.
    pub findings: Vec<Finding>,
    /// Tied to the top finding.
    pub recommendations: Vec<Recommendation>,
    pub features: FeatureVector,
    pub processing_time: String,
    pub timestamp: DateTime<Utc>,
    pub analysis_id: String,
}

/// Negative result: the image decoded but does not look like a chest X-ray.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedAnalysis {
    pub is_valid_xray: bool,
    pub error: String,
    /// Gate checks that failed, e.g. `["contrast"]`.
    pub reasons: Vec<String>,
    pub processing_time: String,
}

/// Terminal outcome of one `analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Accepted(Box<AnalysisReport>),
    Rejected(RejectedAnalysis),
}

impl AnalysisOutcome {
    pub fn is_valid_xray(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            Self::Accepted(report) => Some(report),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&RejectedAnalysis> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(rejected) => Some(rejected),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Seconds with one decimal place, e.g. "2.3s".
pub fn format_processing_time(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}
