use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::classify::NORMAL_CONDITION;
use super::gate::{GateReport, INVALID_XRAY_MESSAGE};
use super::knowledge::{condition_info, display_name, recommendations_for, DISCLAIMER};
use super::types::{
    format_processing_time, AnalysisReport, AnalysisSummary, ConditionPrediction, FeatureVector,
    Finding, ImageQuality, RejectedAnalysis,
};
use super::AnalysisError;

/// Findings listed in a report, primary included.
pub const MAX_FINDINGS: usize = 3;

/// Build the accepted report from confidence-sorted predictions.
pub fn assemble_report(
    predictions: &[ConditionPrediction],
    features: FeatureVector,
    elapsed: Duration,
) -> Result<AnalysisReport, AnalysisError> {
    let primary = predictions
        .first()
        .ok_or_else(|| AnalysisError::computation("report", "no predictions to report"))?;

    let findings: Vec<Finding> = predictions
        .iter()
        .take(MAX_FINDINGS)
        .map(|p| {
            let info = condition_info(&p.condition);
            Finding {
                condition: p.condition.clone(),
                description: info.description.into(),
                severity: info.severity,
                confidence: p.confidence,
            }
        })
        .collect();

    let additional_findings: Vec<String> = predictions
        .iter()
        .skip(1)
        .take(MAX_FINDINGS - 1)
        .map(|p| display_name(&p.condition))
        .collect();

    let analysis = AnalysisSummary {
        primary_finding: display_name(&primary.condition),
        summary: summary_sentence(primary, &additional_findings),
        additional_findings,
        technical_notes: technical_notes(&features),
        disclaimer: DISCLAIMER.into(),
    };

    Ok(AnalysisReport {
        is_valid_xray: true,
        confidence: primary.confidence,
        image_quality: assess_image_quality(&features),
        analysis,
        findings,
        recommendations: recommendations_for(&primary.condition),
        features,
        processing_time: format_processing_time(elapsed),
        timestamp: Utc::now(),
        analysis_id: format!("xray_{}", Uuid::new_v4().simple()),
    })
}

/// Build the negative result for an image the gate turned away.
pub fn assemble_rejection(gate: &GateReport, elapsed: Duration) -> RejectedAnalysis {
    RejectedAnalysis {
        is_valid_xray: false,
        error: INVALID_XRAY_MESSAGE.into(),
        reasons: gate
            .failed_checks()
            .iter()
            .map(|c| c.as_str().to_string())
            .collect(),
        processing_time: format_processing_time(elapsed),
    }
}

/// Informational quality tier from contrast and edge density.
pub fn assess_image_quality(features: &FeatureVector) -> ImageQuality {
    if features.contrast >= 0.15 && features.edge_density >= 0.05 {
        ImageQuality::Excellent
    } else if features.contrast >= 0.10 {
        ImageQuality::Good
    } else if features.contrast >= 0.07 {
        ImageQuality::Fair
    } else {
        ImageQuality::Poor
    }
}

pub fn technical_notes(features: &FeatureVector) -> String {
    format!(
        "Brightness: {:.2}, Contrast: {:.2}, Edge density: {:.3}, Symmetry: {:.2}",
        features.brightness, features.contrast, features.edge_density, features.symmetry
    )
}

fn summary_sentence(primary: &ConditionPrediction, additional: &[String]) -> String {
    let mut sentence = if primary.condition == NORMAL_CONDITION {
        format!(
            "No abnormal pattern detected ({}% confidence).",
            primary.confidence
        )
    } else {
        format!(
            "Image patterns are most consistent with {} ({}% confidence).",
            display_name(&primary.condition),
            primary.confidence
        )
    };
    if !additional.is_empty() {
        sentence.push_str(&format!(" Also noted: {}.", additional.join(", ")));
    }
    sentence
}
