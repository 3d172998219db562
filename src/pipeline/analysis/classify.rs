use tracing::debug;

use super::types::{ConditionPrediction, FeatureVector};

/// One row of the classifier table: when `predicate` holds, emit
/// `condition` with a fixed `confidence`.
pub struct ClassifierRule {
    pub condition: &'static str,
    pub confidence: u8,
    /// Human-readable form of the predicate.
    pub criteria: &'static str,
    pub predicate: fn(&FeatureVector) -> bool,
}

/// Emitted only when no rule in `RULES` fires.
pub const NORMAL_CONDITION: &str = "Normal";
pub const NORMAL_CONFIDENCE: u8 = 85;

/// Fixed heuristic rule table, evaluated in order.
///
/// Thresholds and confidences are reference values carried for parity;
/// they were never fitted to labelled data and carry no diagnostic accuracy.
pub static RULES: [ClassifierRule; 6] = [
    ClassifierRule {
        condition: "Pneumonia",
        confidence: 82,
        criteria: "brightness < 0.3 and contrast > 0.15",
        predicate: pneumonia_pattern,
    },
    ClassifierRule {
        condition: "COVID-19",
        confidence: 78,
        criteria: "brightness < 0.25 and edge density > 0.08",
        predicate: covid_pattern,
    },
    ClassifierRule {
        condition: "Pneumothorax",
        confidence: 75,
        criteria: "contrast > 0.25 and edge density > 0.12",
        predicate: pneumothorax_pattern,
    },
    ClassifierRule {
        condition: "Pleural_Effusion",
        confidence: 70,
        criteria: "brightness > 0.6 and contrast < 0.1",
        predicate: effusion_pattern,
    },
    ClassifierRule {
        condition: "Cardiomegaly",
        confidence: 68,
        criteria: "edge density > 0.15",
        predicate: cardiomegaly_pattern,
    },
    ClassifierRule {
        condition: "Consolidation",
        confidence: 72,
        criteria: "brightness < 0.4 and histogram[0] > histogram[9]",
        predicate: consolidation_pattern,
    },
];

fn pneumonia_pattern(f: &FeatureVector) -> bool {
    f.brightness < 0.3 && f.contrast > 0.15
}

fn covid_pattern(f: &FeatureVector) -> bool {
    f.brightness < 0.25 && f.edge_density > 0.08
}

fn pneumothorax_pattern(f: &FeatureVector) -> bool {
    f.contrast > 0.25 && f.edge_density > 0.12
}

fn effusion_pattern(f: &FeatureVector) -> bool {
    f.brightness > 0.6 && f.contrast < 0.1
}

fn cardiomegaly_pattern(f: &FeatureVector) -> bool {
    f.edge_density > 0.15
}

fn consolidation_pattern(f: &FeatureVector) -> bool {
    f.brightness < 0.4 && f.histogram[0] > f.histogram[9]
}

/// Evaluate every rule independently and return the emitted conditions,
/// confidence descending. Ties keep table order. Never empty: falls back
/// to a single `Normal` prediction.
pub fn classify(features: &FeatureVector) -> Vec<ConditionPrediction> {
    let mut predictions: Vec<ConditionPrediction> = RULES
        .iter()
        .filter(|rule| (rule.predicate)(features))
        .map(|rule| ConditionPrediction::new(rule.condition, rule.confidence))
        .collect();

    if predictions.is_empty() {
        predictions.push(ConditionPrediction::new(NORMAL_CONDITION, NORMAL_CONFIDENCE));
    }

    // `sort_by` is stable.
    predictions.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    debug!(
        fired = predictions.len(),
        top = predictions[0].condition.as_str(),
        "Rule table evaluated"
    );

    predictions
}
