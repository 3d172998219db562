//! Static condition knowledge: descriptions, severity tiers and
//! recommendations keyed by condition label.
//!
//! Built once per process and read-only afterwards; safe to share across
//! concurrent analyses without synchronization.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use super::classify::{NORMAL_CONDITION, NORMAL_CONFIDENCE, RULES};
use super::types::{Priority, Recommendation, Severity};
use crate::config::{APP_NAME, APP_VERSION};

pub const DISCLAIMER: &str = "This screening is produced by fixed image heuristics, not a trained \
    diagnostic model. It is not a medical diagnosis. Always have chest X-rays reviewed by a \
    qualified radiologist or healthcare provider.";

const GENERIC_DESCRIPTION: &str =
    "Pattern detected through image analysis. Its clinical meaning requires professional review.";

/// Static metadata for one condition label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionInfo {
    pub description: &'static str,
    pub severity: Severity,
}

struct RecommendationTemplate {
    title: &'static str,
    description: &'static str,
    priority: Priority,
}

impl RecommendationTemplate {
    fn to_recommendation(&self) -> Recommendation {
        Recommendation {
            title: self.title.into(),
            description: self.description.into(),
            priority: self.priority,
        }
    }
}

static CONDITIONS: LazyLock<HashMap<&'static str, ConditionInfo>> = LazyLock::new(|| {
    HashMap::from([
        (
            "Pneumonia",
            ConditionInfo {
                description: "Infection that inflames the air sacs of one or both lungs, which may fill with fluid.",
                severity: Severity::High,
            },
        ),
        (
            "COVID-19",
            ConditionInfo {
                description: "Viral respiratory infection that can produce patchy opacities across both lungs.",
                severity: Severity::High,
            },
        ),
        (
            "Pneumothorax",
            ConditionInfo {
                description: "Air in the space between the lung and chest wall, which can cause the lung to collapse.",
                severity: Severity::High,
            },
        ),
        (
            "Pleural_Effusion",
            ConditionInfo {
                description: "Build-up of fluid between the layers of tissue lining the lungs and chest cavity.",
                severity: Severity::Medium,
            },
        ),
        (
            "Cardiomegaly",
            ConditionInfo {
                description: "Enlarged heart silhouette, which can point to heart strain or other cardiac conditions.",
                severity: Severity::Medium,
            },
        ),
        (
            "Consolidation",
            ConditionInfo {
                description: "Region of lung tissue filled with fluid or cells instead of air, often seen with infection.",
                severity: Severity::Medium,
            },
        ),
        (
            NORMAL_CONDITION,
            ConditionInfo {
                description: "No abnormal pattern detected by the image heuristics.",
                severity: Severity::Low,
            },
        ),
    ])
});

static RECOMMENDATIONS: LazyLock<HashMap<&'static str, Vec<RecommendationTemplate>>> =
    LazyLock::new(|| {
        HashMap::from([
            (
                "Pneumonia",
                vec![
                    RecommendationTemplate {
                        title: "Consult a physician promptly",
                        description: "See a doctor within 24-48 hours for clinical examination and possible antibiotic treatment.",
                        priority: Priority::High,
                    },
                    RecommendationTemplate {
                        title: "Monitor symptoms",
                        description: "Track fever, cough and breathing difficulty; seek care sooner if they worsen.",
                        priority: Priority::Medium,
                    },
                ],
            ),
            (
                "COVID-19",
                vec![
                    RecommendationTemplate {
                        title: "Get tested",
                        description: "Take a PCR or antigen test to confirm or rule out infection.",
                        priority: Priority::High,
                    },
                    RecommendationTemplate {
                        title: "Isolate and monitor oxygen",
                        description: "Limit contact with others and check oxygen saturation if a pulse oximeter is available.",
                        priority: Priority::High,
                    },
                ],
            ),
            (
                "Pneumothorax",
                vec![RecommendationTemplate {
                    title: "Seek urgent evaluation",
                    description: "A collapsed lung can worsen quickly. Have a clinician review this image as soon as possible.",
                    priority: Priority::High,
                }],
            ),
            (
                "Pleural_Effusion",
                vec![
                    RecommendationTemplate {
                        title: "Follow-up imaging",
                        description: "An ultrasound or CT scan can confirm the amount and type of fluid.",
                        priority: Priority::Medium,
                    },
                    RecommendationTemplate {
                        title: "Investigate the cause",
                        description: "Discuss heart, kidney and infection work-up with your doctor.",
                        priority: Priority::Medium,
                    },
                ],
            ),
            (
                "Cardiomegaly",
                vec![
                    RecommendationTemplate {
                        title: "Cardiac evaluation",
                        description: "An echocardiogram and ECG can assess heart size and function.",
                        priority: Priority::Medium,
                    },
                    RecommendationTemplate {
                        title: "Check blood pressure",
                        description: "Monitor blood pressure regularly and review cardiovascular risk factors.",
                        priority: Priority::Low,
                    },
                ],
            ),
            (
                "Consolidation",
                vec![
                    RecommendationTemplate {
                        title: "Clinical correlation",
                        description: "Review symptoms with a physician; consolidation is often linked to infection.",
                        priority: Priority::Medium,
                    },
                    RecommendationTemplate {
                        title: "Repeat imaging",
                        description: "A follow-up X-ray after treatment can confirm the area has cleared.",
                        priority: Priority::Low,
                    },
                ],
            ),
            (
                NORMAL_CONDITION,
                vec![RecommendationTemplate {
                    title: "Routine follow-up",
                    description: "No action suggested by this screening. Keep regular check-ups with your healthcare provider.",
                    priority: Priority::Low,
                }],
            ),
        ])
    });

static GENERIC_RECOMMENDATION: RecommendationTemplate = RecommendationTemplate {
    title: "Consult a healthcare professional",
    description: "Please have this X-ray reviewed by a qualified radiologist or healthcare provider.",
    priority: Priority::Medium,
};

/// Metadata for `label`; unknown labels get a generic description and
/// medium severity.
pub fn condition_info(label: &str) -> ConditionInfo {
    CONDITIONS.get(label).copied().unwrap_or(ConditionInfo {
        description: GENERIC_DESCRIPTION,
        severity: Severity::Medium,
    })
}

/// Recommendations for `label`; unknown labels get one generic
/// "consult a professional" entry.
pub fn recommendations_for(label: &str) -> Vec<Recommendation> {
    match RECOMMENDATIONS.get(label) {
        Some(templates) => templates.iter().map(|t| t.to_recommendation()).collect(),
        None => vec![GENERIC_RECOMMENDATION.to_recommendation()],
    }
}

/// Label as shown to people: `Pleural_Effusion` -> `Pleural Effusion`.
pub fn display_name(label: &str) -> String {
    label.replace('_', " ")
}

// ═══════════════════════════════════════════════════════════
// Model description
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleInfo {
    pub condition: &'static str,
    pub confidence: u8,
    pub criteria: &'static str,
}

/// What a host's info endpoint reports about the analyzer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub method: &'static str,
    pub rule_count: usize,
    pub rules: Vec<RuleInfo>,
    pub fallback: RuleInfo,
    pub capabilities: Vec<&'static str>,
    pub disclaimer: &'static str,
}

pub fn model_info() -> ModelInfo {
    ModelInfo {
        name: APP_NAME,
        version: APP_VERSION,
        method: "rule-based image heuristics",
        rule_count: RULES.len(),
        rules: RULES
            .iter()
            .map(|r| RuleInfo {
                condition: r.condition,
                confidence: r.confidence,
                criteria: r.criteria,
            })
            .collect(),
        fallback: RuleInfo {
            condition: NORMAL_CONDITION,
            confidence: NORMAL_CONFIDENCE,
            criteria: "no other rule fired",
        },
        capabilities: vec![
            "Image validation",
            "Condition screening",
            "Recommendation generation",
            "Technical quality analysis",
        ],
        disclaimer: DISCLAIMER,
    }
}
