pub mod types;
pub mod preprocess;
pub mod features;
pub mod gate;
pub mod classify;
pub mod knowledge;
pub mod report;
pub mod upload;
pub mod orchestrator;

pub use types::*;
pub use preprocess::*;
pub use features::*;
pub use gate::*;
pub use classify::*;
pub use report::*;
pub use orchestrator::*;

use serde_json::json;
use thiserror::Error;

/// Fatal failures of a single analysis call.
///
/// An image that decodes but fails the validity gate is not an error:
/// it is returned as `AnalysisOutcome::Rejected`.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Computation failed during {stage}: {reason}")]
    Computation { stage: &'static str, reason: String },

    #[error("Invalid upload: {0}")]
    InvalidInput(String),
}

impl AnalysisError {
    pub(crate) fn computation(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Computation {
            stage,
            reason: reason.into(),
        }
    }

    /// Stage tag for log correlation by the caller.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Computation { stage, .. } => stage,
            Self::InvalidInput(_) => "upload_check",
        }
    }

    /// JSON body a host returns alongside a failure status.
    pub fn to_response(&self) -> serde_json::Value {
        let error = match self {
            Self::InvalidInput(_) => "Please upload a JPEG, PNG or WEBP image of at most 10MB and 8192x8192 pixels.",
            _ => "Analysis failed. Please try again with a valid chest X-ray image.",
        };
        json!({
            "error": error,
            "details": self.to_string(),
        })
    }
}
