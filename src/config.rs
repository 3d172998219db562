use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Chest X-ray Analyzer";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Side of the square grid every image is resampled to.
/// Gate and rule thresholds are only comparable across runs at this size.
pub const TARGET_SIZE: u32 = 224;

/// Largest width or height accepted for decoding. Bounds the decode buffer
/// (8192 x 8192 RGB is about 200 MB) regardless of how small the file is.
pub const MAX_INPUT_DIMENSION: u32 = 8192;

/// Equal-width intensity bins over [0, 1].
pub const HISTOGRAM_BINS: usize = 10;

/// Upload cap enforced by the optional upload policy.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10 MB

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
pub const MIN_IMAGE_BYTES: usize = 67;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "chest_xray_lib=info,warn"
}

/// Thresholds of the validity gate. All bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateThresholds {
    pub min_brightness: f64,
    pub max_brightness: f64,
    pub min_contrast: f64,
    pub max_contrast: f64,
    pub min_symmetry: f64,
    pub min_edge_density: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_brightness: 0.1,
            max_brightness: 0.9,
            min_contrast: 0.05,
            max_contrast: 0.4,
            min_symmetry: 0.6,
            min_edge_density: 0.01,
        }
    }
}

/// Analyzer settings a host may load from JSON.
///
/// The classifier rule table and the condition metadata are deliberately
/// absent: they are static process-wide data (see `pipeline::analysis::knowledge`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    pub target_size: u32,
    pub max_input_dimension: u32,
    pub gate: GateThresholds,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            target_size: TARGET_SIZE,
            max_input_dimension: MAX_INPUT_DIMENSION,
            gate: GateThresholds::default(),
        }
    }
}
