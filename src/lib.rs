pub mod config;
pub mod pipeline; // Preprocess -> features -> gate -> rules -> report

pub use pipeline::analysis::knowledge::{model_info, ModelInfo};
pub use pipeline::analysis::upload::{check_upload, supported_types, SupportedTypes};
pub use pipeline::analysis::{
    analyze, AnalysisError, AnalysisOutcome, AnalysisReport, RejectedAnalysis, XrayAnalyzer,
};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber for a host process.
///
/// `RUST_LOG` wins over the built-in filter. Calling it again after a
/// subscriber is set is a no-op.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
