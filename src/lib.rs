// src/lib.rs
// Public library surface for integration tests and the CLI.

pub mod acquire;
pub mod config;
pub mod metrics;
pub mod normalize;
pub mod record;

// Normalise → importance → scoring pipeline
pub mod analyze;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use analyze::{AnalysisReport, AnalyzeError, Analyzer};
pub use record::{CommonFeatureIndex, NormalizedRecord, RawField, RawRecord, WeightMap};

use tracing::info;

/// Build an analyzer from `config/ai.*` (or `$VALUE_AI_CONFIG_PATH`).
///
/// A missing or broken config never fails: the analyzer then runs on the local
/// importance heuristic only.
pub fn analyzer_from_default_config() -> Analyzer {
    let cfg = match config::AiConfig::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "AI config unusable, running in local mode");
            config::AiConfig::default()
        }
    };
    // Safe diagnostics: provider + enabled + key length only
    info!(
        "AI cfg loaded: provider={}, enabled={}, key_len={}",
        String::from(cfg.provider),
        cfg.enabled,
        cfg.api_key.len()
    );
    Analyzer::new(analyze::ImportanceResolver::from_config(&cfg))
}
