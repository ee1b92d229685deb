// src/analyze/mod.rs
//! Analysis pipeline entry: normalise → resolve importance → score → views.
//!
//! Every stage returns fresh values; nothing is cached between runs. The only
//! error surfaced to callers is an empty product set.

pub mod ai_adapter;
pub mod heuristic;
pub mod importance;
pub mod report;
pub mod scoring;

use std::collections::BTreeMap;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::acquire::ListingSource;
use crate::metrics as m;
use crate::normalize::{clean_records, extract_common_features, observed_features};
use crate::record::{CommonFeatureIndex, NormalizedRecord, RawRecord, WeightMap};

// Re-export convenient types.
pub use crate::analyze::heuristic::LocalHeuristic;
pub use crate::analyze::importance::{ImportanceResolver, Resolution, WeightSource};
pub use crate::analyze::report::{
    ComparisonRow, MatchScore, MatchVerdict, PricePerformanceStats, Recommendation,
};
pub use crate::analyze::scoring::{
    breakdown, feature_score, filter_by_budget, rank, score_all, value_score, ScoredProduct,
};

/// Weight given to a feature nobody rated.
pub const DEFAULT_FEATURE_WEIGHT: f64 = 1.0;
pub const DEFAULT_TOP_N: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyzeError {
    #[error("cannot analyze: no usable product records")]
    NoUsableRecords,
}

/// Everything a presentation layer needs from one run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub records: Vec<NormalizedRecord>,
    pub weights: WeightMap,
    pub weight_source: WeightSource,
    /// Resolver had stopped consulting the provider when this report was built.
    pub local_mode: bool,
    pub common_features: CommonFeatureIndex,
    pub value_scores: BTreeMap<String, f64>,
    pub ranking: Vec<ScoredProduct>,
    pub recommendations: Vec<Recommendation>,
    pub summary: String,
    pub breakdowns: BTreeMap<String, BTreeMap<String, f64>>,
    pub comparison: Vec<ComparisonRow>,
    pub stats: Option<PricePerformanceStats>,
    pub match_scores: BTreeMap<String, MatchScore>,
}

impl AnalysisReport {
    /// Weights did not come from the provider.
    pub fn is_degraded(&self) -> bool {
        self.weight_source != WeightSource::Ai
    }
}

/// Every observed feature at [`DEFAULT_FEATURE_WEIGHT`].
pub fn default_weights(records: &[NormalizedRecord]) -> WeightMap {
    observed_features(records)
        .into_iter()
        .map(|f| (f, DEFAULT_FEATURE_WEIGHT))
        .collect()
}

pub struct Analyzer {
    resolver: ImportanceResolver,
    top_n: usize,
}

impl Analyzer {
    pub fn new(resolver: ImportanceResolver) -> Self {
        Self {
            resolver,
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn resolver(&self) -> &ImportanceResolver {
        &self.resolver
    }

    /// Full run over already-acquired listings.
    pub async fn analyze(
        &self,
        raws: &[RawRecord],
        requirement: Option<&str>,
    ) -> Result<AnalysisReport, AnalyzeError> {
        m::ensure_metrics_described();
        if raws.is_empty() {
            counter!(m::ANALYSIS_REJECTED).increment(1);
            warn!(target: "analyzer", "no usable records, analysis skipped");
            return Err(AnalyzeError::NoUsableRecords);
        }

        let records = clean_records(raws);
        let resolution = self.resolver.resolve(&records, requirement).await;

        let report = build_report(
            records,
            resolution.weights,
            resolution.source,
            self.resolver.is_local_mode(),
            requirement,
            self.top_n,
        );
        counter!(m::ANALYSIS_RUNS).increment(1);
        info!(
            target: "analyzer",
            products = report.records.len(),
            features = report.weights.len(),
            source = ?report.weight_source,
            local_mode = report.local_mode,
            "analysis complete"
        );
        Ok(report)
    }

    /// Fetch each locator in turn, drop failures, then [`Analyzer::analyze`].
    pub async fn analyze_locators(
        &self,
        source: &dyn ListingSource,
        locators: &[String],
        requirement: Option<&str>,
    ) -> Result<AnalysisReport, AnalyzeError> {
        let mut raws = Vec::with_capacity(locators.len());
        for locator in locators {
            match source.fetch(locator).await {
                Some(raw) => raws.push(raw),
                None => warn!(target: "analyzer", source = source.name(), %locator, "listing fetch failed"),
            }
        }
        self.analyze(&raws, requirement).await
    }

    /// Recompute every view from a caller-supplied weight map (manual adjustment).
    ///
    /// The map replaces the previous one wholesale and is used unclamped.
    pub fn rescore(
        &self,
        records: Vec<NormalizedRecord>,
        weights: WeightMap,
        requirement: Option<&str>,
    ) -> AnalysisReport {
        build_report(
            records,
            weights,
            WeightSource::Manual,
            self.resolver.is_local_mode(),
            requirement,
            self.top_n,
        )
    }
}

fn build_report(
    records: Vec<NormalizedRecord>,
    weights: WeightMap,
    weight_source: WeightSource,
    local_mode: bool,
    requirement: Option<&str>,
    top_n: usize,
) -> AnalysisReport {
    let common_features = extract_common_features(&records);
    let value_scores = score_all(&records, &weights);
    let ranking = rank(&records, &weights, top_n);
    let recommendations = report::recommend(&ranking);
    let summary = report::recommendation_summary(&recommendations);
    let breakdowns = records
        .iter()
        .map(|r| (r.locator.clone(), breakdown(r, &weights, &common_features)))
        .collect();
    let comparison = report::comparison_table(&records, &weights, &value_scores);
    let stats = report::price_performance_stats(&records, &value_scores);
    let match_scores = report::match_scores(&records, requirement);

    AnalysisReport {
        records,
        weights,
        weight_source,
        local_mode,
        common_features,
        value_scores,
        ranking,
        recommendations,
        summary,
        breakdowns,
        comparison,
        stats,
        match_scores,
    }
}
