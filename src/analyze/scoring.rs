//! Value scoring: per-feature normalisation, the weighted value formula and the
//! ranked views derived from it.
//!
//! value = round( (Σ score·w / Σ w) / (price / 1000) × (1 + rating/5 × 0.2), 4 )
//!
//! Feature scores are the feature's leading number divided by the largest
//! leading number seen for that feature across the collection, clamped to [0,1].
//! A zero denominator yields the neutral 0.5.

use crate::normalize::{extract_common_features, extract_numeric};
use crate::record::{CommonFeatureIndex, NormalizedRecord, WeightMap};
use serde::Serialize;
use std::collections::BTreeMap;

/// Score used when a feature has no usable numeric range.
pub const NEUTRAL_FEATURE_SCORE: f64 = 0.5;
/// Price unit: value is expressed per thousand currency units.
pub const PRICE_SCALE: f64 = 1000.0;
/// Maximum multiplicative bonus granted to a 5/5 rating.
pub const RATING_BONUS_SPAN: f64 = 0.2;
pub const RATING_SCALE: f64 = 5.0;

/// A record paired with its value score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProduct {
    pub record: NormalizedRecord,
    pub value: f64,
}

/// Normalised score of one feature value in [0,1].
pub fn feature_score(value: &str, max_value: f64) -> f64 {
    if max_value == 0.0 {
        return NEUTRAL_FEATURE_SCORE;
    }
    if max_value < 0.0 {
        return 0.0;
    }
    (extract_numeric(value) / max_value).clamp(0.0, 1.0)
}

/// Normalisation denominator for `feature`.
///
/// Indexed features use the collection-wide maximum; anything else falls back
/// to the record's own value, which scores 1.0 (or 0.5 when that value is 0).
fn max_value_for(feature: &str, own_value: &str, common: &CommonFeatureIndex) -> f64 {
    match common.get(feature) {
        Some(values) => values
            .iter()
            .map(|v| extract_numeric(v))
            .fold(0.0_f64, f64::max),
        None => extract_numeric(own_value),
    }
}

/// Unweighted score of `feature` for `record`, or `None` if the record lacks it.
fn term(record: &NormalizedRecord, feature: &str, common: &CommonFeatureIndex) -> Option<f64> {
    let value = record.specs.get(feature)?;
    let max_value = max_value_for(feature, value, common);
    Some(feature_score(value, max_value))
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Weighted, price- and rating-adjusted value of a single record.
///
/// Weights are taken as given (manual overrides are not clamped).
pub fn value_score(record: &NormalizedRecord, weights: &WeightMap, common: &CommonFeatureIndex) -> f64 {
    if record.price <= 0.0 {
        return 0.0;
    }

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (feature, &weight) in weights {
        if let Some(score) = term(record, feature, common) {
            weighted += score * weight;
            total_weight += weight;
        }
    }
    if total_weight == 0.0 {
        total_weight = 1.0;
    }

    let base = (weighted / total_weight) / (record.price / PRICE_SCALE);
    let rating_bonus = 1.0 + (record.rating / RATING_SCALE) * RATING_BONUS_SPAN;
    round4(base * rating_bonus)
}

/// Value score for every record, keyed by locator. Rebuilds the common-feature index.
///
/// Records sharing a locator collapse onto one key (the later record wins).
pub fn score_all(records: &[NormalizedRecord], weights: &WeightMap) -> BTreeMap<String, f64> {
    let common = extract_common_features(records);
    records
        .iter()
        .map(|r| (r.locator.clone(), value_score(r, weights, &common)))
        .collect()
}

/// Score every record against `common`, sort by value descending, keep input order on ties.
fn scored_desc(records: &[NormalizedRecord], weights: &WeightMap, common: &CommonFeatureIndex) -> Vec<ScoredProduct> {
    let mut scored: Vec<ScoredProduct> = records
        .iter()
        .map(|r| ScoredProduct {
            value: value_score(r, weights, common),
            record: r.clone(),
        })
        .collect();
    // `sort_by` is stable.
    scored.sort_by(|a, b| b.value.total_cmp(&a.value));
    scored
}

/// Top `top_n` records by value.
pub fn rank(records: &[NormalizedRecord], weights: &WeightMap, top_n: usize) -> Vec<ScoredProduct> {
    let common = extract_common_features(records);
    let mut scored = scored_desc(records, weights, &common);
    scored.truncate(top_n);
    scored
}

/// Per-feature weighted scores (`score × weight`). Features missing from the record map to 0.
pub fn breakdown(
    record: &NormalizedRecord,
    weights: &WeightMap,
    common: &CommonFeatureIndex,
) -> BTreeMap<String, f64> {
    weights
        .iter()
        .map(|(feature, &weight)| {
            let contribution = term(record, feature, common)
                .map(|score| score * weight)
                .unwrap_or(0.0);
            (feature.clone(), contribution)
        })
        .collect()
}

/// Records priced within `budget`, best value first.
///
/// Normalisation is relative to the affordable subset only.
pub fn filter_by_budget(records: &[NormalizedRecord], weights: &WeightMap, budget: f64) -> Vec<ScoredProduct> {
    let affordable: Vec<NormalizedRecord> = records
        .iter()
        .filter(|r| r.price <= budget)
        .cloned()
        .collect();
    if affordable.is_empty() {
        return Vec::new();
    }
    let common = extract_common_features(&affordable);
    scored_desc(&affordable, weights, &common)
}
