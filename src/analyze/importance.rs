//! Importance resolver: builds the weight map for every observed feature.
//!
//! Tier 1 asks an external text generator for a JSON object `feature → weight`.
//! Tier 2 is the [`LocalHeuristic`]. Features the provider leaves out are
//! back-filled from tier 2; any provider failure drops to tier 2 for all
//! features. A quota failure switches the resolver into local mode for the rest
//! of its lifetime.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::ai_adapter::{build_generator, DynTextGenerator};
use super::heuristic::{LocalHeuristic, MAX_WEIGHT, MIN_WEIGHT};
use crate::config::ai::{AiConfig, DEFAULT_TIMEOUT_SECS};
use crate::metrics as m;
use crate::normalize::observed_features;
use crate::record::{NormalizedRecord, WeightMap};

/// Where a weight map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightSource {
    /// Provider estimate (possibly back-filled locally).
    Ai,
    /// Local heuristic only.
    Local,
    /// Supplied by the caller.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub weights: WeightMap,
    pub source: WeightSource,
}

/// Why the external estimate could not be used.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("external estimate unavailable: {0}")]
    Unavailable(String),
    #[error("provider quota exhausted; resolver is in local mode")]
    Quota,
    #[error("estimate timed out after {0:?}")]
    Timeout(Duration),
    #[error("estimate response is not a JSON object: {0}")]
    Malformed(String),
}

pub struct ImportanceResolver {
    generator: Option<DynTextGenerator>,
    local: LocalHeuristic,
    timeout: Duration,
    local_mode: AtomicBool,
}

impl ImportanceResolver {
    /// Without a generator the resolver starts (and stays) in local mode.
    pub fn new(generator: Option<DynTextGenerator>) -> Self {
        let local_mode = generator.is_none();
        Self {
            generator,
            local: LocalHeuristic::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            local_mode: AtomicBool::new(local_mode),
        }
    }

    pub fn local_only() -> Self {
        Self::new(None)
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(build_generator(config)).with_timeout(config.timeout())
    }

    pub fn with_heuristic(mut self, local: LocalHeuristic) -> Self {
        self.local = local;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True once the resolver no longer consults the provider.
    pub fn is_local_mode(&self) -> bool {
        self.local_mode.load(Ordering::SeqCst)
    }

    pub fn provider_name(&self) -> &'static str {
        self.generator
            .as_ref()
            .map(|g| g.provider_name())
            .unwrap_or("none")
    }

    /// Weight map for every feature observed in `records`.
    pub async fn resolve(&self, records: &[NormalizedRecord], requirement: Option<&str>) -> Resolution {
        m::ensure_metrics_described();
        let features = observed_features(records);
        if features.is_empty() {
            return Resolution {
                weights: WeightMap::new(),
                source: WeightSource::Local,
            };
        }

        if !self.is_local_mode() {
            match self.estimate_external(records, &features, requirement).await {
                Ok(mut weights) => {
                    let estimated = weights.len();
                    for feature in &features {
                        if !weights.contains_key(feature) {
                            weights.insert(feature.clone(), self.local.estimate(feature, records));
                        }
                    }
                    info!(
                        target: "importance",
                        provider = self.provider_name(),
                        estimated,
                        backfilled = features.len() - estimated,
                        "feature weights from provider"
                    );
                    return Resolution {
                        weights,
                        source: WeightSource::Ai,
                    };
                }
                Err(e) => {
                    counter!(m::AI_FAILURES).increment(1);
                    warn!(target: "importance", error = %e, "provider estimate unusable, using local heuristic");
                }
            }
        }

        counter!(m::LOCAL_FALLBACK).increment(1);
        let weights = self.local.estimate_all(&features, records);
        info!(target: "importance", features = weights.len(), "feature weights from local heuristic");
        Resolution {
            weights,
            source: WeightSource::Local,
        }
    }

    /// Tier 1 on its own. Returns only the features the provider rated.
    pub async fn estimate_external(
        &self,
        records: &[NormalizedRecord],
        features: &[String],
        requirement: Option<&str>,
    ) -> Result<WeightMap, EstimateError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| EstimateError::Unavailable("no provider configured".to_string()))?;
        if self.is_local_mode() {
            return Err(EstimateError::Quota);
        }

        let prompt = build_prompt(records, features, requirement);
        counter!(m::AI_CALLS).increment(1);
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, generator.generate(&prompt)).await;
        histogram!(m::AI_LATENCY_MS).record(started.elapsed().as_millis() as f64);

        let text = match outcome {
            Err(_) => return Err(EstimateError::Timeout(self.timeout)),
            Ok(Err(e)) if e.is_quota() => {
                self.local_mode.store(true, Ordering::SeqCst);
                counter!(m::QUOTA_TRIPS).increment(1);
                warn!(target: "importance", error = %e, "provider quota exhausted, switching to local mode");
                return Err(EstimateError::Quota);
            }
            Ok(Err(e)) => return Err(EstimateError::Unavailable(e.to_string())),
            Ok(Ok(text)) => text,
        };

        if text.trim().is_empty() {
            return Err(EstimateError::Unavailable("empty response".to_string()));
        }
        parse_weight_response(&text, features)
    }
}

/// Prompt carrying a product summary, the feature list and the optional requirement.
pub fn build_prompt(records: &[NormalizedRecord], features: &[String], requirement: Option<&str>) -> String {
    #[derive(Serialize)]
    struct Summary<'a> {
        name: &'a str,
        price: f64,
        rating: f64,
        specs: &'a std::collections::BTreeMap<String, String>,
    }

    let summary: Vec<Summary<'_>> = records
        .iter()
        .map(|r| Summary {
            name: &r.name,
            price: r.price,
            rating: r.rating,
            specs: &r.specs,
        })
        .collect();
    let products = serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "[]".to_string());

    let need = match requirement.map(str::trim).filter(|s| !s.is_empty()) {
        Some(r) => format!("User requirement: {r}"),
        None => "No specific requirement; assume a typical buyer.".to_string(),
    };

    format!(
        "Rate how much each product feature matters when judging value for money.\n\n\
         Products:\n{products}\n\n\
         Features: {features}\n\n\
         {need}\n\n\
         Consider the actual feature values, prices and ratings. Return a JSON object \
         mapping every feature name to an importance weight between 1 and 3. \
         Return only the JSON, no other text.",
        features = features.join(", "),
    )
}

/// Strip a ```` ```json ```` or bare ```` ``` ```` fence around the payload.
pub fn strip_code_fence(text: &str) -> &str {
    if let Some(after) = text.split("```json").nth(1) {
        return after.split("```").next().unwrap_or(after).trim();
    }
    if let Some(inner) = text.split("```").nth(1) {
        return inner.trim();
    }
    text.trim()
}

/// Parse the provider's answer. Keeps numeric entries for known features, clamped to [1,3].
pub fn parse_weight_response(text: &str, features: &[String]) -> Result<WeightMap, EstimateError> {
    let payload = strip_code_fence(text);
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| EstimateError::Malformed(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| EstimateError::Malformed(format!("expected object, got {value}")))?;

    let known: BTreeSet<&str> = features.iter().map(String::as_str).collect();
    let mut weights = WeightMap::new();
    for (feature, raw) in object {
        if !known.contains(feature.as_str()) {
            debug!(target: "importance", %feature, "provider rated an unknown feature, ignored");
            continue;
        }
        match raw.as_f64() {
            Some(w) if w.is_finite() => {
                weights.insert(feature.clone(), w.clamp(MIN_WEIGHT, MAX_WEIGHT));
            }
            _ => debug!(target: "importance", %feature, "non-numeric weight, will back-fill"),
        }
    }
    Ok(weights)
}
