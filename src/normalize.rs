// src/normalize.rs
//! Normalizer: turns scraped listings into canonical records and derives the
//! cross-product common-feature index.
//!
//! Every function here is total. Dirty input degrades to a default
//! (`0.0` for numbers, the cleaned text for strings) instead of failing.

use crate::record::{CommonFeatureIndex, NormalizedRecord, RawField, RawRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Share of the collection a feature must appear in to be "common" (`count >= ratio * N`).
pub const COMMON_FEATURE_RATIO: f64 = 0.8;

/// Frozen synonym table, evaluated top to bottom with substring matching on the
/// case-folded name. The first hit wins, so "storage memory" resolves to `RAM`.
pub const FEATURE_SYNONYMS: &[(&str, &str)] = &[
    ("處理器", "CPU"),
    ("processor", "CPU"),
    ("cpu", "CPU"),
    ("記憶體", "RAM"),
    ("memory", "RAM"),
    ("ram", "RAM"),
    ("儲存", "Storage"),
    ("storage", "Storage"),
    ("螢幕", "Screen"),
    ("display", "Screen"),
    ("電池", "Battery"),
    ("battery", "Battery"),
    ("重量", "Weight"),
    ("weight", "Weight"),
    ("品牌", "Brand"),
    ("brand", "Brand"),
    ("型號", "Model"),
    ("model", "Model"),
];

/// Unit detection order and conversion factors relative to the family base unit
/// (GB for capacity, KG for mass).
pub const UNIT_FACTORS: &[(&str, f64)] = &[
    ("GB", 1.0),
    ("TB", 1024.0),
    ("MB", 0.001),
    ("KG", 1.0),
    ("G", 0.001),
    ("LBS", 0.453592),
];

// First `digits[.digits]` run. ASCII digits only; full-width digits are not parsed.
static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("number regex"));

// Anything outside word chars, whitespace, CJK ideographs, dot and hyphen.
static RE_DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\x{4e00}-\x{9fff}.\-]").expect("disallowed-chars regex"));

/// Collapse whitespace runs and strip special characters from free text.
pub fn normalize_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = RE_DISALLOWED.replace_all(&collapsed, "");
    stripped.trim().to_string()
}

/// Clean a spec value. Numbers are rendered as-is; text goes through [`normalize_text`].
pub fn normalize_value(raw: &RawField) -> String {
    match raw {
        RawField::Number(n) => n.to_string(),
        RawField::Text(s) => normalize_text(s),
    }
}

/// First numeric run in `raw`, or `0.0` when there is none.
///
/// `"記憶體: 16GB"` → `16.0`, `"N/A"` → `0.0`, `"NT$12,990"` → `12.0`.
pub fn extract_numeric(raw: &str) -> f64 {
    match RE_NUMBER.find(raw) {
        Some(m) => m.as_str().parse::<f64>().unwrap_or(0.0),
        None => 0.0,
    }
}

/// Numeric view of a raw field: numbers pass through, text is scanned.
pub fn extract_numeric_field(raw: &RawField) -> f64 {
    match raw {
        RawField::Number(n) => *n,
        RawField::Text(s) => extract_numeric(s),
    }
}

/// Map a scraped spec label onto its canonical feature name.
pub fn normalize_feature_name(name: &str) -> String {
    let folded = name.trim().to_lowercase();
    for (pattern, canonical) in FEATURE_SYNONYMS {
        if folded.contains(pattern) {
            return (*canonical).to_string();
        }
    }
    folded
}

/// Price and rating are amounts: negative or non-finite inputs become 0.
fn non_negative(x: f64) -> f64 {
    if x.is_finite() {
        x.max(0.0)
    } else {
        0.0
    }
}

/// Clean one listing.
///
/// When two raw labels canonicalise to the same feature, the label that sorts
/// last wins (raw specs are kept in a sorted map).
pub fn clean_record(raw: &RawRecord) -> NormalizedRecord {
    let mut specs = BTreeMap::new();
    for (key, value) in &raw.specs {
        specs.insert(normalize_feature_name(key), normalize_value(value));
    }
    NormalizedRecord {
        locator: raw.locator.clone(),
        name: normalize_text(&raw.name),
        price: non_negative(extract_numeric_field(&raw.price)),
        rating: non_negative(extract_numeric_field(&raw.rating)),
        specs,
        reviews: raw.reviews.clone(),
    }
}

/// Order-preserving batch form of [`clean_record`].
pub fn clean_records(raws: &[RawRecord]) -> Vec<NormalizedRecord> {
    raws.iter().map(clean_record).collect()
}

/// Features present in at least 80% of `records`, with their values in record order.
pub fn extract_common_features(records: &[NormalizedRecord]) -> CommonFeatureIndex {
    if records.is_empty() {
        return CommonFeatureIndex::new();
    }

    let mut all: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in records {
        for (feature, value) in &record.specs {
            all.entry(feature.clone()).or_default().push(value.clone());
        }
    }

    let threshold = records.len() as f64 * COMMON_FEATURE_RATIO;
    all.into_iter()
        .filter(|(_, values)| values.len() as f64 >= threshold)
        .collect()
}

/// Distinct features observed in any record, sorted.
pub fn observed_features(records: &[NormalizedRecord]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    for record in records {
        for feature in record.specs.keys() {
            seen.insert(feature.clone());
        }
    }
    seen.into_iter().collect()
}

/// Parsed quantity with its detected unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitValue {
    pub value: f64,
    /// Upper-case unit code, or `"unknown"`.
    pub unit: String,
    pub normalized_value: f64,
}

/// Detect the unit in `raw` and convert the leading number into `target`.
///
/// Without a detected unit or a known target the value is returned unconverted.
pub fn normalize_unit(raw: &str, target: Option<&str>) -> UnitValue {
    let upper = raw.to_uppercase();
    let value = extract_numeric(&upper);

    let detected = UNIT_FACTORS.iter().find(|(unit, _)| upper.contains(unit));
    let target_factor = target.and_then(|t| {
        let t = t.trim().to_uppercase();
        UNIT_FACTORS
            .iter()
            .find(|(unit, _)| *unit == t)
            .map(|(_, f)| *f)
    });

    let normalized_value = match (detected, target_factor) {
        (Some((_, from)), Some(to)) => value * from / to,
        _ => value,
    };

    UnitValue {
        value,
        unit: detected
            .map(|(u, _)| (*u).to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        normalized_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_extraction_examples() {
        assert_eq!(extract_numeric("記憶體: 16GB"), 16.0);
        assert_eq!(extract_numeric("8 小時"), 8.0);
        assert_eq!(extract_numeric("4.5 stars"), 4.5);
        assert_eq!(extract_numeric("N/A"), 0.0);
        assert_eq!(extract_numeric(""), 0.0);
        assert_eq!(extract_numeric("Intel i5-1340P"), 5.0);
    }

    #[test]
    fn numeric_field_casts_numbers_directly() {
        assert_eq!(extract_numeric_field(&RawField::Number(12990.0)), 12990.0);
        assert_eq!(extract_numeric_field(&RawField::Text("$12990".into())), 12990.0);
    }

    #[test]
    fn text_is_collapsed_and_stripped() {
        assert_eq!(normalize_text("  Apple   M3\t Pro! "), "Apple M3 Pro");
        assert_eq!(normalize_text("1.6 kg (約)"), "1.6 kg 約");
        assert_eq!(normalize_text("Wi-Fi 6E"), "Wi-Fi 6E");
        assert_eq!(normalize_value(&RawField::Number(1.5)), "1.5");
    }

    #[test]
    fn synonym_table_order_is_a_contract() {
        assert_eq!(normalize_feature_name("處理器"), "CPU");
        assert_eq!(normalize_feature_name(" Processor Model "), "CPU");
        assert_eq!(normalize_feature_name("Memory"), "RAM");
        // "memory" precedes "storage" in the table.
        assert_eq!(normalize_feature_name("Storage Memory"), "RAM");
        // "weight" precedes "model".
        assert_eq!(normalize_feature_name("Model Weight"), "Weight");
        assert_eq!(normalize_feature_name("Noise Cancelling"), "noise cancelling");
    }

    #[test]
    fn common_features_empty_input() {
        assert!(extract_common_features(&[]).is_empty());
    }

    #[test]
    fn units_detected_in_table_order() {
        let tb = normalize_unit("1TB SSD", Some("GB"));
        assert_eq!(tb.unit, "TB");
        assert_eq!(tb.normalized_value, 1024.0);

        let kg = normalize_unit("1.6kg", Some("g"));
        assert_eq!(kg.unit, "KG");
        assert!((kg.normalized_value - 1600.0).abs() < 1e-9);

        let none = normalize_unit("18小時", Some("GB"));
        assert_eq!(none.unit, "unknown");
        assert_eq!(none.normalized_value, 18.0);
    }
}
