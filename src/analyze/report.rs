//! Read-only views over scored products: recommendation list, comparison table,
//! price/performance stats and requirement match scores.

use crate::record::{NormalizedRecord, WeightMap};
use serde::Serialize;
use std::collections::BTreeMap;

use super::scoring::ScoredProduct;

pub const NAME_CELL_CHARS: usize = 40;
pub const MISSING_CELL: &str = "N/A";
pub const NEUTRAL_MATCH_SCORE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// 1-based.
    pub rank: usize,
    pub name: String,
    pub value: f64,
    pub price: f64,
    pub rating: f64,
    pub specs: BTreeMap<String, String>,
    pub locator: String,
}

/// Number the ranked products.
pub fn recommend(ranked: &[ScoredProduct]) -> Vec<Recommendation> {
    ranked
        .iter()
        .enumerate()
        .map(|(i, s)| Recommendation {
            rank: i + 1,
            name: s.record.name.clone(),
            value: s.value,
            price: s.record.price,
            rating: s.record.rating,
            specs: s.record.specs.clone(),
            locator: s.record.locator.clone(),
        })
        .collect()
}

/// One-line text per recommendation.
pub fn recommendation_summary(recs: &[Recommendation]) -> String {
    if recs.is_empty() {
        return "Ranked by value score".to_string();
    }
    recs.iter()
        .map(|r| {
            format!(
                "Recommend {}: value {:.2}, price ${}, rating {:.1}/5",
                r.name,
                r.value,
                format_thousands(r.price),
                r.rating
            )
        })
        .collect::<Vec<_>>()
        .join(". ")
}

/// `12990.4` → `"12,990"`.
pub fn format_thousands(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub name: String,
    pub price: f64,
    pub value: f64,
    pub rating: f64,
    /// Feature → raw value, `"N/A"` when the product lacks it.
    pub features: BTreeMap<String, String>,
}

/// Side-by-side table, best value first. Columns follow the weight map.
pub fn comparison_table(
    records: &[NormalizedRecord],
    weights: &WeightMap,
    values: &BTreeMap<String, f64>,
) -> Vec<ComparisonRow> {
    let mut rows: Vec<ComparisonRow> = records
        .iter()
        .map(|r| ComparisonRow {
            name: r.name.chars().take(NAME_CELL_CHARS).collect(),
            price: r.price,
            value: values.get(&r.locator).copied().unwrap_or(0.0),
            rating: r.rating,
            features: weights
                .keys()
                .map(|f| {
                    let cell = r
                        .specs
                        .get(f)
                        .cloned()
                        .unwrap_or_else(|| MISSING_CELL.to_string());
                    (f.clone(), cell)
                })
                .collect(),
        })
        .collect();
    rows.sort_by(|a, b| b.value.total_cmp(&a.value));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRef {
    pub name: String,
    pub price: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePerformanceStats {
    pub avg_price: f64,
    pub avg_value: f64,
    pub price_range: (f64, f64),
    pub best_value: ProductRef,
    pub most_expensive: ProductRef,
    pub cheapest: ProductRef,
}

/// Aggregate price/value figures. `None` for an empty collection.
///
/// Ties resolve to the first product in input order.
pub fn price_performance_stats(
    records: &[NormalizedRecord],
    values: &BTreeMap<String, f64>,
) -> Option<PricePerformanceStats> {
    let first = records.first()?;
    let value_of = |r: &NormalizedRecord| values.get(&r.locator).copied().unwrap_or(0.0);
    let to_ref = |r: &NormalizedRecord| ProductRef {
        name: r.name.clone(),
        price: r.price,
        value: value_of(r),
    };

    let mut best = first;
    let mut dearest = first;
    let mut cheapest = first;
    for r in records.iter().skip(1) {
        if value_of(r) > value_of(best) {
            best = r;
        }
        if r.price > dearest.price {
            dearest = r;
        }
        if r.price < cheapest.price {
            cheapest = r;
        }
    }

    let n = records.len() as f64;
    let avg_price = records.iter().map(|r| r.price).sum::<f64>() / n;
    let avg_value = if values.is_empty() {
        0.0
    } else {
        values.values().sum::<f64>() / values.len() as f64
    };

    Some(PricePerformanceStats {
        avg_price,
        avg_value,
        price_range: (cheapest.price, dearest.price),
        best_value: to_ref(best),
        most_expensive: to_ref(dearest),
        cheapest: to_ref(cheapest),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchVerdict {
    Recommended,
    Consider,
    Caution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    /// 50..=100.
    pub score: u32,
    pub matched_keywords: Vec<String>,
    pub verdict: MatchVerdict,
}

fn verdict_for(score: u32) -> MatchVerdict {
    if score > 70 {
        MatchVerdict::Recommended
    } else if score > 50 {
        MatchVerdict::Consider
    } else {
        MatchVerdict::Caution
    }
}

/// Keyword overlap between the requirement text and each product's name/specs.
///
/// Keywords are whitespace-separated, lower-cased and longer than two characters;
/// each hit adds 10 to a base of 50, capped at 100.
pub fn match_scores(records: &[NormalizedRecord], requirement: Option<&str>) -> BTreeMap<String, MatchScore> {
    let keywords: Vec<String> = requirement
        .unwrap_or_default()
        .to_lowercase()
        .split_whitespace()
        .filter(|k| k.chars().count() > 2)
        .map(str::to_string)
        .collect();

    records
        .iter()
        .map(|r| {
            let name = r.name.to_lowercase();
            let specs = r
                .specs
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();
            let matched: Vec<String> = keywords
                .iter()
                .filter(|k| name.contains(k.as_str()) || specs.contains(k.as_str()))
                .cloned()
                .collect();
            let score = (NEUTRAL_MATCH_SCORE + 10 * matched.len() as u32).min(100);
            (
                r.locator.clone(),
                MatchScore {
                    score,
                    matched_keywords: matched,
                    verdict: verdict_for(score),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(locator: &str, name: &str, price: f64) -> NormalizedRecord {
        NormalizedRecord {
            locator: locator.into(),
            name: name.into(),
            price,
            ..Default::default()
        }
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(12990.0), "12,990");
        assert_eq!(format_thousands(1234567.4), "1,234,567");
    }

    #[test]
    fn empty_summary_has_fallback_text() {
        assert_eq!(recommendation_summary(&[]), "Ranked by value score");
    }

    #[test]
    fn stats_pick_extremes() {
        let records = vec![rec("a", "A", 39900.0), rec("b", "B", 18900.0), rec("c", "C", 34900.0)];
        let values: BTreeMap<String, f64> =
            [("a".to_string(), 0.02), ("b".to_string(), 0.05), ("c".to_string(), 0.03)].into();
        let s = price_performance_stats(&records, &values).unwrap();
        assert_eq!(s.best_value.name, "B");
        assert_eq!(s.most_expensive.name, "A");
        assert_eq!(s.cheapest.name, "B");
        assert_eq!(s.price_range, (18900.0, 39900.0));
        assert!((s.avg_price - 31233.333).abs() < 0.001);
        assert!(price_performance_stats(&[], &values).is_none());
    }

    #[test]
    fn match_scores_count_long_keywords_only() {
        let mut r = rec("a", "Sony WH-1000XM5 Headphones", 9000.0);
        r.specs.insert("降噪".into(), "主動降噪".into());
        let out = match_scores(&[r], Some("sony headphones for travel ok"));
        let m = &out["a"];
        assert_eq!(m.matched_keywords, vec!["sony", "headphones"]);
        assert_eq!(m.score, 70);
        assert_eq!(m.verdict, MatchVerdict::Consider);
    }

    #[test]
    fn no_requirement_is_neutral() {
        let out = match_scores(&[rec("a", "A", 1.0)], None);
        assert_eq!(out["a"].score, 50);
        assert_eq!(out["a"].verdict, MatchVerdict::Caution);
    }

    #[test]
    fn comparison_marks_missing_cells() {
        let mut a = rec("a", "A product with a very long marketing name that goes on", 100.0);
        a.specs.insert("RAM".into(), "8GB".into());
        let b = rec("b", "B", 50.0);
        let weights: WeightMap = [("RAM".to_string(), 2.0)].into();
        let values: BTreeMap<String, f64> = [("a".to_string(), 1.0), ("b".to_string(), 2.0)].into();
        let rows = comparison_table(&[a, b], &weights, &values);
        assert_eq!(rows[0].name, "B");
        assert_eq!(rows[0].features["RAM"], "N/A");
        assert_eq!(rows[1].name.chars().count(), NAME_CELL_CHARS);
    }
}
