//! # Local importance heuristic
//!
//! Offline stand-in for the AI-assisted importance estimate. Maps a feature name
//! to a weight in `[1.0, 3.0]`:
//!
//! 1. Exact (case-folded) match in [`IMPORTANCE_TABLE`].
//! 2. Otherwise the highest table weight whose keyword contains, or is contained
//!    in, the feature name; `1.0` if nothing matches.
//! 3. Frequency adjustment: features present in ≥80% of products gain up to
//!    `+0.3`, features in <50% lose up to `0.3`.
//! 4. A uniform jitter in `±0.15` breaks ties, then the result is clamped to
//!    `[1.0, 3.0]` and rounded to two decimals.
//!
//! The table and thresholds are frozen policy: they decide rankings.

use crate::record::{NormalizedRecord, WeightMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub const MIN_WEIGHT: f64 = 1.0;
pub const MAX_WEIGHT: f64 = 3.0;
pub const DEFAULT_IMPORTANCE: f64 = 1.0;

pub const HIGH_FREQUENCY_RATIO: f64 = 0.8;
pub const LOW_FREQUENCY_RATIO: f64 = 0.5;
pub const FREQUENCY_ADJUSTMENT: f64 = 0.3;
pub const JITTER: f64 = 0.15;

/// Keyword → importance. Exact matches are resolved in table order.
pub const IMPORTANCE_TABLE: &[(&str, f64)] = &[
    // performance, battery, noise cancellation
    ("降噪", 3.0),
    ("主動降噪", 3.0),
    ("續航", 3.0),
    ("續航時間", 3.0),
    ("電池", 3.0),
    ("電池容量", 3.0),
    ("battery", 3.0),
    ("cpu", 3.0),
    ("處理器", 3.0),
    ("處理器性能", 3.0),
    ("ram", 3.0),
    ("記憶體", 3.0),
    ("運行記憶體", 3.0),
    ("性能", 3.0),
    ("計算能力", 3.0),
    // brand, type, screen, design, connectivity
    ("品牌", 2.5),
    ("品牌信譽", 2.5),
    ("brand", 2.5),
    ("類型", 2.5),
    ("產品類型", 2.5),
    ("螢幕", 2.5),
    ("螢幕尺寸", 2.5),
    ("screen", 2.5),
    ("display", 2.5),
    ("解析度", 2.5),
    ("resolution", 2.5),
    ("設計", 2.5),
    ("外觀", 2.5),
    ("連接", 2.0),
    ("連接方式", 2.0),
    ("藍牙", 2.0),
    ("bluetooth", 2.0),
    ("音質", 2.5),
    ("聲音", 2.0),
    ("喇叭", 2.0),
    ("防水", 2.0),
    ("防塵", 2.0),
    ("防水等級", 2.0),
    // model, warranty, physical
    ("型號", 1.5),
    ("型號代碼", 1.5),
    ("model", 1.5),
    ("保固", 1.5),
    ("保修", 1.5),
    ("售後", 1.5),
    ("重量", 1.5),
    ("weight", 1.5),
    ("尺寸", 1.5),
    ("厚度", 1.5),
    ("材質", 1.5),
    ("材料", 1.5),
    // price, colour
    ("價格", 1.0),
    ("price", 1.0),
    ("顏色", 1.0),
    ("配色", 1.0),
];

/// Table weight before frequency adjustment and jitter.
pub fn table_weight(feature: &str) -> f64 {
    let folded = feature.trim().to_lowercase();

    if let Some((_, w)) = IMPORTANCE_TABLE.iter().find(|(k, _)| k.to_lowercase() == folded) {
        return *w;
    }

    IMPORTANCE_TABLE
        .iter()
        .filter(|(k, _)| {
            let k = k.to_lowercase();
            folded.contains(&k) || k.contains(&folded)
        })
        .map(|(_, w)| *w)
        .fold(DEFAULT_IMPORTANCE, f64::max)
}

/// Share of `records` whose specs carry `feature`.
pub fn appearance_ratio(feature: &str, records: &[NormalizedRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let count = records
        .iter()
        .filter(|r| r.specs.contains_key(feature))
        .count();
    count as f64 / records.len() as f64
}

/// Nudge `weight` by how widespread the feature is. A ratio of 0 means "unseen" and is left alone.
pub fn frequency_adjusted(weight: f64, ratio: f64) -> f64 {
    if ratio <= 0.0 {
        weight
    } else if ratio >= HIGH_FREQUENCY_RATIO {
        (weight + FREQUENCY_ADJUSTMENT).min(MAX_WEIGHT)
    } else if ratio < LOW_FREQUENCY_RATIO {
        (weight - FREQUENCY_ADJUSTMENT).max(MIN_WEIGHT)
    } else {
        weight
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Stateful heuristic: owns the jitter source so tests can seed or disable it.
#[derive(Debug)]
pub struct LocalHeuristic {
    rng: Mutex<StdRng>,
    jitter: f64,
}

impl Default for LocalHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHeuristic {
    /// OS-seeded jitter of ±0.15.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
            jitter: JITTER,
        }
    }

    /// Reproducible jitter sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            jitter: JITTER,
        }
    }

    /// No jitter at all: weights are the table value after frequency adjustment.
    pub fn without_jitter() -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(0)),
            jitter: 0.0,
        }
    }

    fn sample_jitter(&self) -> f64 {
        if self.jitter <= 0.0 {
            return 0.0;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.random_range(-self.jitter..=self.jitter)
    }

    /// Importance of one feature given the collection it was observed in.
    pub fn estimate(&self, feature: &str, records: &[NormalizedRecord]) -> f64 {
        let base = table_weight(feature);
        let adjusted = frequency_adjusted(base, appearance_ratio(feature, records));
        let jittered = adjusted + self.sample_jitter();
        round2(jittered.clamp(MIN_WEIGHT, MAX_WEIGHT))
    }

    /// Weight map covering every feature in `features`.
    pub fn estimate_all(&self, features: &[String], records: &[NormalizedRecord]) -> WeightMap {
        features
            .iter()
            .map(|f| (f.clone(), self.estimate(f, records)))
            .collect()
    }
}
