// src/record.rs
//! Product record shapes: untrusted raw listings and their cleaned counterparts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scraped field that may arrive as a number or as free text ("NT$12,990", "4.5 stars").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
}

impl Default for RawField {
    fn default() -> Self {
        RawField::Text(String::new())
    }
}

impl From<&str> for RawField {
    fn from(s: &str) -> Self {
        RawField::Text(s.to_string())
    }
}

impl From<String> for RawField {
    fn from(s: String) -> Self {
        RawField::Text(s)
    }
}

impl From<f64> for RawField {
    fn from(n: f64) -> Self {
        RawField::Number(n)
    }
}

/// Listing as handed over by the acquisition layer. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "url")]
    pub locator: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: RawField,
    #[serde(default)]
    pub rating: RawField,
    #[serde(default)]
    pub specs: BTreeMap<String, RawField>,
    #[serde(default)]
    pub reviews: Vec<String>,
}

impl RawRecord {
    /// Minimal constructor used by tests and demos.
    pub fn new(locator: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn price(mut self, price: impl Into<RawField>) -> Self {
        self.price = price.into();
        self
    }

    pub fn rating(mut self, rating: impl Into<RawField>) -> Self {
        self.rating = rating.into();
        self
    }

    pub fn spec(mut self, key: &str, value: impl Into<RawField>) -> Self {
        self.specs.insert(key.to_string(), value.into());
        self
    }
}

/// Cleaned record. Spec keys are canonical feature names; values stay textual.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub locator: String,
    pub name: String,
    pub price: f64,
    pub rating: f64,
    pub specs: BTreeMap<String, String>,
    pub reviews: Vec<String>,
}

/// Feature → raw values across the collection (only features shared by ≥80% of products).
pub type CommonFeatureIndex = BTreeMap<String, Vec<String>>;

/// Feature → importance multiplier.
pub type WeightMap = BTreeMap<String, f64>;
