// src/acquire.rs
//! Listing acquisition seam. Scrapers live outside this crate; they plug in here.

use crate::record::RawRecord;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one listing. `None` means the locator could not be scraped.
    async fn fetch(&self, locator: &str) -> Option<RawRecord>;
    fn name(&self) -> &'static str;
}

/// In-memory listings keyed by locator (fixtures, demos, pre-scraped dumps).
#[derive(Debug, Clone, Default)]
pub struct StaticListings {
    by_locator: HashMap<String, RawRecord>,
}

impl StaticListings {
    pub fn new(records: impl IntoIterator<Item = RawRecord>) -> Self {
        Self {
            by_locator: records
                .into_iter()
                .map(|r| (r.locator.clone(), r))
                .collect(),
        }
    }

    /// Load a JSON array of raw records.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let records = load_raw_records(path)?;
        Ok(Self::new(records))
    }

    pub fn locators(&self) -> Vec<String> {
        let mut out: Vec<String> = self.by_locator.keys().cloned().collect();
        out.sort();
        out
    }
}

#[async_trait::async_trait]
impl ListingSource for StaticListings {
    async fn fetch(&self, locator: &str) -> Option<RawRecord> {
        self.by_locator.get(locator).cloned()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Read a JSON array of raw records, keeping file order.
pub fn load_raw_records(path: &Path) -> Result<Vec<RawRecord>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading products from {}", path.display()))?;
    let records: Vec<RawRecord> = serde_json::from_str(&data)
        .with_context(|| format!("parsing products from {}", path.display()))?;
    Ok(records)
}
