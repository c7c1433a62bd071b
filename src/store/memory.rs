//! In-memory store, for tests and ephemeral runs

use std::collections::HashMap;

use chrono::NaiveDate;

use super::{Characteristics, PriceRange, StoreError, SymbolStore};

/// A `SymbolStore` backed by maps. Day-level aggregates are seeded by the
/// caller; commits move staged characteristics into the committed view and
/// are counted, which is what flush-cadence tests assert on.
#[derive(Debug, Default)]
pub struct MemoryStore {
    staged: HashMap<String, Characteristics>,
    committed: HashMap<String, Characteristics>,
    day_volumes: HashMap<(String, NaiveDate), i64>,
    day_ranges: HashMap<(String, NaiveDate), PriceRange>,
    commits: usize,
    fail_commits: bool,
    fail_upserts_for: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the answer to a day-volume query.
    pub fn set_day_volume(&mut self, symbol: &str, date: NaiveDate, volume: i64) {
        self.day_volumes.insert((symbol.to_string(), date), volume);
    }

    /// Seed the answer to a day-price-range query.
    pub fn set_day_range(&mut self, symbol: &str, date: NaiveDate, range: PriceRange) {
        self.day_ranges.insert((symbol.to_string(), date), range);
    }

    /// Make every subsequent commit fail with `StoreError::Unavailable`.
    pub fn fail_commits(&mut self) {
        self.fail_commits = true;
    }

    /// Make upserts for one symbol fail with `StoreError::Unavailable`.
    pub fn fail_upserts_for(&mut self, symbol: &str) {
        self.fail_upserts_for = Some(symbol.to_string());
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn staged(&self, symbol: &str) -> Option<&Characteristics> {
        self.staged.get(symbol)
    }

    pub fn committed(&self, symbol: &str) -> Option<&Characteristics> {
        self.committed.get(symbol)
    }
}

impl SymbolStore for MemoryStore {
    fn upsert_characteristics(
        &mut self,
        symbol: &str,
        characteristics: &Characteristics,
    ) -> Result<(), StoreError> {
        if self.fail_upserts_for.as_deref() == Some(symbol) {
            return Err(StoreError::Unavailable);
        }
        self.staged
            .insert(symbol.to_string(), characteristics.clone());
        Ok(())
    }

    fn day_volume(&mut self, symbol: &str, date: NaiveDate) -> Result<i64, StoreError> {
        self.day_volumes
            .get(&(symbol.to_string(), date))
            .copied()
            .ok_or_else(|| StoreError::MissingDayData {
                symbol: symbol.to_string(),
                date,
            })
    }

    fn day_price_range(&mut self, symbol: &str, date: NaiveDate) -> Result<PriceRange, StoreError> {
        self.day_ranges
            .get(&(symbol.to_string(), date))
            .copied()
            .ok_or_else(|| StoreError::MissingDayData {
                symbol: symbol.to_string(),
                date,
            })
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.fail_commits {
            return Err(StoreError::Unavailable);
        }
        self.committed.extend(self.staged.drain());
        self.commits += 1;
        Ok(())
    }
}
