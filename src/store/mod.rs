//! Persistence collaborator
//!
//! The engine computes, the store remembers. The contract is narrow: upsert a
//! symbol's running characteristics, answer two day-level aggregate queries,
//! and honor an explicit commit boundary. Implementations bind symbol names
//! and dates as query parameters, never by string interpolation.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("no trades recorded for {symbol} on {date}")]
    MissingDayData { symbol: String, date: NaiveDate },
    #[error("store unavailable")]
    Unavailable,
}

/// Snapshot of a symbol's running characteristics.
#[derive(Debug, Clone, Serialize)]
pub struct Characteristics {
    pub average_volume: f64,
    pub average_daily_volume: f64,
    pub average_price_change_daily: f64,
    pub average_price_change: f64,
    pub average_trades_per_minute: f64,
    pub last_price_change_percentage: f64,
    /// Zoned in the configured reporting timezone
    pub timestamp: DateTime<Tz>,
}

/// Max and min trade price over one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub max: Decimal,
    pub min: Decimal,
}

/// Contract between the detection engine and the persistence layer.
pub trait SymbolStore {
    /// Stage a symbol's characteristics for the next commit.
    fn upsert_characteristics(
        &mut self,
        symbol: &str,
        characteristics: &Characteristics,
    ) -> Result<(), StoreError>;

    /// Total traded size for a symbol over one calendar day.
    fn day_volume(&mut self, symbol: &str, date: NaiveDate) -> Result<i64, StoreError>;

    /// Max and min trade price for a symbol over one calendar day.
    fn day_price_range(&mut self, symbol: &str, date: NaiveDate) -> Result<PriceRange, StoreError>;

    /// Durability boundary: invoked after each batch pass, each end-of-day
    /// pass, and every flush interval of streamed trades. Staged writes lost
    /// before a commit are acceptable; committed ones are not.
    fn commit(&mut self) -> Result<(), StoreError>;
}
