//! Trade input type

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single trade event for one symbol.
///
/// `ask >= bid` is assumed but not enforced; a crossed book is itself an
/// anomaly signal and is flagged by the classifier rather than rejected here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Instrument identifier (e.g., "AAPL")
    pub symbol: String,
    /// Execution timestamp
    pub time: DateTime<Utc>,
    /// Trade price
    pub price: Decimal,
    /// Traded size
    pub size: u64,
    /// Best bid at execution
    pub bid: Decimal,
    /// Best ask at execution
    pub ask: Decimal,
}
