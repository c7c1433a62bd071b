//! Ingestion buffer
//!
//! Accumulates raw trades per symbol for the bulk/first-day batch pass. No
//! thresholds are evaluated here; this stage only assembles data. Records are
//! discarded once the batch pass consumes them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::trade::Trade;

/// A buffered trade with its delta against the previous trade of the symbol.
#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub time: DateTime<Utc>,
    /// Caller-assigned external id
    pub id: i64,
    pub price: Decimal,
    /// Price move against the previous buffered trade of the same symbol;
    /// zero for the symbol's first record. Rounded to 3 decimals.
    pub price_delta: Decimal,
    pub volume: u64,
    /// ask - bid at execution; negative means a crossed book
    pub bid_ask_spread: Decimal,
}

/// Per-symbol ordered trade history, bounded by the caller's batch size.
#[derive(Debug, Default)]
pub struct TradeBuffer {
    records: BTreeMap<String, Vec<TradeRecord>>,
}

impl TradeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a trade, deriving its delta from the last buffered record.
    pub fn push(&mut self, trade: &Trade, id: i64) {
        let history = self.records.entry(trade.symbol.clone()).or_default();
        let price_delta = match history.last() {
            Some(prev) => (trade.price - prev.price).round_dp(3),
            None => Decimal::ZERO,
        };
        history.push(TradeRecord {
            time: trade.time,
            id,
            price: trade.price,
            price_delta,
            volume: trade.size,
            bid_ask_spread: trade.ask - trade.bid,
        });
    }

    /// Total buffered records across all symbols.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drain all buffered history, symbol by symbol in name order.
    pub fn drain(&mut self) -> impl Iterator<Item = (String, Vec<TradeRecord>)> {
        std::mem::take(&mut self.records).into_iter()
    }
}
