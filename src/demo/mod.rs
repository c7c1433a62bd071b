//! Synthetic trade stream for the demo subcommand
//!
//! Random-walk prices over a fixed symbol universe, with occasional injected
//! anomalies: oversized prints, price jumps, and crossed books.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::trade::Trade;

pub const SYMBOLS: &[(&str, f64)] = &[
    ("AAPL", 150.0),
    ("GOOGL", 2800.0),
    ("MSFT", 420.0),
    ("AMZN", 185.0),
    ("TSLA", 250.0),
];

#[derive(Debug, Clone, Copy)]
enum Injection {
    PriceJump,
    OversizedPrint,
    CrossedBook,
}

const ALL_INJECTIONS: &[Injection] = &[
    Injection::PriceJump,
    Injection::OversizedPrint,
    Injection::CrossedBook,
];

pub struct TradeGenerator {
    prices: HashMap<String, f64>,
    clock: DateTime<Utc>,
    step: Duration,
    anomaly_rate: f64,
}

impl TradeGenerator {
    pub fn new(start: DateTime<Utc>, anomaly_rate: f64) -> Self {
        let mut prices = HashMap::new();
        for (symbol, base) in SYMBOLS {
            prices.insert(symbol.to_string(), *base);
        }
        Self {
            prices,
            clock: start,
            step: Duration::seconds(2),
            anomaly_rate,
        }
    }

    /// Jump the clock forward, e.g. to the start of the next trading day.
    pub fn advance_to(&mut self, time: DateTime<Utc>) {
        if time > self.clock {
            self.clock = time;
        }
    }

    /// Next synthetic trade. Injects an anomalous episode at the configured
    /// rate; otherwise drifts the symbol's price a few basis points.
    pub fn next_trade(&mut self) -> Trade {
        let mut rng = rand::thread_rng();

        let (symbol, _) = SYMBOLS[rng.gen_range(0..SYMBOLS.len())];
        let price = self.prices.entry(symbol.to_string()).or_insert(100.0);

        let mut size: u64 = rng.gen_range(50..500);
        let mut crossed = false;

        if rng.gen_bool(self.anomaly_rate.clamp(0.0, 1.0)) {
            match ALL_INJECTIONS[rng.gen_range(0..ALL_INJECTIONS.len())] {
                Injection::PriceJump => {
                    let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                    *price *= 1.0 + direction * rng.gen_range(0.08..0.15);
                }
                Injection::OversizedPrint => {
                    size = rng.gen_range(50_000..200_000);
                }
                Injection::CrossedBook => {
                    crossed = true;
                }
            }
        } else {
            *price *= 1.0 + rng.gen_range(-0.002..0.002);
        }

        let decimal_price = Decimal::from_f64(*price).unwrap_or_default().round_dp(2);
        let tick = Decimal::new(1, 2);
        let (bid, ask) = if crossed {
            (decimal_price + tick, decimal_price - tick)
        } else {
            (decimal_price - tick, decimal_price + tick)
        };

        let trade = Trade {
            symbol: symbol.to_string(),
            time: self.clock,
            price: decimal_price,
            size,
            bid,
            ask,
        };
        self.clock += self.step;
        trade
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_monotonic() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let mut generator = TradeGenerator::new(start, 0.0);

        let mut last = start - Duration::seconds(1);
        for _ in 0..100 {
            let trade = generator.next_trade();
            assert!(trade.time > last);
            last = trade.time;
        }
    }

    #[test]
    fn test_clean_stream_has_sane_books() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let mut generator = TradeGenerator::new(start, 0.0);

        for _ in 0..200 {
            let trade = generator.next_trade();
            assert!(trade.ask > trade.bid);
            assert!(trade.price > Decimal::ZERO);
            assert!(trade.size < 50_000);
        }
    }

    #[test]
    fn test_advance_to_never_rewinds() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let mut generator = TradeGenerator::new(start, 0.0);
        generator.next_trade();

        generator.advance_to(start - Duration::hours(1));
        assert!(generator.next_trade().time > start);
    }
}
