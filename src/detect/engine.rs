//! Detection entry points
//!
//! `AnomalyDetector` owns the per-symbol statistics registry and evaluates
//! trades against it in three modes that share the same running state: bulk
//! batch over the ingestion buffer, single-trade streaming updates, and
//! end-of-day reconciliation of persisted day aggregates.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::buffer::{TradeBuffer, TradeRecord};
use crate::config::DetectorConfig;
use crate::stats::{RunningMoments, SymbolStats};
use crate::store::{Characteristics, StoreError, SymbolStore};
use crate::trade::Trade;

use super::thresholds::{
    self, DAILY_SPIKE, FAT_FINGER, HOURLY_RANGE_SIGMAS, HOURLY_SPIKE,
};
use super::types::{Anomaly, AnomalySource, ErrorCode, Severity};

/// Detection errors surfaced to the caller.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Analysis was invoked before any baseline exists for the symbol.
    /// Threshold math against a zero sample count is undefined, so this
    /// fails fast instead of producing NaN bands.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Persisting state failed. Detection itself already completed, so the
    /// anomalies found by the failing call ride along rather than being lost.
    #[error("store failure: {source}")]
    Store {
        #[source]
        source: StoreError,
        anomalies: Vec<Anomaly>,
    },
}

impl DetectError {
    /// Recover the anomalies computed by a call that failed at the
    /// persistence boundary.
    pub fn into_anomalies(self) -> Vec<Anomaly> {
        match self {
            DetectError::Store { anomalies, .. } => anomalies,
            DetectError::UnknownSymbol(_) => Vec::new(),
        }
    }
}

/// Outcome of an end-of-day pass. Failures are localized per symbol: one
/// symbol's missing day data never aborts or corrupts the rest of the pass.
#[derive(Debug, Default)]
pub struct EndOfDayReport {
    pub anomalies: Vec<Anomaly>,
    pub failed_symbols: Vec<(String, StoreError)>,
    pub commit_error: Option<StoreError>,
}

impl EndOfDayReport {
    pub fn is_clean(&self) -> bool {
        self.failed_symbols.is_empty() && self.commit_error.is_none()
    }
}

/// Per-symbol statistical engine and anomaly classifier.
pub struct AnomalyDetector<S: SymbolStore> {
    config: DetectorConfig,
    store: S,
    buffer: TradeBuffer,
    stats: BTreeMap<String, SymbolStats>,
    prev_price: BTreeMap<String, Decimal>,
    unflushed: usize,
}

impl<S: SymbolStore> AnomalyDetector<S> {
    pub fn new(config: DetectorConfig, store: S) -> Self {
        Self {
            config,
            store,
            buffer: TradeBuffer::new(),
            stats: BTreeMap::new(),
            prev_price: BTreeMap::new(),
            unflushed: 0,
        }
    }

    /// Buffer a trade for the batch pass. No thresholds run here.
    pub fn ingest(&mut self, trade: &Trade, id: i64) {
        self.buffer.push(trade, id);
        match self.stats.get_mut(&trade.symbol) {
            Some(stats) => stats.observe_minute(trade.time),
            None => {
                self.stats
                    .insert(trade.symbol.clone(), SymbolStats::open(trade.time, trade.price));
            }
        }
    }

    /// Trades currently held in the ingestion buffer.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self, symbol: &str) -> Option<&SymbolStats> {
        self.stats.get(symbol)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the buffered history and analyze each symbol independently:
    /// fat-finger scans over the whole batch, spread checks, hourly
    /// bucketing, and volume-spike / pump-and-dump detection across hours.
    /// Establishes the streaming baseline for every symbol seen.
    ///
    /// A persistence failure on one symbol never skips the analysis of the
    /// rest: every symbol's in-memory state is updated before its upsert, the
    /// pass runs to completion, and the first store error is surfaced at the
    /// end, carrying everything found.
    pub fn analyze_batch(&mut self) -> Result<Vec<Anomaly>, DetectError> {
        let mut anomalies = Vec::new();
        let mut failure: Option<StoreError> = None;
        let batches: Vec<_> = self.buffer.drain().collect();

        for (symbol, records) in batches {
            if records.is_empty() {
                continue;
            }
            if let Err(source) = self.batch_symbol(&symbol, &records, &mut anomalies) {
                warn!(symbol = %symbol, error = %source, "batch persistence failed");
                failure.get_or_insert(source);
            }
        }

        if let Err(source) = self.store.commit() {
            failure.get_or_insert(source);
        }
        match failure {
            Some(source) => Err(DetectError::Store { source, anomalies }),
            None => Ok(anomalies),
        }
    }

    fn batch_symbol(
        &mut self,
        symbol: &str,
        records: &[TradeRecord],
        out: &mut Vec<Anomaly>,
    ) -> Result<(), StoreError> {
        let deltas: Vec<f64> = records
            .iter()
            .map(|r| to_f64_lossy(r.price_delta))
            .collect();
        let volumes: Vec<f64> = records.iter().map(|r| r.volume as f64).collect();
        let delta_moments = RunningMoments::of_population(&deltas);
        let volume_moments = RunningMoments::of_population(&volumes);

        let first = &records[0];
        let last = &records[records.len() - 1];

        let Some(stats) = self.stats.get_mut(symbol) else {
            return Ok(());
        };

        stats.delta = delta_moments;
        stats.volume = volume_moments;
        stats.trade_count = records.len() as u64;
        stats.daily_volume = RunningMoments {
            mean: volumes.iter().sum(),
            stdev: 0.0,
        };
        stats.day_price_change = RunningMoments {
            mean: to_f64_lossy(last.price - first.price),
            stdev: 0.0,
        };
        stats.day_count = 1;
        stats.price_change_percentage = if records.len() >= 2 {
            price_ratio(last.price, records[records.len() - 2].price)
        } else {
            1.0
        };

        // Fat-finger scans over the whole batch: two-sided on price deltas,
        // one-sided on volume.
        for (record, delta) in records.iter().zip(&deltas) {
            if let Some(severity) = thresholds::exceeds_either(*delta, delta_moments, &FAT_FINGER) {
                out.push(Anomaly {
                    source: AnomalySource::Trade {
                        id: record.id,
                        time: record.time,
                    },
                    description: format!("Fat finger error on price for {symbol}"),
                    code: ErrorCode::Ffp,
                    severity,
                    symbol: symbol.to_string(),
                });
            }
        }
        for (record, volume) in records.iter().zip(&volumes) {
            if let Some(severity) = thresholds::exceeds_upper(*volume, volume_moments, &FAT_FINGER) {
                out.push(Anomaly {
                    source: AnomalySource::Trade {
                        id: record.id,
                        time: record.time,
                    },
                    description: format!("Fat finger error on volume for {symbol}"),
                    code: ErrorCode::Ffv,
                    severity,
                    symbol: symbol.to_string(),
                });
            }
        }

        // Time-ordered walk: hourly buckets and spread checks.
        for record in records {
            stats.bucket_hour(record.time, record.price, record.volume);
            if record.bid_ask_spread < Decimal::ZERO {
                out.push(Anomaly {
                    source: AnomalySource::Trade {
                        id: record.id,
                        time: record.time,
                    },
                    description: format!("Negative bid ask spread for {symbol}"),
                    code: ErrorCode::Nbas,
                    severity: Severity::Critical,
                    symbol: symbol.to_string(),
                });
            }
        }

        // Volume spikes across hours; a flagged hour is further checked for a
        // pump-and-dump price range, inheriting the spike's severity.
        let hourly: Vec<f64> = stats.hourly_vol.iter().map(|v| *v as f64).collect();
        let ranges: Vec<f64> = stats
            .hourly_max_change
            .iter()
            .map(|r| to_f64_lossy(*r))
            .collect();
        let hourly_moments = RunningMoments::of_population(&hourly);
        let range_moments = RunningMoments::of_population(&ranges);

        for (hour, volume) in hourly.iter().enumerate() {
            if let Some(severity) = thresholds::exceeds_upper(*volume, hourly_moments, &HOURLY_SPIKE)
            {
                out.push(Anomaly {
                    source: AnomalySource::HourWindow {
                        from_hour: hour + 1,
                    },
                    description: format!(
                        "Hourly volume spike from hour {} to {} for {symbol}",
                        hour + 1,
                        hour + 2
                    ),
                    code: ErrorCode::Vs,
                    severity,
                    symbol: symbol.to_string(),
                });
                if ranges[hour] > range_moments.band(HOURLY_RANGE_SIGMAS) {
                    out.push(Anomaly {
                        source: AnomalySource::HourWindow {
                            from_hour: hour + 1,
                        },
                        description: format!(
                            "Hourly pump and dump/bear raid from hour {} to {} for {symbol}",
                            hour + 1,
                            hour + 2
                        ),
                        code: ErrorCode::Pdbr,
                        severity,
                        symbol: symbol.to_string(),
                    });
                }
            }
        }

        self.prev_price.insert(symbol.to_string(), last.price);

        let characteristics = characteristics_of(stats, self.config.timezone);
        self.store.upsert_characteristics(symbol, &characteristics)?;
        debug!(symbol, trades = records.len(), "batch pass complete");
        Ok(())
    }

    /// Evaluate one streamed trade against the symbol's pre-update moments,
    /// then fold it into the running state. Requires a baseline established
    /// by a prior batch pass for the symbol.
    pub fn analyze_trade(&mut self, trade: &Trade, id: i64) -> Result<Vec<Anomaly>, DetectError> {
        let symbol = trade.symbol.as_str();
        let prev = *self
            .prev_price
            .get(symbol)
            .ok_or_else(|| DetectError::UnknownSymbol(symbol.to_string()))?;
        let Some(stats) = self.stats.get_mut(symbol) else {
            return Err(DetectError::UnknownSymbol(symbol.to_string()));
        };
        if stats.trade_count == 0 {
            return Err(DetectError::UnknownSymbol(symbol.to_string()));
        }

        let delta = to_f64_lossy(trade.price - prev);
        let volume = trade.size as f64;
        let count = stats.trade_count + 1;

        // Classify against the moments as they stood before this trade.
        let mut anomalies = Vec::new();
        if let Some(severity) = thresholds::exceeds_upper(delta, stats.delta, &FAT_FINGER) {
            anomalies.push(Anomaly {
                source: AnomalySource::Trade {
                    id,
                    time: trade.time,
                },
                description: format!("Fat finger error on price for {symbol}"),
                code: ErrorCode::Ffp,
                severity,
                symbol: symbol.to_string(),
            });
        }
        if let Some(severity) = thresholds::exceeds_upper(volume, stats.volume, &FAT_FINGER) {
            anomalies.push(Anomaly {
                source: AnomalySource::Trade {
                    id,
                    time: trade.time,
                },
                description: format!("Fat finger error on volume for {symbol}"),
                code: ErrorCode::Ffv,
                severity,
                symbol: symbol.to_string(),
            });
        }

        stats.delta = stats.delta.fold(count, delta);
        stats.volume = stats.volume.fold(count, volume);
        stats.trade_count = count;
        stats.price_change_percentage = price_ratio(trade.price, prev);
        stats.observe_minute(trade.time);

        let characteristics = characteristics_of(stats, self.config.timezone);

        // Previous price moves last among state updates, after every delta
        // computation; persistence below may fail without touching it.
        self.prev_price.insert(symbol.to_string(), trade.price);

        if let Err(source) = self.store.upsert_characteristics(symbol, &characteristics) {
            return Err(DetectError::Store { source, anomalies });
        }
        self.unflushed += 1;
        if self.unflushed >= self.config.flush_interval {
            if let Err(source) = self.store.commit() {
                return Err(DetectError::Store { source, anomalies });
            }
            self.unflushed = 0;
            debug!(symbol, "characteristics flushed");
        }

        Ok(anomalies)
    }

    /// Fold the prior day's persisted aggregates into each symbol's
    /// day-level moments and check for daily volume spikes and
    /// pump-and-dump patterns. Must be invoked exactly once per elapsed
    /// calendar day.
    pub fn analyze_end_of_day(&mut self, date: NaiveDate) -> EndOfDayReport {
        let mut report = EndOfDayReport::default();
        let prior = date - Duration::days(1);

        let symbols: Vec<String> = self.prev_price.keys().cloned().collect();
        for symbol in symbols {
            if let Err(error) = self.reconcile_symbol(&symbol, prior, &mut report.anomalies) {
                warn!(symbol = %symbol, %error, "end-of-day reconciliation failed");
                report.failed_symbols.push((symbol, error));
            }
        }

        if let Err(error) = self.store.commit() {
            report.commit_error = Some(error);
        }
        report
    }

    fn reconcile_symbol(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        out: &mut Vec<Anomaly>,
    ) -> Result<(), StoreError> {
        let volume = self.store.day_volume(symbol, date)? as f64;
        let range = self.store.day_price_range(symbol, date)?;

        let Some(stats) = self.stats.get_mut(symbol) else {
            return Ok(());
        };
        let change = to_f64_lossy(range.min - range.max);

        // Classify against the day-level moments as they stood before this
        // day, then fold the observations in.
        if let Some(severity) = thresholds::exceeds_upper(volume, stats.daily_volume, &DAILY_SPIKE) {
            out.push(Anomaly {
                source: AnomalySource::Day { date },
                description: format!("Volume spike over past day for {symbol}"),
                code: ErrorCode::Vs,
                severity,
                symbol: symbol.to_string(),
            });
            if let Some(severity) =
                thresholds::exceeds_upper(change, stats.day_price_change, &DAILY_SPIKE)
            {
                out.push(Anomaly {
                    source: AnomalySource::Day { date },
                    description: format!("Pump and dump/bear raid over past day for {symbol}"),
                    code: ErrorCode::Pdbr,
                    severity,
                    symbol: symbol.to_string(),
                });
            }
        }

        let day_count = stats.day_count + 1;
        stats.daily_volume = stats.daily_volume.fold(day_count, volume);
        stats.day_price_change = stats.day_price_change.fold(day_count, change);
        stats.day_count = day_count;

        let characteristics = characteristics_of(stats, self.config.timezone);
        self.store.upsert_characteristics(symbol, &characteristics)?;
        debug!(symbol, day = %date, "day reconciled");
        Ok(())
    }
}

fn characteristics_of(stats: &SymbolStats, timezone: Tz) -> Characteristics {
    Characteristics {
        average_volume: stats.volume.mean,
        average_daily_volume: stats.daily_volume.mean,
        average_price_change_daily: stats.day_price_change.mean,
        average_price_change: stats.delta.mean,
        average_trades_per_minute: stats.trades_per_minute(),
        last_price_change_percentage: stats.price_change_percentage,
        timestamp: Utc::now().with_timezone(&timezone),
    }
}

fn price_ratio(new: Decimal, old: Decimal) -> f64 {
    if old.is_zero() {
        return 1.0;
    }
    (new / old).to_f64().unwrap_or(1.0)
}

/// Decimal to f64 at the statistics boundary. Every in-range Decimal
/// converts; a failure means corrupt input, so it is loud rather than a
/// silent zero.
fn to_f64_lossy(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_else(|| {
        debug_assert!(false, "unconvertible decimal {value}");
        warn!(%value, "decimal failed f64 conversion, treating as zero");
        0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_lossy_conversion_preserves_values() {
        assert_eq!(to_f64_lossy(dec!(0.001)), 0.001);
        assert_eq!(to_f64_lossy(dec!(-39.9)), -39.9);
        assert!(to_f64_lossy(Decimal::MAX) > 7.9e28);
    }
}
