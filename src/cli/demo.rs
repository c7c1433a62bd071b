//! Demo command: a batch day, a streamed day, then end-of-day reconciliation

use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};
use clap::Args;
use tracing::{info, warn};

use crate::config::Config;
use crate::demo::TradeGenerator;
use crate::detect::{Anomaly, AnomalyDetector};
use crate::store::SqliteStore;
use crate::trade::Trade;

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Trades to generate for the batch (first) day
    #[arg(long, default_value_t = 5000)]
    pub batch_trades: usize,

    /// Trades to stream for the second day
    #[arg(long, default_value_t = 2000)]
    pub stream_trades: usize,

    /// Fraction of trades carrying an injected anomaly
    #[arg(long, default_value_t = 0.01)]
    pub anomaly_rate: f64,

    /// Keep the store in memory instead of the configured SQLite file
    #[arg(long)]
    pub ephemeral: bool,
}

impl DemoArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = if self.ephemeral {
            SqliteStore::open_in_memory()?
        } else {
            SqliteStore::open(&config.store.path)?
        };
        let mut detector = AnomalyDetector::new(config.detector.clone(), store);

        let day_one = Utc
            .with_ymd_and_hms(2026, 8, 24, 8, 0, 0)
            .single()
            .context("invalid demo start time")?;
        let mut generator = TradeGenerator::new(day_one, self.anomaly_rate);
        let mut id: i64 = 0;

        // Day one: buffer everything, then run the batch pass.
        for _ in 0..self.batch_trades {
            let trade = generator.next_trade();
            record(&mut detector, &trade)?;
            detector.ingest(&trade, id);
            id += 1;
        }
        let anomalies = detector.analyze_batch()?;
        info!(
            trades = self.batch_trades,
            anomalies = anomalies.len(),
            "batch day analyzed"
        );
        emit(&anomalies)?;

        // Day two: stream trade by trade.
        generator.advance_to(day_one + Duration::days(1));
        for _ in 0..self.stream_trades {
            let trade = generator.next_trade();
            record(&mut detector, &trade)?;
            let found = detector.analyze_trade(&trade, id)?;
            emit(&found)?;
            id += 1;
        }
        info!(trades = self.stream_trades, "stream day analyzed");

        // Reconcile the streamed day once it has elapsed.
        let report = detector.analyze_end_of_day((day_one + Duration::days(2)).date_naive());
        emit(&report.anomalies)?;
        for (symbol, error) in &report.failed_symbols {
            warn!(symbol = %symbol, %error, "symbol skipped in end-of-day pass");
        }
        if let Some(error) = report.commit_error {
            return Err(error.into());
        }
        info!(anomalies = report.anomalies.len(), "end of day reconciled");

        Ok(())
    }
}

fn record(detector: &mut AnomalyDetector<SqliteStore>, trade: &Trade) -> anyhow::Result<()> {
    detector
        .store_mut()
        .record_trade(&trade.symbol, trade.time.date_naive(), trade.price, trade.size)?;
    Ok(())
}

fn emit(anomalies: &[Anomaly]) -> anyhow::Result<()> {
    for anomaly in anomalies {
        println!("{}", serde_json::to_string(anomaly)?);
    }
    Ok(())
}
