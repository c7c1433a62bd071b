//! tickwatch: statistical trade surveillance over per-symbol trade streams
//!
//! This library provides the core components for:
//! - Buffered ingestion of a first day (or bulk import) of trades
//! - Per-symbol running statistics: Welford mean/stdev, hourly buckets,
//!   per-minute trade rate, day-level aggregates
//! - Severity-tiered anomaly classification: fat-finger price/volume errors,
//!   crossed books, hourly volume spikes, pump-and-dump / bear-raid patterns
//! - End-of-day reconciliation against persisted daily aggregates
//! - A pluggable persistence collaborator (SQLite and in-memory stores)
//! - A demo CLI driving the full pipeline over synthetic trades

pub mod buffer;
pub mod cli;
pub mod config;
pub mod demo;
pub mod detect;
pub mod stats;
pub mod store;
pub mod telemetry;
pub mod trade;
