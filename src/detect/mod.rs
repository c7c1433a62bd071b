//! Anomaly classification
//!
//! Severity-tiered detection of fat-finger errors, crossed books, volume
//! spikes and pump-and-dump / bear-raid patterns, over the statistics
//! engine's per-symbol running state.

mod engine;
pub mod thresholds;
mod types;

pub use engine::{AnomalyDetector, DetectError, EndOfDayReport};
pub use types::{Anomaly, AnomalySource, ErrorCode, Severity};
