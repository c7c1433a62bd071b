//! Anomaly types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};

/// Fixed anomaly vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorCode {
    /// Negative bid/ask spread (crossed book)
    Nbas,
    /// Volume spike, hourly or daily
    Vs,
    /// Pump and dump / bear raid
    Pdbr,
    /// Fat finger on price
    Ffp,
    /// Fat finger on volume
    Ffv,
}

impl ErrorCode {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCode::Nbas => "NBAS",
            ErrorCode::Vs => "VS",
            ErrorCode::Pdbr => "PDBR",
            ErrorCode::Ffp => "FFP",
            ErrorCode::Ffv => "FFV",
        }
    }
}

/// How far outside its threshold band an observation landed. 1 is worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    High,
    Moderate,
}

impl Severity {
    /// Numeric tier, 1 most severe.
    pub fn tier(&self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Moderate => 3,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.tier())
    }
}

/// What an anomaly points back at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalySource {
    /// A single trade, by caller-assigned id
    Trade { id: i64, time: DateTime<Utc> },
    /// An elapsed-hour window, 1-based from the first observed hour
    HourWindow { from_hour: usize },
    /// A whole trading day
    Day { date: NaiveDate },
}

/// One flagged observation, returned to the caller and never retained.
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub source: AnomalySource,
    pub description: String,
    pub code: ErrorCode,
    pub severity: Severity,
    pub symbol: String,
}

impl Anomaly {
    /// The trade id this anomaly references, if it is trade-level.
    pub fn trade_id(&self) -> Option<i64> {
        match self.source {
            AnomalySource::Trade { id, .. } => Some(id),
            _ => None,
        }
    }
}
