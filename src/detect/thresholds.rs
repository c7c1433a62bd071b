//! Severity-tier tables
//!
//! Each table is ordered strictest first and evaluated with first-match-wins
//! semantics, so at most one severity fires per check and a value sitting
//! exactly on the strictest band classifies as severity 1, never lower.

use crate::stats::RunningMoments;

use super::types::Severity;

/// One sigma-multiplier band and the severity it maps to.
#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub sigmas: f64,
    pub severity: Severity,
}

/// Per-trade fat-finger bands (price delta and volume).
pub const FAT_FINGER: [Tier; 3] = [
    Tier {
        sigmas: 7.0,
        severity: Severity::Critical,
    },
    Tier {
        sigmas: 6.0,
        severity: Severity::High,
    },
    Tier {
        sigmas: 5.0,
        severity: Severity::Moderate,
    },
];

/// Hourly volume-spike bands.
pub const HOURLY_SPIKE: [Tier; 3] = [
    Tier {
        sigmas: 5.0,
        severity: Severity::Critical,
    },
    Tier {
        sigmas: 4.0,
        severity: Severity::High,
    },
    Tier {
        sigmas: 3.0,
        severity: Severity::Moderate,
    },
];

/// Daily volume-spike and price-range bands.
pub const DAILY_SPIKE: [Tier; 3] = [
    Tier {
        sigmas: 7.0,
        severity: Severity::Critical,
    },
    Tier {
        sigmas: 6.0,
        severity: Severity::High,
    },
    Tier {
        sigmas: 5.0,
        severity: Severity::Moderate,
    },
];

/// Sigma multiplier for the hourly pump-and-dump price-range check.
pub const HOURLY_RANGE_SIGMAS: f64 = 2.0;

/// Strictest tier whose upper band `value` reaches, if any.
pub fn exceeds_upper(value: f64, moments: RunningMoments, tiers: &[Tier]) -> Option<Severity> {
    tiers
        .iter()
        .find(|tier| value >= moments.band(tier.sigmas))
        .map(|tier| tier.severity)
}

/// Strictest tier breached in either direction, if any.
pub fn exceeds_either(value: f64, moments: RunningMoments, tiers: &[Tier]) -> Option<Severity> {
    tiers
        .iter()
        .find(|tier| value >= moments.band(tier.sigmas) || value <= moments.band(-tier.sigmas))
        .map(|tier| tier.severity)
}
