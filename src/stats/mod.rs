//! Statistics engine
//!
//! Owns the numerically sensitive pieces: Welford running moments and the
//! per-symbol aggregate state (hourly buckets, trade rate, day-level moments).

mod symbol;
mod welford;

pub use symbol::SymbolStats;
pub use welford::RunningMoments;
