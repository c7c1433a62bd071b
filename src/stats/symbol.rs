//! Per-symbol running state
//!
//! One `SymbolStats` exists per symbol for the process lifetime. It reflects
//! every trade the engine has seen for that symbol, in arrival order, with no
//! retroactive correction.

use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;

use super::RunningMoments;

/// Running aggregates for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolStats {
    /// Trades counted against the currently open minute bucket
    trades_this_minute: u64,
    /// Average trades per minute over closed minute buckets
    closed_rate: f64,
    /// Minute buckets opened so far
    minutes: u64,
    /// Total trades across closed minute buckets
    prior_minutes_total: u64,
    /// Epoch-minute of the open minute bucket. Monotonic, so the rate never
    /// wraps at hour boundaries the way a minute-of-hour marker would.
    minute_marker: i64,

    /// Hour-of-day of the open hour bucket
    hour_marker: u32,
    /// Volume accumulated per elapsed hour, append-only within a day
    pub hourly_vol: Vec<u64>,
    /// Price range of each closed hour; the final, still-open hour stays zero
    pub hourly_max_change: Vec<Decimal>,
    hourly_max: Decimal,
    hourly_min: Decimal,

    /// Price-delta moments over every trade seen
    pub delta: RunningMoments,
    /// Volume moments over every trade seen
    pub volume: RunningMoments,
    pub trade_count: u64,

    /// Day-level moments of total daily volume
    pub daily_volume: RunningMoments,
    /// Day-level moments of the daily price range (min - max)
    pub day_price_change: RunningMoments,
    pub day_count: u64,

    /// Ratio of the last trade price to the one before it
    pub price_change_percentage: f64,
}

impl SymbolStats {
    /// State as of a symbol's first observed trade.
    pub fn open(time: DateTime<Utc>, price: Decimal) -> Self {
        Self {
            trades_this_minute: 1,
            closed_rate: 0.0,
            minutes: 1,
            prior_minutes_total: 0,
            minute_marker: time.timestamp().div_euclid(60),
            hour_marker: time.hour(),
            hourly_vol: vec![0],
            hourly_max_change: vec![Decimal::ZERO],
            hourly_max: price,
            hourly_min: price,
            delta: RunningMoments::default(),
            volume: RunningMoments::default(),
            trade_count: 0,
            daily_volume: RunningMoments::default(),
            day_price_change: RunningMoments::default(),
            day_count: 0,
            price_change_percentage: 1.0,
        }
    }

    /// Count one trade against the rolling per-minute rate, closing the open
    /// minute bucket first if the trade falls into a later minute.
    pub fn observe_minute(&mut self, time: DateTime<Utc>) {
        let marker = time.timestamp().div_euclid(60);
        if marker != self.minute_marker {
            self.closed_rate =
                (self.prior_minutes_total + self.trades_this_minute) as f64 / self.minutes as f64;
            self.prior_minutes_total += self.trades_this_minute;
            self.minutes += 1;
            self.trades_this_minute = 0;
            self.minute_marker = marker;
        }
        self.trades_this_minute += 1;
    }

    /// Current trades-per-minute estimate. Until the first minute bucket
    /// closes this is the raw count of the opening minute.
    pub fn trades_per_minute(&self) -> f64 {
        if self.minutes == 1 {
            self.trades_this_minute as f64
        } else {
            self.closed_rate
        }
    }

    /// Fold one trade into the hourly volume and price-range buckets.
    ///
    /// While the hour-of-day is unchanged the open bucket accumulates volume
    /// and tracks the hour's max/min price. On a change the previous bucket's
    /// range is closed into `hourly_max_change` and a new bucket opens seeded
    /// from this trade: its price as max and min, its volume as the sum.
    pub fn bucket_hour(&mut self, time: DateTime<Utc>, price: Decimal, volume: u64) {
        let hour = time.hour();
        if hour != self.hour_marker {
            let range = self.hourly_max - self.hourly_min;
            if let Some(last) = self.hourly_max_change.last_mut() {
                *last = range;
            }
            self.hourly_max_change.push(Decimal::ZERO);
            self.hourly_vol.push(volume);
            self.hourly_max = price;
            self.hourly_min = price;
            self.hour_marker = hour;
        } else {
            if let Some(open) = self.hourly_vol.last_mut() {
                *open += volume;
            }
            if price > self.hourly_max {
                self.hourly_max = price;
            }
            if price < self.hourly_min {
                self.hourly_min = price;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, min, sec).unwrap()
    }

    #[test]
    fn test_hour_buckets_close_on_hour_change() {
        let mut stats = SymbolStats::open(at(9, 58, 0), dec!(100));

        stats.bucket_hour(at(9, 58, 0), dec!(100), 10);
        stats.bucket_hour(at(9, 59, 0), dec!(101), 20);
        stats.bucket_hour(at(10, 1, 0), dec!(105), 30);

        // 09 bucket holds only the 09:xx volume; 10 starts fresh
        assert_eq!(stats.hourly_vol, vec![30, 30]);
        // Closed 09 range covers only the 09:xx prices
        assert_eq!(stats.hourly_max_change[0], dec!(1));
        // The open 10 bucket has no closed range yet
        assert_eq!(stats.hourly_max_change[1], dec!(0));
    }

    #[test]
    fn test_hour_bucket_tracks_max_and_min() {
        let mut stats = SymbolStats::open(at(11, 0, 0), dec!(50));
        stats.bucket_hour(at(11, 0, 0), dec!(50), 1);
        stats.bucket_hour(at(11, 10, 0), dec!(58), 1);
        stats.bucket_hour(at(11, 20, 0), dec!(47), 1);
        stats.bucket_hour(at(12, 0, 0), dec!(52), 1);

        assert_eq!(stats.hourly_max_change[0], dec!(11));
    }

    #[test]
    fn test_minute_rate_survives_hour_wrap() {
        // 09:59 -> 10:00 is a new minute even though minute-of-hour wraps to 00
        let mut stats = SymbolStats::open(at(9, 59, 30), dec!(100));
        stats.observe_minute(at(10, 0, 10));

        assert_eq!(stats.minutes, 2);
        assert_eq!(stats.trades_per_minute(), 1.0);
    }

    #[test]
    fn test_minute_rate_averages_closed_minutes() {
        let mut stats = SymbolStats::open(at(9, 0, 0), dec!(100));
        // 3 trades in the opening minute (1 from open + 2 observed)
        stats.observe_minute(at(9, 0, 10));
        stats.observe_minute(at(9, 0, 20));
        // minute closes with 3 trades
        stats.observe_minute(at(9, 1, 0));
        assert_eq!(stats.trades_per_minute(), 3.0);

        // second minute closes with 1 trade: (3 + 1) / 2
        stats.observe_minute(at(9, 2, 0));
        assert_eq!(stats.trades_per_minute(), 2.0);
    }

    #[test]
    fn test_rate_before_first_minute_closes() {
        let mut stats = SymbolStats::open(at(9, 0, 0), dec!(100));
        stats.observe_minute(at(9, 0, 30));
        assert_eq!(stats.trades_per_minute(), 2.0);
    }
}
