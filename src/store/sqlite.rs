//! SQLite-backed store
//!
//! Writes are staged inside an open transaction and become durable at the
//! commit boundary; dropping the store rolls back anything unflushed. All
//! statements bind values with `params!`.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::{Characteristics, PriceRange, StoreError, SymbolStore};

pub struct SqliteStore {
    conn: Connection,
    in_tx: bool,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS symbols (
                name TEXT PRIMARY KEY,
                average_volume REAL NOT NULL,
                average_daily_volume REAL NOT NULL,
                average_price_change_daily REAL NOT NULL,
                average_price_change REAL NOT NULL,
                average_trades_per_minute REAL NOT NULL,
                last_price_change_percentage REAL NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS trades (
                symbol_name TEXT NOT NULL,
                analysis_date TEXT NOT NULL,
                price REAL NOT NULL,
                size INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_symbol_date
                ON trades (symbol_name, analysis_date);
            "#,
        )?;
        Ok(Self { conn, in_tx: false })
    }

    fn begin_if_needed(&mut self) -> Result<(), StoreError> {
        if !self.in_tx {
            self.conn.execute_batch("BEGIN")?;
            self.in_tx = true;
        }
        Ok(())
    }

    /// Record a trade so the day-level queries have data to aggregate over.
    pub fn record_trade(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        price: Decimal,
        size: u64,
    ) -> Result<(), StoreError> {
        self.begin_if_needed()?;
        self.conn.execute(
            "INSERT INTO trades (symbol_name, analysis_date, price, size) VALUES (?1, ?2, ?3, ?4)",
            params![
                symbol,
                date.to_string(),
                price.to_f64().unwrap_or(0.0),
                size as i64
            ],
        )?;
        Ok(())
    }
}

impl SymbolStore for SqliteStore {
    fn upsert_characteristics(
        &mut self,
        symbol: &str,
        characteristics: &Characteristics,
    ) -> Result<(), StoreError> {
        self.begin_if_needed()?;
        self.conn.execute(
            r#"
            INSERT INTO symbols (
                name, average_volume, average_daily_volume,
                average_price_change_daily, average_price_change,
                average_trades_per_minute, last_price_change_percentage,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(name) DO UPDATE SET
                average_volume = excluded.average_volume,
                average_daily_volume = excluded.average_daily_volume,
                average_price_change_daily = excluded.average_price_change_daily,
                average_price_change = excluded.average_price_change,
                average_trades_per_minute = excluded.average_trades_per_minute,
                last_price_change_percentage = excluded.last_price_change_percentage,
                updated_at = excluded.updated_at
            "#,
            params![
                symbol,
                characteristics.average_volume,
                characteristics.average_daily_volume,
                characteristics.average_price_change_daily,
                characteristics.average_price_change,
                characteristics.average_trades_per_minute,
                characteristics.last_price_change_percentage,
                characteristics.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn day_volume(&mut self, symbol: &str, date: NaiveDate) -> Result<i64, StoreError> {
        let total: Option<i64> = self.conn.query_row(
            "SELECT SUM(size) FROM trades WHERE symbol_name = ?1 AND analysis_date = ?2",
            params![symbol, date.to_string()],
            |row| row.get(0),
        )?;
        total.ok_or_else(|| StoreError::MissingDayData {
            symbol: symbol.to_string(),
            date,
        })
    }

    fn day_price_range(&mut self, symbol: &str, date: NaiveDate) -> Result<PriceRange, StoreError> {
        let (max, min): (Option<f64>, Option<f64>) = self.conn.query_row(
            "SELECT MAX(price), MIN(price) FROM trades WHERE symbol_name = ?1 AND analysis_date = ?2",
            params![symbol, date.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        match (max.and_then(Decimal::from_f64), min.and_then(Decimal::from_f64)) {
            (Some(max), Some(min)) => Ok(PriceRange { max, min }),
            _ => Err(StoreError::MissingDayData {
                symbol: symbol.to_string(),
                date,
            }),
        }
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.in_tx {
            self.conn.execute_batch("COMMIT")?;
            self.in_tx = false;
        }
        Ok(())
    }
}
