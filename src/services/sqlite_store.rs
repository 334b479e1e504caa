//! SQLite persistence for signals, price observations and backtest results.
//!
//! Signals and prices are written by upstream producers and only read by the
//! backtest engine. Backtest results are written by the engine with
//! fill-only-null semantics, so a resolved horizon is never overwritten.

use crate::services::price_resolver::PriceSource;
use crate::types::{
    BacktestResult, Direction, HorizonOutcome, PriceObservation, ScoredResult, Signal,
    SignalRecord, ValidSignal,
};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

const RESULT_COLUMNS: &str = "r.signal_id, r.ticker, r.signal_date, r.direction_predicted, r.price_at_signal,
     r.price_1d, r.change_1d, r.accurate_1d,
     r.price_7d, r.change_7d, r.accurate_7d,
     r.price_30d, r.change_30d, r.accurate_30d,
     r.created_at, r.updated_at";

const SIGNAL_COLUMNS: &str =
    "s.id, s.ticker, s.direction, s.confidence, s.created_at, s.sector, s.sentiment, s.reasoning";

/// SQLite store backing the backtest engine.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite store initialized");
        Ok(store)
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;

        // Upstream writes signals with any column missing; validation happens on read.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT,
                direction TEXT,
                confidence REAL,
                created_at INTEGER NOT NULL,
                sector TEXT,
                sentiment TEXT,
                reasoning TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_signals_ticker ON signals(ticker)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS price_observations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL,
                observed_at INTEGER NOT NULL,
                price REAL NOT NULL,
                source TEXT NOT NULL,
                UNIQUE(ticker, observed_at, source)
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_prices_ticker_time
             ON price_observations(ticker, observed_at)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS backtest_results (
                signal_id INTEGER PRIMARY KEY REFERENCES signals(id),
                ticker TEXT NOT NULL,
                signal_date INTEGER NOT NULL,
                direction_predicted TEXT NOT NULL,
                price_at_signal REAL NOT NULL,
                price_1d REAL,
                change_1d REAL,
                accurate_1d INTEGER,
                price_7d REAL,
                change_7d REAL,
                accurate_7d INTEGER,
                price_30d REAL,
                change_30d REAL,
                accurate_30d INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_signal_date
             ON backtest_results(signal_date DESC)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_ticker ON backtest_results(ticker)",
            [],
        )?;

        info!("SQLite schema initialized");
        Ok(())
    }

    // ========== Signal Methods ==========

    /// Store a validated signal and return it with its assigned id.
    pub fn insert_signal(&self, signal: &ValidSignal) -> Result<Signal, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO signals (ticker, direction, confidence, created_at, sector, sentiment, reasoning)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                signal.ticker,
                signal.direction.as_str(),
                signal.confidence,
                signal.created_at.timestamp_millis(),
                signal.sector,
                signal.sentiment.map(|s| s.as_str()),
                signal.reasoning,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Stored signal {} for {}", id, signal.ticker);

        Ok(Signal {
            id,
            ticker: signal.ticker.clone(),
            direction: signal.direction,
            confidence: signal.confidence,
            // Stored at millisecond precision.
            created_at: millis_to_datetime(signal.created_at.timestamp_millis())
                .unwrap_or(signal.created_at),
            sector: signal.sector.clone(),
            sentiment: signal.sentiment,
            reasoning: signal.reasoning.clone(),
        })
    }

    /// Store a signal row exactly as an upstream producer would, unvalidated.
    pub fn insert_signal_record(&self, record: &SignalRecord) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO signals (ticker, direction, confidence, created_at, sector, sentiment, reasoning)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.ticker,
                record.direction,
                record.confidence,
                record.created_at.map(|t| t.timestamp_millis()),
                record.sector,
                record.sentiment,
                record.reasoning,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a signal by id. Rows that fail validation are not exposed.
    pub fn get_signal(&self, id: i64) -> Result<Option<Signal>, StoreError> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM signals s WHERE s.id = ?1", SIGNAL_COLUMNS),
                params![id],
                read_signal_record,
            )
            .optional()?;
        Ok(record.and_then(|r| Signal::try_from(r).ok()))
    }

    /// List valid signals, newest first, optionally for one ticker.
    pub fn list_signals(&self, ticker: Option<&str>, limit: usize) -> Result<Vec<Signal>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM signals s
             WHERE (?1 IS NULL OR s.ticker = ?1)
             ORDER BY s.created_at DESC, s.id DESC
             LIMIT ?2",
            SIGNAL_COLUMNS
        ))?;
        let ticker = ticker.map(|t| t.trim().to_uppercase());
        let records = stmt
            .query_map(params![ticker, limit as i64], read_signal_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records
            .into_iter()
            .filter_map(|r| Signal::try_from(r).ok())
            .collect())
    }

    /// Signals with no backtest result yet, or with at least one pending horizon.
    ///
    /// Records are returned unvalidated so the caller can report rejects.
    pub fn eligible_signals(&self) -> Result<Vec<SignalRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM signals s
             LEFT JOIN backtest_results r ON r.signal_id = s.id
             WHERE r.signal_id IS NULL
                OR r.price_1d IS NULL
                OR r.price_7d IS NULL
                OR r.price_30d IS NULL
             ORDER BY s.created_at ASC, s.id ASC",
            SIGNAL_COLUMNS
        ))?;
        let records = stmt
            .query_map([], read_signal_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    // ========== Price Methods ==========

    /// Append price observations. Duplicates of an existing
    /// (ticker, time, source) are ignored. Returns how many rows were stored.
    pub fn insert_prices(&self, observations: &[PriceObservation]) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO price_observations (ticker, observed_at, price, source)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for obs in observations {
                inserted += stmt.execute(params![
                    obs.ticker.to_uppercase(),
                    obs.observed_at.timestamp_millis(),
                    obs.price,
                    obs.source,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Stored {} of {} price observations", inserted, observations.len());
        Ok(inserted)
    }

    /// Observations for a ticker within `[start, end]`, oldest first.
    pub fn prices_for(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT ticker, observed_at, price, source FROM price_observations
             WHERE ticker = ?1 AND observed_at >= ?2 AND observed_at <= ?3
             ORDER BY observed_at ASC, id ASC",
        )?;
        let prices = stmt
            .query_map(
                params![
                    ticker.trim().to_uppercase(),
                    start.timestamp_millis(),
                    end.timestamp_millis()
                ],
                read_price,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    /// Every stored observation, in insertion order.
    pub fn all_prices(&self) -> Result<Vec<PriceObservation>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT ticker, observed_at, price, source FROM price_observations ORDER BY id ASC",
        )?;
        let prices = stmt
            .query_map([], read_price)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    // ========== Backtest Result Methods ==========

    /// Get the backtest result for a signal.
    pub fn get_backtest_result(&self, signal_id: i64) -> Result<Option<BacktestResult>, StoreError> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {} FROM backtest_results r WHERE r.signal_id = ?1",
                    RESULT_COLUMNS
                ),
                params![signal_id],
                read_result,
            )
            .optional()?;
        Ok(result)
    }

    /// List results, newest signal first, optionally for one ticker.
    pub fn list_backtest_results(
        &self,
        ticker: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<BacktestResult>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM backtest_results r
             WHERE (?1 IS NULL OR r.ticker = ?1)
             ORDER BY r.signal_date DESC, r.signal_id DESC
             LIMIT ?2 OFFSET ?3",
            RESULT_COLUMNS
        ))?;
        let ticker = ticker.map(|t| t.trim().to_uppercase());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        let results = stmt
            .query_map(params![ticker, limit, skip], read_result)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(results)
    }

    /// Insert a result, or fill only the horizons that are still null.
    ///
    /// A horizon's price, change and accuracy are taken together from the
    /// incoming row only when the stored price is null; resolved horizons,
    /// the signal price and the predicted direction are kept as stored.
    pub fn upsert_backtest_result(&self, result: &BacktestResult) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let o1 = result.outcome_1d;
        let o7 = result.outcome_7d;
        let o30 = result.outcome_30d;

        conn.execute(
            &format!(
                "INSERT INTO backtest_results
                 (signal_id, ticker, signal_date, direction_predicted, price_at_signal,
                  price_1d, change_1d, accurate_1d,
                  price_7d, change_7d, accurate_7d,
                  price_30d, change_30d, accurate_30d,
                  created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                 ON CONFLICT(signal_id) DO UPDATE SET
                    {},
                    {},
                    {},
                    updated_at = excluded.updated_at",
                fill_null_horizon("1d"),
                fill_null_horizon("7d"),
                fill_null_horizon("30d"),
            ),
            params![
                result.signal_id,
                result.ticker,
                result.signal_date.timestamp_millis(),
                result.direction_predicted.as_str(),
                result.price_at_signal,
                o1.map(|o| o.price),
                o1.map(|o| o.change_pct),
                o1.map(|o| o.accurate),
                o7.map(|o| o.price),
                o7.map(|o| o.change_pct),
                o7.map(|o| o.accurate),
                o30.map(|o| o.price),
                o30.map(|o| o.change_pct),
                o30.map(|o| o.accurate),
                result.created_at.timestamp_millis(),
                result.updated_at.timestamp_millis(),
            ],
        )?;

        debug!(
            "Upserted backtest result for signal {} ({} horizons resolved)",
            result.signal_id,
            result.resolved_count()
        );
        Ok(())
    }

    /// Every result joined with its signal's sector and confidence.
    pub fn scored_results(&self) -> Result<Vec<ScoredResult>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, s.sector AS signal_sector, s.confidence AS signal_confidence
             FROM backtest_results r
             LEFT JOIN signals s ON s.id = r.signal_id
             ORDER BY r.signal_date ASC, r.signal_id ASC",
            RESULT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], |row| {
                let sector: Option<String> = row.get("signal_sector")?;
                Ok(ScoredResult {
                    result: read_result(row)?,
                    sector: sector.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                    confidence: read_number(row, "signal_confidence")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Number of stored backtest results.
    pub fn result_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM backtest_results", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

impl PriceSource for SqliteStore {
    fn observations_between(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        self.prices_for(ticker, start, end)
    }
}

/// SET clause filling one horizon's columns only while its price is null.
fn fill_null_horizon(suffix: &str) -> String {
    ["price", "change", "accurate"]
        .iter()
        .map(|col| {
            format!(
                "{col}_{s} = CASE WHEN backtest_results.price_{s} IS NULL \
                 THEN excluded.{col}_{s} ELSE backtest_results.{col}_{s} END",
                col = col,
                s = suffix
            )
        })
        .collect::<Vec<_>>()
        .join(",\n                    ")
}

fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// Read a millisecond timestamp leniently: text, blobs and out-of-range
/// values become `None`.
fn read_timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(match row.get_ref(column)? {
        ValueRef::Integer(ms) => millis_to_datetime(ms),
        _ => None,
    })
}

/// Read a timestamp column this store wrote itself; anything unreadable is an error.
fn require_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    millis_to_datetime(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            Box::new(StoreError::InvalidValue(format!("timestamp {}", ms))),
        )
    })
}

/// Read a numeric column leniently: text or blobs from upstream become `None`.
fn read_number(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(column)? {
        ValueRef::Real(v) => Some(v),
        ValueRef::Integer(v) => Some(v as f64),
        _ => None,
    })
}

fn read_signal_record(row: &Row<'_>) -> rusqlite::Result<SignalRecord> {
    Ok(SignalRecord {
        id: row.get("id")?,
        ticker: row.get("ticker")?,
        direction: row.get("direction")?,
        confidence: read_number(row, "confidence")?,
        created_at: read_timestamp(row, "created_at")?,
        sector: row.get("sector")?,
        sentiment: row.get("sentiment")?,
        reasoning: row.get("reasoning")?,
    })
}

fn read_price(row: &Row<'_>) -> rusqlite::Result<PriceObservation> {
    Ok(PriceObservation {
        ticker: row.get(0)?,
        observed_at: require_timestamp(row, 1)?,
        price: row.get(2)?,
        source: row.get(3)?,
    })
}

fn read_outcome(row: &Row<'_>, suffix: &str) -> rusqlite::Result<Option<HorizonOutcome>> {
    let price: Option<f64> = row.get(format!("price_{}", suffix).as_str())?;
    let change: Option<f64> = row.get(format!("change_{}", suffix).as_str())?;
    let accurate: Option<bool> = row.get(format!("accurate_{}", suffix).as_str())?;

    Ok(match (price, change, accurate) {
        (Some(price), Some(change_pct), Some(accurate)) => Some(HorizonOutcome {
            price,
            change_pct,
            accurate,
        }),
        _ => None,
    })
}

fn read_result(row: &Row<'_>) -> rusqlite::Result<BacktestResult> {
    let direction: String = row.get("direction_predicted")?;
    let direction_predicted = Direction::from_str(&direction).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            Box::new(StoreError::InvalidValue(format!("direction '{}'", direction))),
        )
    })?;

    Ok(BacktestResult {
        signal_id: row.get("signal_id")?,
        ticker: row.get("ticker")?,
        signal_date: require_timestamp(row, 2)?,
        direction_predicted,
        price_at_signal: row.get("price_at_signal")?,
        outcome_1d: read_outcome(row, "1d")?,
        outcome_7d: read_outcome(row, "7d")?,
        outcome_30d: read_outcome(row, "30d")?,
        created_at: require_timestamp(row, 14)?,
        updated_at: require_timestamp(row, 15)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Horizon, Sentiment};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 20, 0, 0).unwrap()
    }

    fn valid_signal(ticker: &str, sector: Option<&str>) -> ValidSignal {
        ValidSignal {
            ticker: ticker.to_string(),
            direction: Direction::Up,
            confidence: 0.7,
            created_at: t0(),
            sector: sector.map(str::to_string),
            sentiment: Some(Sentiment::Positive),
            reasoning: None,
        }
    }

    #[test]
    fn test_signal_roundtrip() {
        let store = SqliteStore::new_in_memory().unwrap();
        let stored = store.insert_signal(&valid_signal("CNQ.TO", Some("Energy"))).unwrap();

        let loaded = store.get_signal(stored.id).unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(store.get_signal(999).unwrap().is_none());
    }

    #[test]
    fn test_invalid_records_are_hidden_from_listing() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.insert_signal(&valid_signal("CNQ.TO", None)).unwrap();
        store
            .insert_signal_record(&SignalRecord {
                ticker: Some("SU.TO".to_string()),
                direction: None,
                confidence: Some(0.4),
                created_at: Some(t0()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(store.list_signals(None, 10).unwrap().len(), 1);
        // Both are still eligible so the runner can report the reject.
        assert_eq!(store.eligible_signals().unwrap().len(), 2);
    }

    #[test]
    fn test_text_confidence_reads_as_missing() {
        let store = SqliteStore::new_in_memory().unwrap();
        {
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO signals (ticker, direction, confidence, created_at)
                 VALUES ('BCE.TO', 'down', 'high', 0)",
                [],
            )
            .unwrap();
        }
        let records = store.eligible_signals().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, None);
    }

    #[test]
    fn test_text_created_at_reads_as_missing() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.insert_signal(&valid_signal("CNQ.TO", None)).unwrap();
        {
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO signals (ticker, direction, confidence, created_at)
                 VALUES ('BCE.TO', 'down', 0.5, '2024-03-04 21:00:00'),
                        ('TD.TO', 'up', 0.5, 9223372036854775807)",
                [],
            )
            .unwrap();
        }

        let records = store.eligible_signals().unwrap();
        assert_eq!(records.len(), 3);
        let missing = records.iter().filter(|r| r.created_at.is_none()).count();
        assert_eq!(missing, 2);

        let listed = store.list_signals(None, 10).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].ticker, "CNQ.TO");
    }

    #[test]
    fn test_duplicate_prices_are_ignored() {
        let store = SqliteStore::new_in_memory().unwrap();
        let obs = PriceObservation::new("RY.TO", t0(), 120.0, "yahoo");

        assert_eq!(store.insert_prices(&[obs.clone()]).unwrap(), 1);
        assert_eq!(store.insert_prices(&[obs]).unwrap(), 0);
        assert_eq!(store.all_prices().unwrap().len(), 1);
    }

    #[test]
    fn test_prices_for_window() {
        let store = SqliteStore::new_in_memory().unwrap();
        let prices: Vec<_> = (0..5)
            .map(|d| PriceObservation::new("RY.TO", t0() + Duration::days(d), 100.0 + d as f64, "yahoo"))
            .collect();
        store.insert_prices(&prices).unwrap();

        let window = store
            .prices_for("ry.to", t0() + Duration::days(1), t0() + Duration::days(3))
            .unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].price, 101.0);
        assert_eq!(window[2].price, 103.0);
    }

    #[test]
    fn test_upsert_fills_only_null_horizons() {
        let store = SqliteStore::new_in_memory().unwrap();
        let signal = store.insert_signal(&valid_signal("ABC", None)).unwrap();

        let mut first = BacktestResult::new(signal.id, "ABC".to_string(), t0(), Direction::Up, 10.0);
        first.resolve(
            Horizon::OneDay,
            HorizonOutcome { price: 10.5, change_pct: 5.0, accurate: true },
        );
        store.upsert_backtest_result(&first).unwrap();

        // A later write disagrees on 1d and adds 7d.
        let mut second = BacktestResult::new(signal.id, "ABC".to_string(), t0(), Direction::Down, 99.0);
        second.resolve(
            Horizon::OneDay,
            HorizonOutcome { price: 9.0, change_pct: -10.0, accurate: true },
        );
        second.resolve(
            Horizon::SevenDays,
            HorizonOutcome { price: 11.0, change_pct: 10.0, accurate: true },
        );
        store.upsert_backtest_result(&second).unwrap();

        let stored = store.get_backtest_result(signal.id).unwrap().unwrap();
        assert_eq!(stored.price_at_signal, 10.0);
        assert_eq!(stored.direction_predicted, Direction::Up);
        assert_eq!(stored.outcome_1d.unwrap().price, 10.5);
        assert_eq!(stored.outcome_7d.unwrap().change_pct, 10.0);
        assert!(stored.outcome_30d.is_none());
        assert_eq!(store.result_count().unwrap(), 1);
    }

    #[test]
    fn test_list_results_filters_and_pages() {
        let store = SqliteStore::new_in_memory().unwrap();
        for (i, ticker) in ["ABC", "XYZ", "ABC"].iter().enumerate() {
            let signal = store.insert_signal(&valid_signal(ticker, None)).unwrap();
            let result = BacktestResult::new(
                signal.id,
                ticker.to_string(),
                t0() + Duration::days(i as i64),
                Direction::Up,
                10.0,
            );
            store.upsert_backtest_result(&result).unwrap();
        }

        let abc = store.list_backtest_results(Some("abc"), 0, 50).unwrap();
        assert_eq!(abc.len(), 2);
        assert!(abc[0].signal_date > abc[1].signal_date);

        let page = store.list_backtest_results(None, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].ticker, "XYZ");
    }

    #[test]
    fn test_scored_results_carry_signal_attributes() {
        let store = SqliteStore::new_in_memory().unwrap();
        let signal = store.insert_signal(&valid_signal("ENB.TO", Some("Energy"))).unwrap();
        store
            .upsert_backtest_result(&BacktestResult::new(
                signal.id,
                "ENB.TO".to_string(),
                t0(),
                Direction::Up,
                50.0,
            ))
            .unwrap();

        let scored = store.scored_results().unwrap();
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].sector.as_deref(), Some("Energy"));
        assert_eq!(scored[0].confidence, Some(0.7));
    }

    #[test]
    fn test_complete_results_are_not_eligible() {
        let store = SqliteStore::new_in_memory().unwrap();
        let signal = store.insert_signal(&valid_signal("ABC", None)).unwrap();
        let mut result = BacktestResult::new(signal.id, "ABC".to_string(), t0(), Direction::Up, 10.0);
        for h in Horizon::ALL {
            result.resolve(h, HorizonOutcome { price: 11.0, change_pct: 10.0, accurate: true });
        }
        store.upsert_backtest_result(&result).unwrap();

        assert!(store.eligible_signals().unwrap().is_empty());
    }
}
