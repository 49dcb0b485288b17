//! Append-only persistence for weather samples.
//!
//! `SqliteSampleStore` is what the monitor runs on; `MemorySampleStore` keeps
//! samples in a vector and is handy for tests and dry runs. Both return
//! `recent` results newest-first, with equal timestamps ordered
//! most-recently-inserted first.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params, types::Type};
use std::{fs, path::Path};

use crate::{error::StorageError, model::Sample};

/// Append-only log of samples.
pub trait SampleStore {
    /// Insert one sample.
    fn append(&mut self, sample: &Sample) -> Result<(), StorageError>;

    /// Up to `n` samples for `location`, newest first. Unknown locations yield an empty vector.
    fn recent(&self, location: &str, n: usize) -> Result<Vec<Sample>, StorageError>;

    /// All samples for `location` with `start <= timestamp < end`.
    fn range(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StorageError>;

    /// Total number of stored samples.
    fn len(&self) -> Result<usize, StorageError>;

    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

#[derive(Debug, Default)]
pub struct MemorySampleStore {
    samples: Vec<Sample>,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleStore for MemorySampleStore {
    fn append(&mut self, sample: &Sample) -> Result<(), StorageError> {
        self.samples.push(sample.clone());
        Ok(())
    }

    fn recent(&self, location: &str, n: usize) -> Result<Vec<Sample>, StorageError> {
        // Walk backwards so the stable sort keeps later insertions first on ties.
        let mut matching: Vec<&Sample> =
            self.samples.iter().rev().filter(|s| s.location == location).collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(matching.into_iter().take(n).cloned().collect())
    }

    fn range(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StorageError> {
        Ok(self
            .samples
            .iter()
            .filter(|s| s.location == location && s.timestamp >= start && s.timestamp < end)
            .cloned()
            .collect())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.samples.len())
    }
}

/// SQLite-backed sample log.
pub struct SqliteSampleStore {
    conn: Connection,
}

impl SqliteSampleStore {
    /// Open (or create) the database at `path`, creating parent directories as needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL,
                temp REAL NOT NULL,
                feels_like REAL NOT NULL,
                weather_condition TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weather_data_city_timestamp
                ON weather_data(city, timestamp);
            "#,
        )?;
        Ok(())
    }

    fn row_to_sample(row: &rusqlite::Row) -> rusqlite::Result<Sample> {
        let location: String = row.get(0)?;
        let temperature_c: f64 = row.get(1)?;
        let feels_like_c: f64 = row.get(2)?;
        let condition: String = row.get(3)?;
        let timestamp_str: String = row.get(4)?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        Ok(Sample { location, temperature_c, feels_like_c, condition, timestamp })
    }
}

/// Fixed-width UTC encoding so that text comparison matches time order.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl SampleStore for SqliteSampleStore {
    fn append(&mut self, sample: &Sample) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO weather_data (city, temp, feels_like, weather_condition, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sample.location,
                sample.temperature_c,
                sample.feels_like_c,
                sample.condition,
                encode_timestamp(sample.timestamp),
            ],
        )?;
        Ok(())
    }

    fn recent(&self, location: &str, n: usize) -> Result<Vec<Sample>, StorageError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT city, temp, feels_like, weather_condition, timestamp
             FROM weather_data
             WHERE city = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![location, limit], Self::row_to_sample)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn range(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT city, temp, feels_like, weather_condition, timestamp
             FROM weather_data
             WHERE city = ?1 AND timestamp >= ?2 AND timestamp < ?3
             ORDER BY id",
        )?;

        let rows = stmt.query_map(
            params![location, encode_timestamp(start), encode_timestamp(end)],
            Self::row_to_sample,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM weather_data", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| StorageError::Corrupt(format!("row count {count}")))
    }
}
