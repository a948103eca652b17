//! Persistent record storage.
//!
//! Records are appended per host and read back by time range. Times are
//! stored as fixed-width local wall-clock text, so lexical order in SQLite
//! matches chronological order.

use std::path::Path;

use chrono::NaiveDateTime;
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::types::Record;

/// Layout of the `time` column.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS hosts (
    id INTEGER PRIMARY KEY,
    identifier TEXT UNIQUE NOT NULL
);
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY,
    host_id INTEGER NOT NULL REFERENCES hosts(id),
    core INTEGER NOT NULL,
    processor INTEGER NOT NULL,
    processor_usage_percent REAL NOT NULL,
    heaviest_process_command TEXT NOT NULL,
    heaviest_process_usage_percent REAL NOT NULL,
    temperature_millidegrees INTEGER NOT NULL,
    time TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS records_host_time ON records(host_id, time);
";

/// Row id and name of a stored host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostHandle {
    pub id: i64,
    pub identifier: String,
}

/// Exclusive time bounds; `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }
}

/// Host-keyed, append-only record history.
pub trait RecordStore {
    /// Create the schema if it does not exist yet.
    fn initialize(&mut self) -> Result<()>;

    fn get_or_create_host(&mut self, identifier: &str) -> Result<HostHandle>;

    /// Look up a host without creating it.
    fn find_host(&self, identifier: &str) -> Result<Option<HostHandle>>;

    /// Append one batch; either every record is stored or none is.
    fn append_records(&mut self, host: &HostHandle, records: &[Record]) -> Result<()>;

    /// Records of `host` inside `range`, ordered by time then processor.
    fn query_records(&self, host: &HostHandle, range: TimeRange) -> Result<Vec<Record>>;
}

/// [`RecordStore`] backed by a SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        debug!("opening database {}", path.display());
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// List every known host identifier, alphabetically.
    pub fn hosts(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT identifier FROM hosts ORDER BY identifier")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl RecordStore for SqliteStore {
    fn initialize(&mut self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn get_or_create_host(&mut self, identifier: &str) -> Result<HostHandle> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO hosts (identifier) VALUES (?1)",
            params![identifier],
        )?;
        if inserted > 0 {
            debug!("registered new host '{identifier}'");
        }
        let id = self.conn.query_row(
            "SELECT id FROM hosts WHERE identifier = ?1",
            params![identifier],
            |row| row.get(0),
        )?;
        Ok(HostHandle {
            id,
            identifier: identifier.to_string(),
        })
    }

    fn find_host(&self, identifier: &str) -> Result<Option<HostHandle>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM hosts WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(|id| HostHandle {
            id,
            identifier: identifier.to_string(),
        }))
    }

    fn append_records(&mut self, host: &HostHandle, records: &[Record]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (host_id, core, processor, processor_usage_percent,
                    heaviest_process_command, heaviest_process_usage_percent,
                    temperature_millidegrees, time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for record in records {
                stmt.execute(params![
                    host.id,
                    record.core,
                    record.processor,
                    record.processor_usage_percent,
                    record.heaviest_process_command,
                    record.heaviest_process_usage_percent,
                    record.temperature_millidegrees,
                    format_time(record.time),
                ])?;
            }
        }
        tx.commit()?;
        debug!(
            "stored {} records for host '{}'",
            records.len(),
            host.identifier
        );
        Ok(())
    }

    fn query_records(&self, host: &HostHandle, range: TimeRange) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT core, processor, processor_usage_percent, heaviest_process_command,
                    heaviest_process_usage_percent, temperature_millidegrees, time
             FROM records
             WHERE host_id = ?1
               AND (?2 IS NULL OR time > ?2)
               AND (?3 IS NULL OR time < ?3)
             ORDER BY time, processor",
        )?;
        let rows = stmt.query_map(
            params![host.id, range.from.map(format_time), range.to.map(format_time)],
            |row| {
                let time: String = row.get(6)?;
                let time = parse_time(&time).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        6,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(Record {
                    core: row.get(0)?,
                    processor: row.get(1)?,
                    processor_usage_percent: row.get(2)?,
                    heaviest_process_command: row.get(3)?,
                    heaviest_process_usage_percent: row.get(4)?,
                    temperature_millidegrees: row.get(5)?,
                    time,
                })
            },
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

pub fn format_time(time: NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn parse_time(text: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, TIME_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn record(processor: u32, time: NaiveDateTime) -> Record {
        Record {
            core: processor / 2,
            processor,
            processor_usage_percent: 12.5,
            heaviest_process_command: "cc1 -O2".to_string(),
            heaviest_process_usage_percent: 10.0,
            temperature_millidegrees: 48000,
            time,
        }
    }

    fn store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut store = store();
        store.initialize().unwrap();
    }

    #[test]
    fn host_created_once() {
        let mut store = store();
        let a = store.get_or_create_host("alpha").unwrap();
        let again = store.get_or_create_host("alpha").unwrap();
        let b = store.get_or_create_host("beta").unwrap();
        assert_eq!(a, again);
        assert_ne!(a.id, b.id);
        assert_eq!(store.hosts().unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn find_host_does_not_create() {
        let store = store();
        assert_eq!(store.find_host("ghost").unwrap(), None);
        assert!(store.hosts().unwrap().is_empty());
    }

    #[test]
    fn records_round_trip_in_order() {
        let mut store = store();
        let host = store.get_or_create_host("alpha").unwrap();
        store
            .append_records(&host, &[record(1, at(10, 0, 1)), record(0, at(10, 0, 1))])
            .unwrap();
        store.append_records(&host, &[record(0, at(10, 0, 0))]).unwrap();

        let rows = store.query_records(&host, TimeRange::all()).unwrap();
        let order: Vec<(NaiveDateTime, u32)> = rows.iter().map(|r| (r.time, r.processor)).collect();
        assert_eq!(
            order,
            vec![(at(10, 0, 0), 0), (at(10, 0, 1), 0), (at(10, 0, 1), 1)]
        );
        assert_eq!(rows[0], record(0, at(10, 0, 0)));
    }

    #[test]
    fn range_bounds_are_exclusive() {
        let mut store = store();
        let host = store.get_or_create_host("alpha").unwrap();
        let batch: Vec<Record> = (0..5).map(|s| record(0, at(10, 0, s))).collect();
        store.append_records(&host, &batch).unwrap();

        let range = TimeRange {
            from: Some(at(10, 0, 1)),
            to: Some(at(10, 0, 4)),
        };
        let rows = store.query_records(&host, range).unwrap();
        let times: Vec<_> = rows.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![at(10, 0, 2), at(10, 0, 3)]);

        let open_end = TimeRange {
            from: Some(at(10, 0, 3)),
            to: None,
        };
        assert_eq!(store.query_records(&host, open_end).unwrap().len(), 1);
    }

    #[test]
    fn hosts_are_isolated() {
        let mut store = store();
        let a = store.get_or_create_host("alpha").unwrap();
        let b = store.get_or_create_host("beta").unwrap();
        store.append_records(&a, &[record(0, at(9, 0, 0))]).unwrap();
        assert!(store.query_records(&b, TimeRange::all()).unwrap().is_empty());
    }

    #[test]
    fn subsecond_times_survive_storage() {
        let mut store = store();
        let host = store.get_or_create_host("alpha").unwrap();
        let time = at(10, 0, 0) + chrono::Duration::microseconds(250_123);
        store.append_records(&host, &[record(0, time)]).unwrap();
        let rows = store.query_records(&host, TimeRange::all()).unwrap();
        assert_eq!(rows[0].time, time);
    }

    #[test]
    fn time_text_is_fixed_width() {
        assert_eq!(format_time(at(7, 5, 3)), "2024-03-01 07:05:03.000000");
    }
}
