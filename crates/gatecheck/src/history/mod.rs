//! Local scan history.
//!
//! Every scan attempt (successful or not) is appended to a small `SQLite`
//! audit log. This is not an offline write buffer: the remote sheet stays the
//! only durable home of the verification marker. The log exists so an
//! operator can answer "what happened at the door" after the fact.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One recorded scan attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRecord {
    /// Unique identifier for this record (assigned by the database).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// When the scan happened.
    pub timestamp: DateTime<Utc>,
    /// Where the frame came from (image path or spool file).
    pub source: String,
    /// BLAKE3 hash of the raw payload, when one was decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_hash: Option<String>,
    /// The extracted identifier, when parsing succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_id: Option<String>,
    /// Outcome label (`verified`, `duplicate`, `not_found`, or an error label).
    pub outcome: String,
    /// Human-readable result shown to the operator.
    pub message: String,
}

impl ScanRecord {
    /// Create a new record stamped with the current time.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        payload_hash: Option<String>,
        scanned_id: Option<String>,
        outcome: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            source: source.into(),
            payload_hash,
            scanned_id,
            outcome: outcome.into(),
            message: message.into(),
        }
    }
}

/// Summary statistics about the scan history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    /// Total number of scan records.
    pub total_records: i64,
    /// Timestamp of the oldest record.
    pub oldest_scan: Option<DateTime<Utc>>,
    /// Timestamp of the newest record.
    pub newest_scan: Option<DateTime<Utc>>,
}

/// `SQLite`-backed store of scan records.
#[derive(Debug)]
pub struct History {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl History {
    /// Open or create a history database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening history database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps the log readable while a watch session is writing
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("History database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory history instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a scan record, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, record: &ScanRecord) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO scans (timestamp, source, payload_hash, scanned_id, outcome, message)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                record.timestamp.to_rfc3339(),
                record.source,
                record.payload_hash,
                record.scanned_id,
                record.outcome,
                record.message,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Recorded scan {} ({})", id, record.outcome);
        Ok(id)
    }

    /// Check whether a record inside the given window carries the payload
    /// hash. Watch mode uses this to skip a code that sits in front of the
    /// source across many frames, including across a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn seen_hash_within(&self, hash: &str, window: std::time::Duration) -> Result<bool> {
        let cutoff = ChronoDuration::from_std(window)
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM scans WHERE payload_hash = ?1 AND timestamp >= ?2",
            params![hash, cutoff.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get the most recent scan records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, timestamp, source, payload_hash, scanned_id, outcome, message
            FROM scans ORDER BY timestamp DESC, id DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map([limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Get the most recent records with a given outcome label.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_by_outcome(&self, outcome: &str, limit: usize) -> Result<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, timestamp, source, payload_hash, scanned_id, outcome, message
            FROM scans WHERE outcome = ?1
            ORDER BY timestamp DESC, id DESC LIMIT ?2
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![outcome, limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Count total scan records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Prune records older than the given duration.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_older_than(&self, max_age: std::time::Duration) -> Result<usize> {
        let Ok(max_age) = ChronoDuration::from_std(max_age) else {
            // A max age beyond chrono's range prunes nothing
            return Ok(0);
        };
        let cutoff = Utc::now() - max_age;

        let affected = self.conn.execute(
            "DELETE FROM scans WHERE timestamp < ?1",
            [cutoff.to_rfc3339()],
        )?;

        if affected > 0 {
            info!("Pruned {} old scan records", affected);
        }
        Ok(affected)
    }

    /// Prune records to keep only the most recent N entries.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_keep_recent(&self, keep_count: usize) -> Result<usize> {
        let keep_i64 = i64::try_from(keep_count).unwrap_or(i64::MAX);
        let affected = self.conn.execute(
            r"
            DELETE FROM scans WHERE id NOT IN (
                SELECT id FROM scans ORDER BY timestamp DESC, id DESC LIMIT ?1
            )
            ",
            [keep_i64],
        )?;

        if affected > 0 {
            info!("Pruned {} scan records to keep {} recent", affected, keep_count);
        }
        Ok(affected)
    }

    /// Get history statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<HistoryStats> {
        let total_records = self.count()?;

        let oldest: Option<String> = self
            .conn
            .query_row(
                "SELECT timestamp FROM scans ORDER BY timestamp ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT timestamp FROM scans ORDER BY timestamp DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let parse = |s: Option<String>| {
            s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };

        Ok(HistoryStats {
            total_records,
            oldest_scan: parse(oldest),
            newest_scan: parse(newest),
        })
    }

    /// Convert a database row to a `ScanRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ScanRecord> {
        let id: i64 = row.get(0)?;
        let timestamp_str: String = row.get(1)?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

        Ok(ScanRecord {
            id: Some(id),
            timestamp,
            source: row.get(2)?,
            payload_hash: row.get(3)?,
            scanned_id: row.get(4)?,
            outcome: row.get(5)?,
            message: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: &str, hash: Option<&str>) -> ScanRecord {
        ScanRecord::new(
            "scan:/tmp/frame.png",
            hash.map(String::from),
            Some("42".to_string()),
            outcome,
            "test message",
        )
    }

    #[test]
    fn test_insert_and_get_recent() {
        let history = History::open_in_memory().unwrap();

        let id = history.insert(&record("verified", Some("abc"))).unwrap();
        assert!(id > 0);

        let records = history.get_recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, "verified");
        assert_eq!(records[0].scanned_id.as_deref(), Some("42"));
        assert_eq!(records[0].id, Some(id));
    }

    #[test]
    fn test_get_recent_orders_newest_first() {
        let history = History::open_in_memory().unwrap();

        let mut older = record("verified", None);
        older.timestamp = Utc::now() - ChronoDuration::hours(2);
        history.insert(&older).unwrap();
        history.insert(&record("duplicate", None)).unwrap();

        let records = history.get_recent(10).unwrap();
        assert_eq!(records[0].outcome, "duplicate");
        assert_eq!(records[1].outcome, "verified");
    }

    #[test]
    fn test_get_recent_respects_limit() {
        let history = History::open_in_memory().unwrap();
        for _ in 0..5 {
            history.insert(&record("not_found", None)).unwrap();
        }
        assert_eq!(history.get_recent(3).unwrap().len(), 3);
    }

    #[test]
    fn test_get_by_outcome() {
        let history = History::open_in_memory().unwrap();
        history.insert(&record("verified", None)).unwrap();
        history.insert(&record("duplicate", None)).unwrap();
        history.insert(&record("duplicate", None)).unwrap();

        let dupes = history.get_by_outcome("duplicate", 10).unwrap();
        assert_eq!(dupes.len(), 2);
        assert!(dupes.iter().all(|r| r.outcome == "duplicate"));
    }

    #[test]
    fn test_seen_hash_within() {
        let history = History::open_in_memory().unwrap();
        let hour = std::time::Duration::from_secs(60 * 60);
        assert!(!history.seen_hash_within("abc", hour).unwrap());

        history.insert(&record("verified", Some("abc"))).unwrap();
        assert!(history.seen_hash_within("abc", hour).unwrap());
        assert!(!history.seen_hash_within("def", hour).unwrap());
    }

    #[test]
    fn test_seen_hash_outside_window() {
        let history = History::open_in_memory().unwrap();

        let mut old = record("verified", Some("abc"));
        old.timestamp = Utc::now() - ChronoDuration::hours(2);
        history.insert(&old).unwrap();

        let hour = std::time::Duration::from_secs(60 * 60);
        assert!(!history.seen_hash_within("abc", hour).unwrap());

        // An oversized window degrades to "ever seen"
        assert!(history
            .seen_hash_within("abc", std::time::Duration::MAX)
            .unwrap());
    }

    #[test]
    fn test_count() {
        let history = History::open_in_memory().unwrap();
        assert_eq!(history.count().unwrap(), 0);

        history.insert(&record("verified", None)).unwrap();
        history.insert(&record("not_found", None)).unwrap();
        assert_eq!(history.count().unwrap(), 2);
    }

    #[test]
    fn test_prune_older_than() {
        let history = History::open_in_memory().unwrap();

        let mut old = record("verified", None);
        old.timestamp = Utc::now() - ChronoDuration::days(10);
        history.insert(&old).unwrap();
        history.insert(&record("verified", None)).unwrap();

        let pruned = history
            .prune_older_than(std::time::Duration::from_secs(24 * 60 * 60))
            .unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(history.count().unwrap(), 1);
    }

    #[test]
    fn test_prune_keep_recent() {
        let history = History::open_in_memory().unwrap();
        for i in 0..5 {
            let mut r = record("verified", None);
            r.timestamp = Utc::now() - ChronoDuration::minutes(i);
            history.insert(&r).unwrap();
        }

        let pruned = history.prune_keep_recent(2).unwrap();
        assert_eq!(pruned, 3);
        assert_eq!(history.count().unwrap(), 2);
    }

    #[test]
    fn test_stats() {
        let history = History::open_in_memory().unwrap();
        let empty = history.stats().unwrap();
        assert_eq!(empty.total_records, 0);
        assert!(empty.oldest_scan.is_none());

        history.insert(&record("verified", None)).unwrap();
        let stats = history.stats().unwrap();
        assert_eq!(stats.total_records, 1);
        assert!(stats.oldest_scan.is_some());
        assert!(stats.newest_scan.is_some());
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/scans.db");

        let history = History::open(&path).unwrap();
        assert_eq!(history.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_record_serializes_without_null_optionals() {
        let r = ScanRecord::new("scan:x", None, None, "no_code", "nothing decoded");
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("payload_hash"));
        assert!(!json.contains("scanned_id"));
        assert!(json.contains("no_code"));
    }
}
