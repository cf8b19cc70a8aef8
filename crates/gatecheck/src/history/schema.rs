//! `SQLite` schema definitions for the scan history.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the scans table.
pub const CREATE_SCANS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    source TEXT NOT NULL,
    payload_hash TEXT,
    scanned_id TEXT,
    outcome TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on timestamp for efficient listing.
pub const CREATE_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_scans_timestamp ON scans(timestamp DESC)
";

/// SQL statement to create an index on `payload_hash` for deduplication checks.
pub const CREATE_HASH_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_scans_hash ON scans(payload_hash)
";

/// SQL statement to create an index on `outcome` for filtering.
pub const CREATE_OUTCOME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_scans_outcome ON scans(outcome)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_SCANS_TABLE,
    CREATE_TIMESTAMP_INDEX,
    CREATE_HASH_INDEX,
    CREATE_OUTCOME_INDEX,
    CREATE_METADATA_TABLE,
];
