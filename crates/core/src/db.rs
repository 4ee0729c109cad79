// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed local store.
//!
//! The [`Database`] struct owns the local connection. Location registry,
//! sync history and watermark operations are implemented on it in their own
//! modules; the attendance tables are read and written through the
//! [`TableRegistry`](crate::table::TableRegistry).

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

use crate::error::{Error, Result};

/// Attendance schema shared by the primary database and every branch.
pub const ATTENDANCE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS departments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    parent_name TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shifts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    late_grace_minutes INTEGER NOT NULL DEFAULT 0,
    early_grace_minutes INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS machines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    serial_number TEXT NOT NULL UNIQUE,
    name TEXT,
    ip_address TEXT,
    port INTEGER,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    badge_number TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    department TEXT,
    shift TEXT,
    card_number TEXT,
    gender TEXT,
    title TEXT,
    hired_on TEXT,
    updated_at TEXT NOT NULL
);

-- Device punches; devices may upload the same punch more than once
CREATE TABLE IF NOT EXISTS attendance_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    badge_number TEXT NOT NULL,
    check_time TEXT NOT NULL,
    machine_serial TEXT NOT NULL,
    check_type TEXT,
    verify_code INTEGER,
    work_code TEXT
);

CREATE TABLE IF NOT EXISTS exception_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    unit TEXT,
    deduct_from_leave INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS exceptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    badge_number TEXT NOT NULL,
    start_time TEXT NOT NULL,
    exception_type TEXT NOT NULL,
    end_time TEXT NOT NULL,
    reason TEXT,
    updated_at TEXT NOT NULL,
    UNIQUE (badge_number, start_time, exception_type)
);

CREATE INDEX IF NOT EXISTS idx_logs_key ON attendance_logs(badge_number, check_time, machine_serial);
CREATE INDEX IF NOT EXISTS idx_logs_check_time ON attendance_logs(check_time);
CREATE INDEX IF NOT EXISTS idx_users_updated ON users(updated_at);
CREATE INDEX IF NOT EXISTS idx_exceptions_updated ON exceptions(updated_at);
"#;

/// Tables that only exist in the primary database.
pub const ADMIN_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS remote_locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    host TEXT NOT NULL,
    port INTEGER NOT NULL,
    database_name TEXT NOT NULL,
    username TEXT NOT NULL,
    password TEXT NOT NULL,      -- enc:v1:<nonce>:<ciphertext>
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_name TEXT NOT NULL,
    sync_type TEXT NOT NULL,
    records_added INTEGER NOT NULL,
    records_updated INTEGER NOT NULL,
    records_skipped INTEGER NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT,
    started_at TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    duration_seconds REAL NOT NULL
);

CREATE TRIGGER IF NOT EXISTS sync_history_no_update
BEFORE UPDATE ON sync_history
BEGIN
    SELECT RAISE(ABORT, 'sync history is append-only');
END;

CREATE TRIGGER IF NOT EXISTS sync_history_no_delete
BEFORE DELETE ON sync_history
BEGIN
    SELECT RAISE(ABORT, 'sync history is append-only');
END;

CREATE TABLE IF NOT EXISTS sync_watermarks (
    location_id INTEGER NOT NULL,
    table_name TEXT NOT NULL,
    synced_at TEXT NOT NULL,
    PRIMARY KEY (location_id, table_name),
    FOREIGN KEY (location_id) REFERENCES remote_locations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_history_location ON sync_history(location_name);
CREATE INDEX IF NOT EXISTS idx_history_started ON sync_history(started_at DESC);
"#;

/// Parse an RFC3339 timestamp from the database.
pub(crate) fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(Error::CorruptedData(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

/// Parse a string value from the database, returning a rusqlite error on parse failure.
pub(crate) fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid value '{value}' in column '{column}'"
            ))),
        )
    })
}

/// Convert a stored record count, rejecting negative values.
pub(crate) fn parse_count(value: i64, column: &str) -> std::result::Result<usize, rusqlite::Error> {
    usize::try_from(value).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Integer,
            Box::new(Error::CorruptedData(format!(
                "invalid count {value} in column '{column}'"
            ))),
        )
    })
}

/// Create the attendance and administration schema on a connection.
///
/// Idempotent; every statement uses `IF NOT EXISTS`.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(ATTENDANCE_SCHEMA)?;
    conn.execute_batch(ADMIN_SCHEMA)?;
    Ok(())
}

/// SQLite database connection with sync administration operations.
pub struct Database {
    /// The underlying SQLite connection.
    pub conn: Connection,
}

impl Database {
    /// Open a database connection at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let db = Database { conn };
        run_migrations(&db.conn)?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database { conn };
        run_migrations(&db.conn)?;
        Ok(db)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
