// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for bsync-core operations.

use std::time::Duration;

use thiserror::Error;

/// All possible errors that can occur in bsync-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("location not found: {0}")]
    LocationNotFound(String),

    #[error("location '{0}' already exists\n  hint: location names must be unique")]
    DuplicateLocation(String),

    #[error("cannot connect to location '{location}': {reason}")]
    Connectivity { location: String, reason: String },

    #[error("connection to location '{location}' timed out after {}s", after.as_secs_f64())]
    Timeout { location: String, after: Duration },

    #[error("detection failed for table {table}: {reason}")]
    Detection { table: String, reason: String },

    #[error("a sync run is already in progress for location '{0}'\n  hint: wait for it to finish or cancel it")]
    LocationBusy(String),

    #[error("approved changes were already applied for this run")]
    AlreadyApplied,

    #[error("invalid run state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },

    #[error("sync run cancelled")]
    Cancelled,

    #[error("pending change not found: {0}")]
    ChangeNotFound(u64),

    #[error("{table} record {key} no longer exists locally")]
    RecordMissing { table: String, key: String },

    #[error("{table} record {key} already exists locally")]
    RecordExists { table: String, key: String },

    #[error("unknown table: '{0}'\n  hint: valid tables are: departments, shifts, machines, users, attendance_logs, exception_types, exceptions")]
    UnknownTable(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for bsync-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
