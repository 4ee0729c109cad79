// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only record of sync attempts.

use chrono::{DateTime, Timelike, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::{parse_count, parse_db, parse_timestamp, Database};
use crate::error::{Error, Result};
use crate::value::format_timestamp;

/// Whether a run compared every remote row or only rows since the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Full,
    Incremental,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Full => "full",
            SyncType::Incremental => "incremental",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "full" => Ok(SyncType::Full),
            "incremental" => Ok(SyncType::Incremental),
            _ => Err(Error::InvalidInput(format!(
                "invalid sync type: '{s}'\n  hint: valid types are: full, incremental"
            ))),
        }
    }
}

/// Outcome of one sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Committed with no row errors.
    Success,
    /// Committed, but some approved rows were skipped.
    Partial,
    /// Probe, detection or commit failed; nothing was written.
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Partial => "partial",
            SyncStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "success" => Ok(SyncStatus::Success),
            "partial" => Ok(SyncStatus::Partial),
            "failed" => Ok(SyncStatus::Failed),
            _ => Err(Error::InvalidInput(format!("invalid sync status: '{s}'"))),
        }
    }
}

/// A sync attempt about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncAttempt {
    pub location_name: String,
    pub sync_type: SyncType,
    pub records_added: usize,
    pub records_updated: usize,
    pub records_skipped: usize,
    pub status: SyncStatus,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SyncAttempt {
    /// An attempt that failed before anything was applied.
    pub fn failed(
        location_name: &str,
        sync_type: SyncType,
        error: &Error,
        started_at: DateTime<Utc>,
    ) -> Self {
        SyncAttempt {
            location_name: location_name.to_string(),
            sync_type,
            records_added: 0,
            records_updated: 0,
            records_skipped: 0,
            status: SyncStatus::Failed,
            error_message: Some(error.to_string()),
            started_at,
            completed_at: Utc::now(),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// A recorded sync attempt. Never modified once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncHistoryEntry {
    pub id: i64,
    pub location_name: String,
    pub sync_type: SyncType,
    pub records_added: usize,
    pub records_updated: usize,
    pub records_skipped: usize,
    pub status: SyncStatus,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl Database {
    /// Appends one attempt to the history.
    ///
    /// The returned entry matches what [`Database::recent_syncs`] reads back:
    /// timestamps are stored to the whole second, the duration is exact.
    pub fn record_sync(&self, attempt: &SyncAttempt) -> Result<SyncHistoryEntry> {
        let duration_seconds = attempt.duration_seconds();
        let started_at = whole_seconds(attempt.started_at);
        let completed_at = whole_seconds(attempt.completed_at);
        self.conn.execute(
            "INSERT INTO sync_history (location_name, sync_type, records_added, records_updated,
             records_skipped, status, error_message, started_at, completed_at, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                attempt.location_name,
                attempt.sync_type.as_str(),
                count_to_db(attempt.records_added)?,
                count_to_db(attempt.records_updated)?,
                count_to_db(attempt.records_skipped)?,
                attempt.status.as_str(),
                attempt.error_message,
                format_timestamp(started_at),
                format_timestamp(completed_at),
                duration_seconds,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(
            id,
            location = %attempt.location_name,
            status = %attempt.status,
            "recorded sync attempt"
        );

        Ok(SyncHistoryEntry {
            id,
            location_name: attempt.location_name.clone(),
            sync_type: attempt.sync_type,
            records_added: attempt.records_added,
            records_updated: attempt.records_updated,
            records_skipped: attempt.records_skipped,
            status: attempt.status,
            error_message: attempt.error_message.clone(),
            started_at,
            completed_at,
            duration_seconds,
        })
    }

    /// Most recent attempts, newest first, optionally for one location.
    pub fn recent_syncs(&self, limit: usize, location: Option<&str>) -> Result<Vec<SyncHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, location_name, sync_type, records_added, records_updated, records_skipped,
                    status, error_message, started_at, completed_at, duration_seconds
             FROM sync_history
             WHERE ?1 IS NULL OR location_name = ?1
             ORDER BY started_at DESC, id DESC
             LIMIT ?2",
        )?;

        let entries = stmt
            .query_map(params![location, i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                let sync_type: String = row.get(2)?;
                let status: String = row.get(6)?;
                let started_at: String = row.get(8)?;
                let completed_at: String = row.get(9)?;
                Ok(SyncHistoryEntry {
                    id: row.get(0)?,
                    location_name: row.get(1)?,
                    sync_type: parse_db(&sync_type, "sync_type")?,
                    records_added: parse_count(row.get(3)?, "records_added")?,
                    records_updated: parse_count(row.get(4)?, "records_updated")?,
                    records_skipped: parse_count(row.get(5)?, "records_skipped")?,
                    status: parse_db(&status, "status")?,
                    error_message: row.get(7)?,
                    started_at: parse_timestamp(&started_at, "started_at")?,
                    completed_at: parse_timestamp(&completed_at, "completed_at")?,
                    duration_seconds: row.get(10)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn whole_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

fn count_to_db(count: usize) -> Result<i64> {
    i64::try_from(count).map_err(|_| Error::InvalidInput(format!("record count {count} out of range")))
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
