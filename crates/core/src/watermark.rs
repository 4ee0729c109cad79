// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-(location, table) sync watermarks.
//!
//! A watermark is the time the remote fetch of a table began during the last
//! run that fully converged that table. Incremental runs fetch from it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{parse_db, parse_timestamp, Database};
use crate::error::Result;
use crate::location::LocationId;
use crate::table::SyncTable;
use crate::value::format_timestamp;

/// Reads one watermark on any connection, including an open transaction.
pub fn load_watermark(
    conn: &Connection,
    location_id: LocationId,
    table: SyncTable,
) -> Result<Option<DateTime<Utc>>> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT synced_at FROM sync_watermarks WHERE location_id = ?1 AND table_name = ?2",
            params![location_id, table.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(stored
        .map(|s| parse_timestamp(&s, "synced_at"))
        .transpose()?)
}

/// Inserts or moves a watermark.
pub fn store_watermark(
    conn: &Connection,
    location_id: LocationId,
    table: SyncTable,
    synced_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_watermarks (location_id, table_name, synced_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(location_id, table_name) DO UPDATE SET synced_at = excluded.synced_at",
        params![location_id, table.as_str(), format_timestamp(synced_at)],
    )?;
    Ok(())
}

impl Database {
    pub fn watermark(&self, location_id: LocationId, table: SyncTable) -> Result<Option<DateTime<Utc>>> {
        load_watermark(&self.conn, location_id, table)
    }

    /// All watermarks of a location, keyed by table.
    pub fn watermarks(&self, location_id: LocationId) -> Result<BTreeMap<SyncTable, DateTime<Utc>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT table_name, synced_at FROM sync_watermarks WHERE location_id = ?1")?;
        let rows = stmt.query_map(params![location_id], |row| {
            let table: String = row.get(0)?;
            let synced_at: String = row.get(1)?;
            Ok((
                parse_db::<SyncTable>(&table, "table_name")?,
                parse_timestamp(&synced_at, "synced_at")?,
            ))
        })?;
        Ok(rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()?)
    }

    /// Forgets every watermark of a location; the next run fetches everything.
    pub fn reset_watermarks(&self, location_id: LocationId) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM sync_watermarks WHERE location_id = ?1",
            params![location_id],
        )?)
    }
}

#[cfg(test)]
#[path = "watermark_tests.rs"]
mod tests;
