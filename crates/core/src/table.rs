// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronizable tables and the handlers that fetch, diff and apply them.
//!
//! Each table is identified by a [`SyncTable`] and described by a static
//! [`TableSpec`]. A [`TableRegistry`] maps tables to [`TableHandler`]s in
//! priority order; the standard registry installs a column-driven handler
//! for every table, and callers may replace individual handlers.
//!
//! Classification rules:
//! - No local record with the natural key: New
//! - Values differ (NULL equals empty string): Updated
//! - Values differ and both change timestamps are after the watermark: Conflict

use chrono::{DateTime, Utc};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::change::{ChangeType, PendingChange};
use crate::error::{Error, Result};
use crate::remote::RemoteSession;
use crate::value::{format_timestamp, FieldValue, RecordKey, Row, Snapshot};

const NULL_VALUE: &FieldValue = &FieldValue::Null;

/// A table that takes part in branch synchronization.
///
/// Declaration order is sync priority order: referenced tables come before
/// the tables that reference them by natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTable {
    Departments,
    Shifts,
    Machines,
    Users,
    AttendanceLogs,
    ExceptionTypes,
    Exceptions,
}

impl SyncTable {
    /// All tables in priority order.
    pub const ALL: [SyncTable; 7] = [
        SyncTable::Departments,
        SyncTable::Shifts,
        SyncTable::Machines,
        SyncTable::Users,
        SyncTable::AttendanceLogs,
        SyncTable::ExceptionTypes,
        SyncTable::Exceptions,
    ];

    pub fn as_str(&self) -> &'static str {
        self.spec().name
    }

    pub fn spec(&self) -> &'static TableSpec {
        match self {
            SyncTable::Departments => &DEPARTMENTS,
            SyncTable::Shifts => &SHIFTS,
            SyncTable::Machines => &MACHINES,
            SyncTable::Users => &USERS,
            SyncTable::AttendanceLogs => &ATTENDANCE_LOGS,
            SyncTable::ExceptionTypes => &EXCEPTION_TYPES,
            SyncTable::Exceptions => &EXCEPTIONS,
        }
    }
}

impl fmt::Display for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        SyncTable::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| Error::UnknownTable(s.to_string()))
    }
}

/// Column layout of a synchronizable table.
#[derive(Debug)]
pub struct TableSpec {
    pub table: SyncTable,
    /// SQL table name, identical on every location.
    pub name: &'static str,
    /// Natural key columns; matched between local and remote.
    pub key_columns: &'static [&'static str],
    /// Compared and copied columns.
    pub value_columns: &'static [&'static str],
    /// Column bounding incremental fetches.
    pub since_column: &'static str,
    /// Last-modified column used for conflict detection. Never compared.
    pub modified_column: Option<&'static str>,
}

static DEPARTMENTS: TableSpec = TableSpec {
    table: SyncTable::Departments,
    name: "departments",
    key_columns: &["name"],
    value_columns: &["parent_name"],
    since_column: "updated_at",
    modified_column: Some("updated_at"),
};

static SHIFTS: TableSpec = TableSpec {
    table: SyncTable::Shifts,
    name: "shifts",
    key_columns: &["name"],
    value_columns: &[
        "start_time",
        "end_time",
        "late_grace_minutes",
        "early_grace_minutes",
    ],
    since_column: "updated_at",
    modified_column: Some("updated_at"),
};

static MACHINES: TableSpec = TableSpec {
    table: SyncTable::Machines,
    name: "machines",
    key_columns: &["serial_number"],
    value_columns: &["name", "ip_address", "port"],
    since_column: "updated_at",
    modified_column: Some("updated_at"),
};

static USERS: TableSpec = TableSpec {
    table: SyncTable::Users,
    name: "users",
    key_columns: &["badge_number"],
    value_columns: &[
        "name",
        "department",
        "shift",
        "card_number",
        "gender",
        "title",
        "hired_on",
    ],
    since_column: "updated_at",
    modified_column: Some("updated_at"),
};

// Punches are immutable device records: no modification time, so they can
// never be in conflict.
static ATTENDANCE_LOGS: TableSpec = TableSpec {
    table: SyncTable::AttendanceLogs,
    name: "attendance_logs",
    key_columns: &["badge_number", "check_time", "machine_serial"],
    value_columns: &["check_type", "verify_code", "work_code"],
    since_column: "check_time",
    modified_column: None,
};

static EXCEPTION_TYPES: TableSpec = TableSpec {
    table: SyncTable::ExceptionTypes,
    name: "exception_types",
    key_columns: &["name"],
    value_columns: &["unit", "deduct_from_leave"],
    since_column: "updated_at",
    modified_column: Some("updated_at"),
};

static EXCEPTIONS: TableSpec = TableSpec {
    table: SyncTable::Exceptions,
    name: "exceptions",
    key_columns: &["badge_number", "start_time", "exception_type"],
    value_columns: &["end_time", "reason"],
    since_column: "updated_at",
    modified_column: Some("updated_at"),
};

impl TableSpec {
    /// All selected columns: keys, values, then the modified column.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns: Vec<&'static str> = self
            .key_columns
            .iter()
            .chain(self.value_columns.iter())
            .copied()
            .collect();
        if let Some(modified) = self.modified_column {
            if !columns.contains(&modified) {
                columns.push(modified);
            }
        }
        columns
    }

    /// Extracts the natural key from a set of column values.
    pub fn key_of(&self, values: &Snapshot) -> RecordKey {
        RecordKey::new(self.key_columns.iter().map(|col| {
            values
                .get(*col)
                .map(FieldValue::key_component)
                .unwrap_or_default()
        }))
    }

    /// Last-modified time of a row, if the table tracks one and it parses.
    pub fn modified_at(&self, row: &Row) -> Option<DateTime<Utc>> {
        self.modified_column
            .and_then(|col| row.get(col).as_timestamp())
    }

    fn select_sql(&self, incremental: bool) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.columns().join(", "), self.name);
        if incremental {
            sql.push_str(&format!(" WHERE {} >= ?1", self.since_column));
        }
        sql.push_str(&format!(" ORDER BY {}, rowid", self.key_columns.join(", ")));
        sql
    }

    fn key_params<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a FieldValue> {
        self.key_columns
            .iter()
            .map(|col| snapshot.get(*col).unwrap_or(NULL_VALUE))
            .collect()
    }

    fn key_predicate(&self, first_param: usize) -> String {
        self.key_columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{col} = ?{}", first_param + i))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Reads rows of one table, optionally bounded by `since` (inclusive).
///
/// Works against any connection carrying the shared schema, local or remote.
pub fn select_rows(
    conn: &Connection,
    spec: &TableSpec,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<Row>> {
    let columns = spec.columns();
    let mut stmt = conn.prepare(&spec.select_sql(since.is_some()))?;

    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Snapshot> {
        let mut values = Snapshot::new();
        for (i, col) in columns.iter().enumerate() {
            values.insert((*col).to_string(), row.get(i)?);
        }
        Ok(values)
    };

    let snapshots = match since {
        Some(ts) => stmt
            .query_map([format_timestamp(ts)], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
    };

    Ok(snapshots
        .into_iter()
        .map(|values| Row {
            key: spec.key_of(&values),
            values,
        })
        .collect())
}

/// Collapses rows sharing a natural key.
///
/// Exact duplicates are dropped silently. Rows that share a key but differ
/// keep the most recently modified one, or the first in fetch order when the
/// table has no modification time.
pub fn dedupe(spec: &TableSpec, mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        match out.last_mut() {
            Some(last) if last.key == row.key => {
                if last.values == row.values {
                    continue;
                }
                tracing::warn!(
                    table = spec.name,
                    key = %row.key,
                    "conflicting duplicate rows share a natural key"
                );
                if let (Some(kept), Some(candidate)) = (spec.modified_at(last), spec.modified_at(&row)) {
                    if candidate > kept {
                        *last = row;
                    }
                }
            }
            _ => out.push(row),
        }
    }
    out
}

/// Classification of one remote row against its local counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub change_type: ChangeType,
    pub changed_fields: Vec<String>,
}

/// Classifies a remote row. Returns `None` when both sides agree.
pub fn classify(
    spec: &TableSpec,
    local: Option<&Row>,
    remote: &Row,
    watermark: Option<DateTime<Utc>>,
) -> Option<Divergence> {
    let Some(local) = local else {
        return Some(Divergence {
            change_type: ChangeType::New,
            changed_fields: Vec::new(),
        });
    };

    let changed_fields: Vec<String> = spec
        .value_columns
        .iter()
        .filter(|col| !local.get(col).same_as(remote.get(col)))
        .map(|col| (*col).to_string())
        .collect();

    if changed_fields.is_empty() {
        return None;
    }

    let both_changed = match watermark {
        Some(mark) => matches!(
            (spec.modified_at(local), spec.modified_at(remote)),
            (Some(l), Some(r)) if l > mark && r > mark
        ),
        None => false,
    };

    Some(Divergence {
        change_type: if both_changed {
            ChangeType::Conflict
        } else {
            ChangeType::Updated
        },
        changed_fields,
    })
}

/// What applying a single change did to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    Updated,
}

/// Writes one approved change using the table's column layout.
///
/// New records must not exist yet; updated and conflicting records take the
/// remote values and must still exist.
pub fn apply_change(conn: &Connection, spec: &TableSpec, change: &PendingChange) -> Result<Applied> {
    let remote = &change.remote_snapshot;
    let exists_sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
        spec.name,
        spec.key_predicate(1)
    );
    let exists: bool = conn.query_row(
        &exists_sql,
        params_from_iter(spec.key_params(remote)),
        |row| row.get(0),
    )?;

    match change.change_type {
        ChangeType::New => {
            if exists {
                return Err(Error::RecordExists {
                    table: spec.name.to_string(),
                    key: change.record_key.to_string(),
                });
            }
            let columns = spec.columns();
            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                spec.name,
                columns.join(", "),
                placeholders.join(", ")
            );
            let values: Vec<&FieldValue> = columns
                .iter()
                .map(|col| remote.get(*col).unwrap_or(NULL_VALUE))
                .collect();
            conn.execute(&sql, params_from_iter(values))?;
            Ok(Applied::Inserted)
        }
        ChangeType::Updated | ChangeType::Conflict => {
            if !exists {
                return Err(Error::RecordMissing {
                    table: spec.name.to_string(),
                    key: change.record_key.to_string(),
                });
            }
            let mut set_columns: Vec<&'static str> = spec.value_columns.to_vec();
            if let Some(modified) = spec.modified_column {
                set_columns.push(modified);
            }
            let assignments: Vec<String> = set_columns
                .iter()
                .enumerate()
                .map(|(i, col)| format!("{col} = ?{}", i + 1))
                .collect();
            let sql = format!(
                "UPDATE {} SET {} WHERE {}",
                spec.name,
                assignments.join(", "),
                spec.key_predicate(set_columns.len() + 1)
            );
            let mut values: Vec<&FieldValue> = set_columns
                .iter()
                .map(|col| remote.get(*col).unwrap_or(NULL_VALUE))
                .collect();
            values.extend(spec.key_params(remote));
            conn.execute(&sql, params_from_iter(values))?;
            Ok(Applied::Updated)
        }
    }
}

/// Fetch, diff and apply behavior for one table.
///
/// Default methods implement the column-driven behavior from [`TableSpec`];
/// handlers override only what differs.
pub trait TableHandler: Send + Sync {
    fn spec(&self) -> &'static TableSpec;

    /// Reads every local row of the table.
    fn fetch_local(&self, conn: &Connection) -> Result<Vec<Row>> {
        select_rows(conn, self.spec(), None)
    }

    /// Reads remote rows, bounded by `since` for incremental runs.
    fn fetch_remote(
        &self,
        session: &mut dyn RemoteSession,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Row>> {
        session.fetch_rows(self.spec(), since)
    }

    fn diff(
        &self,
        local: Option<&Row>,
        remote: &Row,
        watermark: Option<DateTime<Utc>>,
    ) -> Option<Divergence> {
        classify(self.spec(), local, remote, watermark)
    }

    fn apply(&self, conn: &Connection, change: &PendingChange) -> Result<Applied> {
        apply_change(conn, self.spec(), change)
    }
}

/// Handler driven entirely by the table's [`TableSpec`].
pub struct ColumnTable {
    spec: &'static TableSpec,
}

impl ColumnTable {
    pub fn new(table: SyncTable) -> Self {
        ColumnTable { spec: table.spec() }
    }
}

impl TableHandler for ColumnTable {
    fn spec(&self) -> &'static TableSpec {
        self.spec
    }
}

/// Handlers keyed by table, iterated in priority order.
pub struct TableRegistry {
    handlers: BTreeMap<SyncTable, Box<dyn TableHandler>>,
}

impl TableRegistry {
    /// A registry with no tables.
    pub fn empty() -> Self {
        TableRegistry {
            handlers: BTreeMap::new(),
        }
    }

    /// Every table with its column-driven handler.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for table in SyncTable::ALL {
            registry.register(Box::new(ColumnTable::new(table)));
        }
        registry
    }

    /// Installs a handler for the table named by its spec, returning the previous one.
    pub fn register(&mut self, handler: Box<dyn TableHandler>) -> Option<Box<dyn TableHandler>> {
        self.handlers.insert(handler.spec().table, handler)
    }

    pub fn get(&self, table: SyncTable) -> Option<&dyn TableHandler> {
        self.handlers.get(&table).map(|h| h.as_ref())
    }

    /// Handlers in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (SyncTable, &dyn TableHandler)> {
        self.handlers.iter().map(|(table, h)| (*table, h.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
