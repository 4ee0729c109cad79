// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending changes: one detected divergence between a local and a remote record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::table::{Divergence, SyncTable};
use crate::value::{RecordKey, Row, Snapshot};

/// Identifier of a pending change, unique within one detection run.
pub type ChangeId = u64;

/// How a remote record diverges from its local counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// No local record with this natural key.
    New,
    /// Values differ and at most one side changed since the last sync.
    Updated,
    /// Values differ and both sides changed since the last sync.
    Conflict,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::New => "new",
            ChangeType::Updated => "updated",
            ChangeType::Conflict => "conflict",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ChangeType::New),
            "updated" => Ok(ChangeType::Updated),
            "conflict" => Ok(ChangeType::Conflict),
            _ => Err(Error::InvalidInput(format!("invalid change type: '{s}'"))),
        }
    }
}

/// A divergence awaiting explicit operator approval.
///
/// Never persisted; lives only as long as the run that detected it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub change_id: ChangeId,
    pub table: SyncTable,
    pub record_key: RecordKey,
    pub change_type: ChangeType,
    /// Local values; `None` for [`ChangeType::New`].
    pub local_snapshot: Option<Snapshot>,
    pub remote_snapshot: Snapshot,
    /// Differing columns in table column order; empty for new records.
    pub changed_fields: Vec<String>,
    pub description: String,
    pub is_approved: bool,
}

impl PendingChange {
    /// Builds an unapproved change from a classified row pair.
    ///
    /// The change id is assigned later, once the full list is ordered.
    pub fn new(table: SyncTable, local: Option<&Row>, remote: &Row, divergence: Divergence) -> Self {
        let description = describe(table, local, remote, &divergence);
        PendingChange {
            change_id: 0,
            table,
            record_key: remote.key.clone(),
            change_type: divergence.change_type,
            local_snapshot: local.map(|row| row.values.clone()),
            remote_snapshot: remote.values.clone(),
            changed_fields: divergence.changed_fields,
            description,
            is_approved: false,
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.table.as_str()
    }
}

fn describe(table: SyncTable, local: Option<&Row>, remote: &Row, divergence: &Divergence) -> String {
    let prefix = format!("{table} {}", remote.key);
    match (divergence.change_type, local) {
        (ChangeType::New, _) | (_, None) => {
            let values: Vec<String> = table
                .spec()
                .value_columns
                .iter()
                .filter(|col| !remote.get(col).is_blank())
                .map(|col| format!("{col}={}", remote.get(col)))
                .collect();
            if values.is_empty() {
                format!("{prefix}: new record")
            } else {
                format!("{prefix}: new record ({})", values.join(", "))
            }
        }
        (ChangeType::Updated, Some(local)) => {
            let fields: Vec<String> = divergence
                .changed_fields
                .iter()
                .map(|col| format!("{col} {} -> {}", local.get(col), remote.get(col)))
                .collect();
            format!("{prefix}: {}", fields.join(", "))
        }
        (ChangeType::Conflict, Some(local)) => {
            let fields: Vec<String> = divergence
                .changed_fields
                .iter()
                .map(|col| format!("{col} local {} vs remote {}", local.get(col), remote.get(col)))
                .collect();
            format!("{prefix}: changed on both sides; {}", fields.join(", "))
        }
    }
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
