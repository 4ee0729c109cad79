// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Change detection between a remote location and the local store.
//!
//! Tables are scanned in priority order. A table whose remote fetch fails is
//! reported as a [`TableWarning`] and skipped; the others still produce
//! changes. Failures reading the local store abort detection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::change::{ChangeId, PendingChange};
use crate::error::{Error, Result};
use crate::history::SyncType;
use crate::location::LocationId;
use crate::remote::RemoteSession;
use crate::table::{dedupe, SyncTable, TableRegistry};
use crate::value::{RecordKey, Row};
use crate::watermark::load_watermark;

/// Shared cancellation flag for an in-flight run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A table skipped during detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableWarning {
    pub table: SyncTable,
    pub message: String,
}

impl fmt::Display for TableWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.table, self.message)
    }
}

/// Outcome of scanning one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScan {
    pub table: SyncTable,
    /// When the remote fetch began; the table's next watermark.
    pub fetched_at: DateTime<Utc>,
    pub remote_rows: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionReport {
    /// Ordered by table priority, then natural key, with ids 1..n.
    pub changes: Vec<PendingChange>,
    pub warnings: Vec<TableWarning>,
    /// Tables that were scanned successfully.
    pub scans: Vec<TableScan>,
}

pub struct ChangeDetector<'a> {
    tables: &'a TableRegistry,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(tables: &'a TableRegistry) -> Self {
        ChangeDetector { tables }
    }

    pub fn detect(
        &self,
        session: &mut dyn RemoteSession,
        local: &Connection,
        location_id: LocationId,
        sync_type: SyncType,
        cancel: &CancelToken,
    ) -> Result<DetectionReport> {
        let mut report = DetectionReport::default();

        for (table, handler) in self.tables.iter() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let local_failure = |e: Error| Error::Detection {
                table: table.to_string(),
                reason: e.to_string(),
            };

            let watermark = load_watermark(local, location_id, table).map_err(local_failure)?;
            let since = match sync_type {
                SyncType::Full => None,
                SyncType::Incremental => watermark,
            };

            let fetched_at = Utc::now();
            let remote = match handler.fetch_remote(session, since) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(%table, error = %e, "skipping table: remote fetch failed");
                    report.warnings.push(TableWarning {
                        table,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            let spec = handler.spec();
            let local_rows = handler.fetch_local(local).map_err(local_failure)?;
            let local_rows: BTreeMap<RecordKey, Row> = dedupe(spec, local_rows)
                .into_iter()
                .map(|row| (row.key.clone(), row))
                .collect();
            let remote = dedupe(spec, remote);

            let before = report.changes.len();
            for row in &remote {
                let local_row = local_rows.get(&row.key);
                if let Some(divergence) = handler.diff(local_row, row, watermark) {
                    report
                        .changes
                        .push(PendingChange::new(table, local_row, row, divergence));
                }
            }
            let pending = report.changes.len() - before;

            tracing::debug!(%table, remote_rows = remote.len(), pending, "scanned table");
            report.scans.push(TableScan {
                table,
                fetched_at,
                remote_rows: remote.len(),
                pending,
            });
        }

        report
            .changes
            .sort_by(|a, b| (a.table, &a.record_key).cmp(&(b.table, &b.record_key)));
        for (index, change) in report.changes.iter_mut().enumerate() {
            change.change_id = index as ChangeId + 1;
        }

        tracing::info!(
            location_id,
            changes = report.changes.len(),
            warnings = report.warnings.len(),
            "detection finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
