// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Applies approved changes to the local store in one transaction.
//!
//! Apply rules:
//! - New: inserted, counted as added
//! - Updated and approved Conflict: remote values taken, counted as updated
//! - A failing row rolls back its own savepoint and is counted as skipped
//! - A failed commit leaves nothing applied and every row skipped
//!
//! Watermarks move in the same transaction, only for tables that fully
//! converged: every detected change approved and applied without error.

use std::collections::BTreeMap;

use rusqlite::Transaction;
use serde::Serialize;

use crate::change::PendingChange;
use crate::db::Database;
use crate::detect::TableScan;
use crate::error::{Error, Result};
use crate::history::SyncStatus;
use crate::location::LocationId;
use crate::queue::ApprovedSet;
use crate::table::{Applied, SyncTable, TableRegistry};
use crate::watermark::store_watermark;

/// Outcome of one apply pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Committed with no row errors.
    pub success: bool,
    /// The transaction was committed.
    pub committed: bool,
    pub records_added: usize,
    pub records_updated: usize,
    pub records_skipped: usize,
    pub errors: Vec<String>,
    /// Descriptions of rows written, in apply order.
    pub applied: Vec<String>,
}

impl SyncResult {
    pub fn status(&self) -> SyncStatus {
        match (self.committed, self.errors.is_empty()) {
            (false, _) => SyncStatus::Failed,
            (true, true) => SyncStatus::Success,
            (true, false) => SyncStatus::Partial,
        }
    }

    fn aborted(mut self, total: usize, err: &Error) -> Self {
        self.success = false;
        self.committed = false;
        self.records_added = 0;
        self.records_updated = 0;
        self.records_skipped = total;
        self.applied.clear();
        self.errors.push(format!("transaction failed: {err}"));
        self
    }
}

pub struct ChangeApplier<'a> {
    tables: &'a TableRegistry,
}

impl<'a> ChangeApplier<'a> {
    pub fn new(tables: &'a TableRegistry) -> Self {
        ChangeApplier { tables }
    }

    /// Applies the approved set, consuming it.
    ///
    /// `scans` lists the tables detection covered, for advancing watermarks.
    pub fn apply(
        &self,
        db: &mut Database,
        location_id: LocationId,
        approved: ApprovedSet,
        scans: &[TableScan],
    ) -> SyncResult {
        let changes = approved.into_changes();
        let total = changes.len();
        let mut result = SyncResult::default();

        let mut tx = match db.conn.transaction() {
            Ok(tx) => tx,
            Err(e) => return result.aborted(total, &e.into()),
        };

        let mut clean: BTreeMap<SyncTable, usize> = BTreeMap::new();
        for change in &changes {
            match self.apply_one(&mut tx, change) {
                Ok(applied) => {
                    match applied {
                        Applied::Inserted => result.records_added += 1,
                        Applied::Updated => result.records_updated += 1,
                    }
                    *clean.entry(change.table).or_default() += 1;
                    result.applied.push(change.description.clone());
                    tracing::debug!(
                        change_id = change.change_id,
                        table = %change.table,
                        key = %change.record_key,
                        "applied change"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        change_id = change.change_id,
                        table = %change.table,
                        key = %change.record_key,
                        error = %e,
                        "skipped change"
                    );
                    result.records_skipped += 1;
                    result
                        .errors
                        .push(format!("{} {}: {e}", change.table, change.record_key));
                }
            }
        }

        let converged: Vec<&TableScan> = scans
            .iter()
            .filter(|scan| clean.get(&scan.table).copied().unwrap_or(0) == scan.pending)
            .collect();
        for scan in &converged {
            if let Err(e) = store_watermark(&tx, location_id, scan.table, scan.fetched_at) {
                return result.aborted(total, &e);
            }
        }

        if let Err(e) = tx.commit() {
            return result.aborted(total, &e.into());
        }

        result.committed = true;
        result.success = result.errors.is_empty();
        tracing::info!(
            location_id,
            added = result.records_added,
            updated = result.records_updated,
            skipped = result.records_skipped,
            watermarks = converged.len(),
            "apply committed"
        );
        result
    }

    fn apply_one(&self, tx: &mut Transaction<'_>, change: &PendingChange) -> Result<Applied> {
        let handler = self
            .tables
            .get(change.table)
            .ok_or_else(|| Error::UnknownTable(change.table.to_string()))?;

        let savepoint = tx.savepoint()?;
        // Dropping an uncommitted savepoint rolls it back
        let applied = handler.apply(&savepoint, change)?;
        savepoint.commit()?;
        Ok(applied)
    }
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
