// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation queue: the operator's approval surface for one detection.
//!
//! Every change starts unapproved. Nothing here touches a database.

use sha2::{Digest, Sha256};

use crate::change::{ChangeId, PendingChange};
use crate::error::{Error, Result};

/// Pending changes of one run with their approval flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationQueue {
    changes: Vec<PendingChange>,
}

impl ReconciliationQueue {
    /// Wraps a detection result. Approval flags are reset.
    pub fn new(mut changes: Vec<PendingChange>) -> Self {
        for change in &mut changes {
            change.is_approved = false;
        }
        ReconciliationQueue { changes }
    }

    pub fn changes(&self) -> &[PendingChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn get(&self, id: ChangeId) -> Option<&PendingChange> {
        self.changes.iter().find(|c| c.change_id == id)
    }

    fn get_mut(&mut self, id: ChangeId) -> Result<&mut PendingChange> {
        self.changes
            .iter_mut()
            .find(|c| c.change_id == id)
            .ok_or(Error::ChangeNotFound(id))
    }

    pub fn set_approved(&mut self, id: ChangeId, approved: bool) -> Result<()> {
        self.get_mut(id)?.is_approved = approved;
        Ok(())
    }

    /// Flips one change's flag and returns the new value.
    pub fn toggle(&mut self, id: ChangeId) -> Result<bool> {
        let change = self.get_mut(id)?;
        change.is_approved = !change.is_approved;
        Ok(change.is_approved)
    }

    /// Approves several changes; fails without changing anything if any id is unknown.
    pub fn approve_ids(&mut self, ids: &[ChangeId]) -> Result<()> {
        if let Some(missing) = ids.iter().find(|id| self.get(**id).is_none()) {
            return Err(Error::ChangeNotFound(*missing));
        }
        for id in ids {
            self.set_approved(*id, true)?;
        }
        Ok(())
    }

    pub fn select_all(&mut self) {
        for change in &mut self.changes {
            change.is_approved = true;
        }
    }

    pub fn deselect_all(&mut self) {
        for change in &mut self.changes {
            change.is_approved = false;
        }
    }

    /// Approves every change matching the predicate, returning how many matched.
    pub fn approve_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&PendingChange) -> bool,
    {
        let mut matched = 0;
        for change in &mut self.changes {
            if predicate(change) {
                change.is_approved = true;
                matched += 1;
            }
        }
        matched
    }

    /// Fingerprint of the pending changes, ignoring approval flags.
    ///
    /// Two detections share a digest only when they list the same records
    /// under the same ids, with the same change types and values.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for change in &self.changes {
            hasher.update(format!(
                "{}\t{}\t{}\t{}\n",
                change.change_id, change.table, change.record_key, change.change_type
            ));
            let sides = [
                ("local", change.local_snapshot.as_ref()),
                ("remote", Some(&change.remote_snapshot)),
            ];
            for (side, snapshot) in sides {
                for (column, value) in snapshot.into_iter().flatten() {
                    hasher.update(format!("{side}.{column}={value}\n"));
                }
            }
        }
        hex::encode(&hasher.finalize()[..8])
    }

    pub fn approved_count(&self) -> usize {
        self.changes.iter().filter(|c| c.is_approved).count()
    }

    /// Snapshot of the approved changes for the applier.
    pub(crate) fn approved(&self) -> ApprovedSet {
        ApprovedSet {
            changes: self
                .changes
                .iter()
                .filter(|c| c.is_approved)
                .cloned()
                .collect(),
        }
    }
}

/// Approved changes handed to the applier. Consumed by value, applied once.
#[derive(Debug, PartialEq)]
pub struct ApprovedSet {
    changes: Vec<PendingChange>,
}

impl ApprovedSet {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.iter()
    }

    pub(crate) fn into_changes(self) -> Vec<PendingChange> {
        self.changes
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
