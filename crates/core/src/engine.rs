// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync runs: probe, detect, await approval, apply.
//!
//! A [`SyncRun`] moves through
//! `Idle -> Probing -> Detecting -> AwaitingApproval -> Applying -> Completed | Failed`,
//! and may be cancelled at any point before applying. Each run holds its
//! location's lease from probing until it finishes, so two runs never target
//! the same location at once. Runs against different locations are
//! independent `Send` values.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::apply::{ChangeApplier, SyncResult};
use crate::audit::{AuditEntry, AuditLog};
use crate::db::Database;
use crate::detect::{CancelToken, ChangeDetector, TableScan, TableWarning};
use crate::error::{Error, Result};
use crate::history::{SyncAttempt, SyncHistoryEntry, SyncType};
use crate::location::RemoteLocation;
use crate::lock::{LocationLease, LocationLocks};
use crate::queue::ReconciliationQueue;
use crate::remote::{ConnectionProbe, RemoteConnector, DEFAULT_CONNECT_TIMEOUT};
use crate::table::TableRegistry;

/// Who is syncing which location.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub location: RemoteLocation,
    pub operator: String,
}

/// Where a run is in its lifecycle.
///
/// `Idle`, `Probing` and `Detecting` pass inside [`SyncEngine::start`] and
/// only show up in logs; a [`SyncRun`] value begins at `AwaitingApproval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Probing,
    Detecting,
    AwaitingApproval,
    Applying,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Probing => "probing",
            RunState::Detecting => "detecting",
            RunState::AwaitingApproval => "awaiting_approval",
            RunState::Applying => "applying",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entry point for probing locations and starting runs.
pub struct SyncEngine {
    probe: ConnectionProbe,
    tables: Arc<TableRegistry>,
    locks: LocationLocks,
    audit: Option<AuditLog>,
}

impl SyncEngine {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        SyncEngine {
            probe: ConnectionProbe::new(connector, DEFAULT_CONNECT_TIMEOUT),
            tables: Arc::new(TableRegistry::standard()),
            locks: LocationLocks::new(),
            audit: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.probe = self.probe.with_timeout(timeout);
        self
    }

    pub fn with_tables(mut self, tables: TableRegistry) -> Self {
        self.tables = Arc::new(tables);
        self
    }

    /// Shares leases with other engines, or other processes for directory-backed locks.
    pub fn with_locks(mut self, locks: LocationLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn locks(&self) -> &LocationLocks {
        &self.locks
    }

    pub fn audit_log(&self) -> Option<&AuditLog> {
        self.audit.as_ref()
    }

    /// Checks reachability without starting a run or recording anything.
    pub fn test_connection(&self, location: &RemoteLocation) -> Result<()> {
        self.probe.test(location)
    }

    /// Probes and detects, returning a run awaiting approval.
    ///
    /// Probe and detection failures are recorded in history and the audit
    /// log before being returned. Cancellation records nothing.
    pub fn start(
        &self,
        db: &Database,
        context: SyncContext,
        sync_type: SyncType,
        cancel: &CancelToken,
    ) -> Result<SyncRun> {
        let started_at = Utc::now();
        let location = &context.location;
        tracing::debug!(location = %location.name, state = %RunState::Idle, "acquiring lease");
        let lease = self.locks.try_acquire(location)?;

        tracing::info!(
            location = %location.name,
            %sync_type,
            state = %RunState::Probing,
            "sync run started"
        );
        let mut session = match self.probe.open(location) {
            Ok(session) => session,
            Err(e) => {
                self.record_failure(db, &context, sync_type, started_at, &e);
                return Err(e);
            }
        };

        if cancel.is_cancelled() {
            tracing::info!(location = %location.name, "sync run cancelled");
            return Err(Error::Cancelled);
        }

        tracing::info!(location = %location.name, state = %RunState::Detecting, "probe succeeded");
        let report = match ChangeDetector::new(&self.tables).detect(
            session.as_mut(),
            &db.conn,
            location.id,
            sync_type,
            cancel,
        ) {
            Ok(report) => report,
            Err(Error::Cancelled) => {
                tracing::info!(location = %location.name, "sync run cancelled");
                return Err(Error::Cancelled);
            }
            Err(e) => {
                self.record_failure(db, &context, sync_type, started_at, &e);
                return Err(e);
            }
        };

        tracing::info!(
            location = %location.name,
            state = %RunState::AwaitingApproval,
            changes = report.changes.len(),
            "awaiting approval"
        );
        Ok(SyncRun {
            context,
            sync_type,
            state: RunState::AwaitingApproval,
            started_at,
            queue: ReconciliationQueue::new(report.changes),
            warnings: report.warnings,
            scans: report.scans,
            tables: Arc::clone(&self.tables),
            audit: self.audit.clone(),
            lease: Some(lease),
        })
    }

    fn record_failure(
        &self,
        db: &Database,
        context: &SyncContext,
        sync_type: SyncType,
        started_at: DateTime<Utc>,
        err: &Error,
    ) {
        tracing::warn!(
            location = %context.location.name,
            error = %err,
            state = %RunState::Failed,
            "sync run failed"
        );
        let attempt = SyncAttempt::failed(&context.location.name, sync_type, err, started_at);
        if let Err(e) = db.record_sync(&attempt) {
            tracing::error!(error = %e, "failed to record sync history");
        }
        if let Some(audit) = &self.audit {
            let entry = audit_entry(context, &attempt, Vec::new(), &[], vec![err.to_string()]);
            if let Err(e) = audit.append(&entry) {
                tracing::error!(error = %e, "failed to write audit log");
            }
        }
    }
}

fn audit_entry(
    context: &SyncContext,
    attempt: &SyncAttempt,
    applied: Vec<String>,
    warnings: &[TableWarning],
    errors: Vec<String>,
) -> AuditEntry {
    AuditEntry {
        at: attempt.started_at,
        location: context.location.name.clone(),
        operator: context.operator.clone(),
        sync_type: attempt.sync_type,
        status: attempt.status,
        records_added: attempt.records_added,
        records_updated: attempt.records_updated,
        records_skipped: attempt.records_skipped,
        applied,
        warnings: warnings.iter().map(ToString::to_string).collect(),
        errors,
        duration_seconds: attempt.duration_seconds(),
    }
}

/// What a completed apply produced.
///
/// Once the apply transaction has finished, an outcome is always returned.
/// Failures to record the attempt afterwards land in `record_errors`, and
/// `history` is `None` when the history row could not be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub result: SyncResult,
    pub history: Option<SyncHistoryEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub record_errors: Vec<String>,
}

/// One run against one location, awaiting the operator's approvals.
#[derive(Debug)]
pub struct SyncRun {
    context: SyncContext,
    sync_type: SyncType,
    state: RunState,
    started_at: DateTime<Utc>,
    queue: ReconciliationQueue,
    warnings: Vec<TableWarning>,
    scans: Vec<TableScan>,
    tables: Arc<TableRegistry>,
    audit: Option<AuditLog>,
    lease: Option<LocationLease>,
}

impl SyncRun {
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    pub fn sync_type(&self) -> SyncType {
        self.sync_type
    }

    pub fn queue(&self) -> &ReconciliationQueue {
        &self.queue
    }

    /// The queue, for approving changes. Only while awaiting approval.
    pub fn queue_mut(&mut self) -> Result<&mut ReconciliationQueue> {
        if self.state != RunState::AwaitingApproval {
            return Err(Error::InvalidState {
                expected: RunState::AwaitingApproval.as_str(),
                actual: self.state.to_string(),
            });
        }
        Ok(&mut self.queue)
    }

    /// Tables skipped during detection.
    pub fn warnings(&self) -> &[TableWarning] {
        &self.warnings
    }

    /// Applies the approved changes, records the attempt and releases the location.
    ///
    /// May succeed at most once per run. After the transaction has run, the
    /// outcome is returned even if recording the attempt fails.
    pub fn apply(&mut self, db: &mut Database) -> Result<SyncOutcome> {
        match self.state {
            RunState::AwaitingApproval => {}
            RunState::Completed | RunState::Failed | RunState::Applying => {
                return Err(Error::AlreadyApplied);
            }
            other => {
                return Err(Error::InvalidState {
                    expected: RunState::AwaitingApproval.as_str(),
                    actual: other.to_string(),
                });
            }
        }

        self.state = RunState::Applying;
        let location = &self.context.location;
        tracing::info!(
            location = %location.name,
            approved = self.queue.approved_count(),
            state = %RunState::Applying,
            "applying approved changes"
        );

        let result = ChangeApplier::new(&self.tables).apply(
            db,
            location.id,
            self.queue.approved(),
            &self.scans,
        );
        self.state = if result.committed {
            RunState::Completed
        } else {
            RunState::Failed
        };

        let attempt = SyncAttempt {
            location_name: location.name.clone(),
            sync_type: self.sync_type,
            records_added: result.records_added,
            records_updated: result.records_updated,
            records_skipped: result.records_skipped,
            status: result.status(),
            error_message: (!result.errors.is_empty()).then(|| result.errors.join("; ")),
            started_at: self.started_at,
            completed_at: Utc::now(),
        };
        let mut record_errors = Vec::new();
        let history = match db.record_sync(&attempt) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::error!(location = %location.name, error = %e, "failed to record sync history");
                record_errors.push(format!("sync history not recorded: {e}"));
                None
            }
        };
        if let Some(audit) = &self.audit {
            let entry = audit_entry(
                &self.context,
                &attempt,
                result.applied.clone(),
                &self.warnings,
                result.errors.clone(),
            );
            if let Err(e) = audit.append(&entry) {
                tracing::error!(location = %location.name, error = %e, "failed to write audit log");
                record_errors.push(format!("audit log not written: {e}"));
            }
        }

        self.lease = None;
        tracing::info!(
            location = %location.name,
            state = %self.state,
            status = %attempt.status,
            "sync run finished"
        );
        Ok(SyncOutcome {
            result,
            history,
            record_errors,
        })
    }

    /// Discards the run before applying. Nothing is recorded.
    pub fn cancel(mut self) {
        if self.state == RunState::AwaitingApproval {
            self.state = RunState::Cancelled;
        }
        tracing::info!(
            location = %self.context.location.name,
            state = %self.state,
            "sync run cancelled"
        );
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
