// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! bsync-core: branch attendance sync engine
//!
//! This crate pulls attendance and HR records from remote branch databases
//! into the local store. Changes are detected per table, held for explicit
//! operator approval, and applied transactionally, with every attempt
//! recorded in an append-only history and a dated audit log.
//!
//! # Main Components
//!
//! - [`Database`] - local store, location registry, history and watermarks
//! - [`SyncEngine`] / [`SyncRun`] - probe, detect, approve, apply
//! - [`TableRegistry`] - per-table fetch, diff and apply handlers
//! - [`AuditLog`] - human-readable record of every attempt

pub mod apply;
pub mod audit;
pub mod change;
pub mod db;
pub mod detect;
pub mod engine;
pub mod error;
pub mod history;
pub mod identity;
pub mod location;
pub mod lock;
pub mod queue;
pub mod remote;
pub mod secret;
pub mod table;
pub mod value;
pub mod watermark;

pub use apply::{ChangeApplier, SyncResult};
pub use audit::{AuditEntry, AuditLog};
pub use change::{ChangeId, ChangeType, PendingChange};
pub use db::Database;
pub use detect::{CancelToken, ChangeDetector, DetectionReport, TableScan, TableWarning};
pub use engine::{RunState, SyncContext, SyncEngine, SyncOutcome, SyncRun};
pub use error::{Error, Result};
pub use history::{SyncAttempt, SyncHistoryEntry, SyncStatus, SyncType};
pub use location::{LocationId, LocationUpdate, NewLocation, RemoteLocation};
pub use lock::{LocationLease, LocationLocks};
pub use queue::{ApprovedSet, ReconciliationQueue};
pub use remote::{ConnectionProbe, RemoteConnector, RemoteSession, SqliteConnector};
pub use secret::{CredentialCipher, Secret};
pub use table::{SyncTable, TableHandler, TableRegistry, TableSpec};
pub use value::{FieldValue, RecordKey, Row, Snapshot};
