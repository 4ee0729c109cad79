// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Test infrastructure for command testing without a state directory.
//!
//! `TestContext` wraps an in-memory primary database, an ephemeral
//! credential key, and temporary audit and lock directories. Branches are SQLite
//! files in the same temporary directory, registered as mounted locations.
//!
//! ```rust,ignore
//! let ctx = TestContext::new();
//! let branch = ctx.add_branch("Branch A");
//! ctx.branch_sql(&branch, "INSERT INTO users ...");
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bsync_core::db::run_migrations;
use bsync_core::{
    AuditLog, CredentialCipher, Database, LocationLocks, NewLocation, RemoteLocation, Secret,
    SqliteConnector, SyncEngine,
};
use rusqlite::Connection;
use tempfile::TempDir;

pub struct TestContext {
    pub db: Database,
    pub cipher: CredentialCipher,
    pub audit: AuditLog,
    pub locks: LocationLocks,
    temp_dir: TempDir,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestContext {
            db: Database::open_in_memory().expect("Failed to create in-memory database"),
            cipher: CredentialCipher::ephemeral(),
            audit: AuditLog::new(temp_dir.path().join("audit")),
            locks: LocationLocks::in_dir(temp_dir.path().join("locks")),
            temp_dir,
        }
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(Arc::new(SqliteConnector))
            .with_timeout(Duration::from_secs(2))
            .with_locks(self.locks.clone())
            .with_audit_log(self.audit.clone())
    }

    /// Creates a branch database file and registers it as a mounted location.
    pub fn add_branch(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(format!("{}.db", name.replace(' ', "_")));
        let conn = Connection::open(&path).expect("Failed to create branch database");
        run_migrations(&conn).expect("Failed to create branch schema");
        self.register(name, &path, true);
        path
    }

    pub fn register(&self, name: &str, path: &Path, is_active: bool) -> RemoteLocation {
        self.db
            .add_location(
                &NewLocation {
                    name: name.to_string(),
                    host: String::new(),
                    port: 0,
                    database_name: path.display().to_string(),
                    username: "sync".to_string(),
                    password: Secret::new("pw"),
                    is_active,
                },
                &self.cipher,
            )
            .expect("Failed to register location")
    }

    pub fn branch_sql(&self, path: &Path, sql: &str) {
        let conn = Connection::open(path).expect("Failed to open branch database");
        conn.execute_batch(sql).expect("Failed to run branch SQL");
    }

    pub fn local_sql(&self, sql: &str) {
        self.db.conn.execute_batch(sql).expect("Failed to run local SQL");
    }

    /// Single text value from the primary database.
    pub fn local_text(&self, sql: &str) -> Option<String> {
        self.db
            .conn
            .query_row(sql, [], |row| row.get(0))
            .ok()
    }
}
