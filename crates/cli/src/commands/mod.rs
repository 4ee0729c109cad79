// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod audit;
pub mod history;
pub mod location;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bsync_core::{
    AuditLog, CredentialCipher, Database, LocationLocks, SqliteConnector, SyncEngine,
};

use crate::config::Config;
use crate::error::Result;

/// The state directory and its configuration, resolved once per invocation.
pub struct Workspace {
    state_dir: PathBuf,
    config: Config,
}

impl Workspace {
    pub fn open(state_dir: PathBuf) -> Result<Self> {
        let config = Config::load(&state_dir)?;
        Ok(Workspace { state_dir, config })
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn open_db(&self) -> Result<Database> {
        let db_path = self.config.database_path(&self.state_dir);
        Ok(Database::open(&db_path)?)
    }

    /// Opens the credential key, creating it on first use.
    pub fn cipher(&self) -> Result<CredentialCipher> {
        Ok(CredentialCipher::load_or_create(
            &self.config.key_file(&self.state_dir),
        )?)
    }

    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(self.config.audit_dir(&self.state_dir))
    }

    /// Location leases shared by every `bsync` process on this state directory.
    pub fn locks(&self) -> LocationLocks {
        LocationLocks::in_dir(self.state_dir.join("locks"))
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(Arc::new(SqliteConnector))
            .with_timeout(self.config.connect_timeout())
            .with_locks(self.locks())
            .with_audit_log(self.audit_log())
    }
}
