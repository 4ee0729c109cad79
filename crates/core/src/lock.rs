// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-location leases.
//!
//! A lease is held for the whole of a sync run and for every registry edit
//! of that location. Leases taken in this process are tracked in a shared
//! set. When the locks are backed by a directory, each lease also holds an
//! exclusive file lock on `<dir>/<location id>.lock`, so separate `bsync`
//! processes exclude each other too.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;

use crate::error::{Error, Result};
use crate::location::{LocationId, RemoteLocation};

/// Locations with a run or an edit in flight.
#[derive(Debug, Clone, Default)]
pub struct LocationLocks {
    held: Arc<Mutex<HashSet<LocationId>>>,
    dir: Option<PathBuf>,
}

impl LocationLocks {
    /// Locks visible to this process only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks shared with every process using the same directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        LocationLocks {
            held: Arc::default(),
            dir: Some(dir.into()),
        }
    }

    /// Takes the location's lease, failing fast if anyone else holds it.
    pub fn try_acquire(&self, location: &RemoteLocation) -> Result<LocationLease> {
        self.acquire(location.id, &location.name)
    }

    pub fn acquire(&self, id: LocationId, name: &str) -> Result<LocationLease> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if held.contains(&id) {
            return Err(Error::LocationBusy(name.to_string()));
        }
        let file = match &self.dir {
            Some(dir) => Some(lock_file(dir, id, name)?),
            None => None,
        };
        held.insert(id);
        tracing::debug!(location = %name, id, "acquired location lease");
        Ok(LocationLease {
            id,
            held: Arc::clone(&self.held),
            _file: file,
        })
    }

    /// Whether a lease on the location is live, here or in another process.
    pub fn is_held(&self, id: LocationId) -> bool {
        if self
            .held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id)
        {
            return true;
        }
        let Some(dir) = &self.dir else {
            return false;
        };
        let Ok(file) = OpenOptions::new().write(true).open(lock_path(dir, id)) else {
            return false;
        };
        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(_) => true,
        }
    }
}

fn lock_path(dir: &Path, id: LocationId) -> PathBuf {
    dir.join(format!("{id}.lock"))
}

fn lock_file(dir: &Path, id: LocationId, name: &str) -> Result<File> {
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path(dir, id))?;
    file.try_lock_exclusive()
        .map_err(|_| Error::LocationBusy(name.to_string()))?;
    Ok(file)
}

/// Exclusive claim on one location, released on drop.
#[derive(Debug)]
pub struct LocationLease {
    id: LocationId,
    held: Arc<Mutex<HashSet<LocationId>>>,
    _file: Option<File>,
}

impl LocationLease {
    pub fn location_id(&self) -> LocationId {
        self.id
    }
}

impl Drop for LocationLease {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
