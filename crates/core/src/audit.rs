// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable audit log of sync attempts.
//!
//! One text block per attempt is appended to `sync-YYYY-MM-DD.log` (UTC date)
//! in the audit directory. Appends hold an exclusive file lock so blocks from
//! concurrent runs never interleave. Files only shrink through an explicit
//! [`AuditLog::clear`] or [`AuditLog::clear_all`].

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;

use crate::error::Result;
use crate::history::{SyncStatus, SyncType};
use crate::value::format_timestamp;

const FILE_PREFIX: &str = "sync-";
const FILE_SUFFIX: &str = ".log";

/// Contents of one audit block.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub location: String,
    pub operator: String,
    pub sync_type: SyncType,
    pub status: SyncStatus,
    pub records_added: usize,
    pub records_updated: usize,
    pub records_skipped: usize,
    /// Descriptions of rows written to the local store.
    pub applied: Vec<String>,
    /// Tables skipped during detection, with the reason.
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub duration_seconds: f64,
}

impl AuditEntry {
    /// Renders the block, terminated by a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== {} sync {} ===", format_timestamp(self.at), self.location);
        let _ = writeln!(out, "operator: {}", self.operator);
        let _ = writeln!(out, "type: {}", self.sync_type);
        let _ = writeln!(out, "status: {}", self.status);
        let _ = writeln!(
            out,
            "added: {}, updated: {}, skipped: {}",
            self.records_added, self.records_updated, self.records_skipped
        );
        render_list(&mut out, "applied", &self.applied);
        render_list(&mut out, "warnings", &self.warnings);
        render_list(&mut out, "errors", &self.errors);
        let _ = writeln!(out, "duration: {:.2}s", self.duration_seconds);
        out.push('\n');
        out
    }
}

fn render_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

/// Directory of dated audit log files.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        AuditLog { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for one day, whether or not it exists.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", date.format("%Y-%m-%d")))
    }

    /// Appends a block to the file of the entry's day, returning its path.
    pub fn append(&self, entry: &AuditEntry) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(entry.at.date_naive());

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.lock_exclusive()?;
        let written = file
            .write_all(entry.render().as_bytes())
            .and_then(|()| file.sync_all());
        let unlocked = FileExt::unlock(&file);
        written?;
        unlocked?;

        tracing::debug!(path = %path.display(), location = %entry.location, "appended audit block");
        Ok(path)
    }

    /// Contents of one day's log; empty when there is none.
    pub fn read(&self, date: NaiveDate) -> Result<String> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Existing log files, oldest first.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if log_date(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Removes one day's log. Returns whether a file was removed.
    pub fn clear(&self, date: NaiveDate) -> Result<bool> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        tracing::info!(path = %path.display(), "cleared audit log");
        Ok(true)
    }

    /// Removes every log file. Returns how many were removed.
    pub fn clear_all(&self) -> Result<usize> {
        let files = self.files()?;
        for path in &files {
            fs::remove_file(path)?;
        }
        tracing::info!(count = files.len(), dir = %self.dir.display(), "cleared audit logs");
        Ok(files.len())
    }
}

/// Day covered by a log file, if the path names one.
pub fn log_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let date = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
