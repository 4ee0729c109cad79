// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use bsync_core::{
    LocationId, PendingChange, RemoteLocation, SyncHistoryEntry, SyncResult, TableWarning,
};
use chrono::SecondsFormat;
use serde::Serialize;

/// A location as shown to the operator. The password never leaves the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSummary {
    pub id: LocationId,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub is_active: bool,
}

impl From<&RemoteLocation> for LocationSummary {
    fn from(location: &RemoteLocation) -> Self {
        LocationSummary {
            id: location.id,
            name: location.name.clone(),
            host: location.host.clone(),
            port: location.port,
            database_name: location.database_name.clone(),
            username: location.username.clone(),
            is_active: location.is_active,
        }
    }
}

/// Format a location as a single line: `  3  Branch A  10.0.0.5:5432/branch_a`.
pub fn format_location(location: &RemoteLocation) -> String {
    let mut line = format!(
        "{:>3}  {}  {}",
        location.id,
        location.name,
        location.endpoint()
    );
    if !location.is_active {
        line.push_str("  (inactive)");
    }
    line
}

/// Format a pending change: `   2  updated   users 1001: name "Ali" -> "Ali Hassan"`.
pub fn format_change(change: &PendingChange) -> String {
    format!(
        "{:>4}  {:<9} {}",
        change.change_id,
        change.change_type.as_str(),
        change.description
    )
}

pub fn format_warning(warning: &TableWarning) -> String {
    format!("warning: skipped {warning}")
}

/// Counts line shared by sync results and history entries.
fn format_counts(added: usize, updated: usize, skipped: usize) -> String {
    format!("added {added}, updated {updated}, skipped {skipped}")
}

/// Format the result of applying approved changes.
///
/// ```text
/// Applied to Branch A: added 1, updated 0, skipped 1 (partial)
///   error: users 1001: users record 1001 no longer exists locally
/// ```
pub fn format_result(location: &str, result: &SyncResult) -> Vec<String> {
    let mut lines = vec![format!(
        "Applied to {}: {} ({})",
        location,
        format_counts(
            result.records_added,
            result.records_updated,
            result.records_skipped
        ),
        result.status()
    )];
    lines.extend(result.errors.iter().map(|e| format!("  error: {e}")));
    lines
}

/// Format one history entry, with its error message on a second line.
pub fn format_history(entry: &SyncHistoryEntry) -> Vec<String> {
    let mut lines = vec![format!(
        "[{}] {}  {}  {}  {}  {}  {:.2}s",
        entry.id,
        entry
            .started_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        entry.location_name,
        entry.sync_type,
        entry.status,
        format_counts(
            entry.records_added,
            entry.records_updated,
            entry.records_skipped
        ),
        entry.duration_seconds
    )];
    if let Some(message) = &entry.error_message {
        lines.push(format!("    {message}"));
    }
    lines
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
