// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use bsync_core::{Database, SyncHistoryEntry};

use crate::cli::OutputFormat;
use crate::display::format_history;
use crate::error::Result;

use super::Workspace;

pub fn run(ws: &Workspace, location: Option<String>, limit: usize, output: OutputFormat) -> Result<()> {
    let db = ws.open_db()?;
    let entries = run_impl(&db, location.as_deref(), limit)?;

    match output {
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No sync history");
            }
            for entry in &entries {
                for line in format_history(entry) {
                    println!("{line}");
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

/// Most recent attempts first.
pub(crate) fn run_impl(
    db: &Database,
    location: Option<&str>,
    limit: usize,
) -> Result<Vec<SyncHistoryEntry>> {
    Ok(db.recent_syncs(limit, location)?)
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
