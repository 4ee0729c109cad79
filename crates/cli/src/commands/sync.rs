// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `bsync sync`: detect, review, approve, apply.
//!
//! Approval is always explicit. Without `--approve` the run stops after
//! detection: pending changes are printed with a review digest and the run is
//! cancelled, which leaves no history or audit record. Change ids are only
//! accepted together with the digest of the list they were read from.

use bsync_core::{
    CancelToken, CredentialCipher, Database, PendingChange, ReconciliationQueue, SyncContext,
    SyncEngine, SyncOutcome, SyncRun, SyncType, TableWarning,
};
use serde::Serialize;

use crate::cli::{Approval, OutputFormat};
use crate::display::{format_change, format_result, format_warning};
use crate::error::{Error, Result};

use super::Workspace;

/// What the operator asked for.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub location: String,
    pub sync_type: SyncType,
    pub approve: Option<Approval>,
    /// Review digest the pending changes must still match.
    pub expect: Option<String>,
    pub operator: String,
    pub output: OutputFormat,
}

pub fn run(ws: &Workspace, request: SyncRequest) -> Result<()> {
    let mut db = ws.open_db()?;
    let cipher = ws.cipher()?;
    run_impl(&mut db, &cipher, &ws.engine(), request).map(|_| ())
}

/// Returns the outcome when changes were applied, `None` when only reviewed.
pub(crate) fn run_impl(
    db: &mut Database,
    cipher: &CredentialCipher,
    engine: &SyncEngine,
    request: SyncRequest,
) -> Result<Option<SyncOutcome>> {
    let location = db.find_location(&request.location, cipher)?;
    if !location.is_active {
        return Err(Error::LocationInactive(location.name));
    }
    if matches!(request.approve, Some(Approval::Ids(_))) && request.expect.is_none() {
        return Err(Error::DigestRequired {
            location: location.name,
        });
    }

    let context = SyncContext {
        location,
        operator: request.operator,
    };
    let mut run = engine.start(db, context, request.sync_type, &CancelToken::new())?;
    for warning in run.warnings() {
        eprintln!("{}", format_warning(warning));
    }

    let Some(approval) = request.approve else {
        print_pending(&run, request.output)?;
        run.cancel();
        return Ok(None);
    };

    if let Some(expected) = request.expect {
        let actual = run.queue().digest();
        if actual != expected {
            let location = run.context().location.name.clone();
            run.cancel();
            return Err(Error::ReviewChanged {
                location,
                expected,
                actual,
            });
        }
    }

    select(run.queue_mut()?, &approval)?;
    let outcome = run.apply(db)?;
    let name = &run.context().location.name;
    for problem in &outcome.record_errors {
        eprintln!("warning: {problem}");
    }

    match request.output {
        OutputFormat::Text => {
            for line in format_result(name, &outcome.result) {
                println!("{line}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    if !outcome.result.committed {
        return Err(Error::SyncFailed {
            location: name.clone(),
            reason: outcome.result.errors.join("; "),
        });
    }
    Ok(Some(outcome))
}

/// Marks the selected changes approved, returning how many are approved.
pub(crate) fn select(queue: &mut ReconciliationQueue, approval: &Approval) -> Result<usize> {
    match approval {
        Approval::All => queue.select_all(),
        Approval::Type(change_type) => {
            queue.approve_where(|change| change.change_type == *change_type);
        }
        Approval::Ids(ids) => queue.approve_ids(ids)?,
    }
    Ok(queue.approved_count())
}

#[derive(Serialize)]
struct PendingReport<'a> {
    location: &'a str,
    sync_type: SyncType,
    digest: String,
    changes: &'a [PendingChange],
    warnings: &'a [TableWarning],
}

fn print_pending(run: &SyncRun, output: OutputFormat) -> Result<()> {
    let name = &run.context().location.name;
    let changes = run.queue().changes();
    match output {
        OutputFormat::Json => {
            let report = PendingReport {
                location: name,
                sync_type: run.sync_type(),
                digest: run.queue().digest(),
                changes,
                warnings: run.warnings(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text if changes.is_empty() => {
            println!("{name} is up to date ({} sync)", run.sync_type());
        }
        OutputFormat::Text => {
            println!(
                "{name}: {} pending change{} ({} sync)",
                changes.len(),
                if changes.len() == 1 { "" } else { "s" },
                run.sync_type()
            );
            for change in changes {
                println!("{}", format_change(change));
            }
            let digest = run.queue().digest();
            println!();
            println!("Review digest: {digest}");
            println!(
                "Nothing applied. Re-run with --approve all|new|updated|conflict|<ids> --expect {digest}"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
