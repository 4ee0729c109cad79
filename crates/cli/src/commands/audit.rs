// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use bsync_core::audit::log_date;
use bsync_core::AuditLog;
use chrono::{NaiveDate, Utc};

use crate::error::{Error, Result};

use super::Workspace;

/// Parses `YYYY-MM-DD`, defaulting to today (UTC, matching the log file names).
pub(crate) fn parse_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| Error::InvalidDate(s.to_string())),
        None => Ok(Utc::now().date_naive()),
    }
}

pub fn path(ws: &Workspace, date: Option<String>) -> Result<()> {
    let date = parse_date(date.as_deref())?;
    println!("{}", ws.audit_log().path_for(date).display());
    Ok(())
}

pub fn list(ws: &Workspace) -> Result<()> {
    let files = ws.audit_log().files()?;
    if files.is_empty() {
        println!("No audit logs");
    }
    for path in files {
        let day = log_date(&path).map(|d| d.to_string()).unwrap_or_default();
        println!("{day}  {}", path.display());
    }
    Ok(())
}

pub fn show(ws: &Workspace, date: Option<String>) -> Result<()> {
    let date = parse_date(date.as_deref())?;
    let content = ws.audit_log().read(date)?;
    if content.is_empty() {
        println!("No audit entries for {date}");
    } else {
        print!("{content}");
    }
    Ok(())
}

pub fn clear(ws: &Workspace, date: Option<String>, all: bool) -> Result<()> {
    let date = match date {
        Some(d) => Some(parse_date(Some(&d))?),
        None => None,
    };
    let removed = clear_impl(&ws.audit_log(), date, all)?;
    println!(
        "Removed {removed} audit log file{}",
        if removed == 1 { "" } else { "s" }
    );
    Ok(())
}

pub(crate) fn clear_impl(log: &AuditLog, date: Option<NaiveDate>, all: bool) -> Result<usize> {
    if all {
        return Ok(log.clear_all()?);
    }
    match date {
        Some(date) => Ok(usize::from(log.clear(date)?)),
        None => Ok(0),
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
