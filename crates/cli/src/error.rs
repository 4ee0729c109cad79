// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by the `bsync` command line.
///
/// Engine failures pass through unchanged; the rest carry a hint where the
/// fix is obvious.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] bsync_core::Error),

    #[error("location '{0}' is inactive\n  hint: enable it with 'bsync location edit {0} --enable'")]
    LocationInactive(String),

    #[error("invalid approval selection '{0}'\n  hint: use all, new, updated, conflict, or comma-separated change ids")]
    InvalidSelection(String),

    #[error("approving '{location}' by change id needs the review digest\n  hint: run 'bsync sync {location}' and pass the printed digest with --expect")]
    DigestRequired { location: String },

    #[error("pending changes for '{location}' no longer match the review (digest {actual}, expected {expected})\n  hint: review again with 'bsync sync {location}'")]
    ReviewChanged {
        location: String,
        expected: String,
        actual: String,
    },

    #[error("sync of '{location}' failed: {reason}")]
    SyncFailed { location: String, reason: String },

    #[error("invalid date '{0}'\n  hint: use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("cannot determine state directory\n  hint: pass --state-dir or set BSYNC_STATE_DIR")]
    NoStateDir,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
