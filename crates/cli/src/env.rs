// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule. The operator variable belongs to the core crate.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `BSYNC_STATE_DIR` if set and non-empty.
pub fn state_dir() -> Option<PathBuf> {
    std::env::var(vars::BSYNC_STATE_DIR)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Returns the value of `BSYNC_PASSWORD` if set.
///
/// Lets scripts register a location without putting the password in argv.
pub fn password() -> Option<String> {
    std::env::var(vars::BSYNC_PASSWORD).ok()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
