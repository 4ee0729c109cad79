// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operator identity for audit purposes.

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;

/// Environment variable naming the operator explicitly.
pub const OPERATOR_ENV: &str = "BSYNC_OPERATOR";

/// Returns the name recorded as the operator of a sync run.
///
/// Resolution order:
/// 1. `BSYNC_OPERATOR`
/// 2. Unix username from USER or LOGNAME env var (if not system account)
/// 3. Fallback to "operator"
pub fn operator_name() -> String {
    if let Some(name) = non_empty_var(OPERATOR_ENV) {
        return name;
    }

    if let Some(name) = get_unix_username() {
        if !is_system_account(&name) {
            return name;
        }
    }

    "operator".to_string()
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn get_unix_username() -> Option<String> {
    non_empty_var("USER").or_else(|| non_empty_var("LOGNAME"))
}

fn is_system_account(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "root" | "system" | "administrator" | "admin" | "daemon" | "nobody"
    )
}
