// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use bsync_core::db::run_migrations;
use rusqlite::Connection;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// `bsync` with an isolated state directory and a fixed operator.
pub fn bsync(state: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("bsync");
    cmd.env("BSYNC_STATE_DIR", state.path())
        .env("BSYNC_OPERATOR", "tester")
        .env_remove("BSYNC_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Creates a branch database with the attendance schema.
pub fn create_branch(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(format!("{name}.db"));
    let conn = Connection::open(&path).unwrap();
    run_migrations(&conn).unwrap();
    path
}

pub fn exec(path: &Path, sql: &str) {
    Connection::open(path).unwrap().execute_batch(sql).unwrap();
}

/// Primary database inside the state directory, created if needed.
pub fn local_db(state: &TempDir) -> PathBuf {
    let path = state.path().join("attendance.db");
    let conn = Connection::open(&path).unwrap();
    run_migrations(&conn).unwrap();
    path
}

pub fn query_text(path: &Path, sql: &str) -> Option<String> {
    Connection::open(path)
        .unwrap()
        .query_row(sql, [], |row| row.get(0))
        .ok()
}

/// Registers a mounted branch file as a location.
pub fn add_location(state: &TempDir, name: &str, branch: &Path) {
    bsync(state)
        .args(["location", "add", name, "--database"])
        .arg(branch)
        .args(["--username", "sync", "--password", "pw"])
        .assert()
        .success();
}
