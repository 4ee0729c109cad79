// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod common;
use common::*;

use std::path::PathBuf;

const BRANCH_USERS: &str = "
    INSERT INTO users (badge_number, name, department, updated_at) VALUES
        ('1001', 'Ali Hassan', 'HR', '2026-01-02T08:00:00Z'),
        ('2002', 'Sara', 'Sales', '2026-01-02T09:00:00Z');";

struct Scenario {
    state: TempDir,
    branch: PathBuf,
    _branches: TempDir,
}

/// Local knows 1001 as "Ali"; the branch renamed him and hired 2002.
fn users_scenario() -> Scenario {
    let state = TempDir::new().unwrap();
    let branches = TempDir::new().unwrap();
    let branch = create_branch(&branches, "north");
    exec(&branch, BRANCH_USERS);
    exec(
        &local_db(&state),
        "INSERT INTO users (badge_number, name, department, updated_at)
         VALUES ('1001', 'Ali', 'HR', '2026-01-01T08:00:00Z');",
    );
    add_location(&state, "North", &branch);
    Scenario {
        state,
        branch,
        _branches: branches,
    }
}

/// The review digest `bsync sync` prints for the current pending changes.
fn review_digest(state: &TempDir, location: &str) -> String {
    let output = bsync(state)
        .args(["sync", location, "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    report["digest"].as_str().unwrap().to_string()
}

fn local_name(state: &TempDir, badge: &str) -> Option<String> {
    query_text(
        &state.path().join("attendance.db"),
        &format!("SELECT name FROM users WHERE badge_number = '{badge}'"),
    )
}

#[test]
fn review_lists_changes_and_applies_nothing() {
    let s = users_scenario();

    bsync(&s.state)
        .args(["sync", "North"])
        .assert()
        .success()
        .stdout(predicate::str::contains("North: 2 pending changes (incremental sync)"))
        .stdout(predicate::str::contains("updated   users 1001"))
        .stdout(predicate::str::contains("new       users 2002"))
        .stdout(predicate::str::contains("Review digest: "))
        .stdout(predicate::str::contains("Nothing applied"));

    assert_eq!(local_name(&s.state, "2002"), None);
    bsync(&s.state)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sync history"));
}

#[test]
fn approve_new_then_updated() {
    let s = users_scenario();

    bsync(&s.state)
        .args(["sync", "North", "--approve", "new"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Applied to North: added 1, updated 0, skipped 0 (success)",
        ));
    assert_eq!(local_name(&s.state, "2002").as_deref(), Some("Sara"));
    assert_eq!(local_name(&s.state, "1001").as_deref(), Some("Ali"));

    bsync(&s.state)
        .args(["sync", "North"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 pending change "))
        .stdout(predicate::str::contains("users 1001"));

    let digest = review_digest(&s.state, "North");
    bsync(&s.state)
        .args(["sync", "North", "--approve", "1", "--expect", digest.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("added 0, updated 1, skipped 0"));
    assert_eq!(local_name(&s.state, "1001").as_deref(), Some("Ali Hassan"));

    bsync(&s.state)
        .args(["sync", "North", "--full"])
        .assert()
        .success()
        .stdout(predicate::str::contains("North is up to date (full sync)"));
}

#[test]
fn json_outcome() {
    let s = users_scenario();
    let output = bsync(&s.state)
        .args(["sync", "North", "--approve", "all", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["result"]["records_added"], 1);
    assert_eq!(outcome["result"]["records_updated"], 1);
    assert_eq!(outcome["result"]["committed"], true);
    assert_eq!(outcome["history"]["status"], "success");
    assert_eq!(outcome["history"]["location_name"], "North");
}

#[test]
fn json_pending_report() {
    let s = users_scenario();
    let output = bsync(&s.state)
        .args(["sync", "North", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["location"], "North");
    assert_eq!(report["sync_type"], "incremental");
    assert_eq!(report["digest"].as_str().unwrap().len(), 16);
    let changes = report["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0]["change_type"], "updated");
    assert_eq!(changes[0]["changed_fields"][0], "name");
    assert_eq!(changes[1]["change_type"], "new");
}

#[test]
fn unknown_change_id_fails() {
    let s = users_scenario();
    let digest = review_digest(&s.state, "North");
    bsync(&s.state)
        .args(["sync", "North", "--approve", "7", "--expect", digest.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pending change not found: 7"));
    assert_eq!(local_name(&s.state, "2002"), None);
}

#[test]
fn ids_need_the_review_digest() {
    let s = users_scenario();
    bsync(&s.state)
        .args(["sync", "North", "--approve", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs the review digest"));
    assert_eq!(local_name(&s.state, "2002"), None);
}

#[test]
fn ids_refer_to_the_reviewed_list() {
    let s = users_scenario();
    let digest = review_digest(&s.state, "North");
    exec(
        &s.branch,
        "INSERT INTO departments (name, updated_at) VALUES ('Ops', '2026-01-03T08:00:00Z');",
    );

    bsync(&s.state)
        .args(["sync", "North", "--approve", "1", "--expect", digest.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no longer match the review"));
    assert_eq!(
        query_text(
            &s.state.path().join("attendance.db"),
            "SELECT name FROM departments WHERE name = 'Ops'"
        ),
        None
    );
    bsync(&s.state)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sync history"));
}

#[test]
fn invalid_selection_is_a_usage_error() {
    let s = users_scenario();
    bsync(&s.state)
        .args(["sync", "North", "--approve", "most"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid approval selection 'most'"));
}

#[test]
fn inactive_location_is_refused() {
    let s = users_scenario();
    bsync(&s.state)
        .args(["location", "edit", "North", "--disable"])
        .assert()
        .success();
    bsync(&s.state)
        .args(["sync", "North", "--approve", "all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("location 'North' is inactive"));
}

#[test]
fn unreachable_location_is_recorded() {
    let state = TempDir::new().unwrap();
    let branches = TempDir::new().unwrap();
    add_location(&state, "Gone", &branches.path().join("gone.db"));

    bsync(&state)
        .args(["sync", "Gone", "--approve", "all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot connect to location 'Gone'"));

    bsync(&state)
        .args(["history", "--location", "Gone"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Gone  incremental  failed"))
        .stdout(predicate::str::contains("cannot connect"));

    bsync(&state)
        .args(["audit", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sync Gone ==="))
        .stdout(predicate::str::contains("operator: tester"))
        .stdout(predicate::str::contains("status: failed"));
}

#[test]
fn audit_records_applied_rows() {
    let s = users_scenario();
    bsync(&s.state)
        .args(["sync", "North", "--approve", "new", "--operator", "fatima"])
        .assert()
        .success();

    bsync(&s.state)
        .args(["audit", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("operator: fatima"))
        .stdout(predicate::str::contains("added: 1, updated: 0, skipped: 0"))
        .stdout(predicate::str::contains("applied:\n  - users 2002"));

    bsync(&s.state)
        .args(["audit", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sync-"));

    bsync(&s.state)
        .args(["audit", "clear", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 audit log file"));

    bsync(&s.state)
        .args(["audit", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No audit logs"));
}

#[test]
fn audit_path_for_date() {
    let state = TempDir::new().unwrap();
    bsync(&state)
        .args(["audit", "path", "--date", "2026-03-04"])
        .assert()
        .success()
        .stdout(predicate::str::ends_with("sync-2026-03-04.log\n"));

    bsync(&state)
        .args(["audit", "path", "--date", "March 4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date 'March 4'"));
}

#[test]
fn logs_go_to_state_dir() {
    let s = users_scenario();
    bsync(&s.state)
        .args(["sync", "North"])
        .assert()
        .success();
    let log = std::fs::read_to_string(s.state.path().join("bsync.log")).unwrap();
    assert!(log.contains("sync run started"));
}
