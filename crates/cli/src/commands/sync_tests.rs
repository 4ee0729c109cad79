// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use bsync_core::{ChangeId, ChangeType, RecordKey, SyncStatus, SyncTable};
use std::path::PathBuf;
use yare::parameterized;

const LOCAL_USERS: &str = "
    INSERT INTO users (badge_number, name, department, updated_at)
    VALUES ('1001', 'Ali', 'HR', '2026-01-01T08:00:00Z');";

const BRANCH_USERS: &str = "
    INSERT INTO users (badge_number, name, department, updated_at) VALUES
        ('1001', 'Ali Hassan', 'HR', '2026-01-02T08:00:00Z'),
        ('2002', 'Sara', 'Sales', '2026-01-02T09:00:00Z');";

fn request(approve: Option<Approval>) -> SyncRequest {
    SyncRequest {
        location: "Branch A".to_string(),
        sync_type: SyncType::Incremental,
        approve,
        expect: None,
        operator: "alice".to_string(),
        output: OutputFormat::Text,
    }
}

fn users_scenario() -> (TestContext, PathBuf) {
    let ctx = TestContext::new();
    let branch = ctx.add_branch("Branch A");
    ctx.branch_sql(&branch, BRANCH_USERS);
    ctx.local_sql(LOCAL_USERS);
    (ctx, branch)
}

fn approve_ids(ids: Vec<ChangeId>, digest: &str) -> SyncRequest {
    let mut request = request(Some(Approval::Ids(ids)));
    request.expect = Some(digest.to_string());
    request
}

/// Digest of what a review of "Branch A" would show right now.
fn review_digest(ctx: &TestContext, engine: &SyncEngine) -> String {
    let location = ctx.db.find_location("Branch A", &ctx.cipher).unwrap();
    let context = SyncContext {
        location,
        operator: "alice".to_string(),
    };
    let run = engine
        .start(&ctx.db, context, SyncType::Incremental, &CancelToken::new())
        .unwrap();
    let digest = run.queue().digest();
    run.cancel();
    digest
}

#[test]
fn review_without_approval_records_nothing() {
    let (mut ctx, _branch) = users_scenario();
    let engine = ctx.engine();
    let outcome = run_impl(&mut ctx.db, &ctx.cipher, &engine, request(None)).unwrap();
    assert!(outcome.is_none());
    assert!(ctx.db.recent_syncs(10, None).unwrap().is_empty());
    assert!(ctx.audit.files().unwrap().is_empty());
    assert_eq!(
        ctx.local_text("SELECT name FROM users WHERE badge_number = '2002'"),
        None
    );
}

#[test]
fn approving_new_leaves_update_pending() {
    let (mut ctx, _branch) = users_scenario();
    let engine = ctx.engine();

    let outcome = run_impl(
        &mut ctx.db,
        &ctx.cipher,
        &engine,
        request(Some(Approval::Type(ChangeType::New))),
    )
    .unwrap()
    .unwrap();
    assert_eq!(outcome.result.records_added, 1);
    assert_eq!(outcome.result.records_updated, 0);
    assert_eq!(outcome.result.status(), SyncStatus::Success);
    assert_eq!(outcome.history.as_ref().unwrap().location_name, "Branch A");
    assert_eq!(
        ctx.local_text("SELECT name FROM users WHERE badge_number = '2002'"),
        Some("Sara".to_string())
    );
    assert_eq!(
        ctx.local_text("SELECT name FROM users WHERE badge_number = '1001'"),
        Some("Ali".to_string())
    );

    let outcome = run_impl(
        &mut ctx.db,
        &ctx.cipher,
        &engine,
        request(Some(Approval::Type(ChangeType::Updated))),
    )
    .unwrap()
    .unwrap();
    assert_eq!(outcome.result.records_added, 0);
    assert_eq!(outcome.result.records_updated, 1);
    assert_eq!(
        ctx.local_text("SELECT name FROM users WHERE badge_number = '1001'"),
        Some("Ali Hassan".to_string())
    );
    assert_eq!(ctx.db.recent_syncs(10, Some("Branch A")).unwrap().len(), 2);
}

#[test]
fn approve_all_then_converged() {
    let (mut ctx, _branch) = users_scenario();
    let engine = ctx.engine();
    let outcome = run_impl(&mut ctx.db, &ctx.cipher, &engine, request(Some(Approval::All)))
        .unwrap()
        .unwrap();
    assert_eq!(outcome.result.records_added, 1);
    assert_eq!(outcome.result.records_updated, 1);

    let mut full = request(Some(Approval::All));
    full.sync_type = SyncType::Full;
    let outcome = run_impl(&mut ctx.db, &ctx.cipher, &engine, full)
        .unwrap()
        .unwrap();
    assert_eq!(outcome.result.records_added, 0);
    assert_eq!(outcome.result.records_updated, 0);
    assert_eq!(outcome.result.status(), SyncStatus::Success);
}

#[test]
fn unknown_change_id_applies_nothing() {
    let (mut ctx, _branch) = users_scenario();
    let engine = ctx.engine();
    let digest = review_digest(&ctx, &engine);
    let err = run_impl(&mut ctx.db, &ctx.cipher, &engine, approve_ids(vec![1, 99], &digest))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Core(bsync_core::Error::ChangeNotFound(99))
    ));
    assert!(ctx.db.recent_syncs(10, None).unwrap().is_empty());
    assert!(!engine.locks().is_held(1));
}

#[test]
fn ids_apply_when_review_still_matches() {
    let (mut ctx, _branch) = users_scenario();
    let engine = ctx.engine();
    let digest = review_digest(&ctx, &engine);

    let outcome = run_impl(&mut ctx.db, &ctx.cipher, &engine, approve_ids(vec![2], &digest))
        .unwrap()
        .unwrap();
    assert_eq!(outcome.result.records_added, 1);
    assert_eq!(outcome.result.records_updated, 0);
    assert_eq!(
        ctx.local_text("SELECT name FROM users WHERE badge_number = '2002'"),
        Some("Sara".to_string())
    );
}

#[test]
fn ids_without_digest_are_refused() {
    let (mut ctx, _branch) = users_scenario();
    let engine = ctx.engine();
    let err = run_impl(
        &mut ctx.db,
        &ctx.cipher,
        &engine,
        request(Some(Approval::Ids(vec![2]))),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DigestRequired { .. }));
    assert!(ctx.db.recent_syncs(10, None).unwrap().is_empty());
}

#[test]
fn ids_are_refused_after_remote_changes() {
    let (mut ctx, branch) = users_scenario();
    let engine = ctx.engine();
    let digest = review_digest(&ctx, &engine);

    ctx.branch_sql(
        &branch,
        "INSERT INTO departments (name, updated_at) VALUES ('Ops', '2026-01-03T08:00:00Z');",
    );
    let err = run_impl(&mut ctx.db, &ctx.cipher, &engine, approve_ids(vec![1], &digest))
        .unwrap_err();
    assert!(matches!(err, Error::ReviewChanged { ref expected, .. } if *expected == digest));

    assert!(ctx.db.recent_syncs(10, None).unwrap().is_empty());
    assert!(ctx.audit.files().unwrap().is_empty());
    assert_eq!(
        ctx.local_text("SELECT name FROM departments WHERE name = 'Ops'"),
        None
    );
    assert!(!engine.locks().is_held(1));
}

#[test]
fn category_approval_can_pin_the_review() {
    let (mut ctx, _branch) = users_scenario();
    let engine = ctx.engine();
    let mut stale = request(Some(Approval::All));
    stale.expect = Some("0000000000000000".to_string());
    let err = run_impl(&mut ctx.db, &ctx.cipher, &engine, stale).unwrap_err();
    assert!(matches!(err, Error::ReviewChanged { .. }));
    assert_eq!(
        ctx.local_text("SELECT name FROM users WHERE badge_number = '2002'"),
        None
    );
}

#[test]
fn inactive_location_is_refused() {
    let mut ctx = TestContext::new();
    let temp = tempfile::TempDir::new().unwrap();
    ctx.register("Branch A", &temp.path().join("a.db"), false);
    let engine = ctx.engine();
    let err = run_impl(&mut ctx.db, &ctx.cipher, &engine, request(None)).unwrap_err();
    assert!(matches!(err, Error::LocationInactive(name) if name == "Branch A"));
}

#[test]
fn unreachable_location_is_recorded() {
    let mut ctx = TestContext::new();
    let temp = tempfile::TempDir::new().unwrap();
    ctx.register("Branch A", &temp.path().join("missing.db"), true);
    let engine = ctx.engine();
    let err = run_impl(&mut ctx.db, &ctx.cipher, &engine, request(None)).unwrap_err();
    assert!(matches!(
        err,
        Error::Core(bsync_core::Error::Connectivity { .. })
    ));

    let history = ctx.db.recent_syncs(10, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, SyncStatus::Failed);
    assert_eq!(ctx.audit.files().unwrap().len(), 1);
}

fn change(id: u64, change_type: ChangeType) -> PendingChange {
    PendingChange {
        change_id: id,
        table: SyncTable::Users,
        record_key: RecordKey::new([id.to_string()]),
        change_type,
        local_snapshot: None,
        remote_snapshot: Default::default(),
        changed_fields: Vec::new(),
        description: String::new(),
        is_approved: false,
    }
}

#[parameterized(
    all = { Approval::All, 4 },
    new = { Approval::Type(ChangeType::New), 2 },
    updated = { Approval::Type(ChangeType::Updated), 1 },
    conflict = { Approval::Type(ChangeType::Conflict), 1 },
    ids = { Approval::Ids(vec![1, 4]), 2 },
)]
fn select_counts(approval: Approval, expected: usize) {
    let mut queue = ReconciliationQueue::new(vec![
        change(1, ChangeType::New),
        change(2, ChangeType::New),
        change(3, ChangeType::Updated),
        change(4, ChangeType::Conflict),
    ]);
    assert_eq!(select(&mut queue, &approval).unwrap(), expected);
}

#[test]
fn select_unknown_id_changes_nothing() {
    let mut queue = ReconciliationQueue::new(vec![change(1, ChangeType::New)]);
    assert!(select(&mut queue, &Approval::Ids(vec![1, 2])).is_err());
    assert_eq!(queue.approved_count(), 0);
}
