// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use bsync_core::{SyncAttempt, SyncStatus, SyncType};
use chrono::{Duration, TimeZone, Utc};

fn record(ctx: &TestContext, location: &str, minute: u32, status: SyncStatus) {
    let started_at = Utc.with_ymd_and_hms(2026, 2, 1, 9, minute, 0).unwrap();
    ctx.db
        .record_sync(&SyncAttempt {
            location_name: location.to_string(),
            sync_type: SyncType::Incremental,
            records_added: 1,
            records_updated: 0,
            records_skipped: 0,
            status,
            error_message: None,
            started_at,
            completed_at: started_at + Duration::seconds(3),
        })
        .unwrap();
}

#[test]
fn newest_first_and_limited() {
    let ctx = TestContext::new();
    record(&ctx, "Branch A", 0, SyncStatus::Success);
    record(&ctx, "Branch B", 5, SyncStatus::Failed);
    record(&ctx, "Branch A", 10, SyncStatus::Partial);

    let entries = run_impl(&ctx.db, None, 2).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, SyncStatus::Partial);
    assert_eq!(entries[1].location_name, "Branch B");
}

#[test]
fn filtered_by_location() {
    let ctx = TestContext::new();
    record(&ctx, "Branch A", 0, SyncStatus::Success);
    record(&ctx, "Branch B", 5, SyncStatus::Failed);

    let entries = run_impl(&ctx.db, Some("Branch A"), 20).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].duration_seconds, 3.0);
    assert!(run_impl(&ctx.db, Some("Branch C"), 20).unwrap().is_empty());
}
