// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;

#[test]
fn in_process_lease_is_exclusive() {
    let locks = LocationLocks::new();
    let lease = locks.acquire(7, "north").unwrap();
    assert_eq!(lease.location_id(), 7);
    assert!(locks.is_held(7));
    assert!(!locks.is_held(8));

    let err = locks.acquire(7, "north").unwrap_err();
    assert!(matches!(err, Error::LocationBusy(ref name) if name == "north"));

    drop(lease);
    assert!(!locks.is_held(7));
    locks.acquire(7, "north").unwrap();
}

#[test]
fn clones_share_leases() {
    let locks = LocationLocks::new();
    let other = locks.clone();
    let _lease = locks.acquire(1, "north").unwrap();
    assert!(other.is_held(1));
    assert!(other.acquire(1, "north").is_err());
}

#[test]
fn directory_locks_exclude_independent_instances() {
    let dir = TempDir::new().unwrap();
    let first = LocationLocks::in_dir(dir.path().join("locks"));
    let second = LocationLocks::in_dir(dir.path().join("locks"));

    let lease = first.acquire(3, "south").unwrap();
    assert!(dir.path().join("locks").join("3.lock").exists());
    assert!(second.is_held(3));
    assert!(matches!(
        second.acquire(3, "south"),
        Err(Error::LocationBusy(_))
    ));
    second.acquire(4, "east").unwrap();

    drop(lease);
    assert!(!second.is_held(3));
    let _lease = second.acquire(3, "south").unwrap();
    assert!(first.is_held(3));
}

#[test]
fn never_locked_location_is_free() {
    let dir = TempDir::new().unwrap();
    let locks = LocationLocks::in_dir(dir.path());
    assert!(!locks.is_held(42));
}
