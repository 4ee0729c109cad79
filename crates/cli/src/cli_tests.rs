// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use clap::CommandFactory;
use yare::parameterized;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("bsync").chain(args.iter().copied())).unwrap()
}

#[test]
fn command_definition_is_valid() {
    Cli::command().debug_assert();
}

#[parameterized(
    all = { "all", Approval::All },
    all_upper = { "ALL", Approval::All },
    new = { "new", Approval::Type(ChangeType::New) },
    updated = { "updated", Approval::Type(ChangeType::Updated) },
    conflict = { "Conflict", Approval::Type(ChangeType::Conflict) },
    single_id = { "3", Approval::Ids(vec![3]) },
    id_list = { "1, 4,9", Approval::Ids(vec![1, 4, 9]) },
)]
fn approval_parses(input: &str, expected: Approval) {
    assert_eq!(input.parse::<Approval>().unwrap(), expected);
}

#[parameterized(
    empty = { "" },
    word = { "some" },
    negative = { "-1" },
    trailing_comma = { "1,2," },
)]
fn approval_rejects(input: &str) {
    let err = input.parse::<Approval>().unwrap_err();
    assert!(err.contains("invalid approval selection"), "{err}");
}

#[test]
fn sync_defaults() {
    let cli = parse(&["sync", "Branch A"]);
    match cli.command {
        Command::Sync {
            location,
            full,
            approve,
            expect,
            operator,
            output,
        } => {
            assert_eq!(location, "Branch A");
            assert!(!full);
            assert_eq!(approve, None);
            assert_eq!(expect, None);
            assert_eq!(operator, None);
            assert_eq!(output, OutputFormat::Text);
        }
        _ => panic!("expected sync"),
    }
}

#[test]
fn expect_needs_approve() {
    assert!(Cli::try_parse_from(["bsync", "sync", "Branch A", "--expect", "abc123"]).is_err());
}

#[test]
fn sync_with_selection() {
    let cli = parse(&[
        "sync", "2", "--full", "--approve", "1,2", "--expect", "abc123", "-o", "json",
    ]);
    match cli.command {
        Command::Sync {
            full,
            approve,
            expect,
            output,
            ..
        } => {
            assert!(full);
            assert_eq!(approve, Some(Approval::Ids(vec![1, 2])));
            assert_eq!(expect.as_deref(), Some("abc123"));
            assert_eq!(output, OutputFormat::Json);
        }
        _ => panic!("expected sync"),
    }
}

#[test]
fn state_dir_is_global() {
    let cli = parse(&["history", "--state-dir", "/tmp/bsync"]);
    assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/bsync")));
}

#[test]
fn location_add_defaults_to_mounted_file() {
    let cli = parse(&["location", "add", "Branch A", "--database", "/mnt/a.db"]);
    match cli.command {
        Command::Location(LocationCommand::Add(args)) => {
            assert_eq!(args.port, 0);
            assert_eq!(args.host, "");
            assert_eq!(args.password, None);
            assert!(!args.inactive);
        }
        _ => panic!("expected location add"),
    }
}

#[test]
fn enable_and_disable_conflict() {
    let result = Cli::try_parse_from([
        "bsync", "location", "edit", "Branch A", "--enable", "--disable",
    ]);
    assert!(result.is_err());
}

#[test]
fn audit_clear_needs_date_or_all() {
    assert!(Cli::try_parse_from(["bsync", "audit", "clear"]).is_err());
    assert!(Cli::try_parse_from(["bsync", "audit", "clear", "--all"]).is_ok());
    assert!(Cli::try_parse_from(["bsync", "audit", "clear", "--date", "2026-01-02"]).is_ok());
    assert!(
        Cli::try_parse_from(["bsync", "audit", "clear", "--all", "--date", "2026-01-02"]).is_err()
    );
}
