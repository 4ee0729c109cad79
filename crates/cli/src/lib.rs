// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! bsyncrs - operator command line for the branch attendance sync engine.
//!
//! This crate drives [`bsync_core`] from the `bsync` binary: it resolves the
//! state directory and configuration, manages the location registry, runs
//! detect/approve/apply cycles and reads back sync history and audit logs.
//!
//! # Main Components
//!
//! - [`Cli`] - clap command definitions
//! - [`Config`] - state directory configuration (`config.toml`)
//! - [`Error`] - error type wrapping engine failures with CLI hints
//!
//! ```rust,ignore
//! use clap::Parser;
//!
//! let cli = bsyncrs::Cli::parse_from(["bsync", "history", "--limit", "5"]);
//! bsyncrs::run(cli)?;
//! ```

mod cli;
mod commands;
mod display;
mod logging;

pub mod config;
pub mod env;
pub mod error;

pub use cli::{Approval, AuditCommand, Cli, Command, LocationArgs, LocationCommand, OutputFormat};
pub use config::Config;
pub use error::{Error, Result};

use bsync_core::identity::operator_name;
use bsync_core::SyncType;

use commands::location::LocationEdit;
use commands::sync::SyncRequest;
use commands::Workspace;

/// Execute a parsed command line. This is the main entry point for library
/// users and provides a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    let state_dir = config::state_dir(cli.state_dir)?;
    logging::setup_logging(&config::log_path(&state_dir));
    let ws = Workspace::open(state_dir)?;
    tracing::debug!(state_dir = %ws.state_dir().display(), "workspace opened");

    match cli.command {
        Command::Location(command) => run_location(&ws, command),
        Command::Sync {
            location,
            full,
            approve,
            expect,
            operator,
            output,
        } => commands::sync::run(
            &ws,
            SyncRequest {
                location,
                sync_type: if full {
                    SyncType::Full
                } else {
                    SyncType::Incremental
                },
                approve,
                expect,
                operator: operator.unwrap_or_else(operator_name),
                output,
            },
        ),
        Command::History {
            location,
            limit,
            output,
        } => commands::history::run(&ws, location, limit, output),
        Command::Audit(command) => match command {
            AuditCommand::Path { date } => commands::audit::path(&ws, date),
            AuditCommand::List => commands::audit::list(&ws),
            AuditCommand::Show { date } => commands::audit::show(&ws, date),
            AuditCommand::Clear { date, all } => commands::audit::clear(&ws, date, all),
        },
    }
}

fn run_location(ws: &Workspace, command: LocationCommand) -> Result<()> {
    match command {
        LocationCommand::Add(args) => commands::location::add(ws, args),
        LocationCommand::List { all, output } => commands::location::list(ws, all, output),
        LocationCommand::Edit {
            location,
            name,
            host,
            port,
            database,
            username,
            password,
            enable,
            disable,
        } => commands::location::edit(
            ws,
            &location,
            LocationEdit {
                name,
                host,
                port,
                database,
                username,
                password,
                enable,
                disable,
            },
        ),
        LocationCommand::Remove { location } => commands::location::remove(ws, &location),
        LocationCommand::Test { location } => commands::location::test(ws, &location),
    }
}
