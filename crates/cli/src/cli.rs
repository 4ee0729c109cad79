// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::str::FromStr;

use bsync_core::{ChangeId, ChangeType};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::Error;

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  bsync location add \"Branch A\" --host 10.0.0.5 --port 5432 --database branch_a
  bsync location test \"Branch A\"     Check the branch is reachable
  bsync sync \"Branch A\"              Review pending changes
  bsync sync \"Branch A\" --approve new
  bsync history                      Recent sync attempts";

#[derive(Parser)]
#[command(name = "bsync")]
#[command(version)]
#[command(about = "Pull attendance and HR records from branch databases")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Directory holding the database, audit log, key file and config.
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage remote branch locations
    #[command(subcommand)]
    Location(LocationCommand),

    /// Detect changes at a location and apply the approved ones
    #[command(after_help = "\
Without --approve the pending changes are listed with a review digest and
nothing is applied. Approving by change id requires --expect with that
digest, so ids always refer to the list that was reviewed.

Examples:
  bsync sync \"Branch A\"                                     List pending changes
  bsync sync \"Branch A\" --approve all                       Apply everything detected
  bsync sync \"Branch A\" --approve 2,5,7 --expect 3f9a0c12e4b7d851
                                                             Apply selected changes
  bsync sync \"Branch A\" --full --approve new")]
    Sync {
        /// Location name or id
        location: String,

        /// Compare every row instead of rows changed since the last sync
        #[arg(long)]
        full: bool,

        /// Changes to apply: all, new, updated, conflict, or change ids (e.g. 1,3,4)
        #[arg(long, value_name = "SELECTION")]
        approve: Option<Approval>,

        /// Refuse to apply unless the pending changes match this review digest
        #[arg(long, value_name = "DIGEST", requires = "approve")]
        expect: Option<String>,

        /// Operator recorded in the audit log [default: BSYNC_OPERATOR or login name]
        #[arg(long)]
        operator: Option<String>,

        /// Output format
        #[arg(long, short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show recent sync attempts
    History {
        /// Only attempts against this location
        #[arg(long, short = 'l')]
        location: Option<String>,

        /// Maximum number of entries
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(long, short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Inspect and clear the sync audit log
    #[command(subcommand)]
    Audit(AuditCommand),
}

#[derive(Subcommand)]
pub enum LocationCommand {
    /// Register a new location
    Add(LocationArgs),

    /// List locations
    List {
        /// Include inactive locations
        #[arg(long, short = 'a')]
        all: bool,

        /// Output format
        #[arg(long, short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Change a location's connection details
    Edit {
        /// Location name or id
        location: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        database: Option<String>,

        #[arg(long, short = 'u')]
        username: Option<String>,

        #[arg(long, short = 'p')]
        password: Option<String>,

        /// Mark the location active
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Mark the location inactive
        #[arg(long)]
        disable: bool,
    },

    /// Remove a location and its sync watermarks
    Remove {
        /// Location name or id
        location: String,
    },

    /// Check that a location is reachable
    Test {
        /// Location name or id
        location: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct LocationArgs {
    /// Unique location name
    pub name: String,

    /// Host name or address; omit for a locally mounted database file
    #[arg(long, default_value = "")]
    pub host: String,

    /// TCP port; 0 for a locally mounted database file
    #[arg(long, default_value = "0")]
    pub port: u16,

    /// Database name (a file path for mounted databases)
    #[arg(long, short = 'd')]
    pub database: String,

    #[arg(long, short = 'u', default_value = "")]
    pub username: String,

    /// Password [default: BSYNC_PASSWORD]
    #[arg(long, short = 'p')]
    pub password: Option<String>,

    /// Register the location as inactive
    #[arg(long)]
    pub inactive: bool,
}

#[derive(Subcommand)]
pub enum AuditCommand {
    /// Print the audit log file path for a day
    Path {
        /// Day as YYYY-MM-DD [default: today]
        #[arg(long)]
        date: Option<String>,
    },

    /// List audit log files
    List,

    /// Print the audit log for a day
    Show {
        /// Day as YYYY-MM-DD [default: today]
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete audit log files
    Clear {
        /// Day as YYYY-MM-DD
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        date: Option<String>,

        /// Delete every audit log file
        #[arg(long)]
        all: bool,
    },
}

/// Which pending changes the operator approves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Approval {
    All,
    Type(ChangeType),
    Ids(Vec<ChangeId>),
}

impl FromStr for Approval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Approval::All);
        }
        if let Ok(change_type) = s.parse::<ChangeType>() {
            return Ok(Approval::Type(change_type));
        }
        s.split(',')
            .map(|part| part.trim().parse::<ChangeId>())
            .collect::<Result<Vec<_>, _>>()
            .map(Approval::Ids)
            .map_err(|_| Error::InvalidSelection(s.to_string()).to_string())
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
