// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use bsync_core::{
    CredentialCipher, Database, LocationLocks, LocationUpdate, NewLocation, RemoteLocation, Secret,
    SyncEngine,
};

use crate::cli::{LocationArgs, OutputFormat};
use crate::display::{format_location, LocationSummary};
use crate::env;
use crate::error::Result;

use super::Workspace;

pub fn add(ws: &Workspace, args: LocationArgs) -> Result<()> {
    let db = ws.open_db()?;
    let cipher = ws.cipher()?;
    let location = add_impl(&db, &cipher, args)?;
    println!("Added location {} ({})", location.name, location.id);
    Ok(())
}

pub(crate) fn add_impl(
    db: &Database,
    cipher: &CredentialCipher,
    args: LocationArgs,
) -> Result<RemoteLocation> {
    let password = args.password.or_else(env::password).unwrap_or_default();
    let new = NewLocation {
        name: args.name,
        host: args.host,
        port: args.port,
        database_name: args.database,
        username: args.username,
        password: Secret::new(password),
        is_active: !args.inactive,
    };
    Ok(db.add_location(&new, cipher)?)
}

pub fn list(ws: &Workspace, all: bool, output: OutputFormat) -> Result<()> {
    let db = ws.open_db()?;
    let cipher = ws.cipher()?;
    list_impl(&db, &cipher, all, output)
}

pub(crate) fn list_impl(
    db: &Database,
    cipher: &CredentialCipher,
    all: bool,
    output: OutputFormat,
) -> Result<()> {
    let locations = db.list_locations(!all, cipher)?;
    match output {
        OutputFormat::Text => {
            if locations.is_empty() {
                println!("No locations");
            }
            for location in &locations {
                println!("{}", format_location(location));
            }
        }
        OutputFormat::Json => {
            let summaries: Vec<LocationSummary> =
                locations.iter().map(LocationSummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }
    Ok(())
}

/// Changes requested by `location edit`.
#[derive(Debug, Default)]
pub struct LocationEdit {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub enable: bool,
    pub disable: bool,
}

impl LocationEdit {
    fn into_update(self) -> LocationUpdate {
        let is_active = match (self.enable, self.disable) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        LocationUpdate {
            name: self.name,
            host: self.host,
            port: self.port,
            database_name: self.database,
            username: self.username,
            password: self.password.map(Secret::new),
            is_active,
        }
    }
}

pub fn edit(ws: &Workspace, target: &str, edit: LocationEdit) -> Result<()> {
    let db = ws.open_db()?;
    let cipher = ws.cipher()?;
    let location = edit_impl(&db, &cipher, &ws.locks(), target, edit)?;
    println!("Updated location {} ({})", location.name, location.id);
    Ok(())
}

/// Fails with `LocationBusy` while a sync of the location is in flight.
pub(crate) fn edit_impl(
    db: &Database,
    cipher: &CredentialCipher,
    locks: &LocationLocks,
    target: &str,
    edit: LocationEdit,
) -> Result<RemoteLocation> {
    let update = edit.into_update();
    if is_empty(&update) {
        return Err(bsync_core::Error::InvalidInput(
            "nothing to change\n  hint: pass at least one of --name, --host, --port, --database, --username, --password, --enable, --disable".to_string(),
        )
        .into());
    }
    let location = db.find_location(target, cipher)?;
    Ok(db.update_location(location.id, &update, cipher, locks)?)
}

fn is_empty(update: &LocationUpdate) -> bool {
    update.name.is_none()
        && update.host.is_none()
        && update.port.is_none()
        && update.database_name.is_none()
        && update.username.is_none()
        && update.password.is_none()
        && update.is_active.is_none()
}

pub fn remove(ws: &Workspace, target: &str) -> Result<()> {
    let db = ws.open_db()?;
    let cipher = ws.cipher()?;
    let location = remove_impl(&db, &cipher, &ws.locks(), target)?;
    println!("Removed location {}", location.name);
    Ok(())
}

pub(crate) fn remove_impl(
    db: &Database,
    cipher: &CredentialCipher,
    locks: &LocationLocks,
    target: &str,
) -> Result<RemoteLocation> {
    let location = db.find_location(target, cipher)?;
    db.delete_location(location.id, locks)?;
    Ok(location)
}

pub fn test(ws: &Workspace, target: &str) -> Result<()> {
    let db = ws.open_db()?;
    let cipher = ws.cipher()?;
    let location = test_impl(&db, &cipher, &ws.engine(), target)?;
    println!("Connected to {} ({})", location.name, location.endpoint());
    Ok(())
}

/// Probes a location without starting a run. Nothing is recorded.
pub(crate) fn test_impl(
    db: &Database,
    cipher: &CredentialCipher,
    engine: &SyncEngine,
    target: &str,
) -> Result<RemoteLocation> {
    let location = db.find_location(target, cipher)?;
    engine.test_connection(&location)?;
    Ok(location)
}

#[cfg(test)]
#[path = "location_tests.rs"]
mod tests;
