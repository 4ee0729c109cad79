// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of remote branch locations.
//!
//! Locations are rows of the local `remote_locations` table. Passwords are
//! sealed with a [`CredentialCipher`] on the way in and opened on the way out.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::lock::LocationLocks;
use crate::secret::{CredentialCipher, Secret};
use crate::value::format_timestamp;

/// Database id of a remote location.
pub type LocationId = i64;

/// A configured remote branch database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    pub id: LocationId,
    pub name: String,
    pub host: String,
    /// TCP port; 0 for a locally mounted database file.
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: Secret,
    pub is_active: bool,
}

impl RemoteLocation {
    /// Human-readable endpoint, without credentials.
    pub fn endpoint(&self) -> String {
        if self.port == 0 {
            self.database_name.clone()
        } else {
            format!("{}:{}/{}", self.host, self.port, self.database_name)
        }
    }
}

/// Fields for registering a new location.
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: Secret,
    pub is_active: bool,
}

/// Partial edit of a location; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<Secret>,
    pub is_active: Option<bool>,
}

fn validate(name: &str, host: &str, port: u16, database_name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("location name cannot be empty".to_string()));
    }
    if port != 0 && host.trim().is_empty() {
        return Err(Error::InvalidInput(
            "host is required when a port is given".to_string(),
        ));
    }
    if database_name.trim().is_empty() {
        return Err(Error::InvalidInput("database name cannot be empty".to_string()));
    }
    Ok(())
}

const SELECT_LOCATION: &str = "SELECT id, name, host, port, database_name, username, password, is_active
     FROM remote_locations";

struct StoredLocation {
    id: LocationId,
    name: String,
    host: String,
    port: i64,
    database_name: String,
    username: String,
    password: String,
    is_active: bool,
}

impl StoredLocation {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredLocation {
            id: row.get(0)?,
            name: row.get(1)?,
            host: row.get(2)?,
            port: row.get(3)?,
            database_name: row.get(4)?,
            username: row.get(5)?,
            password: row.get(6)?,
            is_active: row.get(7)?,
        })
    }

    fn open(self, cipher: &CredentialCipher) -> Result<RemoteLocation> {
        let port = u16::try_from(self.port).map_err(|_| {
            Error::CorruptedData(format!("invalid port {} for location '{}'", self.port, self.name))
        })?;
        Ok(RemoteLocation {
            id: self.id,
            password: cipher.decrypt(&self.password)?,
            name: self.name,
            host: self.host,
            port,
            database_name: self.database_name,
            username: self.username,
            is_active: self.is_active,
        })
    }
}

impl Database {
    /// Register a new location.
    pub fn add_location(&self, new: &NewLocation, cipher: &CredentialCipher) -> Result<RemoteLocation> {
        validate(&new.name, &new.host, new.port, &new.database_name)?;
        if self.location_name_taken(&new.name, None)? {
            return Err(Error::DuplicateLocation(new.name.clone()));
        }

        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO remote_locations (name, host, port, database_name, username, password,
             is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                new.name,
                new.host,
                i64::from(new.port),
                new.database_name,
                new.username,
                cipher.encrypt(&new.password)?,
                new.is_active,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(location = %new.name, id, "registered location");
        self.get_location(id, cipher)
    }

    /// Get a location by id.
    pub fn get_location(&self, id: LocationId, cipher: &CredentialCipher) -> Result<RemoteLocation> {
        let stored = self
            .conn
            .query_row(
                &format!("{SELECT_LOCATION} WHERE id = ?1"),
                params![id],
                StoredLocation::from_row,
            )
            .optional()?;
        stored
            .ok_or_else(|| Error::LocationNotFound(id.to_string()))?
            .open(cipher)
    }

    /// Find a location by name, or by id when `name_or_id` is numeric.
    pub fn find_location(&self, name_or_id: &str, cipher: &CredentialCipher) -> Result<RemoteLocation> {
        let stored = self
            .conn
            .query_row(
                &format!("{SELECT_LOCATION} WHERE name = ?1"),
                params![name_or_id],
                StoredLocation::from_row,
            )
            .optional()?;
        match stored {
            Some(stored) => stored.open(cipher),
            None => match name_or_id.parse::<LocationId>() {
                Ok(id) => self.get_location(id, cipher),
                Err(_) => Err(Error::LocationNotFound(name_or_id.to_string())),
            },
        }
    }

    /// List locations ordered by name.
    pub fn list_locations(&self, active_only: bool, cipher: &CredentialCipher) -> Result<Vec<RemoteLocation>> {
        let sql = if active_only {
            format!("{SELECT_LOCATION} WHERE is_active = 1 ORDER BY name")
        } else {
            format!("{SELECT_LOCATION} ORDER BY name")
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let stored = stmt
            .query_map([], StoredLocation::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        stored.into_iter().map(|s| s.open(cipher)).collect()
    }

    /// Apply a partial edit to a location.
    ///
    /// Fails with [`Error::LocationBusy`] while a sync run holds the location.
    pub fn update_location(
        &self,
        id: LocationId,
        update: &LocationUpdate,
        cipher: &CredentialCipher,
        locks: &LocationLocks,
    ) -> Result<RemoteLocation> {
        let current = self.get_location(id, cipher)?;
        let _lease = locks.try_acquire(&current)?;

        let name = update.name.clone().unwrap_or(current.name);
        let host = update.host.clone().unwrap_or(current.host);
        let port = update.port.unwrap_or(current.port);
        let database_name = update.database_name.clone().unwrap_or(current.database_name);
        let username = update.username.clone().unwrap_or(current.username);
        let password = update.password.as_ref().unwrap_or(&current.password);
        let is_active = update.is_active.unwrap_or(current.is_active);

        validate(&name, &host, port, &database_name)?;
        if self.location_name_taken(&name, Some(id))? {
            return Err(Error::DuplicateLocation(name));
        }

        self.conn.execute(
            "UPDATE remote_locations SET name = ?1, host = ?2, port = ?3, database_name = ?4,
             username = ?5, password = ?6, is_active = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                name,
                host,
                i64::from(port),
                database_name,
                username,
                cipher.encrypt(password)?,
                is_active,
                format_timestamp(Utc::now()),
                id,
            ],
        )?;
        tracing::info!(location = %name, id, "updated location");
        self.get_location(id, cipher)
    }

    /// Remove a location and its watermarks. History entries are kept.
    ///
    /// Fails with [`Error::LocationBusy`] while a sync run holds the location.
    pub fn delete_location(&self, id: LocationId, locks: &LocationLocks) -> Result<()> {
        let name: String = self
            .conn
            .query_row(
                "SELECT name FROM remote_locations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::LocationNotFound(id.to_string()))?;
        let _lease = locks.acquire(id, &name)?;

        let affected = self
            .conn
            .execute("DELETE FROM remote_locations WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(Error::LocationNotFound(id.to_string()));
        }
        tracing::info!(location = %name, id, "deleted location");
        Ok(())
    }

    fn location_name_taken(&self, name: &str, except: Option<LocationId>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM remote_locations WHERE name = ?1 AND id != ?2",
            params![name, except.unwrap_or(-1)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
#[path = "location_tests.rs"]
mod tests;
