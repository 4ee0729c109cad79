// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote branch access and the connection probe.
//!
//! Provides a trait-based seam over remote databases so that:
//! - branch databases reachable as SQLite files are read by [`SqliteConnector`]
//! - tests substitute connectors that fail, stall or count calls
//!
//! [`ConnectionProbe`] bounds every connection attempt with a timeout, even
//! when the connector itself blocks.

use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags};

use crate::error::{Error, Result};
use crate::location::RemoteLocation;
use crate::table::{select_rows, TableSpec};
use crate::value::Row;

/// Default bound on probing a location.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// An open, read-only session against one remote location.
pub trait RemoteSession: Send {
    /// Cheap round trip proving the remote answers queries.
    fn ping(&mut self) -> Result<()>;

    /// Reads rows of one table, bounded by `since` (inclusive) when given.
    fn fetch_rows(&mut self, spec: &TableSpec, since: Option<DateTime<Utc>>) -> Result<Vec<Row>>;
}

/// Opens sessions to remote locations.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, location: &RemoteLocation, timeout: Duration) -> Result<Box<dyn RemoteSession>>;
}

/// Connector for branch databases exposed as SQLite files.
///
/// A non-zero port is checked with a TCP handshake to `host:port` before the
/// file is opened; port 0 means the file is mounted locally. SQLite has no
/// credentials of its own, so username and password are not used.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteConnector;

impl SqliteConnector {
    fn handshake(location: &RemoteLocation, timeout: Duration) -> Result<()> {
        let unreachable = |reason: String| Error::Connectivity {
            location: location.name.clone(),
            reason,
        };

        let addrs = (location.host.as_str(), location.port)
            .to_socket_addrs()
            .map_err(|e| unreachable(format!("cannot resolve {}: {e}", location.host)))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(Error::Timeout {
                        location: location.name.clone(),
                        after: timeout,
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(unreachable(match last_err {
            Some(e) => format!("{}:{}: {e}", location.host, location.port),
            None => format!("no address for {}", location.host),
        }))
    }
}

impl RemoteConnector for SqliteConnector {
    fn connect(&self, location: &RemoteLocation, timeout: Duration) -> Result<Box<dyn RemoteSession>> {
        if location.port != 0 {
            Self::handshake(location, timeout)?;
        }

        let path = Path::new(&location.database_name);
        if !path.exists() {
            return Err(Error::Connectivity {
                location: location.name.clone(),
                reason: format!("database {} not found", path.display()),
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::Connectivity {
            location: location.name.clone(),
            reason: e.to_string(),
        })?;
        conn.busy_timeout(timeout)?;

        Ok(Box::new(SqliteSession { conn }))
    }
}

/// Read-only session over a branch SQLite database.
pub struct SqliteSession {
    conn: Connection,
}

impl RemoteSession for SqliteSession {
    fn ping(&mut self) -> Result<()> {
        // Touching sqlite_master reads the header, rejecting non-database files
        self.conn
            .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn fetch_rows(&mut self, spec: &TableSpec, since: Option<DateTime<Utc>>) -> Result<Vec<Row>> {
        select_rows(&self.conn, spec, since)
    }
}

/// Establishes verified sessions within a bounded time.
#[derive(Clone)]
pub struct ConnectionProbe {
    connector: Arc<dyn RemoteConnector>,
    timeout: Duration,
}

impl ConnectionProbe {
    pub fn new(connector: Arc<dyn RemoteConnector>, timeout: Duration) -> Self {
        ConnectionProbe { connector, timeout }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Tests that a location is reachable and answers queries.
    ///
    /// Has no side effects on either database.
    pub fn test(&self, location: &RemoteLocation) -> Result<()> {
        self.open(location).map(|_| ())
    }

    /// Connects and pings on a worker thread, giving up after the timeout.
    ///
    /// A worker that outlives the timeout is abandoned; its session is
    /// dropped when it eventually finishes.
    pub fn open(&self, location: &RemoteLocation) -> Result<Box<dyn RemoteSession>> {
        let (tx, rx) = mpsc::channel();
        let connector = Arc::clone(&self.connector);
        let target = location.clone();
        let timeout = self.timeout;

        thread::Builder::new()
            .name(format!("probe-{}", location.name))
            .spawn(move || {
                let result = connector.connect(&target, timeout).and_then(|mut session| {
                    session.ping()?;
                    Ok(session)
                });
                // Receiver is gone once the probe timed out
                let _ = tx.send(result);
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(session)) => {
                tracing::debug!(location = %location.name, "probe succeeded");
                Ok(session)
            }
            Ok(Err(e)) => Err(as_connectivity(location, e)),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout {
                location: location.name.clone(),
                after: self.timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Connectivity {
                location: location.name.clone(),
                reason: "probe worker exited without a result".to_string(),
            }),
        }
    }
}

fn as_connectivity(location: &RemoteLocation, err: Error) -> Error {
    match err {
        Error::Connectivity { .. } | Error::Timeout { .. } => err,
        other => Error::Connectivity {
            location: location.name.clone(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
