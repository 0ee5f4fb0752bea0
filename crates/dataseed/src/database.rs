//! The database wraps a rusqlite connection, sets it up the way the merge expects, and hands out transactions.
//!
//! Merging never opens or finishes a transaction on its own: callers get one from [Database::transaction], pass it
//! down, and decide whether to commit it.  Dropping a transaction without committing rolls it back.
use std::path::Path;

use log::*;

use crate::config::validate_identifier;
use crate::error::{Error, Result};
use crate::sql::quote_ident;

pub struct Database {
    conn: rusqlite::Connection,
}

/// SQL that we run as part of opening a connection.
///
/// - Enables the busy timeout, so that a concurrent writer makes us wait rather than fail immediately.
/// - Enables foreign key enforcement, which is off by default in SQLite.  Seed data is ordered so that it satisfies
///   foreign keys; we want to hear about it when it doesn't.
/// - Raises the default cache size because the one sqlite sets up for us is only a couple megabytes.
const INITIAL_SQL: &str = r#"
PRAGMA busy_timeout = 1000;
PRAGMA cache_size = -100000;
PRAGMA foreign_keys = 1;
"#;

fn connection_error(source: rusqlite::Error) -> Error {
    Error::Connection { source }
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening database at {}", path.display());
        let conn = rusqlite::Connection::open(path).map_err(connection_error)?;
        Database::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(connection_error)?;
        Database::with_connection(conn)
    }

    /// Build a database from an already-existing connection.
    pub fn with_connection(conn: rusqlite::Connection) -> Result<Self> {
        conn.execute_batch(INITIAL_SQL).map_err(connection_error)?;
        Ok(Database { conn })
    }

    /// Attach the database file at `path` as the catalog `name`.
    pub fn attach_catalog(&self, name: &str, path: &Path) -> Result<()> {
        validate_identifier("catalog", name)?;
        let path = path.to_str().ok_or_else(|| {
            Error::Config(format!("{} is not valid UTF-8", path.display()))
        })?;

        info!("Attaching {} as catalog {}", path, name);
        self.conn
            .execute(
                &format!("ATTACH DATABASE ?1 AS {}", quote_ident(name)),
                rusqlite::params![path],
            )
            .map_err(connection_error)?;
        Ok(())
    }

    /// Run some SQL outside of any merge, e.g. to create the target schema.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(connection_error)
    }

    pub fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    pub fn transaction(&mut self) -> Result<rusqlite::Transaction<'_>> {
        self.conn.transaction().map_err(connection_error)
    }
}
