// src/db/mod.rs

//! Installed-package database
//!
//! SQLite-backed records of what is installed where. `init` creates the
//! database (and parent directories) and applies migrations; `open`
//! connects to an existing database and brings its schema up to date.

pub mod models;
pub mod schema;

pub use models::{FlagOverride, InstalledPackage};

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Initialize a new database at `path`, creating parent directories
pub fn init(path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Init(format!(
                    "Cannot create database directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    let conn = open(path)?;
    info!("Database initialized at {}", path);
    Ok(conn)
}

/// Open the database at `path` and apply any pending migrations
pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Register an install: record identity, flag state, and dependency
/// declarations in one transaction.
pub fn register_install(
    conn: &mut Connection,
    name: &str,
    version: &str,
    dest_dir: &str,
    flags: &crate::flag::FlagSet,
    deps: &[(String, String, bool)],
) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut pkg =
            InstalledPackage::new(name.to_string(), version.to_string(), dest_dir.to_string());
        pkg.insert(&tx)?;
        pkg.set_flags(&tx, flags)?;
        pkg.set_dependencies(&tx, deps)?;
    }
    tx.commit()?;
    Ok(())
}
