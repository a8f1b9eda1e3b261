// src/db/schema.rs

//! Database schema definitions and migrations
//!
//! The installed-package database records what is present at each dest
//! dir: package identity, the resolved flag state it was installed with,
//! and its dependency declarations at install time. The resolver consumes
//! this as a read-only snapshot.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

/// Record that a schema version has been applied
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations
pub fn migrate(conn: &Connection) -> Result<()> {
    let current = get_schema_version(conn)?;
    if current >= SCHEMA_VERSION {
        debug!("Schema up to date at version {}", current);
        return Ok(());
    }

    if current < 1 {
        info!("Applying schema migration to version 1");
        migrate_to_v1(conn)?;
        set_schema_version(conn, 1)?;
    }

    Ok(())
}

/// Initial schema: installed packages, their flag state, their dependency
/// declarations, and operator flag overrides.
fn migrate_to_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE packages (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            dest_dir TEXT NOT NULL DEFAULT '/',
            installed_at TEXT NOT NULL,
            UNIQUE (name, dest_dir)
        );

        CREATE TABLE package_flags (
            id INTEGER PRIMARY KEY,
            package_id INTEGER NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            enabled INTEGER NOT NULL,
            UNIQUE (package_id, name)
        );

        CREATE TABLE package_dependencies (
            id INTEGER PRIMARY KEY,
            package_id INTEGER NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
            depspec TEXT NOT NULL,
            dep_name TEXT NOT NULL,
            build_only INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX idx_package_dependencies_dep_name
            ON package_dependencies(dep_name);

        CREATE TABLE flag_overrides (
            package_name TEXT NOT NULL,
            flag TEXT NOT NULL,
            enabled INTEGER NOT NULL,
            PRIMARY KEY (package_name, flag)
        );",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_exist_after_migrate() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        for table in [
            "packages",
            "package_flags",
            "package_dependencies",
            "flag_overrides",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {table} should exist");
        }
    }
}
