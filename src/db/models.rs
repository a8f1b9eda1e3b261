// src/db/models.rs

//! Data models for installed-package database entities

use crate::error::Result;
use crate::flag::{Flag, FlagSet};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// An installed package instance at one dest dir
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub id: Option<i64>,
    pub name: String,
    pub version: String,
    pub dest_dir: String,
    pub installed_at: String,
}

impl InstalledPackage {
    /// Create a new record stamped with the current time
    pub fn new(name: String, version: String, dest_dir: String) -> Self {
        Self {
            id: None,
            name,
            version,
            dest_dir,
            installed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            version: row.get(2)?,
            dest_dir: row.get(3)?,
            installed_at: row.get(4)?,
        })
    }

    /// Insert this record, replacing any previous install of the same name
    /// at the same dest dir
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT OR REPLACE INTO packages (name, version, dest_dir, installed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![&self.name, &self.version, &self.dest_dir, &self.installed_at],
        )?;
        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find the installed instance of a package at a dest dir
    pub fn find(conn: &Connection, name: &str, dest_dir: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, version, dest_dir, installed_at
             FROM packages WHERE name = ?1 AND dest_dir = ?2",
        )?;
        let pkg = stmt
            .query_row(params![name, dest_dir], Self::from_row)
            .optional()?;
        Ok(pkg)
    }

    /// List every installed package at a dest dir, ordered by name
    pub fn list(conn: &Connection, dest_dir: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, version, dest_dir, installed_at
             FROM packages WHERE dest_dir = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map([dest_dir], Self::from_row)?;
        let mut packages = Vec::new();
        for row in rows {
            packages.push(row?);
        }
        Ok(packages)
    }

    /// Installed packages at the same dest dir whose recorded dependencies
    /// name `dep_name`, ordered by name for deterministic replay
    pub fn reverse_dependents(
        conn: &Connection,
        dep_name: &str,
        dest_dir: &str,
    ) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT p.id, p.name, p.version, p.dest_dir, p.installed_at
             FROM packages p
             JOIN package_dependencies d ON d.package_id = p.id
             WHERE d.dep_name = ?1 AND p.dest_dir = ?2 AND d.build_only = 0
             ORDER BY p.name",
        )?;
        let rows = stmt.query_map(params![dep_name, dest_dir], Self::from_row)?;
        let mut packages = Vec::new();
        for row in rows {
            packages.push(row?);
        }
        Ok(packages)
    }

    /// Remove this record (flags and dependencies cascade)
    pub fn delete(&self, conn: &Connection) -> Result<()> {
        if let Some(id) = self.id {
            conn.execute("DELETE FROM packages WHERE id = ?1", [id])?;
        }
        Ok(())
    }

    /// Replace the recorded flag state for this package
    pub fn set_flags(&self, conn: &Connection, flags: &FlagSet) -> Result<()> {
        let id = self.id.expect("package must be inserted before set_flags");
        conn.execute("DELETE FROM package_flags WHERE package_id = ?1", [id])?;
        for flag in flags.iter() {
            conn.execute(
                "INSERT INTO package_flags (package_id, name, enabled) VALUES (?1, ?2, ?3)",
                params![id, &flag.name, flag.enabled],
            )?;
        }
        Ok(())
    }

    /// The flag state this package was installed with
    pub fn flags(&self, conn: &Connection) -> Result<FlagSet> {
        let id = self.id.expect("package must be loaded from the database");
        let mut stmt = conn.prepare(
            "SELECT name, enabled FROM package_flags WHERE package_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map([id], |row| {
            Ok(Flag::new(row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?;
        let mut flags = FlagSet::new();
        for row in rows {
            flags.set(row?);
        }
        Ok(flags)
    }

    /// Replace the recorded dependency declarations for this package
    ///
    /// `deps` pairs the raw depspec string with its parsed target name and
    /// whether it was a build-only dependency.
    pub fn set_dependencies(
        &self,
        conn: &Connection,
        deps: &[(String, String, bool)],
    ) -> Result<()> {
        let id = self
            .id
            .expect("package must be inserted before set_dependencies");
        conn.execute(
            "DELETE FROM package_dependencies WHERE package_id = ?1",
            [id],
        )?;
        for (depspec, dep_name, build_only) in deps {
            conn.execute(
                "INSERT INTO package_dependencies (package_id, depspec, dep_name, build_only)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, depspec, dep_name, build_only],
            )?;
        }
        Ok(())
    }

    /// The recorded runtime dependency declarations, as raw depspec strings
    pub fn dependencies(&self, conn: &Connection) -> Result<Vec<String>> {
        let id = self.id.expect("package must be loaded from the database");
        let mut stmt = conn.prepare(
            "SELECT depspec FROM package_dependencies
             WHERE package_id = ?1 AND build_only = 0 ORDER BY id",
        )?;
        let rows = stmt.query_map([id], |row| row.get(0))?;
        let mut deps = Vec::new();
        for row in rows {
            deps.push(row?);
        }
        Ok(deps)
    }
}

/// Operator-supplied per-package flag override
#[derive(Debug, Clone)]
pub struct FlagOverride {
    pub package_name: String,
    pub flag: String,
    pub enabled: bool,
}

impl FlagOverride {
    /// Set or update one override
    pub fn set(conn: &Connection, package_name: &str, flag: &Flag) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO flag_overrides (package_name, flag, enabled)
             VALUES (?1, ?2, ?3)",
            params![package_name, &flag.name, flag.enabled],
        )?;
        Ok(())
    }

    /// Drop one override; reports whether it existed
    pub fn unset(conn: &Connection, package_name: &str, flag: &str) -> Result<bool> {
        let removed = conn.execute(
            "DELETE FROM flag_overrides WHERE package_name = ?1 AND flag = ?2",
            params![package_name, flag],
        )?;
        Ok(removed > 0)
    }

    /// Drop all overrides for a package
    pub fn clear(conn: &Connection, package_name: &str) -> Result<()> {
        conn.execute(
            "DELETE FROM flag_overrides WHERE package_name = ?1",
            [package_name],
        )?;
        Ok(())
    }

    /// Overrides for one package as a flag set
    pub fn for_package(conn: &Connection, package_name: &str) -> Result<FlagSet> {
        let mut stmt = conn.prepare(
            "SELECT flag, enabled FROM flag_overrides WHERE package_name = ?1 ORDER BY flag",
        )?;
        let rows = stmt.query_map([package_name], |row| {
            Ok(Flag::new(row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?;
        let mut flags = FlagSet::new();
        for row in rows {
            flags.set(row?);
        }
        Ok(flags)
    }

    /// All overrides, ordered by package then flag
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT package_name, flag, enabled FROM flag_overrides
             ORDER BY package_name, flag",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Self {
                package_name: row.get(0)?,
                flag: row.get(1)?,
                enabled: row.get(2)?,
            })
        })?;
        let mut overrides = Vec::new();
        for row in rows {
            overrides.push(row?);
        }
        Ok(overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::schema::migrate(&conn).unwrap();
        conn
    }

    fn flags(items: &[(&str, bool)]) -> FlagSet {
        items
            .iter()
            .map(|(name, enabled)| Flag::new(*name, *enabled))
            .collect()
    }

    #[test]
    fn test_insert_and_find() {
        let conn = test_conn();
        let mut pkg =
            InstalledPackage::new("zlib".to_string(), "1.3".to_string(), "/".to_string());
        pkg.insert(&conn).unwrap();

        let found = InstalledPackage::find(&conn, "zlib", "/").unwrap().unwrap();
        assert_eq!(found.version, "1.3");
        assert!(InstalledPackage::find(&conn, "zlib", "/mnt").unwrap().is_none());
    }

    #[test]
    fn test_reinstall_replaces() {
        let conn = test_conn();
        let mut old =
            InstalledPackage::new("zlib".to_string(), "1.2".to_string(), "/".to_string());
        old.insert(&conn).unwrap();
        let mut new =
            InstalledPackage::new("zlib".to_string(), "1.3".to_string(), "/".to_string());
        new.insert(&conn).unwrap();

        let found = InstalledPackage::find(&conn, "zlib", "/").unwrap().unwrap();
        assert_eq!(found.version, "1.3");
        assert_eq!(InstalledPackage::list(&conn, "/").unwrap().len(), 1);
    }

    #[test]
    fn test_flags_roundtrip() {
        let conn = test_conn();
        let mut pkg =
            InstalledPackage::new("libssl".to_string(), "3.2".to_string(), "/".to_string());
        pkg.insert(&conn).unwrap();
        pkg.set_flags(&conn, &flags(&[("asm", true), ("docs", false)]))
            .unwrap();

        let loaded = pkg.flags(&conn).unwrap();
        assert_eq!(loaded.get("asm"), Some(true));
        assert_eq!(loaded.get("docs"), Some(false));
    }

    #[test]
    fn test_reverse_dependents() {
        let conn = test_conn();
        let mut lib =
            InstalledPackage::new("zlib".to_string(), "1.3".to_string(), "/".to_string());
        lib.insert(&conn).unwrap();

        let mut app =
            InstalledPackage::new("curl".to_string(), "8.6".to_string(), "/".to_string());
        app.insert(&conn).unwrap();
        app.set_dependencies(
            &conn,
            &[
                ("zlib>=1.2".to_string(), "zlib".to_string(), false),
                ("cmake".to_string(), "cmake".to_string(), true),
            ],
        )
        .unwrap();

        let rdeps = InstalledPackage::reverse_dependents(&conn, "zlib", "/").unwrap();
        assert_eq!(rdeps.len(), 1);
        assert_eq!(rdeps[0].name, "curl");

        // Build-only dependencies do not create reverse-dependent edges
        let rdeps = InstalledPackage::reverse_dependents(&conn, "cmake", "/").unwrap();
        assert!(rdeps.is_empty());
    }

    #[test]
    fn test_dependencies_runtime_only() {
        let conn = test_conn();
        let mut app =
            InstalledPackage::new("curl".to_string(), "8.6".to_string(), "/".to_string());
        app.insert(&conn).unwrap();
        app.set_dependencies(
            &conn,
            &[
                ("zlib>=1.2".to_string(), "zlib".to_string(), false),
                ("cmake".to_string(), "cmake".to_string(), true),
            ],
        )
        .unwrap();

        assert_eq!(app.dependencies(&conn).unwrap(), vec!["zlib>=1.2"]);
    }

    #[test]
    fn test_flag_overrides() {
        let conn = test_conn();
        FlagOverride::set(&conn, "libssl", &Flag::new("asm", true)).unwrap();
        FlagOverride::set(&conn, "libssl", &Flag::new("docs", false)).unwrap();

        let set = FlagOverride::for_package(&conn, "libssl").unwrap();
        assert_eq!(set.get("asm"), Some(true));
        assert_eq!(set.get("docs"), Some(false));
        assert!(FlagOverride::for_package(&conn, "other").unwrap().is_empty());

        FlagOverride::clear(&conn, "libssl").unwrap();
        assert!(FlagOverride::for_package(&conn, "libssl").unwrap().is_empty());
    }
}
