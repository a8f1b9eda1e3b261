// src/repository/mod.rs

//! Repository store: the resolver's read-only view of the world
//!
//! The resolver never touches the filesystem or database directly; it
//! queries a [`RepositoryStore`] for package metadata, artifact and
//! template availability, and installed state. [`FsRepository`] is the
//! production implementation over a template tree, an artifact cache dir,
//! and the installed-package database; [`MemoryStore`] backs tests.

use crate::db::models::{FlagOverride, InstalledPackage};
use crate::depspec::DepSpec;
use crate::error::Result;
use crate::flag::{FlagExpr, FlagSet};
use crate::template::Template;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Static metadata for one package, sourced from its build template
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    /// Declared default flag states
    pub default_flags: FlagSet,
    /// Per-flag enable conditions; a flag may only be enabled when its
    /// condition verifies against the package's resolved flag set
    pub flag_conditions: Vec<(String, FlagExpr)>,
    /// Runtime dependencies
    pub depends: Vec<DepSpec>,
    /// Build-only dependencies
    pub build_depends: Vec<DepSpec>,
}

impl PackageMetadata {
    /// First declared condition violated by `flags`, if any
    pub fn violated_condition(&self, flags: &FlagSet) -> Option<&str> {
        self.flag_conditions
            .iter()
            .find(|(name, expr)| flags.is_enabled(name) && !expr.verify(flags))
            .map(|(name, _)| name.as_str())
    }
}

/// One installed package instance as the resolver sees it
#[derive(Debug, Clone)]
pub struct InstalledRecord {
    pub name: String,
    pub version: String,
    /// Flag state the package was installed with
    pub flags: FlagSet,
    pub dest_dir: String,
    /// Raw runtime dependency declarations recorded at install time
    pub depends: Vec<String>,
}

/// Query surface the resolver requires; all methods are read-only
pub trait RepositoryStore {
    /// Latest known metadata for a package name
    fn latest(&self, name: &str) -> Option<&PackageMetadata>;

    /// Whether a prebuilt artifact exists for this exact resolution
    fn has_artifact(&self, name: &str, version: &str, flags: &FlagSet) -> bool;

    /// Whether a build template exists for this version
    fn has_template(&self, name: &str, version: &str) -> bool;

    /// Installed instance of `name` at `dest_dir`, if any
    fn installed(&self, name: &str, dest_dir: &str) -> Result<Option<InstalledRecord>>;

    /// Installed packages at the record's dest dir whose runtime
    /// dependencies name the record's package
    fn reverse_dependents(&self, record: &InstalledRecord) -> Result<Vec<InstalledRecord>>;

    /// Operator-supplied flag overrides for a package
    fn flag_overrides(&self, name: &str) -> Result<FlagSet>;
}

/// Filesystem-and-database repository
///
/// Templates are TOML files anywhere under the template dir; the highest
/// version per package name wins (raw string comparison, consistent with
/// version bounds). Artifacts are files named
/// `<name>-<version>.anvil.tar` in the artifact dir.
pub struct FsRepository {
    packages: HashMap<String, PackageMetadata>,
    artifact_dir: PathBuf,
    conn: Connection,
}

impl FsRepository {
    /// Scan the template tree and wrap the installed-package database
    pub fn open(template_dir: &Path, artifact_dir: &Path, conn: Connection) -> Result<Self> {
        let mut packages: HashMap<String, PackageMetadata> = HashMap::new();
        for entry in WalkDir::new(template_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file()
                || entry.path().extension().is_none_or(|ext| ext != "toml")
            {
                continue;
            }
            let meta = match Template::load(entry.path()).and_then(Template::into_metadata) {
                Ok(meta) => meta,
                Err(e) => {
                    // One bad template must not take down the whole scan
                    warn!("Skipping template {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            match packages.get(&meta.name) {
                Some(existing) if existing.version.as_str() >= meta.version.as_str() => {}
                _ => {
                    packages.insert(meta.name.clone(), meta);
                }
            }
        }
        debug!("Loaded {} templates", packages.len());

        Ok(Self {
            packages,
            artifact_dir: artifact_dir.to_path_buf(),
            conn,
        })
    }

    /// Borrow the underlying database connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Take back the underlying database connection
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn record_for(&self, pkg: &InstalledPackage) -> Result<InstalledRecord> {
        Ok(InstalledRecord {
            name: pkg.name.clone(),
            version: pkg.version.clone(),
            flags: pkg.flags(&self.conn)?,
            dest_dir: pkg.dest_dir.clone(),
            depends: pkg.dependencies(&self.conn)?,
        })
    }
}

impl RepositoryStore for FsRepository {
    fn latest(&self, name: &str) -> Option<&PackageMetadata> {
        self.packages.get(name)
    }

    fn has_artifact(&self, name: &str, version: &str, _flags: &FlagSet) -> bool {
        // The artifact cache is not partitioned by flag state; a cached
        // artifact is assumed to match the configured flags for its
        // name and version.
        self.artifact_dir
            .join(format!("{name}-{version}.anvil.tar"))
            .is_file()
    }

    fn has_template(&self, name: &str, version: &str) -> bool {
        self.packages
            .get(name)
            .is_some_and(|meta| meta.version == version)
    }

    fn installed(&self, name: &str, dest_dir: &str) -> Result<Option<InstalledRecord>> {
        match InstalledPackage::find(&self.conn, name, dest_dir)? {
            Some(pkg) => Ok(Some(self.record_for(&pkg)?)),
            None => Ok(None),
        }
    }

    fn reverse_dependents(&self, record: &InstalledRecord) -> Result<Vec<InstalledRecord>> {
        let packages =
            InstalledPackage::reverse_dependents(&self.conn, &record.name, &record.dest_dir)?;
        packages.iter().map(|pkg| self.record_for(pkg)).collect()
    }

    fn flag_overrides(&self, name: &str) -> Result<FlagSet> {
        FlagOverride::for_package(&self.conn, name)
    }
}

/// In-memory store for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    packages: HashMap<String, PackageMetadata>,
    /// (name, version) pairs with a prebuilt artifact
    artifacts: Vec<(String, String)>,
    /// Package names with metadata but no build template
    binary_only: Vec<String>,
    installed: Vec<InstalledRecord>,
    /// Reverse dependents reported regardless of recorded depends, to
    /// model a corrupted install database
    forced_rdeps: Vec<(String, InstalledRecord)>,
    overrides: HashMap<String, FlagSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add package metadata; the package gets a build template by default
    pub fn add_package(&mut self, meta: PackageMetadata) -> &mut Self {
        self.packages.insert(meta.name.clone(), meta);
        self
    }

    /// Record a prebuilt artifact for a name/version
    pub fn add_artifact(&mut self, name: &str, version: &str) -> &mut Self {
        self.artifacts.push((name.to_string(), version.to_string()));
        self
    }

    /// Mark a package as having no build template
    pub fn binary_only(&mut self, name: &str) -> &mut Self {
        self.binary_only.push(name.to_string());
        self
    }

    /// Record an installed instance
    pub fn add_installed(&mut self, record: InstalledRecord) -> &mut Self {
        self.installed.push(record);
        self
    }

    /// Report `dependent` as a reverse dependent of `name` even though
    /// its recorded dependencies say otherwise
    pub fn force_reverse_dependent(&mut self, name: &str, dependent: InstalledRecord) -> &mut Self {
        self.forced_rdeps.push((name.to_string(), dependent));
        self
    }

    /// Set operator flag overrides for a package
    pub fn set_overrides(&mut self, name: &str, flags: FlagSet) -> &mut Self {
        self.overrides.insert(name.to_string(), flags);
        self
    }
}

impl RepositoryStore for MemoryStore {
    fn latest(&self, name: &str) -> Option<&PackageMetadata> {
        self.packages.get(name)
    }

    fn has_artifact(&self, name: &str, version: &str, _flags: &FlagSet) -> bool {
        self.artifacts
            .iter()
            .any(|(n, v)| n == name && v == version)
    }

    fn has_template(&self, name: &str, version: &str) -> bool {
        self.packages
            .get(name)
            .is_some_and(|meta| meta.version == version)
            && !self.binary_only.iter().any(|n| n == name)
    }

    fn installed(&self, name: &str, dest_dir: &str) -> Result<Option<InstalledRecord>> {
        Ok(self
            .installed
            .iter()
            .find(|r| r.name == name && r.dest_dir == dest_dir)
            .cloned())
    }

    fn reverse_dependents(&self, record: &InstalledRecord) -> Result<Vec<InstalledRecord>> {
        let mut dependents: Vec<InstalledRecord> = self
            .installed
            .iter()
            .filter(|r| {
                r.dest_dir == record.dest_dir
                    && r.depends.iter().any(|raw| {
                        DepSpec::parse(raw).is_ok_and(|dep| dep.name == record.name)
                    })
            })
            .cloned()
            .collect();
        for (target, dependent) in &self.forced_rdeps {
            if target == &record.name {
                dependents.push(dependent.clone());
            }
        }
        dependents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(dependents)
    }

    fn flag_overrides(&self, name: &str) -> Result<FlagSet> {
        Ok(self.overrides.get(name).cloned().unwrap_or_default())
    }
}
