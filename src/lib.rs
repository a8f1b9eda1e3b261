// src/lib.rs

//! Anvil Package Manager
//!
//! Source and binary package manager built around flag-aware dependency
//! resolution. Forging builds a package from source into an installable
//! artifact; wielding places it onto a destination root.
//!
//! # Architecture
//!
//! - Flags: named boolean feature toggles, merged across dependents
//! - DepSpecs: the dependency declaration grammar (conditions, version
//!   bounds, required flags)
//! - Templates: TOML build metadata scanned into a repository snapshot
//! - Resolver: recursive classification into forge and install sets,
//!   with bootstrap-cycle handling and build-set partitioning
//! - Install database: SQLite records of what is installed where

pub mod db;
pub mod depspec;
mod error;
pub mod flag;
pub mod repository;
pub mod resolver;
pub mod template;

pub use depspec::{BoundKind, DepSpec, VersionBound};
pub use error::{Error, Result};
pub use flag::{merge_required_flags, Flag, FlagExpr, FlagSet};
pub use repository::{
    FsRepository, InstalledRecord, MemoryStore, PackageMetadata, RepositoryStore,
};
pub use resolver::{
    partition, BuildGraph, MissingInfo, Partition, Report, ReportEntry, Resolution, ResolveFailure,
    ResolveParams,
};
pub use template::Template;
