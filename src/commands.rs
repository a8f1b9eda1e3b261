// src/commands.rs

//! Command handlers for the Anvil CLI
//!
//! Each handler opens what it needs, runs one resolver or database
//! operation, and prints for a human. JSON output goes through the
//! report's own serializer so scripts see a stable shape.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use anvil::db::models::FlagOverride;
use anvil::flag::{Flag, FlagSet};
use anvil::repository::{FsRepository, RepositoryStore};
use anvil::resolver::{partition, Report, ReportEntry, Resolution, ResolveParams};

/// Open the repository at `repo`: templates under `templates/`,
/// artifacts under `artifacts/`, installed state in the database.
fn open_repo(repo: &str, db_path: &str) -> Result<FsRepository> {
    let conn = anvil::db::open(db_path)
        .with_context(|| format!("Cannot open database '{db_path}' (run 'anvil init'?)"))?;
    let root = Path::new(repo);
    FsRepository::open(&root.join("templates"), &root.join("artifacts"), conn)
        .with_context(|| format!("Cannot open repository '{repo}'"))
}

/// Ad-hoc flag requirements from repeated `--with`/`--without` args
fn root_flags(with: &[String], without: &[String]) -> Result<FlagSet> {
    let mut flags = FlagSet::new();
    for name in with {
        flags.set(Flag::new(name.as_str(), true));
    }
    for name in without {
        if flags.get(name) == Some(true) {
            bail!("flag '{name}' passed to both --with and --without");
        }
        flags.set(Flag::new(name.as_str(), false));
    }
    Ok(flags)
}

fn print_entries(heading: &str, entries: &[ReportEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("{heading}:");
    for entry in entries {
        let marker = if entry.build_only { " (build only)" } else { "" };
        if entry.flags.is_empty() {
            println!("  {} {}{}", entry.name, entry.version, marker);
        } else {
            println!("  {} {} [{}]{}", entry.name, entry.version, entry.flags, marker);
        }
    }
}

fn print_diagnostics(report: &Report) {
    for missing in &report.missing {
        println!("missing: {missing}");
    }
    for failure in &report.failures {
        println!("error: {failure}");
    }
}

pub fn cmd_init(db_path: &str) -> Result<()> {
    info!("Initializing database at {}", db_path);
    anvil::db::init(db_path)?;
    println!("Database initialized at {db_path}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_resolve(
    packages: &[String],
    repo: &str,
    db_path: &str,
    dest_dir: &str,
    forge: bool,
    reinstall: bool,
    no_build_deps: bool,
    with_flags: &[String],
    without_flags: &[String],
    json: bool,
) -> Result<()> {
    let store = open_repo(repo, db_path)?;
    let params = ResolveParams {
        is_forge: forge,
        is_reinstall: reinstall,
        ignore_build_deps: no_build_deps,
        dest_dir: dest_dir.to_string(),
        root_flags: root_flags(with_flags, without_flags)?,
    };
    let report = Resolution::new(&store, params).run(packages)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        print_entries("To forge", &report.forge);
        print_entries("To install", &report.install);
        if report.forge.is_empty() && report.install.is_empty() && report.is_clean() {
            println!("Nothing to do.");
        }
        print_diagnostics(&report);
    }

    if !report.is_clean() {
        bail!(
            "{} problem(s) found",
            report.missing.len() + report.failures.len()
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_install(
    packages: &[String],
    repo: &str,
    db_path: &str,
    dest_dir: &str,
    reinstall: bool,
    with_flags: &[String],
    without_flags: &[String],
    dry_run: bool,
) -> Result<()> {
    let store = open_repo(repo, db_path)?;
    let params = ResolveParams {
        is_forge: false,
        is_reinstall: reinstall,
        ignore_build_deps: false,
        dest_dir: dest_dir.to_string(),
        root_flags: root_flags(with_flags, without_flags)?,
    };
    let report = Resolution::new(&store, params.clone()).run(packages)?;
    if !report.is_clean() {
        print_diagnostics(&report);
        bail!("resolution failed, nothing installed");
    }
    if !report.forge.is_empty() {
        print_entries("Requires forging first", &report.forge);
        bail!("some packages have no prebuilt artifact; run 'anvil forge'");
    }

    let plan = partition(&store, &report, &params)?;
    if plan.install.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }
    print_entries("Installing", &plan.install);
    if dry_run {
        println!("Dry run, nothing recorded.");
        return Ok(());
    }

    let rows: Vec<Vec<(String, String, bool)>> = plan
        .install
        .iter()
        .map(|entry| dependency_rows(&store, &entry.name))
        .collect();
    let mut conn = store.into_connection();
    for (entry, deps) in plan.install.iter().zip(rows) {
        anvil::db::register_install(
            &mut conn,
            &entry.name,
            &entry.version,
            dest_dir,
            &entry.flags,
            &deps,
        )?;
        info!("Registered {} {} at {}", entry.name, entry.version, dest_dir);
    }
    println!("Installed {} package(s).", plan.install.len());
    Ok(())
}

/// Dependency declarations to record for an installed package, as
/// (raw depspec, dependency name, build-only) rows
fn dependency_rows(store: &FsRepository, name: &str) -> Vec<(String, String, bool)> {
    let Some(meta) = store.latest(name) else {
        return Vec::new();
    };
    let mut rows = Vec::new();
    for dep in &meta.depends {
        rows.push((dep.to_string(), dep.name.clone(), false));
    }
    for dep in &meta.build_depends {
        rows.push((dep.to_string(), dep.name.clone(), true));
    }
    rows
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_forge(
    packages: &[String],
    repo: &str,
    db_path: &str,
    dest_dir: &str,
    no_build_deps: bool,
    with_flags: &[String],
    without_flags: &[String],
    json: bool,
) -> Result<()> {
    let store = open_repo(repo, db_path)?;
    let params = ResolveParams {
        is_forge: true,
        is_reinstall: false,
        ignore_build_deps: no_build_deps,
        dest_dir: dest_dir.to_string(),
        root_flags: root_flags(with_flags, without_flags)?,
    };
    let report = Resolution::new(&store, params.clone()).run(packages)?;
    if !report.is_clean() {
        print_diagnostics(&report);
        bail!("resolution failed");
    }

    let plan = partition(&store, &report, &params)?;
    if json {
        let value = serde_json::json!({
            "builds": plan
                .builds
                .iter()
                .map(|graph| {
                    serde_json::json!({
                        "root": { "name": graph.root.name, "version": graph.root.version },
                        "install": graph
                            .install
                            .iter()
                            .map(|e| serde_json::json!({ "name": e.name, "version": e.version }))
                            .collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>(),
            "install": plan
                .install
                .iter()
                .map(|e| serde_json::json!({ "name": e.name, "version": e.version }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for graph in &plan.builds {
            println!("Forge {} {}:", graph.root.name, graph.root.version);
            print_entries("  install first", &graph.install);
        }
        print_entries("Then install", &plan.install);
    }

    if !plan.is_clean() {
        for failure in &plan.failures {
            println!("error: {failure}");
        }
        bail!("{} problem(s) found", plan.failures.len());
    }
    Ok(())
}

pub fn cmd_config_set(package: &str, flag: &str, db_path: &str) -> Result<()> {
    let flag: Flag = flag
        .parse()
        .with_context(|| format!("'{flag}' is not a signed flag like '+ssl' or '-acl'"))?;
    let conn = anvil::db::open(db_path)?;
    FlagOverride::set(&conn, package, &flag)?;
    println!("Set {package} {flag}");
    Ok(())
}

pub fn cmd_config_unset(package: &str, flag: Option<&str>, db_path: &str) -> Result<()> {
    let conn = anvil::db::open(db_path)?;
    match flag {
        Some(flag) => {
            if FlagOverride::unset(&conn, package, flag)? {
                println!("Removed override {package} {flag}");
            } else {
                println!("No override {package} {flag}");
            }
        }
        None => {
            FlagOverride::clear(&conn, package)?;
            println!("Cleared overrides for {package}");
        }
    }
    Ok(())
}

pub fn cmd_config_list(package: Option<&str>, db_path: &str) -> Result<()> {
    let conn = anvil::db::open(db_path)?;
    match package {
        Some(package) => {
            let flags = FlagOverride::for_package(&conn, package)?;
            if flags.is_empty() {
                println!("No overrides for {package}");
            } else {
                println!("{package}: {flags}");
            }
        }
        None => {
            let overrides = FlagOverride::list_all(&conn)?;
            if overrides.is_empty() {
                println!("No overrides.");
            }
            for item in overrides {
                let sign = if item.enabled { '+' } else { '-' };
                println!("{} {}{}", item.package_name, sign, item.flag);
            }
        }
    }
    Ok(())
}
