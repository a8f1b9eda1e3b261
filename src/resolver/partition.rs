// src/resolver/partition.rs

//! Build-set partitioning
//!
//! Splits a finished resolution report into per-root build graphs and a
//! residual install graph. Each forge root gets its build-time install
//! set computed by re-running the resolver in forge mode against that
//! root alone, so the set is restricted to the root's own
//! build-dependency closure.

use super::engine::{Resolution, ResolveParams};
use super::report::{Report, ReportEntry, ResolveFailure};
use crate::error::Result;
use crate::flag::FlagSet;
use crate::repository::RepositoryStore;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// One package to forge, with everything its build needs installed first
#[derive(Debug)]
pub struct BuildGraph {
    pub root: ReportEntry,
    /// Installs required before the root's build can start
    pub install: Vec<ReportEntry>,
}

/// Result of partitioning one resolution report
#[derive(Debug, Default)]
pub struct Partition {
    pub builds: Vec<BuildGraph>,
    /// Install-set members not covered by any build graph and not yet
    /// installed at the destination
    pub install: Vec<ReportEntry>,
    pub failures: Vec<ResolveFailure>,
}

impl Partition {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Partition `report` into build graphs and a residual install graph
pub fn partition<S: RepositoryStore>(
    store: &S,
    report: &Report,
    params: &ResolveParams,
) -> Result<Partition> {
    let mut partition = Partition::default();

    // Resolved flags by name, for evaluating conditional edges during
    // reachability walks
    let mut flags_of: HashMap<String, FlagSet> = HashMap::new();
    for entry in report.forge.iter().chain(report.install.iter()) {
        flags_of
            .entry(entry.name.clone())
            .or_insert_with(|| entry.flags.clone());
    }

    // A forge root is a forge-marked node no other forge-marked node
    // depends on. A forge node with its own prebuilt artifact is always
    // a root: dependents bootstrap from the artifact rather than from
    // its build, so their edges impose no ordering on it.
    let roots: Vec<&ReportEntry> = report
        .forge
        .iter()
        .filter(|candidate| {
            store.has_artifact(&candidate.name, &candidate.version, &candidate.flags)
                || !report.forge.iter().any(|other| {
                    other.name != candidate.name
                        && reach_path(store, &flags_of, &other.name, &candidate.name).is_some()
                })
        })
        .collect();

    for root in roots {
        debug!("partitioning build graph for {}", root.name);
        let sub_params = ResolveParams {
            is_forge: true,
            ..params.clone()
        };
        let sub = Resolution::new(store, sub_params).run(&[root.name.clone()])?;
        for failure in sub.failures {
            push_failure(&mut partition.failures, failure);
        }

        // An install member that depends back on the root makes every
        // build order infeasible, unless the root's prebuilt artifact
        // can satisfy the member first. Report it instead of reordering.
        let bootstrapped = store.has_artifact(&root.name, &root.version, &root.flags);
        let mut install = Vec::new();
        for entry in sub.install {
            if entry.name != root.name && !bootstrapped {
                if let Some(path) = reach_path(store, &flags_of, &entry.name, &root.name) {
                    push_failure(
                        &mut partition.failures,
                        ResolveFailure::BuildCycle {
                            root: root.name.clone(),
                            chain: path,
                        },
                    );
                    continue;
                }
            }
            install.push(entry);
        }
        partition.builds.push(BuildGraph {
            root: root.clone(),
            install,
        });
    }

    for entry in &report.install {
        let scheduled = partition
            .builds
            .iter()
            .any(|graph| graph.install.iter().any(|e| e.name == entry.name));
        if scheduled {
            continue;
        }
        let already = store
            .installed(&entry.name, &params.dest_dir)?
            .is_some_and(|record| record.version == entry.version);
        if !already {
            partition.install.push(entry.clone());
        }
    }

    Ok(partition)
}

/// Breadth-first dependency path from `from` to `target`, conditions
/// evaluated against the walked node's resolved flags when known
fn reach_path<S: RepositoryStore>(
    store: &S,
    flags_of: &HashMap<String, FlagSet>,
    from: &str,
    target: &str,
) -> Option<Vec<String>> {
    let mut queue = VecDeque::new();
    let mut parent: HashMap<String, String> = HashMap::new();
    queue.push_back(from.to_string());

    while let Some(name) = queue.pop_front() {
        let Some(meta) = store.latest(&name) else {
            continue;
        };
        let flags = flags_of.get(&name).unwrap_or(&meta.default_flags);
        for dep in meta.depends.iter().chain(meta.build_depends.iter()) {
            if let Some(cond) = &dep.condition {
                if flags.is_enabled(&cond.name) != cond.enabled {
                    continue;
                }
            }
            if dep.name == target {
                let mut path = vec![target.to_string(), name.clone()];
                let mut cursor = name;
                while let Some(prev) = parent.get(&cursor) {
                    path.push(prev.clone());
                    cursor = prev.clone();
                }
                path.reverse();
                return Some(path);
            }
            if dep.name != from && !parent.contains_key(&dep.name) {
                parent.insert(dep.name.clone(), name.clone());
                queue.push_back(dep.name.clone());
            }
        }
    }
    None
}

fn push_failure(failures: &mut Vec<ResolveFailure>, failure: ResolveFailure) {
    if !failures.contains(&failure) {
        failures.push(failure);
    }
}
