// src/resolver/engine.rs

//! Recursive classification
//!
//! Walks requested packages depth-first and sorts every reachable node
//! into the forge set (build from source), the install set (unpack a
//! prebuilt artifact), or the diagnostics lists. One [`Resolution`]
//! instance covers exactly one run; nothing persists between runs.

use super::node::{NodeId, NodeTable};
use super::report::{ClassSet, MissingInfo, Report, ReportEntry, ResolveFailure};
use crate::depspec::DepSpec;
use crate::error::Result;
use crate::flag::FlagSet;
use crate::repository::RepositoryStore;
use tracing::debug;

/// Knobs for one resolution run
#[derive(Debug, Clone)]
pub struct ResolveParams {
    /// Treat the requested roots as forge targets: they are rebuilt from
    /// source and never added to the install set themselves.
    pub is_forge: bool,
    /// Resolve the roots even if they are already installed
    pub is_reinstall: bool,
    /// Skip build-dependency recursion entirely
    pub ignore_build_deps: bool,
    /// Installation root the run resolves against
    pub dest_dir: String,
    /// Ad-hoc flag requirements applied to every requested root
    pub root_flags: FlagSet,
}

impl Default for ResolveParams {
    fn default() -> Self {
        Self {
            is_forge: false,
            is_reinstall: false,
            ignore_build_deps: false,
            dest_dir: "/".to_string(),
            root_flags: FlagSet::new(),
        }
    }
}

/// One in-flight resolution run
pub struct Resolution<'a, S: RepositoryStore> {
    store: &'a S,
    params: ResolveParams,
    nodes: NodeTable,
    forge: ClassSet,
    install: ClassSet,
    missing: Vec<MissingInfo>,
    failures: Vec<ResolveFailure>,
    /// Ancestors of the node currently being classified, for cycle chains
    path: Vec<NodeId>,
}

impl<'a, S: RepositoryStore> Resolution<'a, S> {
    pub fn new(store: &'a S, params: ResolveParams) -> Self {
        Self {
            store,
            params,
            nodes: NodeTable::new(),
            forge: ClassSet::new(),
            install: ClassSet::new(),
            missing: Vec::new(),
            failures: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Classify `roots` and everything they pull in.
    ///
    /// `Err` is reserved for store and database faults; anything the run
    /// merely could not place lands in the report's diagnostics.
    pub fn run(mut self, roots: &[String]) -> Result<Report> {
        let mut seeded = Vec::new();
        for name in roots {
            if self.store.latest(name).is_none() {
                self.push_failure(ResolveFailure::UnknownPackage {
                    package: name.clone(),
                });
                continue;
            }
            let id = self.nodes.add_node(name, self.store)?;
            if self.params.is_reinstall {
                self.nodes.get_mut(id).is_reinstall = true;
            }
            if !self.params.root_flags.is_empty() {
                let mut reason = DepSpec::bare(name);
                reason.required_flags = self.params.root_flags.clone();
                if !self
                    .nodes
                    .add_parent(id, None, reason, "command line".to_string(), self.store)
                {
                    if let Err(failure) = self.nodes.resolve(id, self.store) {
                        self.push_failure(failure);
                    }
                }
            }
            self.add_rdep_constraints(id)?;
            seeded.push(id);
        }

        for id in seeded {
            self.classify(id, id, false, 0)?;
        }
        Ok(self.snapshot())
    }

    /// When a root is already installed, its installed reverse
    /// dependents keep a say in its flags and version. Replay their
    /// recorded dependency on the root as constraints before resolving.
    fn add_rdep_constraints(&mut self, id: NodeId) -> Result<()> {
        let name = self.nodes.get(id).name.clone();
        let Some(record) = self.store.installed(&name, &self.params.dest_dir)? else {
            return Ok(());
        };

        for dependent in self.store.reverse_dependents(&record)? {
            let mut edge: Option<DepSpec> = None;
            for raw in &dependent.depends {
                if let Ok(dep) = DepSpec::parse(raw) {
                    if dep.name == name {
                        edge = Some(dep);
                        break;
                    }
                }
            }
            let Some(dep) = edge else {
                self.push_failure(ResolveFailure::InconsistentDatabase {
                    package: name.clone(),
                    dependent: dependent.name.clone(),
                });
                continue;
            };

            // The edge only binds if its condition held for the flag
            // state the dependent was installed with.
            if let Some(cond) = &dep.condition {
                if dependent.flags.is_enabled(&cond.name) != cond.enabled {
                    continue;
                }
            }

            let parent = self.nodes.add_node(&dependent.name, self.store)?;
            let label = format!("{} (installed)", dependent.name);
            debug!("constraining {} by installed dependent {}", name, dependent.name);
            if !self.nodes.add_parent(id, Some(parent), dep, label, self.store) {
                if let Err(failure) = self.nodes.resolve(id, self.store) {
                    self.push_failure(failure);
                }
            }
        }
        Ok(())
    }

    fn classify(&mut self, id: NodeId, root: NodeId, build_only: bool, depth: u32) -> Result<()> {
        let indent = "  ".repeat(depth as usize);
        let resolved = match self.nodes.resolve(id, self.store) {
            Ok(resolved) => resolved,
            Err(failure) => {
                self.push_failure(failure);
                return Ok(());
            }
        };
        let name = self.nodes.get(id).name.clone();
        let is_forge_root = self.params.is_forge && id == root;
        let reinstall = self.params.is_reinstall && self.nodes.get(id).is_reinstall;

        if !is_forge_root && !reinstall {
            if let Some(record) = self.store.installed(&name, &self.params.dest_dir)? {
                if record.version == resolved.version {
                    debug!("{indent}{name} {} already installed", resolved.version);
                    return Ok(());
                }
            }
        }

        // Non-build-only membership means runtime deps were walked too
        if self.install.contains_runtime(id) {
            return Ok(());
        }
        if self.install.contains(id) {
            if build_only {
                // Same marking as the previous visit; the subtree was
                // already walked under it
                return Ok(());
            }
            // Widen to runtime and re-descend so the subtree widens too
            self.mark_install(id, false);
        }

        // Already scheduled for forging further up: the only way out of
        // the cycle is a prebuilt artifact from an earlier bootstrap.
        if self.forge.contains(id) {
            if self
                .store
                .has_artifact(&name, &resolved.version, &resolved.flags)
            {
                debug!("{indent}{name} bootstrap via prebuilt artifact");
                self.mark_install(id, build_only);
                self.path.push(id);
                self.walk_deps(id, false, root, build_only, depth + 1)?;
                self.path.pop();
                return Ok(());
            }
            let chain = self.cycle_chain(id);
            self.push_failure(ResolveFailure::BootstrapImpossible {
                package: name,
                chain,
            });
            return Ok(());
        }

        if !is_forge_root
            && self
                .store
                .has_artifact(&name, &resolved.version, &resolved.flags)
        {
            debug!("{indent}{name} {} from artifact", resolved.version);
            self.mark_install(id, build_only);
            self.path.push(id);
            self.walk_deps(id, false, root, build_only, depth + 1)?;
            self.path.pop();
            return Ok(());
        }

        // No usable artifact: source build or nothing
        if !self.store.has_template(&name, &resolved.version) {
            self.push_failure(ResolveFailure::NoTemplate {
                package: name,
                version: resolved.version,
            });
            return Ok(());
        }

        debug!("{indent}{name} {} will be forged", resolved.version);
        self.mark_forge(id, build_only);
        self.path.push(id);
        if !self.params.ignore_build_deps {
            self.walk_deps(id, true, root, true, depth + 1)?;
        }
        if !is_forge_root {
            self.mark_install(id, build_only);
            self.walk_deps(id, false, root, build_only, depth + 1)?;
        }
        self.path.pop();
        Ok(())
    }

    fn walk_deps(
        &mut self,
        id: NodeId,
        build_deps: bool,
        root: NodeId,
        build_only: bool,
        depth: u32,
    ) -> Result<()> {
        let name = self.nodes.get(id).name.clone();
        let Ok(resolved) = self.nodes.resolve(id, self.store) else {
            return Ok(());
        };
        let Some(meta) = self.store.latest(&name) else {
            return Ok(());
        };
        let deps: Vec<DepSpec> = if build_deps {
            meta.build_depends.clone()
        } else {
            meta.depends.clone()
        };

        for dep in deps {
            // Conditional edges apply only under the dependent's final flags
            if let Some(cond) = &dep.condition {
                if resolved.flags.is_enabled(&cond.name) != cond.enabled {
                    continue;
                }
            }
            if self.store.latest(&dep.name).is_none() {
                self.missing.push(MissingInfo {
                    dependent: name.clone(),
                    dependency: dep,
                });
                continue;
            }
            let child = self.nodes.add_node(&dep.name, self.store)?;
            if !self
                .nodes
                .add_parent(child, Some(id), dep.clone(), name.clone(), self.store)
            {
                if let Err(failure) = self.nodes.resolve(child, self.store) {
                    self.push_failure(failure);
                }
                self.missing.push(MissingInfo {
                    dependent: name.clone(),
                    dependency: dep,
                });
                continue;
            }
            self.classify(child, root, build_only, depth)?;
        }
        Ok(())
    }

    fn mark_forge(&mut self, id: NodeId, build_only: bool) {
        self.forge.append(id, build_only);
        if !build_only {
            self.nodes.get_mut(id).forge_only = false;
        } else if !self.install.contains_runtime(id) {
            self.nodes.get_mut(id).forge_only = true;
        }
    }

    fn mark_install(&mut self, id: NodeId, build_only: bool) {
        self.install.append(id, build_only);
        if !build_only {
            self.nodes.get_mut(id).forge_only = false;
        }
    }

    /// Chain of names from the previous visit of `id` down to it again
    fn cycle_chain(&self, id: NodeId) -> Vec<String> {
        let start = self.path.iter().position(|n| *n == id).unwrap_or(0);
        let mut chain: Vec<String> = self.path[start..]
            .iter()
            .map(|n| self.nodes.get(*n).name.clone())
            .collect();
        chain.push(self.nodes.get(id).name.clone());
        chain
    }

    fn push_failure(&mut self, failure: ResolveFailure) {
        if !self.failures.contains(&failure) {
            self.failures.push(failure);
        }
    }

    fn snapshot(mut self) -> Report {
        let mut report = Report {
            missing: self.missing,
            failures: self.failures,
            ..Default::default()
        };
        for entry in self.forge.iter() {
            if let Ok(resolved) = self.nodes.resolve(entry.node, self.store) {
                // The node-level bit also reflects runtime appearances
                // recorded after the forge marking
                report.forge.push(ReportEntry {
                    name: self.nodes.get(entry.node).name.clone(),
                    version: resolved.version,
                    flags: resolved.flags,
                    build_only: self.nodes.get(entry.node).forge_only,
                });
            }
        }
        for entry in self.install.iter() {
            if let Ok(resolved) = self.nodes.resolve(entry.node, self.store) {
                report.install.push(ReportEntry {
                    name: self.nodes.get(entry.node).name.clone(),
                    version: resolved.version,
                    flags: resolved.flags,
                    build_only: entry.build_only,
                });
            }
        }
        report
    }
}
