// src/resolver/node.rs

//! Resolution-run node table
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; constraints
//! hold contributor ids, never references, so the graph can be cloned or
//! inspected without aliasing concerns. Nodes exist for the duration of
//! one resolution run only.

use super::report::ResolveFailure;
use crate::depspec::{DepSpec, version_acceptable};
use crate::error::{Error, Result};
use crate::flag::{FlagSet, merge_required_flags};
use crate::repository::RepositoryStore;
use std::collections::HashMap;

/// Stable handle to a node within one resolution run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// One contribution to a node's requirements
///
/// `contributor` is `None` for externally injected reasons such as
/// operator flag overrides.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub contributor: Option<NodeId>,
    pub reason: DepSpec,
    /// Human-readable source, used in conflict reports
    pub label: String,
}

/// Derived values for a node once its constraints are reconciled
#[derive(Debug, Clone)]
pub struct Resolved {
    pub version: String,
    pub flags: FlagSet,
}

/// One candidate package instance inside a resolution run
#[derive(Debug)]
pub struct PackageNode {
    pub name: String,
    constraints: Vec<Constraint>,
    pub is_reinstall: bool,
    /// Whether every appearance of this node so far has been build-only
    pub forge_only: bool,
    /// Cached derived values must be recomputed after a constraint change
    dirty: bool,
    cached: Option<Resolved>,
}

impl PackageNode {
    fn new(name: String) -> Self {
        Self {
            name,
            constraints: Vec::new(),
            is_reinstall: false,
            forge_only: false,
            dirty: true,
            cached: None,
        }
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

/// Arena of nodes for one resolution run, deduplicated by package name
#[derive(Debug, Default)]
pub struct NodeTable {
    nodes: Vec<PackageNode>,
    index: HashMap<String, NodeId>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> &PackageNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut PackageNode {
        &mut self.nodes[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up or create the node for `name`, seeding operator flag
    /// overrides as an externally injected constraint.
    pub fn add_node<S: RepositoryStore>(&mut self, name: &str, store: &S) -> Result<NodeId> {
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }
        let id = NodeId(self.nodes.len());
        let mut node = PackageNode::new(name.to_string());

        let overrides = store.flag_overrides(name)?;
        if !overrides.is_empty() {
            let mut reason = DepSpec::bare(name);
            reason.required_flags = overrides;
            node.constraints.push(Constraint {
                contributor: None,
                reason,
                label: "flag overrides".to_string(),
            });
        }

        self.nodes.push(node);
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Append a constraint from `parent` unless it already contributes.
    ///
    /// Returns whether the node still has a valid resolution afterwards.
    /// `false` means this edge is unsatisfiable given existing
    /// constraints, not that the whole run failed.
    pub fn add_parent<S: RepositoryStore>(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        reason: DepSpec,
        label: String,
        store: &S,
    ) -> bool {
        let already = parent.is_some()
            && self.nodes[id.0]
                .constraints
                .iter()
                .any(|c| c.contributor == parent);
        if !already {
            self.nodes[id.0].constraints.push(Constraint {
                contributor: parent,
                reason,
                label,
            });
            self.nodes[id.0].dirty = true;
        }
        self.resolve(id, store).is_ok()
    }

    /// Drop every constraint contributed by `parent`
    pub fn remove_parent(&mut self, id: NodeId, parent: NodeId) {
        let node = &mut self.nodes[id.0];
        let before = node.constraints.len();
        node.constraints
            .retain(|c| c.contributor != Some(parent));
        if node.constraints.len() != before {
            node.dirty = true;
        }
    }

    /// Reconcile the node's constraints into a concrete version and flag
    /// assignment, recomputing only when the constraint list changed.
    pub fn resolve<S: RepositoryStore>(
        &mut self,
        id: NodeId,
        store: &S,
    ) -> std::result::Result<Resolved, ResolveFailure> {
        if !self.nodes[id.0].dirty {
            if let Some(cached) = &self.nodes[id.0].cached {
                return Ok(cached.clone());
            }
        }

        let node = &self.nodes[id.0];
        let Some(meta) = store.latest(&node.name) else {
            return Err(ResolveFailure::UnknownPackage {
                package: node.name.clone(),
            });
        };

        let contributions = node
            .constraints
            .iter()
            .map(|c| (c.label.as_str(), &c.reason.required_flags));
        let flags = match merge_required_flags(&node.name, contributions, &meta.default_flags) {
            Ok(flags) => flags,
            Err(Error::FlagConflict {
                package,
                flag,
                first,
                second,
            }) => {
                return Err(ResolveFailure::FlagConflict {
                    package,
                    flag,
                    first,
                    second,
                });
            }
            Err(e) => {
                return Err(ResolveFailure::Internal {
                    package: node.name.clone(),
                    reason: e.to_string(),
                });
            }
        };

        if let Some(flag) = meta.violated_condition(&flags) {
            return Err(ResolveFailure::ConditionViolated {
                package: node.name.clone(),
                flag: flag.to_string(),
            });
        }

        // The store offers one candidate per name; it resolves only if it
        // satisfies the AND of every contributed bound.
        if !version_acceptable(&meta.version, node.constraints.iter().map(|c| &c.reason)) {
            return Err(ResolveFailure::VersionUnsatisfiable {
                package: node.name.clone(),
                version: meta.version.clone(),
                required_by: node
                    .constraints
                    .iter()
                    .filter(|c| c.reason.lower.is_some() || c.reason.upper.is_some())
                    .map(|c| (c.label.clone(), c.reason.to_string()))
                    .collect(),
            });
        }

        let resolved = Resolved {
            version: meta.version.clone(),
            flags,
        };
        let node = &mut self.nodes[id.0];
        node.cached = Some(resolved.clone());
        node.dirty = false;
        Ok(resolved)
    }
}
