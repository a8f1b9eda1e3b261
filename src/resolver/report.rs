// src/resolver/report.rs

//! Resolution outcomes
//!
//! A run never aborts on the first problem; everything it could not
//! place is collected here so one pass reports all the blockers.

use super::node::NodeId;
use crate::depspec::DepSpec;
use crate::flag::FlagSet;
use serde_json::json;
use std::fmt;

/// A dependency edge that could not be followed
#[derive(Debug, Clone, PartialEq)]
pub struct MissingInfo {
    pub dependent: String,
    pub dependency: DepSpec,
}

impl fmt::Display for MissingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires {}", self.dependent, self.dependency)
    }
}

/// Why a node could not be given a usable classification
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveFailure {
    UnknownPackage {
        package: String,
    },
    FlagConflict {
        package: String,
        flag: String,
        first: String,
        second: String,
    },
    ConditionViolated {
        package: String,
        flag: String,
    },
    VersionUnsatisfiable {
        package: String,
        version: String,
        required_by: Vec<(String, String)>,
    },
    /// Source build is needed but no template exists
    NoTemplate {
        package: String,
        version: String,
    },
    /// Mutual build dependency with no prebuilt artifact to break it
    BootstrapImpossible {
        package: String,
        chain: Vec<String>,
    },
    /// An installed package names a dependent that does not depend on it
    InconsistentDatabase {
        package: String,
        dependent: String,
    },
    /// A build graph for this root could not be isolated
    BuildCycle {
        root: String,
        chain: Vec<String>,
    },
    Internal {
        package: String,
        reason: String,
    },
}

impl ResolveFailure {
    fn kind(&self) -> &'static str {
        match self {
            Self::UnknownPackage { .. } => "unknown-package",
            Self::FlagConflict { .. } => "flag-conflict",
            Self::ConditionViolated { .. } => "condition-violated",
            Self::VersionUnsatisfiable { .. } => "version-unsatisfiable",
            Self::NoTemplate { .. } => "no-template",
            Self::BootstrapImpossible { .. } => "bootstrap-impossible",
            Self::InconsistentDatabase { .. } => "inconsistent-database",
            Self::BuildCycle { .. } => "build-cycle",
            Self::Internal { .. } => "internal",
        }
    }
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPackage { package } => {
                write!(f, "no package named '{package}' in the repository")
            }
            Self::FlagConflict {
                package,
                flag,
                first,
                second,
            } => write!(
                f,
                "flag conflict on {package}: {first} requires {flag} enabled, {second} requires it disabled"
            ),
            Self::ConditionViolated { package, flag } => write!(
                f,
                "flag assignment for {package} violates its condition on {flag}"
            ),
            Self::VersionUnsatisfiable {
                package,
                version,
                required_by,
            } => {
                write!(f, "{package} {version} satisfies no common version range")?;
                for (label, bound) in required_by {
                    write!(f, "\n  {label} requires {bound}")?;
                }
                Ok(())
            }
            Self::NoTemplate { package, version } => {
                write!(f, "{package} {version} must be forged but has no template")
            }
            Self::BootstrapImpossible { package, chain } => write!(
                f,
                "cannot bootstrap {package}: build cycle {} and no prebuilt artifact",
                chain.join(" -> ")
            ),
            Self::InconsistentDatabase { package, dependent } => write!(
                f,
                "install database lists {dependent} as depending on {package}, but its recorded dependencies do not mention it"
            ),
            Self::BuildCycle { root, chain } => write!(
                f,
                "build graph for {root} contains a cycle: {}",
                chain.join(" -> ")
            ),
            Self::Internal { package, reason } => {
                write!(f, "internal resolution error for {package}: {reason}")
            }
        }
    }
}

/// Membership of one node in a classification set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetEntry {
    pub node: NodeId,
    pub build_only: bool,
}

/// Insertion-ordered node set with build-only tracking
///
/// A node appears at most once. A build-only member is upgraded in
/// place when the same node later appears for runtime use; it never
/// moves, so iteration order stays the order of first appearance.
#[derive(Debug, Default)]
pub struct ClassSet {
    entries: Vec<SetEntry>,
}

impl ClassSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node`, or widen an existing build-only membership
    pub fn append(&mut self, node: NodeId, build_only: bool) {
        for entry in &mut self.entries {
            if entry.node == node {
                if !build_only {
                    entry.build_only = false;
                }
                return;
            }
        }
        self.entries.push(SetEntry { node, build_only });
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.iter().any(|e| e.node == node)
    }

    /// Whether `node` is present for runtime use, not just for a build
    pub fn contains_runtime(&self, node: NodeId) -> bool {
        self.entries
            .iter()
            .any(|e| e.node == node && !e.build_only)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SetEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One package instance in the final report, detached from the node table
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub name: String,
    pub version: String,
    pub flags: FlagSet,
    pub build_only: bool,
}

/// Snapshot of a completed resolution run
#[derive(Debug, Default)]
pub struct Report {
    pub forge: Vec<ReportEntry>,
    pub install: Vec<ReportEntry>,
    pub missing: Vec<MissingInfo>,
    pub failures: Vec<ResolveFailure>,
}

impl Report {
    /// A clean report has everything placed and nothing unresolvable
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.failures.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let entry = |e: &ReportEntry| {
            json!({
                "name": e.name,
                "version": e.version,
                "flags": e.flags.to_string(),
                "build_only": e.build_only,
            })
        };
        json!({
            "forge": self.forge.iter().map(entry).collect::<Vec<_>>(),
            "install": self.install.iter().map(entry).collect::<Vec<_>>(),
            "missing": self
                .missing
                .iter()
                .map(|m| {
                    json!({
                        "dependent": m.dependent,
                        "dependency": m.dependency.to_string(),
                    })
                })
                .collect::<Vec<_>>(),
            "failures": self
                .failures
                .iter()
                .map(|c| json!({ "kind": c.kind(), "message": c.to_string() }))
                .collect::<Vec<_>>(),
        })
    }
}
