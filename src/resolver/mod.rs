// src/resolver/mod.rs

//! Dependency resolution
//!
//! One resolution run classifies a set of requested packages and every
//! package they pull in into two accumulating sets: the forge set
//! (build from source) and the install set (unpack a prebuilt
//! artifact). The run is synchronous, single-threaded recursion over a
//! repository snapshot; problems accumulate as diagnostics instead of
//! aborting the walk, so one pass surfaces every blocker.
//!
//! [`partition`] then turns a finished report into per-root build
//! graphs plus a residual install graph for execution.

mod engine;
mod node;
mod partition;
mod report;

pub use engine::{Resolution, ResolveParams};
pub use node::{Constraint, NodeId, NodeTable, PackageNode, Resolved};
pub use partition::{partition, BuildGraph, Partition};
pub use report::{ClassSet, MissingInfo, Report, ReportEntry, ResolveFailure, SetEntry};
