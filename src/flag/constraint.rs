// src/flag/constraint.rs

//! Merging flag requirements contributed by every dependent of a package
//!
//! Each dependent contributes the required-flag set of its dependency
//! declaration. The merged result is conflict-free or the merge fails with
//! a structured error naming the flag and both contributors; a conflict is
//! never reported as an empty flag set.

use super::{Flag, FlagSet};
use crate::error::{Error, Result};

/// Merge the required flags of every contributor, then fill unmentioned
/// flags from the package's declared defaults.
///
/// `contributions` pairs a contributor label (used in conflict reports)
/// with that contributor's required flags for `package`.
pub fn merge_required_flags<'a>(
    package: &str,
    contributions: impl IntoIterator<Item = (&'a str, &'a FlagSet)>,
    defaults: &FlagSet,
) -> Result<FlagSet> {
    let mut merged = FlagSet::new();
    // Remember which contributor first set each flag, for conflict reports
    let mut sources: Vec<(String, String)> = Vec::new();

    for (label, required) in contributions {
        for flag in required.iter() {
            match merged.get(&flag.name) {
                None => {
                    merged.set(flag.clone());
                    sources.push((flag.name.clone(), label.to_string()));
                }
                Some(enabled) if enabled == flag.enabled => {}
                Some(enabled) => {
                    let first = sources
                        .iter()
                        .find(|(name, _)| name == &flag.name)
                        .map(|(_, src)| src.clone())
                        .unwrap_or_default();
                    // Report enabled-side contributor first
                    let (first, second) = if enabled {
                        (first, label.to_string())
                    } else {
                        (label.to_string(), first)
                    };
                    return Err(Error::FlagConflict {
                        package: package.to_string(),
                        flag: flag.name.clone(),
                        first,
                        second,
                    });
                }
            }
        }
    }

    for flag in defaults.iter() {
        if !merged.contains(&flag.name) {
            merged.set(flag.clone());
        }
    }

    Ok(merged)
}

/// Convenience for seeding a set from signed flag strings like `+ssl`
pub fn flagset_from_strs<'a>(items: impl IntoIterator<Item = &'a str>) -> Result<FlagSet> {
    let mut set = FlagSet::new();
    for item in items {
        set.insert(Flag::parse(item)?)?;
    }
    Ok(set)
}
