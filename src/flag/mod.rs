// src/flag/mod.rs

//! Build-time flag handling
//!
//! Flags are named boolean toggles on a package, written with a sign prefix:
//! `+ssl` requests the flag enabled, `-debug` requests it disabled. A
//! [`FlagSet`] holds at most one state per name; merging opposite states is
//! rejected so a conflict can never masquerade as "no flags".

pub mod constraint;
pub mod expr;

pub use constraint::merge_required_flags;
pub use expr::{BoolOp, FlagExpr};

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A single named boolean flag with its requested state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Flag {
    pub name: String,
    pub enabled: bool,
}

impl Flag {
    /// Create a new flag
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
        }
    }

    /// Parse a signed flag reference like `+ssl` or `-debug`
    pub fn parse(s: &str) -> Result<Self> {
        let (enabled, name) = match s.as_bytes().first() {
            Some(b'+') => (true, &s[1..]),
            Some(b'-') => (false, &s[1..]),
            _ => return Err(Error::parse(s, 0, "expected '+' or '-' sign")),
        };
        if name.is_empty() {
            return Err(Error::parse(s, 1, "missing flag name after sign"));
        }
        Ok(Self::new(name, enabled))
    }

    /// The sign prefix for this flag's state
    pub fn sign(&self) -> char {
        if self.enabled { '+' } else { '-' }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sign(), self.name)
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Flag::parse(s)
    }
}

/// A set of flags, unique by name
///
/// Kept sorted by name so Display output and iteration order are canonical
/// regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlagSet {
    items: Vec<Flag>,
}

impl FlagSet {
    /// Create an empty flag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from flags, rejecting opposite duplicates
    pub fn from_flags(flags: impl IntoIterator<Item = Flag>) -> Result<Self> {
        let mut set = Self::new();
        for flag in flags {
            set.insert(flag)?;
        }
        Ok(set)
    }

    /// Insert a flag
    ///
    /// Same-state duplicates are ignored; an opposite-state duplicate is an
    /// error naming the flag.
    pub fn insert(&mut self, flag: Flag) -> Result<()> {
        match self.items.binary_search_by(|f| f.name.cmp(&flag.name)) {
            Ok(idx) => {
                if self.items[idx].enabled != flag.enabled {
                    return Err(Error::FlagConflict {
                        package: String::new(),
                        first: self.items[idx].to_string(),
                        second: flag.to_string(),
                        flag: flag.name,
                    });
                }
                Ok(())
            }
            Err(idx) => {
                self.items.insert(idx, flag);
                Ok(())
            }
        }
    }

    /// Insert a flag, overwriting any existing state for that name
    pub fn set(&mut self, flag: Flag) {
        match self.items.binary_search_by(|f| f.name.cmp(&flag.name)) {
            Ok(idx) => self.items[idx] = flag,
            Err(idx) => self.items.insert(idx, flag),
        }
    }

    /// Look up the recorded state for a flag name
    pub fn get(&self, name: &str) -> Option<bool> {
        self.items
            .binary_search_by(|f| f.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.items[idx].enabled)
    }

    /// Whether a flag is enabled; absent flags count as disabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }

    /// Whether the set records any state for this name
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate flags in name order
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for FlagSet {
    /// Canonical form: comma-separated signed flags in name order
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.items.iter().map(|flag| flag.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromIterator<Flag> for FlagSet {
    /// Collect flags, last state wins for duplicate names
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut set = Self::new();
        for flag in iter {
            set.set(flag);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Flag tests ===

    #[test]
    fn test_flag_parse_enabled() {
        let flag = Flag::parse("+ssl").unwrap();
        assert_eq!(flag.name, "ssl");
        assert!(flag.enabled);
    }

    #[test]
    fn test_flag_parse_disabled() {
        let flag = Flag::parse("-debug").unwrap();
        assert_eq!(flag.name, "debug");
        assert!(!flag.enabled);
    }

    #[test]
    fn test_flag_parse_missing_sign() {
        assert!(Flag::parse("ssl").is_err());
        assert!(Flag::parse("").is_err());
    }

    #[test]
    fn test_flag_parse_missing_name() {
        assert!(Flag::parse("+").is_err());
        assert!(Flag::parse("-").is_err());
    }

    #[test]
    fn test_flag_display_roundtrip() {
        for s in ["+ssl", "-debug"] {
            assert_eq!(Flag::parse(s).unwrap().to_string(), s);
        }
    }

    // === FlagSet tests ===

    #[test]
    fn test_flagset_insert_and_lookup() {
        let mut set = FlagSet::new();
        set.insert(Flag::new("ssl", true)).unwrap();
        set.insert(Flag::new("debug", false)).unwrap();

        assert_eq!(set.get("ssl"), Some(true));
        assert_eq!(set.get("debug"), Some(false));
        assert_eq!(set.get("missing"), None);
    }

    #[test]
    fn test_flagset_absent_is_disabled() {
        let set = FlagSet::new();
        assert!(!set.is_enabled("anything"));
    }

    #[test]
    fn test_flagset_same_state_duplicate_ok() {
        let mut set = FlagSet::new();
        set.insert(Flag::new("ssl", true)).unwrap();
        set.insert(Flag::new("ssl", true)).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_flagset_opposite_state_rejected() {
        let mut set = FlagSet::new();
        set.insert(Flag::new("ssl", true)).unwrap();
        let err = set.insert(Flag::new("ssl", false)).unwrap_err();
        match err {
            Error::FlagConflict { flag, .. } => assert_eq!(flag, "ssl"),
            other => panic!("expected FlagConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_flagset_display_canonical_order() {
        let mut set = FlagSet::new();
        set.insert(Flag::new("zlib", true)).unwrap();
        set.insert(Flag::new("acl", false)).unwrap();
        set.insert(Flag::new("ssl", true)).unwrap();
        assert_eq!(set.to_string(), "-acl,+ssl,+zlib");
    }

    #[test]
    fn test_flagset_set_overwrites() {
        let mut set = FlagSet::new();
        set.insert(Flag::new("ssl", true)).unwrap();
        set.set(Flag::new("ssl", false));
        assert_eq!(set.get("ssl"), Some(false));
        assert_eq!(set.len(), 1);
    }
}
