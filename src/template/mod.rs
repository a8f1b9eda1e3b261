// src/template/mod.rs

//! Build template file format definitions
//!
//! Templates are TOML files that describe how to build a package from
//! source: identity, declared flag defaults, per-flag enable conditions,
//! and dependency declarations in the depspec grammar.
//!
//! ```toml
//! depends = ["zlib>=1.2"]
//! build_depends = ["perl"]
//!
//! [package]
//! name = "libssl"
//! version = "3.2"
//!
//! [flags]
//! default = ["+asm", "-docs"]
//!
//! [flags.conditions]
//! ktls = "[+asm&&-fips]"
//! ```

use crate::depspec::DepSpec;
use crate::error::{Error, Result};
use crate::flag::constraint::flagset_from_strs;
use crate::flag::FlagExpr;
use crate::repository::PackageMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A complete build template for one package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Package identity
    pub package: PackageSection,

    /// Declared flags (optional)
    #[serde(default)]
    pub flags: FlagsSection,

    /// Runtime dependency declarations, depspec grammar
    #[serde(default)]
    pub depends: Vec<String>,

    /// Build-only dependency declarations, depspec grammar
    #[serde(default)]
    pub build_depends: Vec<String>,
}

/// Package identity section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Declared flag defaults and enable conditions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagsSection {
    /// Default states as signed flag strings, e.g. `"+asm"`
    #[serde(default)]
    pub default: Vec<String>,

    /// Per-flag enable conditions as flag expressions; a flag may only be
    /// enabled when its condition verifies against the resolved set.
    /// BTreeMap so iteration order is stable.
    #[serde(default)]
    pub conditions: BTreeMap<String, String>,
}

impl Template {
    /// Load and parse a template from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Template {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Validate the embedded depspec and flag-expression strings and
    /// convert into the resolver's metadata view.
    pub fn into_metadata(self) -> Result<PackageMetadata> {
        let default_flags = flagset_from_strs(self.flags.default.iter().map(String::as_str))?;

        let mut flag_conditions = Vec::with_capacity(self.flags.conditions.len());
        for (name, expr) in &self.flags.conditions {
            flag_conditions.push((name.clone(), FlagExpr::parse(expr)?));
        }

        Ok(PackageMetadata {
            name: self.package.name,
            version: self.package.version,
            description: self.package.description,
            default_flags,
            flag_conditions,
            depends: parse_deps(&self.depends)?,
            build_depends: parse_deps(&self.build_depends)?,
        })
    }
}

fn parse_deps(raw: &[String]) -> Result<Vec<DepSpec>> {
    raw.iter().map(|s| DepSpec::parse(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
depends = ["zlib>=1.2"]
build_depends = ["perl"]

[package]
name = "libssl"
version = "3.2"
description = "TLS library"

[flags]
default = ["+asm", "-docs"]

[flags.conditions]
ktls = "[+asm]"
"#;

    #[test]
    fn test_parse_full_template() {
        let template: Template = toml::from_str(SAMPLE).unwrap();
        assert_eq!(template.package.name, "libssl");
        assert_eq!(template.package.version, "3.2");
        assert_eq!(template.depends, vec!["zlib>=1.2"]);
        assert_eq!(template.build_depends, vec!["perl"]);
    }

    #[test]
    fn test_into_metadata() {
        let template: Template = toml::from_str(SAMPLE).unwrap();
        let meta = template.into_metadata().unwrap();
        assert_eq!(meta.name, "libssl");
        assert_eq!(meta.default_flags.get("asm"), Some(true));
        assert_eq!(meta.default_flags.get("docs"), Some(false));
        assert_eq!(meta.flag_conditions.len(), 1);
        assert_eq!(meta.depends[0].name, "zlib");
        assert_eq!(meta.build_depends[0].name, "perl");
    }

    #[test]
    fn test_minimal_template() {
        let template: Template = toml::from_str(
            r#"
[package]
name = "zlib"
version = "1.3"
"#,
        )
        .unwrap();
        let meta = template.into_metadata().unwrap();
        assert!(meta.default_flags.is_empty());
        assert!(meta.depends.is_empty());
    }

    #[test]
    fn test_bad_depspec_rejected() {
        let template: Template = toml::from_str(
            r#"
depends = ["libfoo()"]

[package]
name = "zlib"
version = "1.3"
"#,
        )
        .unwrap();
        assert!(template.into_metadata().is_err());
    }

    #[test]
    fn test_bad_condition_rejected() {
        let template: Template = toml::from_str(
            r#"
[package]
name = "zlib"
version = "1.3"

[flags.conditions]
broken = "ssl"
"#,
        )
        .unwrap();
        assert!(template.into_metadata().is_err());
    }
}
