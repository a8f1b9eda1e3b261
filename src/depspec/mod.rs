// src/depspec/mod.rs

//! Dependency declaration grammar
//!
//! A dependency string names a package with optional version bounds, an
//! optional enclosing flag condition, and an optional required-flag group:
//!
//! ```text
//! dep      := [ '[' condition ']' ] name [ bound [ bound ] ] [ '(' flagspec {',' flagspec} ')' ]
//! condition := ('+'|'-') name
//! bound    := ('>='|'<='|'==') version
//! flagspec := ('+'|'-') name
//! ```
//!
//! Examples: `libssl`, `[+tls]libssl>=1.1(+asm)`, `zlib>=1.2<=1.3`.
//!
//! Inputs are stripped of spaces before parsing; the grammar itself carries
//! no whitespace. Version tokens are compared as raw strings, left to
//! right, with no numeric awareness: `>=9.0` rejects `"10.0"`. Calling
//! code must choose version tokens with that in mind.

use crate::error::{Error, Result};
use crate::flag::{Flag, FlagSet};
use std::fmt;
use std::str::FromStr;

/// Characters that terminate a name or version token
const TOKEN_TERMINATORS: &[char] = &['<', '>', '=', '(', ')'];

/// The comparison a version bound applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// `>=` — candidate must sort at or after the bound
    AtLeast,
    /// `<=` — candidate must sort at or before the bound
    AtMost,
    /// `==` — candidate must equal the bound exactly
    Exact,
}

impl BoundKind {
    fn as_str(self) -> &'static str {
        match self {
            BoundKind::AtLeast => ">=",
            BoundKind::AtMost => "<=",
            BoundKind::Exact => "==",
        }
    }
}

/// One version bound
///
/// Comparison is lexicographic on the raw version token; there is no
/// semantic-version parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBound {
    pub kind: BoundKind,
    pub version: String,
}

impl VersionBound {
    pub fn new(kind: BoundKind, version: impl Into<String>) -> Self {
        Self {
            kind,
            version: version.into(),
        }
    }

    /// Whether `candidate` satisfies this bound (raw string comparison)
    pub fn accepts(&self, candidate: &str) -> bool {
        match self.kind {
            BoundKind::AtLeast => candidate >= self.version.as_str(),
            BoundKind::AtMost => candidate <= self.version.as_str(),
            BoundKind::Exact => candidate == self.version,
        }
    }
}

impl fmt::Display for VersionBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.as_str(), self.version)
    }
}

/// One parsed dependency declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepSpec {
    /// Flag condition on the dependent: the edge only applies when the
    /// dependent's resolved state of this flag matches
    pub condition: Option<Flag>,
    /// Target package name
    pub name: String,
    /// `>=` or `==` bound
    pub lower: Option<VersionBound>,
    /// `<=` bound
    pub upper: Option<VersionBound>,
    /// Flag states the dependent requires of the target
    pub required_flags: FlagSet,
}

impl DepSpec {
    /// A bare dependency on `name` with no bounds, condition, or flags
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            condition: None,
            name: name.into(),
            lower: None,
            upper: None,
            required_flags: FlagSet::new(),
        }
    }

    /// Parse a dependency declaration, stripping spaces first
    pub fn parse(input: &str) -> Result<Self> {
        let stripped: String;
        let text = if input.contains(' ') {
            stripped = input.replace(' ', "");
            stripped.as_str()
        } else {
            input
        };

        let cur = Cursor::new(text);
        let (condition, cur) = parse_condition(cur)?;
        let (name, cur) = parse_name(cur)?;
        let (lower, upper, cur) = parse_bounds(cur)?;
        let (required_flags, cur) = parse_flag_group(cur)?;

        if !cur.at_end() {
            return Err(cur.error("trailing input after dependency"));
        }

        Ok(Self {
            condition,
            name,
            lower,
            upper,
            required_flags,
        })
    }

    /// Whether `candidate` satisfies every bound on this declaration
    pub fn accepts_version(&self, candidate: &str) -> bool {
        self.lower.iter().all(|b| b.accepts(candidate))
            && self.upper.iter().all(|b| b.accepts(candidate))
    }
}

/// AND of every declaration's bound acceptance; zero declarations (or zero
/// bounds) accept any version.
pub fn version_acceptable<'a>(
    candidate: &str,
    specs: impl IntoIterator<Item = &'a DepSpec>,
) -> bool {
    specs.into_iter().all(|spec| spec.accepts_version(candidate))
}

impl fmt::Display for DepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cond) = &self.condition {
            write!(f, "[{cond}]")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(lower) = &self.lower {
            write!(f, "{lower}")?;
        }
        if let Some(upper) = &self.upper {
            write!(f, "{upper}")?;
        }
        if !self.required_flags.is_empty() {
            write!(f, "({})", self.required_flags)?;
        }
        Ok(())
    }
}

impl FromStr for DepSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DepSpec::parse(s)
    }
}

/// An immutable parse position over the stripped input
///
/// Every parse function takes a cursor by value and returns the new cursor
/// alongside its result; there is no shared mutable state.
#[derive(Debug, Clone, Copy)]
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(self, n: usize) -> Self {
        Self {
            input: self.input,
            pos: self.pos + n,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Take characters until a terminator, returning the token
    fn take_token(self) -> (&'a str, Self) {
        let end = self
            .rest()
            .find(TOKEN_TERMINATORS)
            .map(|off| self.pos + off)
            .unwrap_or(self.input.len());
        (&self.input[self.pos..end], self.advance(end - self.pos))
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::parse(self.input, self.pos, reason)
    }
}

fn parse_condition(cur: Cursor<'_>) -> Result<(Option<Flag>, Cursor<'_>)> {
    if cur.peek() != Some('[') {
        return Ok((None, cur));
    }
    let cur = cur.advance(1);
    let close = cur
        .rest()
        .find(']')
        .ok_or_else(|| cur.error("unterminated flag condition, expected ']'"))?;
    let flag = Flag::parse(&cur.rest()[..close]).map_err(|_| {
        cur.error("flag condition must be a signed flag like '+ssl'")
    })?;
    Ok((Some(flag), cur.advance(close + 1)))
}

fn parse_name(cur: Cursor<'_>) -> Result<(String, Cursor<'_>)> {
    let (token, next) = cur.take_token();
    if token.is_empty() {
        return Err(cur.error("missing package name"));
    }
    Ok((token.to_string(), next))
}

fn parse_bounds(
    cur: Cursor<'_>,
) -> Result<(Option<VersionBound>, Option<VersionBound>, Cursor<'_>)> {
    let mut lower = None;
    let mut upper = None;
    let mut cur = cur;

    for i in 0..2 {
        let Some((bound, next)) = parse_bound(cur)? else {
            break;
        };
        if i == 1 && matches!(lower, Some(VersionBound { kind: BoundKind::Exact, .. })) {
            return Err(cur.error("no second bound allowed after '=='"));
        }
        let slot = match bound.kind {
            BoundKind::AtLeast | BoundKind::Exact => &mut lower,
            BoundKind::AtMost => &mut upper,
        };
        if slot.is_some() {
            return Err(cur.error("duplicate version bound"));
        }
        *slot = Some(bound);
        cur = next;
    }

    Ok((lower, upper, cur))
}

fn parse_bound(cur: Cursor<'_>) -> Result<Option<(VersionBound, Cursor<'_>)>> {
    let kind = match cur.peek() {
        Some('>') => BoundKind::AtLeast,
        Some('<') => BoundKind::AtMost,
        Some('=') => BoundKind::Exact,
        _ => return Ok(None),
    };
    if !cur.rest().starts_with(kind.as_str()) {
        return Err(cur.error(format!("malformed bound operator, expected '{}'", kind.as_str())));
    }
    let cur = cur.advance(2);
    let (token, next) = cur.take_token();
    if token.is_empty() {
        return Err(cur.error("missing version after bound operator"));
    }
    Ok(Some((VersionBound::new(kind, token), next)))
}

fn parse_flag_group(cur: Cursor<'_>) -> Result<(FlagSet, Cursor<'_>)> {
    if cur.peek() != Some('(') {
        return Ok((FlagSet::new(), cur));
    }
    let mut cur = cur.advance(1);
    let mut flags = FlagSet::new();

    loop {
        let end = cur
            .rest()
            .find([',', ')'])
            .ok_or_else(|| cur.error("unterminated flag group, expected ')'"))?;
        let item = &cur.rest()[..end];
        if item.is_empty() {
            return Err(cur.error("empty flag entry in flag group"));
        }
        let flag =
            Flag::parse(item).map_err(|_| cur.error("flag must be signed, like '+ssl' or '-ssl'"))?;
        flags.insert(flag)?;
        let sep = cur.rest().as_bytes()[end];
        cur = cur.advance(end + 1);
        if sep == b')' {
            break;
        }
    }

    Ok((flags, cur))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_name() {
        let dep = DepSpec::parse("zlib").unwrap();
        assert_eq!(dep.name, "zlib");
        assert!(dep.condition.is_none());
        assert!(dep.lower.is_none());
        assert!(dep.upper.is_none());
        assert!(dep.required_flags.is_empty());
    }

    #[test]
    fn test_parse_lower_bound() {
        let dep = DepSpec::parse("zlib>=1.2").unwrap();
        let lower = dep.lower.unwrap();
        assert_eq!(lower.kind, BoundKind::AtLeast);
        assert_eq!(lower.version, "1.2");
    }

    #[test]
    fn test_parse_both_bounds() {
        let dep = DepSpec::parse("zlib>=1.2<=1.3").unwrap();
        assert_eq!(dep.lower.unwrap().version, "1.2");
        assert_eq!(dep.upper.unwrap().version, "1.3");
    }

    #[test]
    fn test_parse_exact_bound() {
        let dep = DepSpec::parse("zlib==1.2.13").unwrap();
        let lower = dep.lower.unwrap();
        assert_eq!(lower.kind, BoundKind::Exact);
        assert_eq!(lower.version, "1.2.13");
    }

    #[test]
    fn test_second_bound_after_exact_rejected() {
        assert!(DepSpec::parse("zlib==1.2<=1.3").is_err());
    }

    #[test]
    fn test_duplicate_bound_rejected() {
        assert!(DepSpec::parse("zlib>=1.2>=1.3").is_err());
    }

    #[test]
    fn test_parse_condition() {
        let dep = DepSpec::parse("[+tls]libssl>=1.1").unwrap();
        let cond = dep.condition.unwrap();
        assert_eq!(cond.name, "tls");
        assert!(cond.enabled);
        assert_eq!(dep.name, "libssl");
    }

    #[test]
    fn test_parse_negative_condition() {
        let dep = DepSpec::parse("[-minimal]ncurses").unwrap();
        let cond = dep.condition.unwrap();
        assert!(!cond.enabled);
    }

    #[test]
    fn test_parse_flag_group() {
        let dep = DepSpec::parse("libssl(+asm,-docs)").unwrap();
        assert_eq!(dep.required_flags.get("asm"), Some(true));
        assert_eq!(dep.required_flags.get("docs"), Some(false));
    }

    #[test]
    fn test_empty_flag_group_rejected() {
        assert!(DepSpec::parse("libssl()").is_err());
    }

    #[test]
    fn test_unsigned_flag_rejected() {
        assert!(DepSpec::parse("libssl(asm)").is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(DepSpec::parse("").is_err());
        assert!(DepSpec::parse(">=1.0").is_err());
        assert!(DepSpec::parse("(+ssl)").is_err());
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(DepSpec::parse("zlib(+ssl)x").is_err());
        assert!(DepSpec::parse("zlib>=").is_err());
    }

    #[test]
    fn test_malformed_operator_rejected() {
        assert!(DepSpec::parse("zlib>1.0").is_err());
        assert!(DepSpec::parse("zlib=1.0").is_err());
    }

    #[test]
    fn test_spaces_stripped() {
        let dep = DepSpec::parse(" zlib >= 1.2 ( +ssl ) ").unwrap();
        assert_eq!(dep.name, "zlib");
        assert_eq!(dep.lower.unwrap().version, "1.2");
        assert_eq!(dep.required_flags.get("ssl"), Some(true));
    }

    #[test]
    fn test_display_roundtrip() {
        for s in [
            "zlib",
            "zlib>=1.2",
            "zlib>=1.2<=1.3",
            "zlib==1.2.13",
            "[+tls]libssl>=1.1(+asm)",
            "libssl(-docs,+tls)",
        ] {
            let dep = DepSpec::parse(s).unwrap();
            assert_eq!(dep.to_string(), s);
            assert_eq!(DepSpec::parse(&dep.to_string()).unwrap(), dep);
        }
    }

    #[test]
    fn test_accepts_version_lexicographic() {
        let dep = DepSpec::parse("zlib>=1.0").unwrap();
        assert!(dep.accepts_version("1.5"));
        assert!(!dep.accepts_version("0.9"));

        // Documented quirk: raw string comparison, so "10.0" < "9.0"
        let dep = DepSpec::parse("gcc>=9.0").unwrap();
        assert!(!dep.accepts_version("10.0"));
        assert!(dep.accepts_version("9.1"));
    }

    #[test]
    fn test_accepts_version_range() {
        let dep = DepSpec::parse("zlib>=1.2<=1.3").unwrap();
        assert!(dep.accepts_version("1.2"));
        assert!(dep.accepts_version("1.25"));
        assert!(!dep.accepts_version("1.4"));
        assert!(!dep.accepts_version("1.1"));
    }

    #[test]
    fn test_version_acceptable_aggregate() {
        let a = DepSpec::parse("zlib>=1.2").unwrap();
        let b = DepSpec::parse("zlib<=1.3").unwrap();
        assert!(version_acceptable("1.25", [&a, &b]));
        assert!(!version_acceptable("1.4", [&a, &b]));
        assert!(version_acceptable("anything", std::iter::empty::<&DepSpec>()));
    }

    #[test]
    fn test_no_bounds_accepts_anything() {
        let dep = DepSpec::parse("zlib").unwrap();
        assert!(dep.accepts_version("0.0.1"));
        assert!(dep.accepts_version("99"));
    }
}
