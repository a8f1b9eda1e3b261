// src/flag/expr.rs

//! Boolean expressions over flags
//!
//! Grammar (inputs carry no whitespace):
//!
//! ```text
//! flagref  := ('+'|'-') name
//! expr     := flagref | '[' exprlist ']'
//! exprlist := expr [ ('&&'|'||') exprlist ]
//! ```
//!
//! Evaluation is strictly left to right: `&&` and `||` bind equally and
//! there is no precedence, so `+a||+b&&+c` means `((a || b) && c)`.
//! Existing metadata relies on this literal chaining; do not introduce
//! conventional precedence. Flags absent from the assignment evaluate as
//! disabled.

use super::{Flag, FlagSet};
use crate::error::{Error, Result};
use std::fmt;

/// Binary boolean operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    fn as_str(self) -> &'static str {
        match self {
            BoolOp::And => "&&",
            BoolOp::Or => "||",
        }
    }
}

/// One operand in an expression chain
#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    /// A signed flag reference
    Ref(Flag),
    /// A bracketed sub-expression
    Group(Box<FlagExpr>),
}

/// A parsed flag expression: a left-to-right chain of terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagExpr {
    first: Term,
    rest: Vec<(BoolOp, Term)>,
}

impl FlagExpr {
    /// Parse an expression, consuming the entire input
    pub fn parse(input: &str) -> Result<Self> {
        let (expr, pos) = parse_exprlist(input, 0)?;
        if pos != input.len() {
            return Err(Error::parse(input, pos, "trailing input after expression"));
        }
        Ok(expr)
    }

    /// Evaluate against a flag assignment
    ///
    /// Short-circuits per operator: a false chain skips further `&&`
    /// operands, a true chain skips further `||` operands.
    pub fn verify(&self, flags: &FlagSet) -> bool {
        let mut value = eval_term(&self.first, flags);
        for (op, term) in &self.rest {
            match op {
                BoolOp::And => {
                    if value {
                        value = eval_term(term, flags);
                    }
                }
                BoolOp::Or => {
                    if !value {
                        value = eval_term(term, flags);
                    }
                }
            }
        }
        value
    }
}

fn eval_term(term: &Term, flags: &FlagSet) -> bool {
    match term {
        Term::Ref(flag) => flag.enabled == flags.is_enabled(&flag.name),
        Term::Group(inner) => inner.verify(flags),
    }
}

/// Parse an exprlist starting at `pos`; returns the expression and the
/// position one past its end.
fn parse_exprlist(input: &str, pos: usize) -> Result<(FlagExpr, usize)> {
    let (first, mut pos) = parse_term(input, pos)?;
    let mut rest = Vec::new();

    loop {
        let tail = &input[pos..];
        let op = if tail.starts_with("&&") {
            BoolOp::And
        } else if tail.starts_with("||") {
            BoolOp::Or
        } else {
            break;
        };
        let (term, next) = parse_term(input, pos + 2)?;
        rest.push((op, term));
        pos = next;
    }

    Ok((FlagExpr { first, rest }, pos))
}

fn parse_term(input: &str, pos: usize) -> Result<(Term, usize)> {
    match input[pos..].as_bytes().first() {
        Some(b'[') => {
            let (inner, after) = parse_exprlist(input, pos + 1)?;
            if input[after..].as_bytes().first() != Some(&b']') {
                return Err(Error::parse(input, after, "expected ']'"));
            }
            Ok((Term::Group(Box::new(inner)), after + 1))
        }
        Some(b'+') | Some(b'-') => {
            let enabled = input.as_bytes()[pos] == b'+';
            let name_start = pos + 1;
            let name_end = input[name_start..]
                .find(|c: char| matches!(c, '&' | '|' | ']' | '[' | '+' | '-'))
                .map(|off| name_start + off)
                .unwrap_or(input.len());
            if name_end == name_start {
                return Err(Error::parse(input, name_start, "missing flag name after sign"));
            }
            let flag = Flag::new(&input[name_start..name_end], enabled);
            Ok((Term::Ref(flag), name_end))
        }
        _ => Err(Error::parse(input, pos, "expected flag reference or '['")),
    }
}

impl fmt::Display for FlagExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_term(&self.first, f)?;
        for (op, term) in &self.rest {
            write!(f, "{}", op.as_str())?;
            fmt_term(term, f)?;
        }
        Ok(())
    }
}

fn fmt_term(term: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match term {
        Term::Ref(flag) => write!(f, "{flag}"),
        Term::Group(inner) => write!(f, "[{inner}]"),
    }
}
