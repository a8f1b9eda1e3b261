// src/error.rs

//! Error types shared across the anvil library
//!
//! Parse failures carry the offending input and position so callers can
//! reject a single bad metadata entry. Flag conflicts are structured and
//! name both contributors; they are never collapsed into an empty flag set.

use thiserror::Error;

/// Errors that can occur across the anvil library
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed dependency or flag expression text
    #[error("Parse error in '{input}' at position {position}: {reason}")]
    Parse {
        input: String,
        position: usize,
        reason: String,
    },

    /// Two dependents require opposite states of the same flag
    #[error("Flag conflict on '{package}': '{first}' requires {flag} enabled while '{second}' requires it disabled")]
    FlagConflict {
        package: String,
        flag: String,
        first: String,
        second: String,
    },

    /// Template file could not be read or deserialized
    #[error("Invalid template '{path}': {reason}")]
    Template { path: String, reason: String },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Initialization failure (paths, schema, migrations)
    #[error("{0}")]
    Init(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a parse error for `input` at byte offset `position`
    pub fn parse(input: &str, position: usize, reason: impl Into<String>) -> Self {
        Error::Parse {
            input: input.to_string(),
            position,
            reason: reason.into(),
        }
    }
}
