//! Error types.
//!
//! Expected imprecision is never an error: it is [`Value::Unknown`](crate::value::Value::Unknown).
//! Logic bugs (operator/type combinations ruled out by the front end) panic.

use std::fmt;

use thiserror::Error;

/// Source position of a CFA edge, for diagnostics.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct FileLocation {
    pub file: String,
    pub line: u32,
}

impl FileLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// An edge or expression shape the analysis does not understand.
    /// The driver aborts the current program.
    #[error("unrecognized code at {location}: {message}")]
    UnrecognizedCode {
        message: String,
        location: FileLocation,
    },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid precision at line {line}: {message}")]
    InvalidPrecision { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn unrecognized(message: impl Into<String>, location: &FileLocation) -> Self {
        AnalysisError::UnrecognizedCode {
            message: message.into(),
            location: location.clone(),
        }
    }
}

/// Raised by Java evaluation on integral division or remainder by zero.
///
/// Only the assume handler catches it; the branch is then infeasible.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("illegal operation: {0}")]
pub struct IllegalOperation(pub String);
