//! Parsing of the canonical string encodings used by every domain enum.

use thiserror::Error;

/// A string did not match any variant of a domain enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} value: '{value}'")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
