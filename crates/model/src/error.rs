//! Error types for tree document decoding.

use thiserror::Error;

/// Errors that can occur while decoding or validating a tree document.
///
/// Every structural rejection names the path of the offending node within
/// the document so the user can locate it.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("document top level must be a JSON array")]
    NotASequence,

    #[error("document must contain at least one entry")]
    Empty,

    #[error("root entry must be a directory")]
    RootNotDirectory,

    #[error("node at '{path}' must be a JSON object")]
    NotAnObject { path: String },

    #[error("node at '{path}' is missing required field '{field}'")]
    MissingField { path: String, field: &'static str },

    #[error("node at '{path}': field '{field}' {expected}")]
    InvalidField {
        path: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("node at '{path}' has unknown type '{kind}'")]
    UnknownKind { path: String, kind: String },

    #[error("node at '{path}': name must not contain '/' or NUL")]
    InvalidName { path: String },
}
