//! Error types for workflow documents and run inputs

use thiserror::Error;

/// Errors raised while parsing or validating a workflow document
///
/// Each variant names the offending field so callers can surface an
/// actionable message without inspecting the document themselves.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document declares a schema version this SDK does not understand
    #[error("unsupported schema_version: {found:?} (expected \"v1\")")]
    UnsupportedVersion {
        /// The version string found in the document
        found: String,
    },

    /// The document is structurally invalid (missing or mistyped field)
    #[error("invalid workflow document: {0}")]
    InvalidDocument(String),

    /// Two workflow inputs share the same name
    #[error("duplicate workflow input name: {name}")]
    DuplicateInput {
        /// The repeated input name
        name: String,
    },

    /// An execution instruction references a sequence that does not exist
    #[error("execution instructions reference unknown sequence: {sequence_id}")]
    UnknownSequence {
        /// The missing sequence id
        sequence_id: String,
    },

    /// A field holds a value that violates a wire-format constraint
    #[error("invalid value for field {field}: {detail}")]
    InvalidField {
        /// The offending field
        field: String,
        /// What was wrong with it
        detail: String,
    },

    /// Reading a workflow file from disk failed
    #[error("failed to read workflow file {path}: {detail}")]
    Io {
        /// The file path that could not be read
        path: String,
        /// The underlying I/O error
        detail: String,
    },
}

/// Errors raised when validating user inputs against a workflow definition
///
/// These always fail before any network effect.
#[derive(Debug, Error)]
pub enum InputValidationError {
    /// An input was provided that the workflow does not define
    #[error("unexpected input '{name}'; valid inputs are: {valid}")]
    Unexpected {
        /// The unrecognized input name
        name: String,
        /// Comma-separated list of valid input names
        valid: String,
    },

    /// A required input was neither provided nor defaulted
    #[error("required input '{name}' (type: {input_type}) was not provided and has no default value")]
    MissingRequired {
        /// The missing input name
        name: String,
        /// The declared input type
        input_type: String,
    },

    /// A provided value does not match the declared input type
    #[error("input '{name}' expects type {expected}, but got an incompatible value: {value}")]
    TypeMismatch {
        /// The input name
        name: String,
        /// The declared input type
        expected: String,
        /// The rejected value, rendered as JSON
        value: String,
    },
}
