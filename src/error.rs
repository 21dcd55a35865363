//! Error types for schema loading and partial model synthesis.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a schema or turning it into models.
#[derive(Debug, Error)]
pub enum SchemaError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Schema errors (exit code 2)
    #[error("invalid schema at {path}: {message}")]
    InvalidSchema { path: String, message: String },

    #[error("unsupported $ref \"{reference}\": only local refs (#/...) are supported")]
    UnsupportedRef { reference: String },

    #[error("circular reference detected: {reference}")]
    CircularReference { reference: String },

    #[error("unknown model \"{name}\"")]
    UnknownModel { name: String },
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SchemaError::FileNotFound { .. } | SchemaError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            SchemaError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors raised by a [`ModelFactory`](crate::ModelFactory) when it rejects
/// a set of field overrides.
///
/// The derivation engine never produces these itself; they are passed
/// through to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("cannot override field \"{field}\": model {model} has no such field")]
    UnknownField { model: String, field: String },

    #[error("field \"{field}\" of model {model} is overridden more than once")]
    DuplicateOverride { model: String, field: String },
}

impl SynthesisError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}
