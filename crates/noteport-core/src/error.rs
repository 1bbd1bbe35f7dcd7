//! Error types for noteport.

use thiserror::Error;

/// Result type alias using noteport's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], used at the HTTP boundary and in
/// batch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request data. Rejected before any processing starts.
    Validation,
    /// The file could not be turned into documents.
    Conversion,
    /// The downstream store refused the write.
    Persistence,
}

/// Core error type for noteport operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input (bad id, missing file, oversized file)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File extension not accepted by the endpoint or registry
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Converter failed (malformed archive, no markup, extractor failure)
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store rejected a write
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify the error for status mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) | Error::UnsupportedFormat(_) => ErrorKind::Validation,
            Error::NotFound(_) | Error::Persistence(_) => ErrorKind::Persistence,
            Error::Conversion(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_) => ErrorKind::Conversion,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
