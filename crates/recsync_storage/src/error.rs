//! Error types for record store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed error raised by code outside the store (observers, callbacks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during store operations.
///
/// Validation failures are not errors: `save` reports them by returning
/// `Ok(false)` and leaving the messages on the record.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted store could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A field name not declared by the schema was read or written.
    #[error("unknown field '{field}' for schema '{schema}'")]
    UnknownField {
        /// Schema name.
        schema: String,
        /// The offending field.
        field: String,
    },

    /// A record's key fields do not form a usable primary key.
    #[error("invalid primary key for schema '{schema}': {message}")]
    InvalidKey {
        /// Schema name.
        schema: String,
        /// Description of the problem.
        message: String,
    },

    /// A lifecycle observer failed after the write completed.
    #[error("lifecycle observer failed: {0}")]
    Observer(#[source] BoxError),

    /// The store file is locked by another process.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// The persisted store is corrupted.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}

impl StorageError {
    /// Creates an unknown field error.
    pub fn unknown_field(schema: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            schema: schema.into(),
            field: field.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKey {
            schema: schema.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StorageError::unknown_field("slave", "nope");
        assert_eq!(err.to_string(), "unknown field 'nope' for schema 'slave'");

        let err = StorageError::Locked;
        assert!(err.to_string().contains("locked"));
    }
}
