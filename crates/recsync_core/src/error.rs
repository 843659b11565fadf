//! Error types for the sync engine.

use recsync_storage::{BoxError, StorageError};
use std::io;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while configuring or running synchronization.
///
/// A slave that fails validation on save, or is missing on delete, is not
/// an error: those are reported as [`crate::SyncOutcome`]s and routed to
/// the failure hooks.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Malformed field map or missing required configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// A store operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A user-supplied mapping function or failure hook returned an error.
    #[error("callback failed: {0}")]
    Callback(#[source] BoxError),

    /// I/O error while loading settings.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Settings file could not be parsed.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl SyncError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns true for configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns the callback error, if this error came from user code.
    ///
    /// Looks through errors surfaced by lifecycle observers, so a host
    /// that triggered a sync by saving a master record can still reach
    /// the error its own hook raised.
    pub fn callback_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Callback(err) => Some(err.as_ref()),
            Self::Storage(StorageError::Observer(inner)) => match inner.downcast_ref::<SyncError>() {
                Some(sync) => sync.callback_source(),
                None => Some(inner.as_ref()),
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::configuration("field map is empty");
        assert_eq!(err.to_string(), "configuration error: field map is empty");
        assert!(err.is_configuration());

        let err = SyncError::Callback("fail save".into());
        assert_eq!(err.to_string(), "callback failed: fail save");
        assert!(!err.is_configuration());
    }

    #[test]
    fn callback_source_through_observer() {
        let inner = SyncError::Callback("fail save".into());
        let err = SyncError::Storage(StorageError::Observer(Box::new(inner)));
        let source = err.callback_source().unwrap();
        assert_eq!(source.to_string(), "fail save");
    }
}
