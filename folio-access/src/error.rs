//! Access engine error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the access engine.
///
/// An ordinary denial is not an error: it is returned as an
/// [`AccessPermission`](crate::AccessPermission) with `granted == false`.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The referenced record (or file document) does not exist in the index
    #[error("Record not found: {pi}")]
    RecordNotFound { pi: String },

    /// The external index could not answer an existence check
    #[error("Index unreachable: {message}")]
    IndexUnreachable { message: String },

    /// A catalog entry violates a catalog invariant
    #[error("Misconfigured rule: {message}")]
    MisconfiguredRule { message: String },

    /// Malformed input passed to a pure helper
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl AccessError {
    /// Create a record-not-found error
    pub fn record_not_found(pi: impl Into<String>) -> Self {
        Self::RecordNotFound { pi: pi.into() }
    }

    /// Create an index-unreachable error
    pub fn index_unreachable(message: impl Into<String>) -> Self {
        Self::IndexUnreachable {
            message: message.into(),
        }
    }

    /// Create a misconfigured-rule error
    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::MisconfiguredRule {
            message: message.into(),
        }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// True for failures a caller may retry (the index was unavailable)
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::IndexUnreachable { .. })
    }
}

/// Errors from catalog file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse catalog file {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
    #[error(transparent)]
    Rule(#[from] AccessError),
}

/// Result type alias for access engine operations
pub type Result<T> = std::result::Result<T, AccessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_index_failures_are_retryable() {
        assert!(AccessError::index_unreachable("timeout").is_retryable());
        assert!(!AccessError::record_not_found("PPN1").is_retryable());
        assert!(!AccessError::misconfigured("two targets").is_retryable());
    }

    #[test]
    fn test_display_names_the_record() {
        let err = AccessError::record_not_found("PPN123");
        assert_eq!(err.to_string(), "Record not found: PPN123");
    }
}
