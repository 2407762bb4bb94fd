//! Error types for the compaction engine.

use rowsync_core::KeyError;
use rowsync_store::StoreError;
use thiserror::Error;

/// Result type for compaction operations.
pub type CompactionResult<T> = Result<T, CompactionError>;

/// Errors that can occur while compacting the change log.
///
/// Store and key faults are propagated unmodified; a merge that has nothing
/// to report is not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompactionError {
    /// The change log could not be read or consumed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A key could not be encoded or decoded.
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CompactionError {
    /// Returns true if retrying the whole pass may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompactionError::Store(e) => e.is_retryable(),
            CompactionError::Key(_) | CompactionError::InvalidConfig(_) => false,
        }
    }

    /// Returns true if this is a data-integrity failure on a stored key.
    pub fn is_malformed_key(&self) -> bool {
        matches!(self, CompactionError::Key(KeyError::Malformed { .. }))
    }

    /// Returns true if a caller-supplied key lacks a primary-key column.
    pub fn is_missing_column(&self) -> bool {
        matches!(self, CompactionError::Key(KeyError::MissingColumn { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowsync_core::Role;

    #[test]
    fn retryable_errors() {
        let unavailable: CompactionError = StoreError::unavailable(Role::Left, "reset").into();
        assert!(unavailable.is_retryable());

        let malformed: CompactionError = KeyError::malformed("id|1|x", "odd").into();
        assert!(!malformed.is_retryable());
        assert!(malformed.is_malformed_key());

        assert!(!CompactionError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn missing_column_is_not_a_malformed_key() {
        let err: CompactionError = KeyError::MissingColumn {
            column: "region".into(),
        }
        .into();
        assert!(err.is_missing_column());
        assert!(!err.is_malformed_key());
        assert!(!err.is_retryable());
    }

    #[test]
    fn error_display() {
        let err: CompactionError = KeyError::EmptySeparator.into();
        assert_eq!(err.to_string(), "key error: key separator must not be empty");
    }
}
