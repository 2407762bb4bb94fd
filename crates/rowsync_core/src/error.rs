//! Error types for key encoding and decoding.

use thiserror::Error;

/// Result type for key codec operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Errors that can occur while encoding or decoding composite keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The encoded key cannot be re-paired into column/value pairs.
    #[error("malformed key {raw:?}: {reason}")]
    Malformed {
        /// The encoded key as read from the log.
        raw: String,
        /// Why the pairing failed.
        reason: String,
    },

    /// A primary-key column is absent from a structured key.
    #[error("key is missing primary-key column {column:?}")]
    MissingColumn {
        /// The missing column name.
        column: String,
    },

    /// The configured separator is empty.
    #[error("key separator must not be empty")]
    EmptySeparator,
}

impl KeyError {
    /// Creates a malformed key error.
    pub fn malformed(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}
