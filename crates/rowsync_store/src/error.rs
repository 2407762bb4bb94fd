//! Error types for change-log store operations.

use rowsync_core::Role;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or consuming the change log.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connectivity or query failure against the log store.
    #[error("change log unavailable ({role}): {message}")]
    Unavailable {
        /// Database the failing connection belongs to.
        role: Role,
        /// Driver or connection message.
        message: String,
    },

    /// A stored row cannot be mapped to a log entry.
    #[error("corrupted change-log row {id}: {reason}")]
    CorruptedRow {
        /// Raw ID of the row.
        id: i64,
        /// What is wrong with it.
        reason: String,
    },

    /// A log ID does not fit the persisted signed ID column.
    #[error("change-log id {id} exceeds the persisted id range")]
    IdOutOfRange {
        /// The unrepresentable ID.
        id: u64,
    },

    /// Schema introspection does not know the table.
    #[error("unknown table {table:?} in {role} database")]
    UnknownTable {
        /// Database that was asked.
        role: Role,
        /// Table name.
        table: String,
    },
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(role: Role, message: impl Into<String>) -> Self {
        Self::Unavailable {
            role,
            message: message.into(),
        }
    }

    /// Returns true if retrying the whole pass may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}
