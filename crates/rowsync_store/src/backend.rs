//! Change-log store trait definition.

use crate::error::StoreResult;
use rowsync_core::{LogEntry, LogId, Role};

/// Read-and-consume access to the change log of one or both databases.
///
/// Implementations wrap the host application's connections; `role` selects
/// which database a call is executed against.
///
/// # Invariants
///
/// - `entries_after` returns rows in strictly ascending ID order
/// - `oldest` returns the row with the smallest remaining ID
/// - a deleted row is never returned again
///
/// Transaction boundaries belong to the caller: a merge issues reads and
/// deletes through this trait and expects them to commit or roll back
/// together.
pub trait ChangeLogStore {
    /// Returns the rows logged for `(table, key)` with an ID greater than
    /// `after`, ascending by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn entries_after(
        &self,
        role: Role,
        table: &str,
        key: &str,
        after: LogId,
    ) -> StoreResult<Vec<LogEntry>>;

    /// Returns the oldest remaining row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn oldest(&self, role: Role) -> StoreResult<Option<LogEntry>>;

    /// Permanently deletes one row.
    ///
    /// Deleting an ID that no longer exists is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    fn delete(&self, role: Role, id: LogId) -> StoreResult<()>;
}

impl<S: ChangeLogStore + ?Sized> ChangeLogStore for &S {
    fn entries_after(
        &self,
        role: Role,
        table: &str,
        key: &str,
        after: LogId,
    ) -> StoreResult<Vec<LogEntry>> {
        (**self).entries_after(role, table, key, after)
    }

    fn oldest(&self, role: Role) -> StoreResult<Option<LogEntry>> {
        (**self).oldest(role)
    }

    fn delete(&self, role: Role, id: LogId) -> StoreResult<()> {
        (**self).delete(role, id)
    }
}

impl<S: ChangeLogStore + ?Sized> ChangeLogStore for std::sync::Arc<S> {
    fn entries_after(
        &self,
        role: Role,
        table: &str,
        key: &str,
        after: LogId,
    ) -> StoreResult<Vec<LogEntry>> {
        (**self).entries_after(role, table, key, after)
    }

    fn oldest(&self, role: Role) -> StoreResult<Option<LogEntry>> {
        (**self).oldest(role)
    }

    fn delete(&self, role: Role, id: LogId) -> StoreResult<()> {
        (**self).delete(role, id)
    }
}
