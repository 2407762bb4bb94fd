//! In-memory change log.

use crate::backend::ChangeLogStore;
use crate::error::{StoreError, StoreResult};
use crate::row::LogRow;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rowsync_core::{ChangeType, LogEntry, LogId, Role};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

#[derive(Debug, Clone, Default)]
struct Partition {
    rows: BTreeMap<LogId, LogEntry>,
    last_id: LogId,
}

/// An in-memory change log holding one partition per database role.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - Embedding the engine where the log is captured in-process
///
/// It also plays the writer's part: `append` and the `record_*` helpers
/// assign strictly increasing IDs per role.
///
/// # Thread Safety
///
/// The store is thread-safe and can be shared across threads. A rolled back
/// [`transaction`](Self::transaction) restores only the rows it deleted
/// itself; rows appended or consumed concurrently by others are untouched.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use rowsync_core::Role;
/// use rowsync_store::InMemoryChangeLog;
///
/// let log = InMemoryChangeLog::new();
/// log.record_insert(Role::Left, "users", "id|1", Utc::now());
/// log.record_delete(Role::Left, "users", "id|1", Utc::now());
/// assert_eq!(log.len(Role::Left), 2);
/// assert!(log.is_empty(Role::Right));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryChangeLog {
    partitions: RwLock<HashMap<Role, Partition>>,
    /// Successful operations left per role before that role's connection
    /// reports itself unavailable.
    faults: Mutex<HashMap<Role, usize>>,
}

impl InMemoryChangeLog {
    /// Creates an empty change log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row and returns its assigned ID.
    pub fn append(
        &self,
        role: Role,
        table: &str,
        change_type: ChangeType,
        key: &str,
        new_key: &str,
        change_time: DateTime<Utc>,
    ) -> LogId {
        let mut partitions = self.partitions.write();
        let partition = partitions.entry(role).or_default();
        let id = partition.last_id.next();
        partition.last_id = id;

        let new_key = if change_type == ChangeType::Update {
            new_key
        } else {
            key
        };
        partition.rows.insert(
            id,
            LogEntry {
                id,
                table: table.to_string(),
                key: key.to_string(),
                new_key: new_key.to_string(),
                change_time,
                change_type,
            },
        );
        id
    }

    /// Records an insert.
    pub fn record_insert(
        &self,
        role: Role,
        table: &str,
        key: &str,
        change_time: DateTime<Utc>,
    ) -> LogId {
        self.append(role, table, ChangeType::Insert, key, key, change_time)
    }

    /// Records an update from `key` to `new_key`.
    pub fn record_update(
        &self,
        role: Role,
        table: &str,
        key: &str,
        new_key: &str,
        change_time: DateTime<Utc>,
    ) -> LogId {
        self.append(role, table, ChangeType::Update, key, new_key, change_time)
    }

    /// Records a delete.
    pub fn record_delete(
        &self,
        role: Role,
        table: &str,
        key: &str,
        change_time: DateTime<Utc>,
    ) -> LogId {
        self.append(role, table, ChangeType::Delete, key, key, change_time)
    }

    /// Loads rows as read from a persisted change-log table.
    ///
    /// Rows must arrive in ascending ID order, each after every row already
    /// present for the role. Returns the number of rows loaded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptedRow`] for an unmappable or out-of-order
    /// row; rows before it stay loaded.
    pub fn load_rows(
        &self,
        role: Role,
        rows: impl IntoIterator<Item = LogRow>,
    ) -> StoreResult<usize> {
        let mut partitions = self.partitions.write();
        let partition = partitions.entry(role).or_default();
        let mut loaded = 0;

        for row in rows {
            let raw_id = row.id;
            let entry = LogEntry::try_from(row)?;
            if entry.id <= partition.last_id {
                return Err(StoreError::CorruptedRow {
                    id: raw_id,
                    reason: format!("id is not after {}", partition.last_id),
                });
            }
            partition.last_id = entry.id;
            partition.rows.insert(entry.id, entry);
            loaded += 1;
        }

        Ok(loaded)
    }

    /// Returns a copy of the remaining rows of a role, ascending by ID.
    #[must_use]
    pub fn entries(&self, role: Role) -> Vec<LogEntry> {
        self.partitions
            .read()
            .get(&role)
            .map(|p| p.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns true if a row is still present.
    #[must_use]
    pub fn contains(&self, role: Role, id: LogId) -> bool {
        self.partitions
            .read()
            .get(&role)
            .is_some_and(|p| p.rows.contains_key(&id))
    }

    /// Returns the number of remaining rows of a role.
    #[must_use]
    pub fn len(&self, role: Role) -> usize {
        self.partitions
            .read()
            .get(&role)
            .map_or(0, |p| p.rows.len())
    }

    /// Returns true if no rows remain for a role.
    #[must_use]
    pub fn is_empty(&self, role: Role) -> bool {
        self.len(role) == 0
    }

    /// Makes every operation on `role` fail after `operations` more
    /// successful ones, simulating a dropped connection to that database.
    pub fn fail_after(&self, role: Role, operations: usize) {
        self.faults.lock().insert(role, operations);
    }

    /// Restores normal operation of `role` after
    /// [`fail_after`](Self::fail_after).
    pub fn clear_fault(&self, role: Role) {
        self.faults.lock().remove(&role);
    }

    /// Runs `f` as one unit of work.
    ///
    /// `f` consumes rows through the [`ChangeLogTransaction`] it is given.
    /// If `f` returns `Err`, every row deleted through that handle is put
    /// back; nothing else in the log is touched.
    pub fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&ChangeLogTransaction<'_>) -> Result<T, E>,
    {
        let tx = ChangeLogTransaction {
            log: self,
            deleted: Mutex::new(Vec::new()),
        };
        let result = f(&tx);
        if result.is_err() {
            let restored = tx.rollback();
            tracing::debug!(restored, "change log transaction rolled back");
        }
        result
    }

    fn check_available(&self, role: Role) -> StoreResult<()> {
        let mut faults = self.faults.lock();
        match faults.get_mut(&role) {
            None => Ok(()),
            Some(0) => Err(StoreError::unavailable(role, "connection lost")),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
        }
    }

    fn remove(&self, role: Role, id: LogId) -> StoreResult<Option<LogEntry>> {
        self.check_available(role)?;
        Ok(self
            .partitions
            .write()
            .get_mut(&role)
            .and_then(|p| p.rows.remove(&id)))
    }

    fn restore(&self, role: Role, entry: LogEntry) {
        self.partitions
            .write()
            .entry(role)
            .or_default()
            .rows
            .insert(entry.id, entry);
    }
}

/// A unit of work over an [`InMemoryChangeLog`].
///
/// Reads go straight to the log. Deletions take effect immediately and are
/// remembered so a rollback can put exactly those rows back.
#[derive(Debug)]
pub struct ChangeLogTransaction<'a> {
    log: &'a InMemoryChangeLog,
    deleted: Mutex<Vec<(Role, LogEntry)>>,
}

impl ChangeLogTransaction<'_> {
    /// Returns the number of rows deleted so far in this transaction.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.lock().len()
    }

    fn rollback(self) -> usize {
        let deleted = self.deleted.into_inner();
        let restored = deleted.len();
        for (role, entry) in deleted {
            self.log.restore(role, entry);
        }
        restored
    }
}

impl ChangeLogStore for ChangeLogTransaction<'_> {
    fn entries_after(
        &self,
        role: Role,
        table: &str,
        key: &str,
        after: LogId,
    ) -> StoreResult<Vec<LogEntry>> {
        self.log.entries_after(role, table, key, after)
    }

    fn oldest(&self, role: Role) -> StoreResult<Option<LogEntry>> {
        self.log.oldest(role)
    }

    fn delete(&self, role: Role, id: LogId) -> StoreResult<()> {
        if let Some(entry) = self.log.remove(role, id)? {
            self.deleted.lock().push((role, entry));
        }
        Ok(())
    }
}

impl ChangeLogStore for InMemoryChangeLog {
    fn entries_after(
        &self,
        role: Role,
        table: &str,
        key: &str,
        after: LogId,
    ) -> StoreResult<Vec<LogEntry>> {
        self.check_available(role)?;
        let partitions = self.partitions.read();
        let Some(partition) = partitions.get(&role) else {
            return Ok(Vec::new());
        };

        Ok(partition
            .rows
            .range((Bound::Excluded(after), Bound::Unbounded))
            .map(|(_, entry)| entry)
            .filter(|entry| entry.table == table && entry.key == key)
            .cloned()
            .collect())
    }

    fn oldest(&self, role: Role) -> StoreResult<Option<LogEntry>> {
        self.check_available(role)?;
        Ok(self
            .partitions
            .read()
            .get(&role)
            .and_then(|p| p.rows.values().next().cloned()))
    }

    fn delete(&self, role: Role, id: LogId) -> StoreResult<()> {
        self.remove(role, id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn memory_new_is_empty() {
        let log = InMemoryChangeLog::new();
        assert!(log.is_empty(Role::Left));
        assert_eq!(log.oldest(Role::Left).unwrap(), None);
    }

    #[test]
    fn append_assigns_increasing_ids_per_role() {
        let log = InMemoryChangeLog::new();

        let a = log.record_insert(Role::Left, "t", "id|1", at(0));
        let b = log.record_insert(Role::Left, "t", "id|2", at(1));
        let c = log.record_insert(Role::Right, "t", "id|1", at(2));

        assert_eq!(a, LogId::new(1));
        assert_eq!(b, LogId::new(2));
        assert_eq!(c, LogId::new(1));
    }

    #[test]
    fn non_update_rows_ignore_new_key() {
        let log = InMemoryChangeLog::new();
        log.append(Role::Left, "t", ChangeType::Delete, "id|1", "id|2", at(0));
        assert_eq!(log.entries(Role::Left)[0].new_key, "id|1");
    }

    #[test]
    fn entries_after_filters_and_orders() {
        let log = InMemoryChangeLog::new();
        log.record_insert(Role::Left, "t", "id|1", at(0));
        log.record_insert(Role::Left, "t", "id|2", at(1));
        log.record_update(Role::Left, "t", "id|1", "id|1", at(2));
        log.record_insert(Role::Left, "other", "id|1", at(3));
        log.record_delete(Role::Left, "t", "id|1", at(4));

        let rows = log
            .entries_after(Role::Left, "t", "id|1", LogId::ZERO)
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_u64()).collect();
        assert_eq!(ids, vec![1, 3, 5]);

        let rows = log
            .entries_after(Role::Left, "t", "id|1", LogId::new(3))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, LogId::new(5));
    }

    #[test]
    fn oldest_and_delete() {
        let log = InMemoryChangeLog::new();
        let first = log.record_insert(Role::Right, "t", "id|1", at(0));
        let second = log.record_insert(Role::Right, "t", "id|2", at(1));

        assert_eq!(log.oldest(Role::Right).unwrap().unwrap().id, first);
        log.delete(Role::Right, first).unwrap();
        assert!(!log.contains(Role::Right, first));
        assert_eq!(log.oldest(Role::Right).unwrap().unwrap().id, second);

        // Deleting twice is harmless.
        log.delete(Role::Right, first).unwrap();
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let log = InMemoryChangeLog::new();
        let first = log.record_insert(Role::Left, "t", "id|1", at(0));
        log.delete(Role::Left, first).unwrap();
        let second = log.record_insert(Role::Left, "t", "id|1", at(1));
        assert!(second > first);
    }

    #[test]
    fn load_rows_rejects_out_of_order() {
        let log = InMemoryChangeLog::new();
        log.record_insert(Role::Left, "t", "id|1", at(0));

        let row = LogRow {
            id: 1,
            change_table: "t".into(),
            change_key: "id|2".into(),
            change_new_key: None,
            change_type: "I".into(),
            change_time: at(1),
        };
        let err = log.load_rows(Role::Left, [row]).unwrap_err();
        assert!(matches!(err, StoreError::CorruptedRow { id: 1, .. }));
    }

    #[test]
    fn load_rows_then_append_continues_ids() {
        let log = InMemoryChangeLog::new();
        let row = LogRow {
            id: 40,
            change_table: "t".into(),
            change_key: "id|2".into(),
            change_new_key: None,
            change_type: "I".into(),
            change_time: at(1),
        };
        assert_eq!(log.load_rows(Role::Left, [row]).unwrap(), 1);
        let next = log.record_delete(Role::Left, "t", "id|2", at(2));
        assert_eq!(next, LogId::new(41));
    }

    #[test]
    fn fault_injection() {
        let log = InMemoryChangeLog::new();
        log.record_insert(Role::Left, "t", "id|1", at(0));

        log.fail_after(Role::Left, 1);
        assert!(log.oldest(Role::Left).is_ok());
        let err = log.oldest(Role::Left).unwrap_err();
        assert!(err.is_retryable());

        log.clear_fault(Role::Left);
        assert!(log.oldest(Role::Left).is_ok());
    }

    #[test]
    fn fault_budget_is_per_role() {
        let log = InMemoryChangeLog::new();
        log.record_insert(Role::Right, "t", "id|1", at(0));

        log.fail_after(Role::Left, 0);
        assert!(log.oldest(Role::Left).is_err());
        for _ in 0..3 {
            assert!(log.oldest(Role::Right).is_ok());
        }
        assert!(log.oldest(Role::Left).is_err());
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let log = InMemoryChangeLog::new();
        let id = log.record_insert(Role::Left, "t", "id|1", at(0));

        let result: StoreResult<()> = log.transaction(|tx| {
            tx.delete(Role::Left, id)?;
            Err(StoreError::unavailable(Role::Left, "boom"))
        });

        assert!(result.is_err());
        assert!(log.contains(Role::Left, id));
    }

    #[test]
    fn transaction_commits_on_success() {
        let log = InMemoryChangeLog::new();
        let id = log.record_insert(Role::Left, "t", "id|1", at(0));

        log.transaction(|tx| tx.delete(Role::Left, id)).unwrap();
        assert!(log.is_empty(Role::Left));
    }

    #[test]
    fn rollback_restores_only_own_deletions() {
        let log = InMemoryChangeLog::new();
        let mine = log.record_insert(Role::Left, "t", "id|1", at(0));
        let theirs = log.record_insert(Role::Right, "t", "id|7", at(1));

        let result: StoreResult<()> = log.transaction(|tx| {
            tx.delete(Role::Left, mine)?;
            // Work done outside this transaction while it is open.
            log.delete(Role::Right, theirs)?;
            log.record_insert(Role::Right, "t", "id|8", at(2));
            log.record_insert(Role::Left, "t", "id|2", at(3));
            assert_eq!(tx.deleted_count(), 1);
            Err(StoreError::unavailable(Role::Left, "boom"))
        });

        assert!(result.is_err());
        assert!(log.contains(Role::Left, mine));
        assert_eq!(log.len(Role::Left), 2);
        let right: Vec<_> = log.entries(Role::Right).into_iter().map(|e| e.key).collect();
        assert_eq!(right, vec!["id|8".to_string()]);
    }

    #[test]
    fn rollback_ignores_rows_that_were_already_gone() {
        let log = InMemoryChangeLog::new();
        let id = log.record_insert(Role::Left, "t", "id|1", at(0));
        log.delete(Role::Left, id).unwrap();

        let result: StoreResult<()> = log.transaction(|tx| {
            tx.delete(Role::Left, id)?;
            Err(StoreError::unavailable(Role::Left, "boom"))
        });

        assert!(result.is_err());
        assert!(log.is_empty(Role::Left));
    }
}
