//! Drivers for the merge state machine.

use crate::config::CompactionConfig;
use crate::error::CompactionResult;
use crate::merger::{ChangeMerger, LoadOutcome};
use rowsync_core::{CompositeKey, NetChange, ResumeState, Role};
use rowsync_store::{ChangeLogStore, SchemaSource};
use tracing::{debug, trace};

/// Identifies the record to check in [`ChangeLoader::load_specific`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    /// A key already encoded as stored in the log.
    Encoded(String),
    /// A structured key, encoded in the table's primary-key column order.
    Structured(CompositeKey),
}

impl From<&str> for RecordKey {
    fn from(key: &str) -> Self {
        RecordKey::Encoded(key.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(key: String) -> Self {
        RecordKey::Encoded(key)
    }
}

impl From<CompositeKey> for RecordKey {
    fn from(key: CompositeKey) -> Self {
        RecordKey::Structured(key)
    }
}

/// Counters accumulated over one drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Merge invocations.
    pub merges: u64,
    /// Log rows consumed.
    pub rows_consumed: u64,
    /// Net changes produced.
    pub changes_loaded: u64,
    /// Merges whose rows cancelled out.
    pub cancelled: u64,
}

impl LoaderStats {
    fn record(&mut self, outcome: &LoadOutcome) {
        self.merges += 1;
        self.rows_consumed += outcome.consumed() as u64;
        if outcome.is_loaded() {
            self.changes_loaded += 1;
        } else if outcome.consumed() > 0 {
            self.cancelled += 1;
        }
    }
}

/// Loads net changes from one database's change log.
///
/// The loader borrows the store per call so the caller can wrap each call
/// in its own transaction.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use rowsync_core::{CompositeKey, Role};
/// use rowsync_engine::{ChangeLoader, CompactionConfig};
/// use rowsync_store::{InMemoryChangeLog, StaticSchema};
///
/// let log = InMemoryChangeLog::new();
/// log.record_delete(Role::Right, "users", "id|7", Utc::now());
///
/// let schema = StaticSchema::new().with_shared_table("users", ["id"]);
/// let loader = ChangeLoader::new(CompactionConfig::new(Role::Right), schema).unwrap();
///
/// let key = CompositeKey::new().with("id", "7");
/// let outcome = loader.load_specific(&log, "users", key, None).unwrap();
/// assert!(outcome.is_loaded());
/// ```
#[derive(Debug, Clone)]
pub struct ChangeLoader<P: SchemaSource> {
    merger: ChangeMerger,
    schema: P,
    max_drain_changes: usize,
}

impl<P: SchemaSource> ChangeLoader<P> {
    /// Creates a loader from a configuration and a schema collaborator.
    pub fn new(config: CompactionConfig, schema: P) -> CompactionResult<Self> {
        Ok(Self {
            merger: ChangeMerger::from_config(&config)?,
            schema,
            max_drain_changes: config.max_drain_changes,
        })
    }

    /// Returns the database this loader consumes.
    pub fn role(&self) -> Role {
        self.merger.role()
    }

    /// Returns the underlying merger.
    pub fn merger(&self) -> &ChangeMerger {
        &self.merger
    }

    /// Merges one specific record.
    ///
    /// Used to check a record again, for example when amending a previous
    /// incomplete load; pass that load's [`NetChange::resume_state`] as
    /// `resume` to continue its fold.
    pub fn load_specific<S: ChangeLogStore + ?Sized>(
        &self,
        store: &S,
        table: &str,
        key: impl Into<RecordKey>,
        resume: Option<&ResumeState>,
    ) -> CompactionResult<LoadOutcome> {
        let encoded = match key.into() {
            RecordKey::Encoded(key) => key,
            RecordKey::Structured(key) => {
                let columns = self.schema.primary_key_columns(self.role(), table)?;
                self.merger.codec().encode_with_columns(&columns, &key)?
            }
        };

        self.merger.merge(store, table, &encoded, resume)
    }

    /// Merges records oldest row first until one produces a net change.
    ///
    /// Records whose rows cancel out are consumed and skipped. Returns
    /// [`LoadOutcome::NothingLoaded`] once the log is empty; calling it on
    /// an empty log is a no-op.
    pub fn load_oldest<S: ChangeLogStore + ?Sized>(
        &self,
        store: &S,
    ) -> CompactionResult<LoadOutcome> {
        let mut stats = LoaderStats::default();
        self.load_oldest_counted(store, &mut stats)
    }

    /// Calls [`load_oldest`](Self::load_oldest) until the log is empty or
    /// the configured number of net changes was produced.
    pub fn drain<S: ChangeLogStore + ?Sized>(
        &self,
        store: &S,
    ) -> CompactionResult<(Vec<NetChange>, LoaderStats)> {
        let mut stats = LoaderStats::default();
        let mut changes = Vec::new();

        while changes.len() < self.max_drain_changes {
            match self.load_oldest_counted(store, &mut stats)? {
                LoadOutcome::Loaded { change, .. } => changes.push(change),
                LoadOutcome::NothingLoaded { .. } => break,
            }
        }

        debug!(
            role = %self.role(),
            merges = stats.merges,
            rows = stats.rows_consumed,
            changes = stats.changes_loaded,
            cancelled = stats.cancelled,
            "drain finished"
        );
        Ok((changes, stats))
    }

    fn load_oldest_counted<S: ChangeLogStore + ?Sized>(
        &self,
        store: &S,
        stats: &mut LoaderStats,
    ) -> CompactionResult<LoadOutcome> {
        let mut consumed = 0;

        while let Some(oldest) = store.oldest(self.role())? {
            trace!(
                role = %self.role(),
                id = oldest.id.as_u64(),
                "merging oldest row of {}",
                oldest.table
            );

            let outcome = self.merger.merge(store, &oldest.table, &oldest.key, None)?;
            stats.record(&outcome);
            consumed += outcome.consumed();

            if let LoadOutcome::Loaded { change, .. } = outcome {
                return Ok(LoadOutcome::Loaded { change, consumed });
            }
        }

        trace!(role = %self.role(), "change log is empty");
        Ok(LoadOutcome::NothingLoaded { consumed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rowsync_core::ChangeType;
    use rowsync_store::{InMemoryChangeLog, StaticSchema};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn loader() -> ChangeLoader<StaticSchema> {
        let schema = StaticSchema::new()
            .with_shared_table("users", ["id"])
            .with_table(Role::Left, "memberships", ["org", "user"]);
        ChangeLoader::new(CompactionConfig::new(Role::Left), schema).unwrap()
    }

    #[test]
    fn load_oldest_on_empty_store_is_repeatable() {
        let log = InMemoryChangeLog::new();
        let loader = loader();

        for _ in 0..3 {
            let outcome = loader.load_oldest(&log).unwrap();
            assert_eq!(outcome, LoadOutcome::NothingLoaded { consumed: 0 });
        }
    }

    #[test]
    fn load_oldest_skips_cancelled_records() {
        let log = InMemoryChangeLog::new();
        log.record_insert(Role::Left, "users", "id|1", at(0));
        log.record_insert(Role::Left, "users", "id|2", at(1));
        log.record_delete(Role::Left, "users", "id|1", at(2));

        let outcome = loader().load_oldest(&log).unwrap();
        assert_eq!(outcome.consumed(), 3);

        let change = outcome.into_change().unwrap();
        assert_eq!(change.change_type, ChangeType::Insert);
        assert_eq!(change.encoded_key, "id|2");
        assert!(log.is_empty(Role::Left));
    }

    #[test]
    fn load_oldest_returns_nothing_when_everything_cancels() {
        let log = InMemoryChangeLog::new();
        log.record_insert(Role::Left, "users", "id|1", at(0));
        log.record_delete(Role::Left, "users", "id|1", at(1));
        log.record_insert(Role::Left, "users", "id|2", at(2));
        log.record_delete(Role::Left, "users", "id|2", at(3));

        let outcome = loader().load_oldest(&log).unwrap();
        assert_eq!(outcome, LoadOutcome::NothingLoaded { consumed: 4 });
        assert!(log.is_empty(Role::Left));
    }

    #[test]
    fn load_oldest_only_reads_own_role() {
        let log = InMemoryChangeLog::new();
        log.record_insert(Role::Right, "users", "id|1", at(0));

        let outcome = loader().load_oldest(&log).unwrap();
        assert!(!outcome.is_loaded());
        assert_eq!(log.len(Role::Right), 1);
    }

    #[test]
    fn load_specific_with_encoded_key() {
        let log = InMemoryChangeLog::new();
        log.record_update(Role::Left, "users", "id|4", "id|4", at(0));

        let change = loader()
            .load_specific(&log, "users", "id|4", None)
            .unwrap()
            .into_change()
            .unwrap();
        assert_eq!(change.change_type, ChangeType::Update);
    }

    #[test]
    fn load_specific_encodes_structured_key_in_schema_order() {
        let log = InMemoryChangeLog::new();
        log.record_insert(Role::Left, "memberships", "org|acme|user|7", at(0));

        let key = CompositeKey::new().with("user", "7").with("org", "acme");
        let change = loader()
            .load_specific(&log, "memberships", key, None)
            .unwrap()
            .into_change()
            .unwrap();

        assert_eq!(change.encoded_key, "org|acme|user|7");
        assert_eq!(change.key.get("user"), Some("7"));
    }

    #[test]
    fn load_specific_structured_key_missing_column() {
        let log = InMemoryChangeLog::new();
        let key = CompositeKey::new().with("user", "7");

        let err = loader()
            .load_specific(&log, "memberships", key, None)
            .unwrap_err();
        assert!(err.is_missing_column());
        assert!(!err.is_malformed_key());
    }

    #[test]
    fn load_specific_structured_key_unknown_table() {
        let log = InMemoryChangeLog::new();
        let key = CompositeKey::new().with("id", "1");

        let err = loader()
            .load_specific(&log, "missing", key, None)
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn drain_collects_all_changes() {
        let log = InMemoryChangeLog::new();
        log.record_insert(Role::Left, "users", "id|1", at(0));
        log.record_insert(Role::Left, "users", "id|2", at(1));
        log.record_delete(Role::Left, "users", "id|2", at(2));
        log.record_delete(Role::Left, "users", "id|3", at(3));

        let (changes, stats) = loader().drain(&log).unwrap();

        let kinds: Vec<_> = changes.iter().map(|c| c.change_type).collect();
        assert_eq!(kinds, vec![ChangeType::Insert, ChangeType::Delete]);
        assert_eq!(
            stats,
            LoaderStats {
                merges: 3,
                rows_consumed: 4,
                changes_loaded: 2,
                cancelled: 1,
            }
        );
        assert!(log.is_empty(Role::Left));
    }

    #[test]
    fn drain_respects_limit() {
        let log = InMemoryChangeLog::new();
        for i in 0..5 {
            log.record_insert(Role::Left, "users", &format!("id|{i}"), at(i));
        }

        let schema = StaticSchema::new();
        let loader =
            ChangeLoader::new(CompactionConfig::new(Role::Left).with_max_drain_changes(2), schema)
                .unwrap();

        let (changes, _) = loader.drain(&log).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(log.len(Role::Left), 3);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = CompactionConfig::new(Role::Left).with_max_drain_changes(0);
        assert!(ChangeLoader::new(config, StaticSchema::new()).is_err());
    }
}
