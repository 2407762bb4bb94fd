//! Change-log fixtures.
//!
//! Provides a builder that plays the change-log writer: every recorded row
//! gets the next ID and a timestamp one second after the previous row.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rowsync_core::{ChangeType, LogId, Role};
use rowsync_store::InMemoryChangeLog;

/// Default table used by fixtures.
pub const DEFAULT_TABLE: &str = "items";

/// Returns the fixed base time used by fixtures.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Returns the time of the `n`th fixture row (0-based).
pub fn fixture_time(n: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(n)
}

/// A change log seeded row by row with deterministic timestamps.
#[derive(Debug)]
pub struct LogFixture {
    log: InMemoryChangeLog,
    role: Role,
    table: String,
    rows_written: i64,
}

impl LogFixture {
    /// Creates an empty fixture writing to `role`.
    pub fn new(role: Role) -> Self {
        Self {
            log: InMemoryChangeLog::new(),
            role,
            table: DEFAULT_TABLE.to_string(),
            rows_written: 0,
        }
    }

    /// Sets the table subsequent rows are recorded for.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Switches the table for subsequent rows.
    pub fn set_table(&mut self, table: impl Into<String>) {
        self.table = table.into();
    }

    /// Records an insert.
    pub fn insert(&mut self, key: &str) -> LogId {
        self.record(ChangeType::Insert, key, key)
    }

    /// Records an update from `key` to `new_key`.
    pub fn update(&mut self, key: &str, new_key: &str) -> LogId {
        self.record(ChangeType::Update, key, new_key)
    }

    /// Records a delete.
    pub fn delete(&mut self, key: &str) -> LogId {
        self.record(ChangeType::Delete, key, key)
    }

    /// Records one change of any type.
    pub fn record(&mut self, change_type: ChangeType, key: &str, new_key: &str) -> LogId {
        let time = fixture_time(self.rows_written);
        self.rows_written += 1;
        self.log
            .append(self.role, &self.table, change_type, key, new_key, time)
    }

    /// Records a sequence of changes for one key that keeps its identity.
    pub fn record_sequence(&mut self, key: &str, changes: &[ChangeType]) -> Vec<LogId> {
        changes
            .iter()
            .map(|change| self.record(*change, key, key))
            .collect()
    }

    /// Returns the role rows are written to.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the seeded change log.
    pub fn log(&self) -> &InMemoryChangeLog {
        &self.log
    }

    /// Consumes the fixture, returning the change log.
    pub fn into_log(self) -> InMemoryChangeLog {
        self.log
    }
}
