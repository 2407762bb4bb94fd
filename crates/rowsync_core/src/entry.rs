//! Change-log rows and compacted results.

use crate::change::{ChangeType, NetChangeType};
use crate::key::CompositeKey;
use crate::types::LogId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the change log.
///
/// `new_key` is only meaningful for updates; for inserts and deletes it
/// equals `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Row ID assigned by the writer.
    pub id: LogId,
    /// Table the change was captured on.
    pub table: String,
    /// Encoded primary key before the change.
    pub key: String,
    /// Encoded primary key after the change.
    pub new_key: String,
    /// When the change was captured.
    pub change_time: DateTime<Utc>,
    /// What kind of change was captured.
    pub change_type: ChangeType,
}

impl LogEntry {
    /// Creates an insert row.
    pub fn insert(
        id: LogId,
        table: impl Into<String>,
        key: impl Into<String>,
        change_time: DateTime<Utc>,
    ) -> Self {
        let key = key.into();
        Self {
            id,
            table: table.into(),
            new_key: key.clone(),
            key,
            change_time,
            change_type: ChangeType::Insert,
        }
    }

    /// Creates an update row moving the record from `key` to `new_key`.
    pub fn update(
        id: LogId,
        table: impl Into<String>,
        key: impl Into<String>,
        new_key: impl Into<String>,
        change_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            table: table.into(),
            key: key.into(),
            new_key: new_key.into(),
            change_time,
            change_type: ChangeType::Update,
        }
    }

    /// Creates a delete row.
    pub fn delete(
        id: LogId,
        table: impl Into<String>,
        key: impl Into<String>,
        change_time: DateTime<Utc>,
    ) -> Self {
        let key = key.into();
        Self {
            id,
            table: table.into(),
            new_key: key.clone(),
            key,
            change_time,
            change_type: ChangeType::Delete,
        }
    }

    /// Returns true if this row moves the record to a different key.
    pub fn changes_key(&self) -> bool {
        self.change_type == ChangeType::Update && self.new_key != self.key
    }
}

/// The single net effect of all consumed log rows for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetChange {
    /// Table the record lives in.
    pub table: String,
    /// The change a consumer must apply.
    pub change_type: ChangeType,
    /// Key of the record. For updates this is the key before the first
    /// folded change; otherwise the key after the last one.
    pub key: CompositeKey,
    /// Key of the record after the last folded change (updates only).
    pub new_key: Option<CompositeKey>,
    /// Encoded form of `key`.
    pub encoded_key: String,
    /// Encoded form of `new_key`.
    pub encoded_new_key: Option<String>,
    /// Capture time of the first folded row.
    pub first_changed_at: DateTime<Utc>,
    /// Capture time of the last folded row.
    pub last_changed_at: DateTime<Utc>,
    /// ID of the last folded row.
    pub last_log_id: LogId,
}

impl NetChange {
    /// Returns the encoded key under which later rows for this record are
    /// logged.
    pub fn current_encoded_key(&self) -> &str {
        self.encoded_new_key.as_deref().unwrap_or(&self.encoded_key)
    }

    /// Returns the state needed to amend this result with rows logged after
    /// it was produced.
    pub fn resume_state(&self) -> ResumeState {
        ResumeState {
            net_type: NetChangeType::from(self.change_type),
            last_id: self.last_log_id,
            origin_key: (self.change_type == ChangeType::Update)
                .then(|| self.encoded_key.clone()),
            first_changed_at: Some(self.first_changed_at),
        }
    }
}

/// State carried over from a previous, possibly incomplete, merge.
///
/// Resuming continues the fold from `net_type` and only considers rows after
/// `last_id`, so rows folded earlier are never reconsidered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    /// Folded state reached by the previous merge.
    pub net_type: NetChangeType,
    /// Last row ID consumed by the previous merge.
    pub last_id: LogId,
    /// Encoded key the record had before the previous merge's first change.
    pub origin_key: Option<String>,
    /// Capture time of the previous merge's first row.
    pub first_changed_at: Option<DateTime<Utc>>,
}

impl ResumeState {
    /// Creates a resume state from a folded type and boundary.
    pub fn new(net_type: NetChangeType, last_id: LogId) -> Self {
        Self {
            net_type,
            last_id,
            origin_key: None,
            first_changed_at: None,
        }
    }

    /// Sets the original encoded key.
    #[must_use]
    pub fn with_origin_key(mut self, key: impl Into<String>) -> Self {
        self.origin_key = Some(key.into());
        self
    }
}
