//! Raw change-log row mapping.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rowsync_core::{ChangeType, LogEntry, LogId};

/// A change-log row as the host database returns it.
///
/// Column names follow the persisted schema: `id`, `change_table`,
/// `change_key`, `change_new_key`, `change_type`, `change_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    /// Monotonic primary key.
    pub id: i64,
    /// Table the change was captured on.
    pub change_table: String,
    /// Encoded key before the change.
    pub change_key: String,
    /// Encoded key after the change; may be NULL for inserts and deletes.
    pub change_new_key: Option<String>,
    /// `I`, `U` or `D`.
    pub change_type: String,
    /// Capture timestamp.
    pub change_time: DateTime<Utc>,
}

impl TryFrom<LogRow> for LogEntry {
    type Error = StoreError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let id = u64::try_from(row.id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| StoreError::CorruptedRow {
                id: row.id,
                reason: "id must be positive".into(),
            })?;

        let change_type =
            ChangeType::from_code_str(&row.change_type).ok_or_else(|| StoreError::CorruptedRow {
                id: row.id,
                reason: format!("unknown change type {:?}", row.change_type),
            })?;

        // Only updates carry a distinct new key.
        let new_key = match (change_type, row.change_new_key) {
            (ChangeType::Update, Some(new_key)) => new_key,
            _ => row.change_key.clone(),
        };

        Ok(LogEntry {
            id: LogId::new(id),
            table: row.change_table,
            key: row.change_key,
            new_key,
            change_time: row.change_time,
            change_type,
        })
    }
}

impl TryFrom<&LogEntry> for LogRow {
    type Error = StoreError;

    fn try_from(entry: &LogEntry) -> Result<Self, Self::Error> {
        let id = i64::try_from(entry.id.as_u64()).map_err(|_| StoreError::IdOutOfRange {
            id: entry.id.as_u64(),
        })?;

        Ok(Self {
            id,
            change_table: entry.table.clone(),
            change_key: entry.key.clone(),
            change_new_key: Some(entry.new_key.clone()),
            change_type: entry.change_type.to_code().to_string(),
            change_time: entry.change_time,
        })
    }
}
