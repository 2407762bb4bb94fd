//! The merge state machine.

use crate::config::CompactionConfig;
use crate::error::CompactionResult;
use rowsync_core::{ChangeType, KeyCodec, LogId, NetChange, NetChangeType, ResumeState, Role};
use rowsync_store::ChangeLogStore;
use tracing::{debug, info, warn};

/// Result of one merge or load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A net change was produced.
    Loaded {
        /// The net change to hand downstream.
        change: NetChange,
        /// Number of log rows folded into it.
        consumed: usize,
    },
    /// Nothing to report: no rows matched, or they cancelled out.
    NothingLoaded {
        /// Number of log rows consumed anyway.
        consumed: usize,
    },
}

impl LoadOutcome {
    /// Returns true if a net change was produced.
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    /// Returns the number of log rows consumed.
    pub fn consumed(&self) -> usize {
        match self {
            LoadOutcome::Loaded { consumed, .. } | LoadOutcome::NothingLoaded { consumed } => {
                *consumed
            }
        }
    }

    /// Returns the net change, if one was produced.
    pub fn change(&self) -> Option<&NetChange> {
        match self {
            LoadOutcome::Loaded { change, .. } => Some(change),
            LoadOutcome::NothingLoaded { .. } => None,
        }
    }

    /// Converts into the net change, if one was produced.
    pub fn into_change(self) -> Option<NetChange> {
        match self {
            LoadOutcome::Loaded { change, .. } => Some(change),
            LoadOutcome::NothingLoaded { .. } => None,
        }
    }
}

/// Folds all unconsumed log rows of one record into a single net change.
///
/// The merger holds no state between calls; the store is passed to every
/// call and resuming a previous merge is explicit through [`ResumeState`].
///
/// # Algorithm
///
/// Rows are read for `(table, key)` with IDs above the boundary, ascending.
/// Each row is folded with [`NetChangeType::fold`] and deleted. When an
/// update moves the record to a new key, the open batch is abandoned and
/// rows are read again under the new key, still above the boundary. The
/// merge ends when a read for the current key returns nothing.
#[derive(Debug, Clone)]
pub struct ChangeMerger {
    role: Role,
    codec: KeyCodec,
}

impl ChangeMerger {
    /// Creates a merger for one database.
    pub fn new(role: Role, codec: KeyCodec) -> Self {
        Self { role, codec }
    }

    /// Creates a merger from a validated configuration.
    pub fn from_config(config: &CompactionConfig) -> CompactionResult<Self> {
        config.validate()?;
        Ok(Self::new(config.role, config.key_codec()?))
    }

    /// Returns the database this merger consumes.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the key codec.
    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Merges every unconsumed row of the record `key` in `table`.
    ///
    /// Consumed rows are deleted through `store` as they are folded; run the
    /// call inside the caller's transaction so the deletions commit or roll
    /// back together with the produced result.
    ///
    /// # Errors
    ///
    /// Store failures and key decoding failures are returned unmodified.
    /// Rows deleted before the failure stay deleted unless the caller's
    /// transaction rolls back.
    pub fn merge<S: ChangeLogStore + ?Sized>(
        &self,
        store: &S,
        table: &str,
        key: &str,
        resume: Option<&ResumeState>,
    ) -> CompactionResult<LoadOutcome> {
        let mut state = resume.map_or(NetChangeType::None, |r| r.net_type);
        let mut boundary = resume.map_or(LogId::ZERO, |r| r.last_id);
        let mut first_changed_at = resume.and_then(|r| r.first_changed_at);
        let mut last_changed_at = None;
        let mut current_key = key.to_string();
        let mut consumed = 0usize;

        'query: loop {
            let rows = store.entries_after(self.role, table, &current_key, boundary)?;
            if rows.is_empty() {
                break;
            }

            for row in rows {
                boundary = row.id;

                if state.is_unexpected(row.change_type) {
                    warn!(
                        role = %self.role,
                        table,
                        id = row.id.as_u64(),
                        "unexpected {} after {:?} for key {:?}, resolving to {:?}",
                        row.change_type,
                        state,
                        current_key,
                        state.fold(row.change_type)
                    );
                }
                state = state.fold(row.change_type);

                store.delete(self.role, row.id)?;
                consumed += 1;
                first_changed_at.get_or_insert(row.change_time);
                last_changed_at = Some(row.change_time);

                debug!(
                    role = %self.role,
                    table,
                    id = row.id.as_u64(),
                    "folded {} into {:?}",
                    row.change_type,
                    state
                );

                if row.change_type == ChangeType::Update && row.new_key != current_key {
                    debug!(
                        role = %self.role,
                        table,
                        "following key change {:?} -> {:?}",
                        current_key,
                        row.new_key
                    );
                    current_key = row.new_key;
                    continue 'query;
                }
            }
        }

        let (Some(change_type), Some(first_changed_at), Some(last_changed_at)) =
            (state.to_change_type(), first_changed_at, last_changed_at)
        else {
            if consumed > 0 {
                debug!(
                    role = %self.role,
                    table,
                    consumed,
                    "changes for key {:?} cancelled out",
                    current_key
                );
            }
            return Ok(LoadOutcome::NothingLoaded { consumed });
        };

        let (encoded_key, encoded_new_key) = if change_type == ChangeType::Update {
            let origin = resume
                .and_then(|r| r.origin_key.clone())
                .unwrap_or_else(|| key.to_string());
            (origin, Some(current_key))
        } else {
            (current_key, None)
        };

        let change = NetChange {
            table: table.to_string(),
            change_type,
            key: self.codec.decode(&encoded_key)?,
            new_key: encoded_new_key
                .as_deref()
                .map(|k| self.codec.decode(k))
                .transpose()?,
            encoded_key,
            encoded_new_key,
            first_changed_at,
            last_changed_at,
            last_log_id: boundary,
        };

        info!(
            role = %self.role,
            table,
            consumed,
            "loaded net {} for {}",
            change.change_type,
            change.key
        );

        Ok(LoadOutcome::Loaded { change, consumed })
    }
}
