//! Configuration for the compaction engine.

use crate::error::{CompactionError, CompactionResult};
use rowsync_core::{KeyCodec, Role, DEFAULT_SEPARATOR};
use serde::{Deserialize, Serialize};

/// Configuration for merging and draining one database's change log.
///
/// Derives `Deserialize` so a host application can embed it in its own
/// configuration file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Database whose change log is compacted.
    pub role: Role,
    /// Token joining key columns and values in the log.
    ///
    /// Must never occur inside a key column name or value.
    pub key_separator: String,
    /// Maximum number of net changes produced by one drain.
    pub max_drain_changes: usize,
}

impl CompactionConfig {
    /// Creates a configuration for the given role.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            key_separator: DEFAULT_SEPARATOR.to_string(),
            max_drain_changes: 1000,
        }
    }

    /// Sets the key separator.
    pub fn with_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }

    /// Sets the drain limit.
    pub fn with_max_drain_changes(mut self, max: usize) -> Self {
        self.max_drain_changes = max;
        self
    }

    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> CompactionResult<()> {
        if self.key_separator.is_empty() {
            return Err(CompactionError::InvalidConfig(
                "key_separator must not be empty".into(),
            ));
        }
        if self.max_drain_changes == 0 {
            return Err(CompactionError::InvalidConfig(
                "max_drain_changes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Builds the key codec for this configuration.
    pub fn key_codec(&self) -> CompactionResult<KeyCodec> {
        Ok(KeyCodec::new(self.key_separator.clone())?)
    }
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self::new(Role::Left)
    }
}
