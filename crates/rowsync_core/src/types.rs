//! Identifier types shared across rowsync crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a change-log row.
///
/// Log IDs are assigned by the writer, strictly increasing and never reused.
/// `LogId::ZERO` sorts before every real row and marks a fresh merge.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogId(pub u64);

impl LogId {
    /// The boundary before any row.
    pub const ZERO: LogId = LogId(0);

    /// Creates a new log ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next log ID.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log:{}", self.0)
    }
}

/// Which of the two synchronized databases an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The left-hand database.
    Left,
    /// The right-hand database.
    Right,
}

impl Role {
    /// Returns the role on the other side of the replication pair.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Role::Left => Role::Right,
            Role::Right => Role::Left,
        }
    }

    /// Returns the lowercase role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Left => "left",
            Role::Right => "right",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Role::Left),
            "right" => Ok(Role::Right),
            other => Err(format!("unknown database role: {other:?}")),
        }
    }
}
