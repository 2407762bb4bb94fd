//! # rowsync Engine
//!
//! Change-log compaction engine for rowsync.
//!
//! Every row-level change in either database is captured into a change log.
//! Before a change can be replicated to the opposite database, all log rows
//! for one logical record are collapsed into a single [`NetChange`]:
//!
//! - insert followed by delete cancels out
//! - delete followed by insert becomes an update
//! - an update that changes the primary key is followed under the new key
//!
//! This crate provides:
//! - [`ChangeMerger`]: folds the rows of one record and consumes them
//! - [`ChangeLoader`]: checks one record, or drains the log oldest-first
//! - [`CompactionConfig`]: separator, role and drain limits
//!
//! ## Key Invariants
//!
//! - Rows of one record are folded in ascending ID order
//! - A folded row is deleted in the same unit of work as the fold
//! - Re-merging an exhausted key is a no-op
//! - A merge with no net effect is a normal outcome, not an error
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use rowsync_core::{ChangeType, Role};
//! use rowsync_engine::{ChangeLoader, CompactionConfig};
//! use rowsync_store::{InMemoryChangeLog, StaticSchema};
//!
//! let log = InMemoryChangeLog::new();
//! log.record_insert(Role::Left, "users", "id|1", Utc::now());
//! log.record_update(Role::Left, "users", "id|1", "id|1", Utc::now());
//!
//! let schema = StaticSchema::new().with_shared_table("users", ["id"]);
//! let loader = ChangeLoader::new(CompactionConfig::new(Role::Left), schema).unwrap();
//!
//! let change = loader.load_oldest(&log).unwrap().into_change().unwrap();
//! assert_eq!(change.change_type, ChangeType::Insert);
//! assert!(log.is_empty(Role::Left));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod loader;
mod merger;

pub use config::CompactionConfig;
pub use error::{CompactionError, CompactionResult};
pub use loader::{ChangeLoader, LoaderStats, RecordKey};
pub use merger::{ChangeMerger, LoadOutcome};

pub use rowsync_core::{NetChange, ResumeState};
