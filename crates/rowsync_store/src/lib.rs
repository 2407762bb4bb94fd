//! # rowsync Store
//!
//! Change-log store and schema collaborator traits for rowsync.
//!
//! The change log itself is owned by the host application: a table written
//! by triggers or the application layer, one row per captured change. This
//! crate defines the narrow interface the compaction engine needs from it:
//!
//! - ordered range scans by (table, key, id > bound)
//! - the globally oldest remaining row
//! - deletion by row ID
//!
//! every operation addressed to one database [`Role`](rowsync_core::Role).
//!
//! ## Available Implementations
//!
//! - [`InMemoryChangeLog`] - For testing and embedding
//! - [`ChangeLogTransaction`] - Unit of work with rollback over the in-memory log
//! - [`StaticSchema`] - Fixed primary-key column lists
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use rowsync_core::{LogId, Role};
//! use rowsync_store::{ChangeLogStore, InMemoryChangeLog};
//!
//! let log = InMemoryChangeLog::new();
//! log.record_insert(Role::Left, "users", "id|1", Utc::now());
//!
//! let oldest = log.oldest(Role::Left).unwrap().unwrap();
//! assert_eq!(oldest.id, LogId::new(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;
mod row;
mod schema;

pub use backend::ChangeLogStore;
pub use error::{StoreError, StoreResult};
pub use memory::{ChangeLogTransaction, InMemoryChangeLog};
pub use row::LogRow;
pub use schema::{SchemaSource, StaticSchema};
