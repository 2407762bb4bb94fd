//! # rowsync Core
//!
//! Change types, transition table and composite key codec for rowsync.
//!
//! This crate provides:
//! - `ChangeType` and `NetChangeType` with the fold transition table
//! - `KeyCodec` for composite primary keys stored as delimited strings
//! - `LogEntry`, `NetChange` and `ResumeState` records
//! - `Role` and `LogId` identifiers
//!
//! This is a pure data crate with no I/O operations.
//!
//! ## Example
//!
//! ```rust
//! use rowsync_core::{ChangeType, NetChangeType};
//!
//! let state = NetChangeType::None
//!     .fold(ChangeType::Insert)
//!     .fold(ChangeType::Delete);
//! assert_eq!(state, NetChangeType::None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod entry;
mod error;
mod key;
mod types;

pub use change::{ChangeType, NetChangeType};
pub use entry::{LogEntry, NetChange, ResumeState};
pub use error::{KeyError, KeyResult};
pub use key::{CompositeKey, KeyCodec, DEFAULT_SEPARATOR};
pub use types::{LogId, Role};
