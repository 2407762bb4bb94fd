//! # rowsync Testkit
//!
//! Test utilities for rowsync.
//!
//! This crate provides:
//! - `LogFixture` for seeding an in-memory change log with timestamped rows
//! - Property-based test generators using proptest
//! - `init_test_tracing` for opting into log output with `RUST_LOG`
//!
//! ## Usage
//!
//! ```rust
//! use rowsync_core::Role;
//! use rowsync_testkit::LogFixture;
//!
//! let mut fixture = LogFixture::new(Role::Left).with_table("users");
//! fixture.insert("id|1");
//! fixture.update("id|1", "id|2");
//! assert_eq!(fixture.log().len(Role::Left), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
