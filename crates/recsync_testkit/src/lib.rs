//! # recsync testkit
//!
//! Test utilities for recsync.
//!
//! This crate provides:
//! - Master and slave fixture schemas with validation rules
//! - Temporary directories holding file-backed stores
//! - A store wrapper that counts lookups and writes
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use recsync_testkit::prelude::*;
//! use recsync_storage::RecordStore;
//!
//! let master = memory_master();
//! let record = insert_master(&master, "alice", "bar", 10);
//! assert_eq!(master.count().unwrap(), 1);
//! assert!(!record.is_new());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod counting;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::counting::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use counting::*;
pub use fixtures::*;
pub use generators::*;
