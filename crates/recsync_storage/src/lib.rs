//! # recsync storage
//!
//! Record store contract and backends for recsync.
//!
//! This crate defines what the sync engine needs from the stores it
//! mirrors between, and nothing more. Stores own their records; the
//! engine only reads master fields and writes slave fields.
//!
//! ## Design Principles
//!
//! - One uniform contract ([`RecordStore`]) regardless of backend
//! - Optional capabilities ([`SupportsBatchIteration`], [`SupportsTruncate`])
//!   are discovered through accessor methods, never assumed
//! - Validation failure is a `false` return, not an error
//! - Lifecycle notification is opt-in through [`ObservedStore`]
//! - Must be `Send + Sync`
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For caches, tests and ephemeral mirrors
//! - [`FileStore`] - A JSON document on disk
//!
//! ## Example
//!
//! ```rust
//! use recsync_storage::{InMemoryStore, RecordKey, RecordSchema, RecordStore};
//!
//! let store = InMemoryStore::new(RecordSchema::new("users", &["id"], &["name"]));
//! let mut user = store.new_record();
//! user.set("id", 7).unwrap();
//! user.set("name", "alice").unwrap();
//! store.save(&mut user).unwrap();
//!
//! let found = store.find_by_key(&RecordKey::Int(7)).unwrap();
//! assert!(found.is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod key;
mod memory;
mod observer;
mod record;
mod schema;
mod store;
mod table;

pub use error::{BoxError, StorageError, StorageResult};
pub use file::FileStore;
pub use key::RecordKey;
pub use memory::InMemoryStore;
pub use observer::{
    ChangeType, LifecycleObserver, ObservedStore, ObserverId, ReentryGuard, SyncContext,
};
pub use record::{Record, DEFAULT_SCENARIO};
pub use schema::RecordSchema;
pub use serde_json::Value;
pub use store::{Batches, KeyFilter, RecordStore, SupportsBatchIteration, SupportsTruncate};
