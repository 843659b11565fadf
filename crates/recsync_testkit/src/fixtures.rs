//! Test fixtures and store helpers.
//!
//! The master and slave schemas share a key but differ in field names
//! and rules, so a field map between them needs a rename and the slave
//! can fail validation where the master did not.

use recsync_storage::{FileStore, InMemoryStore, Record, RecordSchema, RecordStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Maximum length of text fields in both fixture schemas.
pub const MAX_TEXT_LEN: usize = 15;

/// Master schema: `id` (assigned), `name`, `foo`, `bar`, `baz`.
///
/// `name` and `foo` are required, `bar` defaults to `"masterdefault"`.
pub fn master_schema() -> RecordSchema {
    RecordSchema::new("master", &["id"], &["id", "name", "foo", "bar", "baz"])
        .with_auto_increment()
        .with_default("bar", "masterdefault")
        .with_required(&["name", "foo"])
        .with_max_len("name", MAX_TEXT_LEN)
        .with_max_len("foo", MAX_TEXT_LEN)
        .with_max_len("bar", MAX_TEXT_LEN)
}

/// Slave schema: `id`, `title`, `foo`, `bar`, `baz`.
///
/// `title`, `foo` and `baz` are required, `bar` defaults to
/// `"slavedefault"`. Keys are never assigned by the slave store.
pub fn slave_schema() -> RecordSchema {
    RecordSchema::new("slave", &["id"], &["id", "title", "foo", "bar", "baz"])
        .with_default("bar", "slavedefault")
        .with_required(&["title", "foo", "baz"])
        .with_max_len("title", MAX_TEXT_LEN)
        .with_max_len("foo", MAX_TEXT_LEN)
        .with_max_len("bar", MAX_TEXT_LEN)
}

/// Creates an empty in-memory master store.
pub fn memory_master() -> InMemoryStore {
    InMemoryStore::new(master_schema())
}

/// Creates an empty in-memory slave store.
pub fn memory_slave() -> InMemoryStore {
    InMemoryStore::new(slave_schema())
}

/// Saves a new master record and returns it.
///
/// # Panics
///
/// Panics if the record fails validation.
pub fn insert_master(store: &dyn RecordStore, name: &str, foo: &str, baz: i64) -> Record {
    let mut record = store.new_record();
    record.set("name", name).expect("master has name");
    record.set("foo", foo).expect("master has foo");
    record.set("baz", baz).expect("master has baz");
    assert!(
        store.save(&mut record).expect("save master"),
        "master failed validation: {:?}",
        record.errors()
    );
    record
}

/// Saves `count` master records named `name0`, `name1`, ...
pub fn fill_master(store: &dyn RecordStore, count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| insert_master(store, &format!("name{i}"), &format!("foo{i}"), 10 + i as i64))
        .collect()
}

/// A temporary directory for file-backed stores, removed on drop.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates a new temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the path of a file inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Creates a file store named `name` with `schema`.
    pub fn create_store(&self, name: &str, schema: RecordSchema) -> FileStore {
        FileStore::create(&self.file(name), schema).expect("Failed to create file store")
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
