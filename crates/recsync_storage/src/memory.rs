//! In-memory record store.

use crate::error::StorageResult;
use crate::key::RecordKey;
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::store::{KeyFilter, RecordStore, SupportsBatchIteration, SupportsTruncate};
use crate::table::Table;
use parking_lot::RwLock;
use std::sync::Arc;

/// An in-memory record store.
///
/// Suitable for tests, caches and ephemeral mirrors. Supports chunked
/// iteration and truncation with key sequence reset.
///
/// # Thread Safety
///
/// The store is thread-safe; each operation takes the internal lock once
/// and releases it before returning.
///
/// # Example
///
/// ```rust
/// use recsync_storage::{InMemoryStore, RecordSchema, RecordStore};
///
/// let store = InMemoryStore::new(
///     RecordSchema::new("users", &["id"], &["name"]).with_auto_increment(),
/// );
/// let mut user = store.new_record();
/// user.set("name", "alice").unwrap();
/// assert!(store.save(&mut user).unwrap());
/// assert_eq!(store.count().unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    schema: Arc<RecordSchema>,
    table: RwLock<Table>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(schema: RecordSchema) -> Self {
        let schema = Arc::new(schema);
        Self {
            table: RwLock::new(Table::new(Arc::clone(&schema))),
            schema,
        }
    }

    /// Returns the key the next auto-assigned record will receive.
    #[must_use]
    pub fn next_key(&self) -> i64 {
        self.table.read().next_key()
    }

    /// Returns all keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<RecordKey> {
        self.table
            .read()
            .scan()
            .iter()
            .filter_map(Record::primary_key)
            .collect()
    }
}

impl RecordStore for InMemoryStore {
    fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    fn find_by_key(&self, key: &RecordKey) -> StorageResult<Option<Record>> {
        Ok(self.table.read().get(key))
    }

    fn save(&self, record: &mut Record) -> StorageResult<bool> {
        self.table.write().save(record)
    }

    fn delete(&self, record: &Record) -> StorageResult<bool> {
        Ok(self.table.write().delete(record))
    }

    fn delete_all(&self, filter: &KeyFilter) -> StorageResult<usize> {
        Ok(self.table.write().delete_all(filter))
    }

    fn iterate_all(&self) -> StorageResult<Vec<Record>> {
        Ok(self.table.read().scan())
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.table.read().len())
    }

    fn as_batch_iteration(&self) -> Option<&dyn SupportsBatchIteration> {
        Some(self)
    }

    fn as_truncate(&self) -> Option<&dyn SupportsTruncate> {
        Some(self)
    }
}

impl SupportsBatchIteration for InMemoryStore {
    fn next_batch(&self, after: Option<&RecordKey>, limit: usize) -> StorageResult<Vec<Record>> {
        Ok(self.table.read().batch_after(after, limit))
    }
}

impl SupportsTruncate for InMemoryStore {
    fn truncate(&self) -> StorageResult<()> {
        self.table.write().clear();
        Ok(())
    }

    fn reset_key_sequence(&self) -> StorageResult<()> {
        self.table.write().reset_sequence();
        Ok(())
    }
}
