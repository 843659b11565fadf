//! File-backed record store.

use crate::error::{StorageError, StorageResult};
use crate::key::RecordKey;
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::store::{KeyFilter, RecordStore, SupportsTruncate};
use crate::table::Table;
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// On-disk layout of a store file.
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    schema: RecordSchema,
    next_key: i64,
    records: Vec<BTreeMap<String, Value>>,
}

/// A record store persisted as a single JSON document.
///
/// Every successful write rewrites the document through a temporary file
/// and an atomic rename, so readers never observe a half-written store.
/// An advisory lock on `<path>.lock` gives one process exclusive access
/// while the store is open.
///
/// The store supports truncation but not chunked iteration; callers
/// iterating it in batches fall back to whole-collection reads.
///
/// # Example
///
/// ```no_run
/// use recsync_storage::{FileStore, RecordSchema, RecordStore};
/// use std::path::Path;
///
/// let schema = RecordSchema::new("slave", &["id"], &["title"]);
/// let store = FileStore::create(Path::new("slave.json"), schema).unwrap();
/// assert_eq!(store.count().unwrap(), 0);
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    schema: Arc<RecordSchema>,
    table: RwLock<Table>,
    _lock: File,
}

impl FileStore {
    /// Creates a new empty store, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or is locked.
    pub fn create(path: &Path, schema: RecordSchema) -> StorageResult<Self> {
        let lock = Self::acquire_lock(path)?;
        let schema = Arc::new(schema);
        let store = Self {
            path: path.to_path_buf(),
            table: RwLock::new(Table::new(Arc::clone(&schema))),
            schema,
            _lock: lock,
        };
        store.persist(&store.table.read())?;
        Ok(store)
    }

    /// Opens an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, malformed or locked.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let lock = Self::acquire_lock(path)?;
        let reader = BufReader::new(File::open(path)?);
        let doc: StoreDocument = serde_json::from_reader(reader)?;
        let schema = Arc::new(doc.schema);
        let table = Table::from_rows(Arc::clone(&schema), doc.records, doc.next_key)?;
        debug!(path = %path.display(), records = table.len(), "opened file store");
        Ok(Self {
            path: path.to_path_buf(),
            schema,
            table: RwLock::new(table),
            _lock: lock,
        })
    }

    /// Returns the path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_lock(path: &Path) -> StorageResult<File> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path(path))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StorageError::Locked)?;
        Ok(lock_file)
    }

    fn persist(&self, table: &Table) -> StorageResult<()> {
        let doc = StoreDocument {
            schema: table.schema().as_ref().clone(),
            next_key: table.next_key(),
            records: table.rows().cloned().collect(),
        };
        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &doc)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

impl RecordStore for FileStore {
    fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    fn find_by_key(&self, key: &RecordKey) -> StorageResult<Option<Record>> {
        Ok(self.table.read().get(key))
    }

    fn save(&self, record: &mut Record) -> StorageResult<bool> {
        let mut table = self.table.write();
        let mut staged = table.clone();
        let mut candidate = record.clone();
        if !staged.save(&mut candidate)? {
            *record = candidate;
            return Ok(false);
        }
        self.persist(&staged)?;
        *table = staged;
        *record = candidate;
        Ok(true)
    }

    fn delete(&self, record: &Record) -> StorageResult<bool> {
        let mut table = self.table.write();
        if !table.delete(record) {
            return Ok(false);
        }
        self.persist(&table)?;
        Ok(true)
    }

    fn delete_all(&self, filter: &KeyFilter) -> StorageResult<usize> {
        let mut table = self.table.write();
        let removed = table.delete_all(filter);
        if removed > 0 {
            self.persist(&table)?;
        }
        Ok(removed)
    }

    fn iterate_all(&self) -> StorageResult<Vec<Record>> {
        Ok(self.table.read().scan())
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.table.read().len())
    }

    fn as_truncate(&self) -> Option<&dyn SupportsTruncate> {
        Some(self)
    }
}

impl SupportsTruncate for FileStore {
    fn truncate(&self) -> StorageResult<()> {
        let mut table = self.table.write();
        table.clear();
        self.persist(&table)
    }

    fn reset_key_sequence(&self) -> StorageResult<()> {
        let mut table = self.table.write();
        table.reset_sequence();
        self.persist(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn schema() -> RecordSchema {
        RecordSchema::new("slave", &["id"], &["title", "baz"])
            .with_auto_increment()
            .with_required(&["title"])
    }

    fn insert(store: &FileStore, title: &str) -> Record {
        let mut record = store.new_record();
        record.set("title", title).unwrap();
        assert!(store.save(&mut record).unwrap());
        record
    }

    #[test]
    fn file_create_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slave.json");

        {
            let store = FileStore::create(&path, schema()).unwrap();
            insert(&store, "one");
            insert(&store, "two");
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        let found = store.find_by_key(&RecordKey::Int(2)).unwrap().unwrap();
        assert_eq!(found.get("title"), Some(&json!("two")));
        assert_eq!(store.schema().name, "slave");
    }

    #[test]
    fn file_lock_prevents_second_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slave.json");
        let _store = FileStore::create(&path, schema()).unwrap();
        assert!(matches!(FileStore::open(&path), Err(StorageError::Locked)));
    }

    #[test]
    fn file_invalid_save_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slave.json");
        let store = FileStore::create(&path, schema()).unwrap();
        let mut record = store.new_record();
        assert!(!store.save(&mut record).unwrap());
        assert_eq!(record.errors().len(), 1);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn file_truncate_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slave.json");
        {
            let store = FileStore::create(&path, schema()).unwrap();
            insert(&store, "one");
            store.truncate().unwrap();
            store.reset_key_sequence().unwrap();
        }
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 0);
        let record = insert(&store, "again");
        assert_eq!(record.primary_key(), Some(RecordKey::Int(1)));
    }

    #[test]
    fn file_has_no_batch_iteration() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::create(&dir.path().join("s.json"), schema()).unwrap();
        assert!(store.as_batch_iteration().is_none());
        assert!(store.as_truncate().is_some());
    }
}
