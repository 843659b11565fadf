//! Record store contract.

use crate::error::StorageResult;
use crate::key::RecordKey;
use crate::observer::SyncContext;
use crate::record::Record;
use crate::schema::RecordSchema;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Selects records for bulk deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFilter {
    /// Every record.
    All,
    /// Records whose key is not in the set.
    NotIn(BTreeSet<RecordKey>),
}

impl KeyFilter {
    /// Returns true if the filter selects the key.
    #[must_use]
    pub fn matches(&self, key: &RecordKey) -> bool {
        match self {
            KeyFilter::All => true,
            KeyFilter::NotIn(keep) => !keep.contains(key),
        }
    }
}

/// A store of records sharing one schema.
///
/// This is the minimal contract the sync engine needs from a backend,
/// whether it is a relational table, a key-value store or a file.
///
/// # Invariants
///
/// - `save` returns `Ok(false)` when validation fails and leaves the
///   messages on the record; inserting a key that is already stored is a
///   validation failure. `Err` is reserved for I/O and unusable keys
/// - a successful `save` clears the record's new flag and populates its key
/// - `delete` returns `Ok(false)` when there was nothing to delete
/// - `delete_all` bypasses lifecycle observers
///
/// Optional capabilities are exposed through [`as_batch_iteration`] and
/// [`as_truncate`]; callers must fall back when they return `None`.
///
/// [`as_batch_iteration`]: RecordStore::as_batch_iteration
/// [`as_truncate`]: RecordStore::as_truncate
pub trait RecordStore: Send + Sync {
    /// Returns the schema of stored records.
    fn schema(&self) -> &Arc<RecordSchema>;

    /// Creates an empty, unsaved record for this store.
    fn new_record(&self) -> Record {
        Record::new(Arc::clone(self.schema()))
    }

    /// Looks a record up by primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn find_by_key(&self, key: &RecordKey) -> StorageResult<Option<Record>>;

    /// Validates and persists a record.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, on a missing or unusable key,
    /// or when an observer fails after the write.
    fn save(&self, record: &mut Record) -> StorageResult<bool>;

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or when an observer fails.
    fn delete(&self, record: &Record) -> StorageResult<bool>;

    /// Removes every record selected by the filter, returning the count.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    fn delete_all(&self, filter: &KeyFilter) -> StorageResult<usize>;

    /// Reads the whole collection in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn iterate_all(&self) -> StorageResult<Vec<Record>>;

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn count(&self) -> StorageResult<usize>;

    /// Saves within a sync context.
    ///
    /// Plain stores ignore the context; [`crate::ObservedStore`] hands it
    /// to its observers.
    fn save_in(&self, record: &mut Record, _ctx: &SyncContext) -> StorageResult<bool> {
        self.save(record)
    }

    /// Deletes within a sync context.
    fn delete_in(&self, record: &Record, _ctx: &SyncContext) -> StorageResult<bool> {
        self.delete(record)
    }

    /// Returns the chunked-iteration capability, if supported.
    fn as_batch_iteration(&self) -> Option<&dyn SupportsBatchIteration> {
        None
    }

    /// Returns the truncate capability, if supported.
    fn as_truncate(&self) -> Option<&dyn SupportsTruncate> {
        None
    }
}

/// Stores that can page through their records in key order.
pub trait SupportsBatchIteration: Send + Sync {
    /// Returns up to `limit` records with keys greater than `after`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn next_batch(&self, after: Option<&RecordKey>, limit: usize) -> StorageResult<Vec<Record>>;
}

/// Stores whose physical storage can be reset independently of row deletes.
pub trait SupportsTruncate: Send + Sync {
    /// Drops all records and reclaims their storage.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    fn truncate(&self) -> StorageResult<()>;

    /// Restarts key assignment from the first key.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    fn reset_key_sequence(&self) -> StorageResult<()>;
}

/// Lazy iterator over batches of a [`SupportsBatchIteration`] store.
///
/// Each step fetches the next chunk after the last key seen, so no lock
/// or cursor is held between batches. Iteration stops after the first
/// short or failed batch.
pub struct Batches<'a> {
    source: &'a dyn SupportsBatchIteration,
    batch_size: usize,
    after: Option<RecordKey>,
    done: bool,
}

impl<'a> Batches<'a> {
    /// Creates a batch iterator fetching `batch_size` records per step.
    pub fn new(source: &'a dyn SupportsBatchIteration, batch_size: NonZeroUsize) -> Self {
        Self {
            source,
            batch_size: batch_size.get(),
            after: None,
            done: false,
        }
    }
}

impl Iterator for Batches<'_> {
    type Item = StorageResult<Vec<Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.next_batch(self.after.as_ref(), self.batch_size) {
            Ok(batch) => {
                if batch.len() < self.batch_size {
                    self.done = true;
                }
                if batch.is_empty() {
                    return None;
                }
                self.after = batch.last().and_then(Record::primary_key);
                if self.after.is_none() {
                    self.done = true;
                }
                Some(Ok(batch))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_filter_matches() {
        assert!(KeyFilter::All.matches(&RecordKey::Int(1)));

        let keep: BTreeSet<RecordKey> = [RecordKey::Int(1), RecordKey::Int(2)].into();
        let filter = KeyFilter::NotIn(keep);
        assert!(!filter.matches(&RecordKey::Int(1)));
        assert!(filter.matches(&RecordKey::Int(3)));
    }
}
