//! A store wrapper that counts operations.
//!
//! Wrap a slave (or master) in a [`CountingStore`] to assert how many
//! lookups and writes a sync performed.

use recsync_storage::{
    KeyFilter, Record, RecordKey, RecordSchema, RecordStore, StorageResult,
    SupportsBatchIteration, SupportsTruncate, SyncContext,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Snapshot of the operations a [`CountingStore`] has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    /// `find_by_key` calls.
    pub finds: usize,
    /// Save attempts, successful or not.
    pub saves: usize,
    /// Successful saves.
    pub writes: usize,
    /// Delete attempts.
    pub deletes: usize,
    /// `delete_all` calls.
    pub bulk_deletes: usize,
    /// `iterate_all` calls.
    pub scans: usize,
}

/// Delegates to an inner store and counts every call.
pub struct CountingStore {
    inner: Arc<dyn RecordStore>,
    finds: AtomicUsize,
    saves: AtomicUsize,
    writes: AtomicUsize,
    deletes: AtomicUsize,
    bulk_deletes: AtomicUsize,
    scans: AtomicUsize,
    refuse_deletes: AtomicBool,
}

impl CountingStore {
    /// Wraps a store.
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            finds: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            bulk_deletes: AtomicUsize::new(0),
            scans: AtomicUsize::new(0),
            refuse_deletes: AtomicBool::new(false),
        }
    }

    /// Returns the current counts.
    pub fn counts(&self) -> OpCounts {
        OpCounts {
            finds: self.finds.load(Ordering::SeqCst),
            saves: self.saves.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
            bulk_deletes: self.bulk_deletes.load(Ordering::SeqCst),
            scans: self.scans.load(Ordering::SeqCst),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in [
            &self.finds,
            &self.saves,
            &self.writes,
            &self.deletes,
            &self.bulk_deletes,
            &self.scans,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    /// Makes single-record deletes report failure without deleting.
    pub fn set_refuse_deletes(&self, refuse: bool) {
        self.refuse_deletes.store(refuse, Ordering::SeqCst);
    }
}

impl RecordStore for CountingStore {
    fn schema(&self) -> &Arc<RecordSchema> {
        self.inner.schema()
    }

    fn find_by_key(&self, key: &RecordKey) -> StorageResult<Option<Record>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_key(key)
    }

    fn save(&self, record: &mut Record) -> StorageResult<bool> {
        self.save_in(record, &SyncContext::new())
    }

    fn delete(&self, record: &Record) -> StorageResult<bool> {
        self.delete_in(record, &SyncContext::new())
    }

    fn delete_all(&self, filter: &KeyFilter) -> StorageResult<usize> {
        self.bulk_deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_all(filter)
    }

    fn iterate_all(&self) -> StorageResult<Vec<Record>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.inner.iterate_all()
    }

    fn count(&self) -> StorageResult<usize> {
        self.inner.count()
    }

    fn save_in(&self, record: &mut Record, ctx: &SyncContext) -> StorageResult<bool> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let saved = self.inner.save_in(record, ctx)?;
        if saved {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(saved)
    }

    fn delete_in(&self, record: &Record, ctx: &SyncContext) -> StorageResult<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.refuse_deletes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.delete_in(record, ctx)
    }

    fn as_batch_iteration(&self) -> Option<&dyn SupportsBatchIteration> {
        self.inner.as_batch_iteration()
    }

    fn as_truncate(&self) -> Option<&dyn SupportsTruncate> {
        self.inner.as_truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{insert_master, memory_master};

    #[test]
    fn counts_calls() {
        let store = CountingStore::new(Arc::new(memory_master()));
        let record = insert_master(&store, "a", "b", 1);
        store.find_by_key(&record.primary_key().unwrap()).unwrap();
        store.iterate_all().unwrap();

        let counts = store.counts();
        assert_eq!(counts.saves, 1);
        assert_eq!(counts.writes, 1);
        assert_eq!(counts.finds, 1);
        assert_eq!(counts.scans, 1);

        store.reset();
        assert_eq!(store.counts(), OpCounts::default());
    }

    #[test]
    fn refused_deletes_leave_records() {
        let store = CountingStore::new(Arc::new(memory_master()));
        let record = insert_master(&store, "a", "b", 1);
        store.set_refuse_deletes(true);
        assert!(!store.delete(&record).unwrap());
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.counts().deletes, 1);
    }
}
