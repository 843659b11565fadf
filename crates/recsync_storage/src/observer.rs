//! Lifecycle observers.
//!
//! Hosts wrap a store in an [`ObservedStore`] and register observers on
//! it. After every successful save or delete made through the wrapper,
//! each live observer is called inline with the written record and the
//! [`SyncContext`] of the call.
//!
//! # Re-entry suppression
//!
//! When an observer writes into another observed store (a sync engine
//! mirroring into its slave), it raises the context's re-entry flag for
//! the duration of that write. Observers of the target store see the flag
//! and must not write back, which breaks the loop in two-way setups.
//!
//! ```rust
//! use recsync_storage::SyncContext;
//!
//! let ctx = SyncContext::new();
//! {
//!     let _guard = ctx.suppress_reentry();
//!     assert!(ctx.is_reentry_suppressed());
//! }
//! assert!(!ctx.is_reentry_suppressed());
//! ```

use crate::error::{BoxError, StorageError, StorageResult};
use crate::key::RecordKey;
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::store::{KeyFilter, RecordStore, SupportsBatchIteration, SupportsTruncate};
use parking_lot::RwLock;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Type of a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// The record did not exist before the save.
    Insert,
    /// An existing record was saved.
    Update,
    /// The record was deleted.
    Delete,
}

/// Per-call context threaded through a chain of observed writes.
#[derive(Debug, Default)]
pub struct SyncContext {
    suppress_reentry: Cell<bool>,
}

impl SyncContext {
    /// Creates a context with re-entry allowed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a sync write is in progress on this call chain.
    pub fn is_reentry_suppressed(&self) -> bool {
        self.suppress_reentry.get()
    }

    /// Raises the re-entry flag until the returned guard is dropped.
    ///
    /// Guards nest: dropping an inner guard restores the outer state.
    #[must_use = "the flag is cleared as soon as the guard is dropped"]
    pub fn suppress_reentry(&self) -> ReentryGuard<'_> {
        let previous = self.suppress_reentry.replace(true);
        ReentryGuard { ctx: self, previous }
    }
}

/// Scope of a raised re-entry flag. See [`SyncContext::suppress_reentry`].
#[derive(Debug)]
pub struct ReentryGuard<'a> {
    ctx: &'a SyncContext,
    previous: bool,
}

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        self.ctx.suppress_reentry.set(self.previous);
    }
}

/// Callback interface the observed store calls into after writes.
///
/// Errors returned here propagate to the caller of the store operation
/// as [`StorageError::Observer`]; the write itself has already happened.
pub trait LifecycleObserver: Send + Sync {
    /// Called after a record was saved.
    fn on_after_save(
        &self,
        record: &Record,
        change: ChangeType,
        ctx: &SyncContext,
    ) -> Result<(), BoxError>;

    /// Called after a record was deleted.
    fn on_after_delete(&self, record: &Record, ctx: &SyncContext) -> Result<(), BoxError>;
}

/// Handle identifying a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// A store wrapper that notifies observers after successful writes.
///
/// Observers are held weakly: the registry never keeps an observer alive,
/// so two stores observing each other through sync engines do not leak.
/// Dropped observers are pruned on the next notification.
pub struct ObservedStore {
    inner: Arc<dyn RecordStore>,
    observers: RwLock<Vec<(ObserverId, Weak<dyn LifecycleObserver>)>>,
    next_id: AtomicU64,
}

impl ObservedStore {
    /// Wraps a store.
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &Arc<dyn RecordStore> {
        &self.inner
    }

    /// Registers an observer.
    pub fn observe(&self, observer: &Arc<dyn LifecycleObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().push((id, Arc::downgrade(observer)));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    /// Returns the number of live observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .iter()
            .filter(|(_, o)| o.strong_count() > 0)
            .count()
    }

    /// Snapshots live observers so no lock is held while they run.
    fn live_observers(&self) -> Vec<Arc<dyn LifecycleObserver>> {
        let mut observers = self.observers.write();
        observers.retain(|(_, o)| o.strong_count() > 0);
        observers.iter().filter_map(|(_, o)| o.upgrade()).collect()
    }
}

impl RecordStore for ObservedStore {
    fn schema(&self) -> &Arc<RecordSchema> {
        self.inner.schema()
    }

    fn find_by_key(&self, key: &RecordKey) -> StorageResult<Option<Record>> {
        self.inner.find_by_key(key)
    }

    fn save(&self, record: &mut Record) -> StorageResult<bool> {
        self.save_in(record, &SyncContext::new())
    }

    fn delete(&self, record: &Record) -> StorageResult<bool> {
        self.delete_in(record, &SyncContext::new())
    }

    fn delete_all(&self, filter: &KeyFilter) -> StorageResult<usize> {
        self.inner.delete_all(filter)
    }

    fn iterate_all(&self) -> StorageResult<Vec<Record>> {
        self.inner.iterate_all()
    }

    fn count(&self) -> StorageResult<usize> {
        self.inner.count()
    }

    fn save_in(&self, record: &mut Record, ctx: &SyncContext) -> StorageResult<bool> {
        let change = if record.is_new() {
            ChangeType::Insert
        } else {
            ChangeType::Update
        };
        if !self.inner.save_in(record, ctx)? {
            return Ok(false);
        }
        for observer in self.live_observers() {
            observer
                .on_after_save(record, change, ctx)
                .map_err(StorageError::Observer)?;
        }
        Ok(true)
    }

    fn delete_in(&self, record: &Record, ctx: &SyncContext) -> StorageResult<bool> {
        if !self.inner.delete_in(record, ctx)? {
            return Ok(false);
        }
        for observer in self.live_observers() {
            observer
                .on_after_delete(record, ctx)
                .map_err(StorageError::Observer)?;
        }
        Ok(true)
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
    use crate::memory::InMemoryStore;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(ChangeType, bool)>>,
    }

    impl LifecycleObserver for Recorder {
        fn on_after_save(
            &self,
            _record: &Record,
            change: ChangeType,
            ctx: &SyncContext,
        ) -> Result<(), BoxError> {
            self.events.lock().push((change, ctx.is_reentry_suppressed()));
            Ok(())
        }

        fn on_after_delete(&self, _record: &Record, ctx: &SyncContext) -> Result<(), BoxError> {
            self.events
                .lock()
                .push((ChangeType::Delete, ctx.is_reentry_suppressed()));
            Ok(())
        }
    }

    struct Failing;

    impl LifecycleObserver for Failing {
        fn on_after_save(&self, _: &Record, _: ChangeType, _: &SyncContext) -> Result<(), BoxError> {
            Err("observer refused".into())
        }

        fn on_after_delete(&self, _: &Record, _: &SyncContext) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn store() -> ObservedStore {
        let schema = RecordSchema::new("items", &["id"], &["name"]).with_auto_increment();
        ObservedStore::new(Arc::new(InMemoryStore::new(schema)))
    }

    #[test]
    fn guard_restores_previous_state() {
        let ctx = SyncContext::new();
        let outer = ctx.suppress_reentry();
        {
            let _inner = ctx.suppress_reentry();
            assert!(ctx.is_reentry_suppressed());
        }
        assert!(ctx.is_reentry_suppressed());
        drop(outer);
        assert!(!ctx.is_reentry_suppressed());
    }

    #[test]
    fn observers_see_insert_update_delete() {
        let store = store();
        let recorder = Arc::new(Recorder::default());
        let observer: Arc<dyn LifecycleObserver> = recorder.clone();
        store.observe(&observer);

        let mut record = store.new_record();
        record.set("name", "a").unwrap();
        assert!(store.save(&mut record).unwrap());
        assert!(store.save(&mut record).unwrap());
        assert!(store.delete(&record).unwrap());

        let events = recorder.events.lock().clone();
        assert_eq!(
            events,
            vec![
                (ChangeType::Insert, false),
                (ChangeType::Update, false),
                (ChangeType::Delete, false)
            ]
        );
    }

    #[test]
    fn context_flag_reaches_observers() {
        let store = store();
        let recorder = Arc::new(Recorder::default());
        let observer: Arc<dyn LifecycleObserver> = recorder.clone();
        store.observe(&observer);

        let ctx = SyncContext::new();
        let mut record = store.new_record();
        {
            let _guard = ctx.suppress_reentry();
            store.save_in(&mut record, &ctx).unwrap();
        }
        assert_eq!(recorder.events.lock()[0], (ChangeType::Insert, true));
    }

    #[test]
    fn failed_delete_does_not_notify() {
        let store = store();
        let recorder = Arc::new(Recorder::default());
        let observer: Arc<dyn LifecycleObserver> = recorder.clone();
        store.observe(&observer);

        let mut record = store.new_record();
        record.set("id", 99).unwrap();
        assert!(!store.delete(&record).unwrap());
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let store = store();
        let observer: Arc<dyn LifecycleObserver> = Arc::new(Recorder::default());
        store.observe(&observer);
        assert_eq!(store.observer_count(), 1);
        drop(observer);
        assert_eq!(store.observer_count(), 0);

        let mut record = store.new_record();
        assert!(store.save(&mut record).unwrap());
    }

    #[test]
    fn unobserve_removes() {
        let store = store();
        let observer: Arc<dyn LifecycleObserver> = Arc::new(Recorder::default());
        let id = store.observe(&observer);
        assert!(store.unobserve(id));
        assert!(!store.unobserve(id));
        assert_eq!(store.observer_count(), 0);
    }

    #[test]
    fn observer_error_propagates_after_write() {
        let store = store();
        let observer: Arc<dyn LifecycleObserver> = Arc::new(Failing);
        store.observe(&observer);

        let mut record = store.new_record();
        let err = store.save(&mut record).unwrap_err();
        assert!(matches!(err, StorageError::Observer(_)));
        assert_eq!(store.count().unwrap(), 1);
    }
}
