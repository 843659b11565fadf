//! A master store bound to a slave store.

use crate::config::SyncConfig;
use crate::controller::{SyncController, SyncOutcome};
use crate::error::SyncResult;
use crate::reconciler::{BatchReconciler, ReconcileReport};
use recsync_storage::{
    BoxError, ChangeType, LifecycleObserver, ObservedStore, ObserverId, Record, RecordStore,
    SyncContext,
};
use std::sync::Arc;
use tracing::trace;

/// Keeps one slave store consistent with one master store.
///
/// An engine can be driven by hand (`sync`, `sync_delete`, `sync_all`) or
/// attached to an [`ObservedStore`] wrapping the master, in which case it
/// reacts to every save and delete made through that wrapper.
///
/// ```rust
/// use recsync_core::{FieldMapSpec, SyncConfig, SyncEngine};
/// use recsync_storage::{InMemoryStore, ObservedStore, RecordSchema, RecordStore};
/// use std::sync::Arc;
///
/// let schema = RecordSchema::new("users", &["id"], &["id", "name"]);
/// let master = Arc::new(ObservedStore::new(Arc::new(InMemoryStore::new(schema.clone()))));
/// let slave = Arc::new(InMemoryStore::new(schema));
///
/// let config = SyncConfig::builder()
///     .with_slave(slave.clone())
///     .with_field_map(FieldMapSpec::shared(["id", "name"]))
///     .build()
///     .unwrap();
/// let engine = Arc::new(SyncEngine::new(master.clone(), config).unwrap());
/// engine.attach(&master);
///
/// let mut user = master.new_record();
/// user.set("id", 1).unwrap();
/// user.set("name", "alice").unwrap();
/// master.save(&mut user).unwrap();
///
/// assert_eq!(slave.count().unwrap(), 1);
/// ```
pub struct SyncEngine {
    master: Arc<dyn RecordStore>,
    controller: SyncController,
}

impl SyncEngine {
    /// Binds `master` to the slave named in `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the field map copies a master
    /// field the master schema does not declare.
    pub fn new(master: Arc<dyn RecordStore>, config: SyncConfig) -> SyncResult<Self> {
        config.field_map().check_master(master.schema())?;
        Ok(Self {
            master,
            controller: SyncController::new(Arc::new(config)),
        })
    }

    /// Returns the master store.
    pub fn master(&self) -> &Arc<dyn RecordStore> {
        &self.master
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Arc<SyncConfig> {
        self.controller.config()
    }

    /// Returns the per-record controller.
    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    /// Subscribes the engine to saves and deletes made through `store`.
    ///
    /// The store only holds a weak reference; dropping the last `Arc` to
    /// the engine detaches it. Pass the returned id to
    /// [`ObservedStore::unobserve`] to detach earlier.
    pub fn attach(self: &Arc<Self>, store: &ObservedStore) -> ObserverId {
        let observer: Arc<dyn LifecycleObserver> = self.clone();
        store.observe(&observer)
    }

    /// Mirrors a saved master record, gated by the save triggers.
    pub fn sync(&self, master: &Record) -> SyncResult<SyncOutcome> {
        self.controller.sync(master, &SyncContext::new())
    }

    /// Mirrors a deleted master record, gated by the delete triggers.
    pub fn sync_delete(&self, master: &Record) -> SyncResult<SyncOutcome> {
        self.controller.sync_delete(master, &SyncContext::new())
    }

    /// Reconciles the whole slave store with the master.
    pub fn sync_all(&self, clear_first: bool, batch_size: usize) -> SyncResult<ReconcileReport> {
        BatchReconciler::new(&self.controller, self.master.as_ref()).sync_all(clear_first, batch_size)
    }

    /// Reconciles without clearing, using the configured batch size.
    pub fn sync_all_default(&self) -> SyncResult<ReconcileReport> {
        self.sync_all(false, self.config().default_batch_size())
    }

    /// Empties the slave store. Returns the number of records deleted.
    pub fn clear_slave(&self) -> SyncResult<usize> {
        BatchReconciler::clear_slave(self.config().slave().as_ref())
    }
}

impl LifecycleObserver for SyncEngine {
    fn on_after_save(
        &self,
        record: &Record,
        change: ChangeType,
        ctx: &SyncContext,
    ) -> Result<(), BoxError> {
        if ctx.is_reentry_suppressed() {
            trace!(?change, "ignoring save made by a sync");
            return Ok(());
        }
        self.controller.sync_change(record, change, ctx)?;
        Ok(())
    }

    fn on_after_delete(&self, record: &Record, ctx: &SyncContext) -> Result<(), BoxError> {
        if ctx.is_reentry_suppressed() {
            trace!("ignoring delete made by a sync");
            return Ok(());
        }
        self.controller.sync_delete(record, ctx)?;
        Ok(())
    }
}
