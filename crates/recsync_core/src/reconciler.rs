//! Full-store reconciliation.
//!
//! A reconcile pass walks every master record, mirrors it into the slave
//! store and then deletes the slaves whose keys were never seen. Stores
//! that can page through their records are read in batches; others are
//! read in one go.

use crate::controller::{SyncController, SyncOutcome};
use crate::error::{SyncError, SyncResult};
use recsync_storage::{Batches, KeyFilter, Record, RecordKey, RecordStore, SyncContext};
use serde::Serialize;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use tracing::{debug, info};

/// Counters describing one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Distinct master keys seen.
    pub observed: usize,
    /// Slaves created.
    pub created: usize,
    /// Slaves updated.
    pub updated: usize,
    /// Slaves that already matched their master.
    pub unchanged: usize,
    /// Slaves that failed validation.
    pub failed: usize,
    /// Slaves deleted because no master had their key.
    pub orphans_deleted: usize,
    /// Slaves removed by clearing before the pass.
    pub cleared: usize,
    /// Whether the master was read in batches.
    pub batched: bool,
}

impl ReconcileReport {
    fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::SaveFailed => self.failed += 1,
            _ => {}
        }
    }
}

/// Brings a whole slave store in line with its master.
pub struct BatchReconciler<'a> {
    controller: &'a SyncController,
    master: &'a dyn RecordStore,
}

impl<'a> BatchReconciler<'a> {
    /// Creates a reconciler for `master` using the controller's binding.
    pub fn new(controller: &'a SyncController, master: &'a dyn RecordStore) -> Self {
        Self { controller, master }
    }

    /// Mirrors every master record into the slave store.
    ///
    /// With `clear_first` the slave store is emptied beforehand and no
    /// orphan pass is needed. Otherwise slaves whose keys no master record
    /// carried are deleted at the end; when the master is empty nothing is
    /// deleted.
    ///
    /// Trigger sets do not apply here. Slaves failing validation go to the
    /// save failure hook and the pass continues; errors from stores or
    /// callbacks abort it.
    pub fn sync_all(&self, clear_first: bool, batch_size: usize) -> SyncResult<ReconcileReport> {
        let batch_size = NonZeroUsize::new(batch_size)
            .ok_or_else(|| SyncError::configuration("batch size must be at least 1"))?;

        let slave = self.controller.config().slave();
        let mut report = ReconcileReport::default();
        if clear_first {
            report.cleared = Self::clear_slave(slave.as_ref())?;
        }

        let mut observed = BTreeSet::new();
        match self.master.as_batch_iteration() {
            Some(source) => {
                report.batched = true;
                for batch in Batches::new(source, batch_size) {
                    let batch = batch?;
                    debug!(size = batch.len(), "reconciling batch");
                    for record in &batch {
                        self.visit(record, &mut observed, &mut report)?;
                    }
                }
            }
            None => {
                for record in &self.master.iterate_all()? {
                    self.visit(record, &mut observed, &mut report)?;
                }
            }
        }
        report.observed = observed.len();

        if !clear_first && !observed.is_empty() {
            report.orphans_deleted = slave.delete_all(&KeyFilter::NotIn(observed))?;
        }

        info!(
            master = %self.master.schema().name,
            slave = %slave.schema().name,
            observed = report.observed,
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            orphans_deleted = report.orphans_deleted,
            "reconcile finished"
        );
        Ok(report)
    }

    /// Removes every slave record and resets the key sequence where the
    /// store supports it. Returns the number of records deleted.
    pub fn clear_slave(slave: &dyn RecordStore) -> SyncResult<usize> {
        let removed = slave.delete_all(&KeyFilter::All)?;
        if let Some(truncate) = slave.as_truncate() {
            truncate.truncate()?;
            truncate.reset_key_sequence()?;
        }
        debug!(schema = %slave.schema().name, removed, "slave store cleared");
        Ok(removed)
    }

    fn visit(
        &self,
        record: &Record,
        observed: &mut BTreeSet<RecordKey>,
        report: &mut ReconcileReport,
    ) -> SyncResult<()> {
        if let Some(key) = record.primary_key() {
            observed.insert(key);
        }
        let ctx = SyncContext::new();
        let outcome = self.controller.sync_record(record, &ctx)?;
        report.record(outcome);
        Ok(())
    }
}
