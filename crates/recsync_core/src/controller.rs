//! Per-record synchronization.
//!
//! The controller reacts to a single master mutation: it finds or creates
//! the slave with the same primary key, copies mapped values onto it and
//! saves it, or deletes it. While the slave is being written the sync
//! context is marked, so an engine bound in the opposite direction sees
//! the write as an echo and leaves it alone.

use crate::config::{FailureReporting, SyncConfig};
use crate::error::{SyncError, SyncResult};
use recsync_storage::{ChangeType, Record, SyncContext, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What a single sync or delete did to the slave store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The master's scenario is not a trigger.
    Skipped,
    /// A new slave was saved.
    Created,
    /// An existing slave was saved with new values.
    Updated,
    /// The existing slave already held the mapped values.
    Unchanged,
    /// The slave failed validation.
    SaveFailed,
    /// The slave was deleted.
    Deleted,
    /// The slave store refused the delete.
    DeleteFailed,
    /// No slave has the master's key.
    SlaveMissing,
}

impl SyncOutcome {
    /// Returns true for outcomes routed to a failure hook.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::SaveFailed | Self::DeleteFailed | Self::SlaveMissing)
    }

    /// Returns true if the slave store was written.
    pub fn wrote_slave(&self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Deleted)
    }
}

/// Applies master mutations to the slave store.
#[derive(Debug, Clone)]
pub struct SyncController {
    config: Arc<SyncConfig>,
}

impl SyncController {
    /// Creates a controller.
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Arc<SyncConfig> {
        &self.config
    }

    /// Mirrors a saved master record, if its scenario is a save trigger.
    pub fn sync(&self, master: &Record, ctx: &SyncContext) -> SyncResult<SyncOutcome> {
        if !self.config.save_triggers().contains(master.scenario()) {
            trace!(scenario = master.scenario(), "scenario is not a save trigger");
            return Ok(SyncOutcome::Skipped);
        }
        self.sync_with(master, master.is_new(), ctx)
    }

    /// Mirrors a master record reported by a store observer.
    ///
    /// Stores mark a record as persisted before notifying, so the change
    /// type decides whether a slave can already exist.
    pub fn sync_change(
        &self,
        master: &Record,
        change: ChangeType,
        ctx: &SyncContext,
    ) -> SyncResult<SyncOutcome> {
        if !self.config.save_triggers().contains(master.scenario()) {
            trace!(scenario = master.scenario(), ?change, "scenario is not a save trigger");
            return Ok(SyncOutcome::Skipped);
        }
        self.sync_with(master, change == ChangeType::Insert, ctx)
    }

    /// Mirrors a deleted master record, if its scenario is a delete trigger.
    pub fn sync_delete(&self, master: &Record, ctx: &SyncContext) -> SyncResult<SyncOutcome> {
        if !self.config.delete_triggers().contains(master.scenario()) {
            trace!(scenario = master.scenario(), "scenario is not a delete trigger");
            return Ok(SyncOutcome::Skipped);
        }
        self.delete_record(master, ctx)
    }

    /// Mirrors a master record regardless of its scenario.
    ///
    /// A master that was just inserted cannot have a slave yet, so the
    /// lookup is skipped for it.
    pub fn sync_record(&self, master: &Record, ctx: &SyncContext) -> SyncResult<SyncOutcome> {
        self.sync_with(master, master.is_new(), ctx)
    }

    fn sync_with(&self, master: &Record, is_new: bool, ctx: &SyncContext) -> SyncResult<SyncOutcome> {
        let store = self.config.slave();
        let existing = match master.primary_key() {
            Some(key) if !is_new => store.find_by_key(&key)?,
            _ => None,
        };
        let created = existing.is_none();
        let mut slave = existing.unwrap_or_else(|| store.new_record());

        let _guard = ctx.suppress_reentry();
        if let Some(scenario) = self.config.slave_scenario() {
            slave.set_scenario(scenario);
        }
        let loaded = (!created).then(|| slave.fields().clone());
        let changed = self.config.field_map().apply(master, &mut slave)?;
        if let Some(loaded) = loaded {
            if !changed || Self::matches_after_defaults(&slave, &loaded) {
                trace!(schema = %store.schema().name, "slave already up to date");
                return Ok(SyncOutcome::Unchanged);
            }
        }

        if store.save_in(&mut slave, ctx)? {
            debug!(
                schema = %store.schema().name,
                key = ?slave.primary_key(),
                created,
                "slave saved"
            );
            Ok(if created {
                SyncOutcome::Created
            } else {
                SyncOutcome::Updated
            })
        } else {
            self.report_save_failure(&slave)?;
            Ok(SyncOutcome::SaveFailed)
        }
    }

    /// Compares a mapped slave with its stored fields once schema defaults
    /// have filled the empty mapped values.
    fn matches_after_defaults(slave: &Record, loaded: &BTreeMap<String, Value>) -> bool {
        let mut candidate = slave.clone();
        candidate.apply_defaults();
        candidate.fields() == loaded
    }

    /// Deletes the slave of a master record regardless of its scenario.
    pub fn delete_record(&self, master: &Record, ctx: &SyncContext) -> SyncResult<SyncOutcome> {
        let store = self.config.slave();
        let existing = match master.primary_key() {
            Some(key) => store.find_by_key(&key)?,
            None => None,
        };

        let Some(mut slave) = existing else {
            if self.config.failure_reporting() == FailureReporting::Log {
                warn!(
                    schema = %store.schema().name,
                    key = ?master.primary_key(),
                    "slave record not found for delete"
                );
            }
            self.call_delete_hook(None)?;
            return Ok(SyncOutcome::SlaveMissing);
        };

        let _guard = ctx.suppress_reentry();
        if let Some(scenario) = self.config.slave_scenario() {
            slave.set_scenario(scenario);
        }
        if store.delete_in(&slave, ctx)? {
            debug!(schema = %store.schema().name, key = ?slave.primary_key(), "slave deleted");
            Ok(SyncOutcome::Deleted)
        } else {
            if self.config.failure_reporting() == FailureReporting::Log {
                warn!(
                    schema = %store.schema().name,
                    key = ?slave.primary_key(),
                    "slave record could not be deleted"
                );
            }
            self.call_delete_hook(Some(&slave))?;
            Ok(SyncOutcome::DeleteFailed)
        }
    }

    fn report_save_failure(&self, slave: &Record) -> SyncResult<()> {
        match self.config.on_save_failure() {
            Some(hook) => hook(slave).map_err(SyncError::Callback),
            None => {
                if self.config.failure_reporting() == FailureReporting::Log {
                    warn!(
                        schema = %slave.schema().name,
                        key = ?slave.primary_key(),
                        errors = ?slave.errors(),
                        "slave record failed validation"
                    );
                }
                Ok(())
            }
        }
    }

    fn call_delete_hook(&self, slave: Option<&Record>) -> SyncResult<()> {
        match self.config.on_delete_failure() {
            Some(hook) => hook(slave).map_err(SyncError::Callback),
            None => Ok(()),
        }
    }
}
