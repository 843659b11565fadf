//! Configuration for a sync binding.

use crate::error::{SyncError, SyncResult};
use crate::field_map::{FieldMap, FieldMapSpec};
use crate::settings::SyncSettings;
use recsync_storage::{BoxError, Record, RecordStore, DEFAULT_SCENARIO};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Batch size used by [`crate::SyncEngine::sync_all_default`].
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Hook invoked with the slave record after a failed save.
pub type SaveFailureHook = Arc<dyn Fn(&Record) -> Result<(), BoxError> + Send + Sync>;

/// Hook invoked after a failed delete, or with `None` if the slave was missing.
pub type DeleteFailureHook = Arc<dyn Fn(Option<&Record>) -> Result<(), BoxError> + Send + Sync>;

/// The scenario tags that let a master mutation through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSet(BTreeSet<String>);

impl TriggerSet {
    /// Creates a trigger set from tags.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    /// A trigger set that lets nothing through.
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// Returns true if mutations tagged `scenario` should sync.
    pub fn contains(&self, scenario: &str) -> bool {
        self.0.contains(scenario)
    }

    /// Returns true if nothing can trigger a sync.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the tags.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for TriggerSet {
    fn default() -> Self {
        Self::new([DEFAULT_SCENARIO])
    }
}

/// What happens to a failure when no hook is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureReporting {
    /// Emit a `warn` event with the slave's validation errors.
    #[default]
    Log,
    /// Drop the failure without a trace.
    Silent,
}

/// Immutable configuration of one master-to-slave binding.
///
/// Built with [`SyncConfig::builder`]; the field map is normalized and
/// checked against the slave schema by [`SyncConfigBuilder::build`].
pub struct SyncConfig {
    slave: Arc<dyn RecordStore>,
    field_map: FieldMap,
    slave_scenario: Option<String>,
    save_triggers: TriggerSet,
    delete_triggers: TriggerSet,
    on_save_failure: Option<SaveFailureHook>,
    on_delete_failure: Option<DeleteFailureHook>,
    failure_reporting: FailureReporting,
    default_batch_size: usize,
}

impl SyncConfig {
    /// Starts building a configuration.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Returns the slave store.
    pub fn slave(&self) -> &Arc<dyn RecordStore> {
        &self.slave
    }

    /// Returns the normalized field map.
    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    /// Returns the scenario applied to slaves before they are written.
    pub fn slave_scenario(&self) -> Option<&str> {
        self.slave_scenario.as_deref()
    }

    /// Returns the tags that trigger a save sync.
    pub fn save_triggers(&self) -> &TriggerSet {
        &self.save_triggers
    }

    /// Returns the tags that trigger a delete sync.
    pub fn delete_triggers(&self) -> &TriggerSet {
        &self.delete_triggers
    }

    /// Returns the save failure hook.
    pub fn on_save_failure(&self) -> Option<&SaveFailureHook> {
        self.on_save_failure.as_ref()
    }

    /// Returns the delete failure hook.
    pub fn on_delete_failure(&self) -> Option<&DeleteFailureHook> {
        self.on_delete_failure.as_ref()
    }

    /// Returns how unhooked failures are reported.
    pub fn failure_reporting(&self) -> FailureReporting {
        self.failure_reporting
    }

    /// Returns the batch size used when none is given.
    pub fn default_batch_size(&self) -> usize {
        self.default_batch_size
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("slave", &self.slave.schema().name)
            .field("field_map", &self.field_map)
            .field("slave_scenario", &self.slave_scenario)
            .field("save_triggers", &self.save_triggers)
            .field("delete_triggers", &self.delete_triggers)
            .field("on_save_failure", &self.on_save_failure.is_some())
            .field("on_delete_failure", &self.on_delete_failure.is_some())
            .field("failure_reporting", &self.failure_reporting)
            .field("default_batch_size", &self.default_batch_size)
            .finish()
    }
}

/// Builder for [`SyncConfig`].
pub struct SyncConfigBuilder {
    slave: Option<Arc<dyn RecordStore>>,
    field_map: Option<FieldMapSpec>,
    slave_scenario: Option<String>,
    save_triggers: TriggerSet,
    delete_triggers: TriggerSet,
    on_save_failure: Option<SaveFailureHook>,
    on_delete_failure: Option<DeleteFailureHook>,
    failure_reporting: FailureReporting,
    default_batch_size: usize,
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self {
            slave: None,
            field_map: None,
            slave_scenario: None,
            save_triggers: TriggerSet::default(),
            delete_triggers: TriggerSet::default(),
            on_save_failure: None,
            on_delete_failure: None,
            failure_reporting: FailureReporting::default(),
            default_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SyncConfigBuilder {
    /// Sets the slave store.
    pub fn with_slave(mut self, slave: Arc<dyn RecordStore>) -> Self {
        self.slave = Some(slave);
        self
    }

    /// Sets the field map.
    pub fn with_field_map(mut self, spec: FieldMapSpec) -> Self {
        self.field_map = Some(spec);
        self
    }

    /// Sets the scenario applied to slaves before save and delete.
    pub fn with_slave_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.slave_scenario = Some(scenario.into());
        self
    }

    /// Sets the tags that trigger a save sync.
    pub fn with_save_triggers(mut self, triggers: TriggerSet) -> Self {
        self.save_triggers = triggers;
        self
    }

    /// Sets the tags that trigger a delete sync.
    pub fn with_delete_triggers(mut self, triggers: TriggerSet) -> Self {
        self.delete_triggers = triggers;
        self
    }

    /// Installs a hook for slaves that fail to save.
    pub fn on_save_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Record) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_save_failure = Some(Arc::new(hook));
        self
    }

    /// Installs a hook for slaves that fail to delete or are missing.
    pub fn on_delete_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&Record>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_delete_failure = Some(Arc::new(hook));
        self
    }

    /// Sets how failures without a hook are reported.
    pub fn with_failure_reporting(mut self, reporting: FailureReporting) -> Self {
        self.failure_reporting = reporting;
        self
    }

    /// Sets the batch size used when none is given.
    pub fn with_default_batch_size(mut self, size: usize) -> Self {
        self.default_batch_size = size;
        self
    }

    /// Applies settings loaded from a file.
    ///
    /// Only the options present in `settings` are changed.
    pub fn with_settings(mut self, settings: &SyncSettings) -> SyncResult<Self> {
        if let Some(map) = &settings.field_map {
            self.field_map = Some(FieldMapSpec::from_json(map)?);
        }
        if let Some(tags) = &settings.save_triggers {
            self.save_triggers = TriggerSet::new(tags.iter().cloned());
        }
        if let Some(tags) = &settings.delete_triggers {
            self.delete_triggers = TriggerSet::new(tags.iter().cloned());
        }
        if let Some(scenario) = &settings.slave_scenario {
            self.slave_scenario = Some(scenario.clone());
        }
        if let Some(size) = settings.batch_size {
            self.default_batch_size = size;
        }
        if let Some(report) = settings.report_failures {
            self.failure_reporting = if report {
                FailureReporting::Log
            } else {
                FailureReporting::Silent
            };
        }
        Ok(self)
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the slave store or field map is
    /// missing, the field map is malformed or names fields the slave
    /// schema lacks, or the default batch size is zero.
    pub fn build(self) -> SyncResult<SyncConfig> {
        let slave = self
            .slave
            .ok_or_else(|| SyncError::configuration("slave store is required"))?;
        let spec = self
            .field_map
            .ok_or_else(|| SyncError::configuration("field map is required"))?;
        let field_map = FieldMap::normalize(spec)?;
        field_map.check_slave(slave.schema())?;
        if self.default_batch_size == 0 {
            return Err(SyncError::configuration("batch size must be at least 1"));
        }

        Ok(SyncConfig {
            slave,
            field_map,
            slave_scenario: self.slave_scenario,
            save_triggers: self.save_triggers,
            delete_triggers: self.delete_triggers,
            on_save_failure: self.on_save_failure,
            on_delete_failure: self.on_delete_failure,
            failure_reporting: self.failure_reporting,
            default_batch_size: self.default_batch_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recsync_storage::{InMemoryStore, RecordSchema};
    use serde_json::json;

    fn slave() -> Arc<dyn RecordStore> {
        Arc::new(InMemoryStore::new(RecordSchema::new(
            "slave",
            &["id"],
            &["id", "title", "foo"],
        )))
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::builder()
            .with_slave(slave())
            .with_field_map(FieldMapSpec::shared(["id", "foo"]))
            .build()
            .unwrap();

        assert!(config.save_triggers().contains("default"));
        assert!(config.delete_triggers().contains("default"));
        assert!(!config.save_triggers().contains("import"));
        assert_eq!(config.slave_scenario(), None);
        assert_eq!(config.failure_reporting(), FailureReporting::Log);
        assert_eq!(config.default_batch_size(), DEFAULT_BATCH_SIZE);
        assert!(config.on_save_failure().is_none());
        assert!(config.on_delete_failure().is_none());
    }

    #[test]
    fn missing_pieces_are_rejected() {
        let err = SyncConfig::builder()
            .with_field_map(FieldMapSpec::shared(["id"]))
            .build()
            .unwrap_err();
        assert!(err.is_configuration());

        let err = SyncConfig::builder().with_slave(slave()).build().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn unknown_slave_field_is_rejected() {
        let err = SyncConfig::builder()
            .with_slave(slave())
            .with_field_map(FieldMapSpec::shared(["id", "bar"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("'bar'"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = SyncConfig::builder()
            .with_slave(slave())
            .with_field_map(FieldMapSpec::shared(["id"]))
            .with_default_batch_size(0)
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn settings_override_builder() {
        let settings = SyncSettings {
            field_map: Some(json!({"id": "id", "title": "name"})),
            save_triggers: Some(vec!["import".into()]),
            delete_triggers: Some(vec![]),
            slave_scenario: Some("mirror".into()),
            batch_size: Some(7),
            report_failures: Some(false),
        };
        let config = SyncConfig::builder()
            .with_slave(slave())
            .with_settings(&settings)
            .unwrap()
            .build()
            .unwrap();

        assert!(config.save_triggers().contains("import"));
        assert!(!config.save_triggers().contains("default"));
        assert!(config.delete_triggers().is_empty());
        assert_eq!(config.slave_scenario(), Some("mirror"));
        assert_eq!(config.default_batch_size(), 7);
        assert_eq!(config.failure_reporting(), FailureReporting::Silent);
        assert_eq!(config.field_map().get("title").unwrap().master_field(), Some("name"));
    }

    #[test]
    fn debug_hides_hooks() {
        let config = SyncConfig::builder()
            .with_slave(slave())
            .with_field_map(FieldMapSpec::shared(["id"]))
            .on_save_failure(|_| Ok(()))
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("on_save_failure: true"));
        assert!(debug.contains("\"slave\""));
    }
}
