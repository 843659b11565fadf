//! Dynamic records.

use crate::error::{StorageError, StorageResult};
use crate::key::RecordKey;
use crate::schema::RecordSchema;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scenario a record carries unless told otherwise.
pub const DEFAULT_SCENARIO: &str = "default";

/// A record owned by a store.
///
/// Records are plain field maps bound to a schema. The scenario is an
/// opaque tag: stores may use it during validation and the sync engine
/// uses it as the trigger tag of a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    fields: BTreeMap<String, Value>,
    scenario: String,
    is_new: bool,
    errors: Vec<String>,
}

impl Record {
    /// Creates an empty, unsaved record.
    #[must_use]
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            fields: BTreeMap::new(),
            scenario: DEFAULT_SCENARIO.to_string(),
            is_new: true,
            errors: Vec::new(),
        }
    }

    /// Rebuilds a persisted record.
    pub(crate) fn loaded(schema: Arc<RecordSchema>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            schema,
            fields,
            scenario: DEFAULT_SCENARIO.to_string(),
            is_new: false,
            errors: Vec::new(),
        }
    }

    /// Returns the record's schema.
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Returns the shared schema handle.
    pub fn schema_arc(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Returns the primary key, if the key fields are populated.
    ///
    /// Key fields holding values that cannot form a key yield `None`;
    /// stores reject such records on save.
    pub fn primary_key(&self) -> Option<RecordKey> {
        self.schema.key_from(&self.fields).ok().flatten()
    }

    /// Returns true if the record has never been saved.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Overrides the new-record flag.
    pub fn set_is_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    /// Reads a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Writes a field.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownField`] if the schema does not
    /// declare the field.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> StorageResult<()> {
        if !self.schema.has_field(field) {
            return Err(StorageError::unknown_field(&self.schema.name, field));
        }
        self.fields.insert(field.to_string(), value.into());
        Ok(())
    }

    /// Writes several fields, stopping at the first unknown one.
    pub fn set_all<I, K, V>(&mut self, values: I) -> StorageResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (field, value) in values {
            self.set(field.as_ref(), value)?;
        }
        Ok(())
    }

    /// Returns all populated fields.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Returns the scenario tag.
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Sets the scenario tag.
    pub fn set_scenario(&mut self, scenario: impl Into<String>) {
        self.scenario = scenario.into();
    }

    /// Returns validation messages from the last save attempt.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Fills empty fields with the schema's defaults.
    ///
    /// This is the first step of [`Record::validate`]. Persisted records
    /// always have their defaults applied.
    pub fn apply_defaults(&mut self) {
        self.schema.apply_defaults(&mut self.fields);
    }

    /// Applies schema defaults and validation rules.
    ///
    /// Returns true if the record is valid. Messages are kept on the
    /// record until the next validation.
    pub fn validate(&mut self) -> bool {
        self.errors = self.schema.check(&mut self.fields);
        self.errors.is_empty()
    }

    pub(crate) fn fields_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.fields
    }

    pub(crate) fn push_error(&mut self, message: String) {
        self.errors.push(message);
    }

    pub(crate) fn mark_saved(&mut self) {
        self.is_new = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::new("master", &["id"], &["name", "foo", "bar", "baz"])
                .with_required(&["name", "foo"])
                .with_default("bar", "masterdefault"),
        )
    }

    #[test]
    fn new_record_defaults() {
        let record = Record::new(schema());
        assert!(record.is_new());
        assert_eq!(record.scenario(), DEFAULT_SCENARIO);
        assert_eq!(record.primary_key(), None);
        assert!(record.fields().is_empty());
    }

    #[test]
    fn set_and_get() {
        let mut record = Record::new(schema());
        record.set("id", 100500).unwrap();
        record.set("name", "Testy").unwrap();
        assert_eq!(record.get("name"), Some(&json!("Testy")));
        assert_eq!(record.primary_key(), Some(RecordKey::Int(100500)));
        assert_eq!(record.get("foo"), None);
    }

    #[test]
    fn set_unknown_field_fails() {
        let mut record = Record::new(schema());
        let err = record.set("title", "x").unwrap_err();
        assert!(matches!(err, StorageError::UnknownField { .. }));
    }

    #[test]
    fn set_all_fields() {
        let mut record = Record::new(schema());
        record
            .set_all([("name", json!("a")), ("foo", json!("b")), ("baz", json!(3))])
            .unwrap();
        assert_eq!(record.fields().len(), 3);
    }

    #[test]
    fn validate_keeps_errors() {
        let mut record = Record::new(schema());
        record.set("name", "only").unwrap();
        assert!(!record.validate());
        assert_eq!(record.errors().len(), 1);
        assert_eq!(record.get("bar"), Some(&json!("masterdefault")));

        record.set("foo", "bar").unwrap();
        assert!(record.validate());
        assert!(record.errors().is_empty());
    }

    #[test]
    fn apply_defaults_fills_only_empty_fields() {
        let mut record = Record::new(schema());
        record.set("bar", "").unwrap();
        record.apply_defaults();
        assert_eq!(record.get("bar"), Some(&json!("masterdefault")));
        assert!(record.errors().is_empty());

        record.set("bar", "kept").unwrap();
        record.apply_defaults();
        assert_eq!(record.get("bar"), Some(&json!("kept")));
    }

    #[test]
    fn scenario_is_opaque() {
        let mut record = Record::new(schema());
        record.set_scenario("sync");
        assert_eq!(record.scenario(), "sync");
    }
}
