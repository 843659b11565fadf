//! Record schemas.
//!
//! A schema names the fields a record may carry, which of them form the
//! primary key, and the validation rules a store applies on save.

use crate::error::{StorageError, StorageResult};
use crate::key::RecordKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Shape and validation rules of one record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Schema name (table, key prefix, ...).
    pub name: String,
    /// Fields forming the primary key, in order.
    pub key_fields: Vec<String>,
    /// All declared fields, key fields included.
    pub fields: Vec<String>,
    /// Whether the store assigns integer keys to new records.
    #[serde(default)]
    pub auto_increment: bool,
    /// Values applied to empty fields before validation.
    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,
    /// Fields that must be non-empty.
    #[serde(default)]
    pub required: Vec<String>,
    /// Maximum text length per field, in characters.
    #[serde(default)]
    pub max_len: BTreeMap<String, usize>,
}

impl RecordSchema {
    /// Creates a schema with the given key fields and declared fields.
    ///
    /// Key fields missing from `fields` are added to it.
    pub fn new(name: impl Into<String>, key_fields: &[&str], fields: &[&str]) -> Self {
        let mut all: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        for key in key_fields {
            if !all.iter().any(|f| f == key) {
                all.insert(0, key.to_string());
            }
        }
        Self {
            name: name.into(),
            key_fields: key_fields.iter().map(|f| f.to_string()).collect(),
            fields: all,
            auto_increment: false,
            defaults: BTreeMap::new(),
            required: Vec::new(),
            max_len: BTreeMap::new(),
        }
    }

    /// Lets the store assign keys to new records.
    ///
    /// Only meaningful for a single integer key field.
    #[must_use]
    pub fn with_auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets a default applied to an empty field on save.
    #[must_use]
    pub fn with_default(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.to_string(), value.into());
        self
    }

    /// Marks fields as required.
    #[must_use]
    pub fn with_required(mut self, fields: &[&str]) -> Self {
        self.required.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    /// Limits the text length of a field.
    #[must_use]
    pub fn with_max_len(mut self, field: &str, max: usize) -> Self {
        self.max_len.insert(field.to_string(), max);
        self
    }

    /// Returns true if the field is declared.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Returns true if the schema has a single auto-increment key.
    #[must_use]
    pub fn assigns_keys(&self) -> bool {
        self.auto_increment && self.key_fields.len() == 1
    }

    /// Derives the primary key from field values.
    ///
    /// Returns `Ok(None)` when any key field is empty, and an error when a
    /// key field holds a value that cannot be a key (float, bool, ...).
    pub fn key_from(&self, fields: &BTreeMap<String, Value>) -> StorageResult<Option<RecordKey>> {
        let mut parts = Vec::with_capacity(self.key_fields.len());
        for key_field in &self.key_fields {
            match fields.get(key_field) {
                None | Some(Value::Null) => return Ok(None),
                Some(value) => match RecordKey::from_value(value) {
                    Some(part) => parts.push(part),
                    None => {
                        return Err(StorageError::invalid_key(
                            &self.name,
                            format!("field '{key_field}' holds {value}"),
                        ))
                    }
                },
            }
        }
        match parts.len() {
            0 => Err(StorageError::invalid_key(&self.name, "schema declares no key fields")),
            1 => Ok(parts.pop()),
            _ => Ok(Some(RecordKey::Composite(parts))),
        }
    }

    /// Splits a key into `(field, value)` pairs.
    pub fn key_values(&self, key: &RecordKey) -> StorageResult<Vec<(String, Value)>> {
        match (key, self.key_fields.as_slice()) {
            (RecordKey::Composite(parts), fields) if parts.len() == fields.len() => Ok(fields
                .iter()
                .cloned()
                .zip(parts.iter().map(RecordKey::to_value))
                .collect()),
            (RecordKey::Composite(_), _) => Err(StorageError::invalid_key(
                &self.name,
                format!("composite key {key} does not match key fields {:?}", self.key_fields),
            )),
            (scalar, [field]) => Ok(vec![(field.clone(), scalar.to_value())]),
            _ => Err(StorageError::invalid_key(
                &self.name,
                format!("scalar key {key} for {} key fields", self.key_fields.len()),
            )),
        }
    }

    /// Fills empty fields that have a default.
    pub(crate) fn apply_defaults(&self, fields: &mut BTreeMap<String, Value>) {
        for (field, default) in &self.defaults {
            if fields.get(field).map_or(true, is_empty) {
                fields.insert(field.clone(), default.clone());
            }
        }
    }

    /// Applies defaults and validation rules, returning the messages.
    pub(crate) fn check(&self, fields: &mut BTreeMap<String, Value>) -> Vec<String> {
        self.apply_defaults(fields);

        let mut errors = Vec::new();
        for field in &self.required {
            if fields.get(field).map_or(true, is_empty) {
                errors.push(format!("{field} cannot be blank"));
            }
        }
        for (field, max) in &self.max_len {
            match fields.get(field) {
                Some(Value::String(s)) if s.chars().count() > *max => {
                    errors.push(format!("{field} should contain at most {max} characters"));
                }
                Some(Value::Null) | Some(Value::String(_)) | None => {}
                Some(_) => errors.push(format!("{field} must be a string")),
            }
        }
        errors
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> RecordSchema {
        RecordSchema::new("slave", &["id"], &["title", "foo", "bar", "baz"])
            .with_required(&["title", "foo", "baz"])
            .with_default("bar", "slavedefault")
            .with_max_len("title", 15)
    }

    #[test]
    fn key_fields_are_declared() {
        let s = schema();
        assert_eq!(s.fields[0], "id");
        assert!(s.has_field("id"));
        assert!(s.has_field("baz"));
        assert!(!s.has_field("name"));
    }

    #[test]
    fn scalar_key() {
        let s = schema();
        let mut fields = BTreeMap::new();
        assert_eq!(s.key_from(&fields).unwrap(), None);
        fields.insert("id".to_string(), json!(15));
        assert_eq!(s.key_from(&fields).unwrap(), Some(RecordKey::Int(15)));
        fields.insert("id".to_string(), json!(1.5));
        assert!(s.key_from(&fields).is_err());
    }

    #[test]
    fn composite_key_roundtrip() {
        let s = RecordSchema::new("pairs", &["a", "b"], &["v"]);
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), json!(1));
        fields.insert("b".to_string(), json!("x"));
        let key = s.key_from(&fields).unwrap().unwrap();
        assert_eq!(key, RecordKey::Composite(vec![RecordKey::Int(1), "x".into()]));
        let values = s.key_values(&key).unwrap();
        assert_eq!(values, vec![("a".to_string(), json!(1)), ("b".to_string(), json!("x"))]);
        assert!(s.key_values(&RecordKey::Int(1)).is_err());
    }

    #[test]
    fn check_applies_defaults_and_rules() {
        let s = schema();
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), json!("a title that is far too long"));
        let errors = s.check(&mut fields);
        assert_eq!(fields["bar"], json!("slavedefault"));
        assert!(errors.iter().any(|e| e.starts_with("foo")));
        assert!(errors.iter().any(|e| e.starts_with("baz")));
        assert!(errors.iter().any(|e| e.contains("at most 15")));
    }

    #[test]
    fn schema_serde() {
        let s = schema().with_auto_increment();
        let json = serde_json::to_string(&s).unwrap();
        let back: RecordSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(back.assigns_keys());
    }
}
