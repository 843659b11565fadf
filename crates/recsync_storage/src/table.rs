//! Keyed row table shared by the built-in stores.

use crate::error::{StorageError, StorageResult};
use crate::key::RecordKey;
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::store::KeyFilter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

type Row = BTreeMap<String, Value>;

/// Rows in key order plus the next auto-increment key.
#[derive(Debug, Clone)]
pub(crate) struct Table {
    schema: Arc<RecordSchema>,
    rows: BTreeMap<RecordKey, Row>,
    next_key: i64,
}

impl Table {
    pub(crate) fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_key: 1,
        }
    }

    /// Rebuilds a table from persisted rows.
    pub(crate) fn from_rows(
        schema: Arc<RecordSchema>,
        rows: Vec<Row>,
        next_key: i64,
    ) -> StorageResult<Self> {
        let mut table = Self::new(schema);
        for row in rows {
            let key = table.schema.key_from(&row)?.ok_or_else(|| {
                StorageError::Corrupted(format!("row without key in '{}'", table.schema.name))
            })?;
            table.rows.insert(key, row);
        }
        table.next_key = next_key.max(table.max_int_key() + 1);
        Ok(table)
    }

    pub(crate) fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub(crate) fn next_key(&self) -> i64 {
        self.next_key
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn get(&self, key: &RecordKey) -> Option<Record> {
        self.rows
            .get(key)
            .map(|row| Record::loaded(Arc::clone(&self.schema), row.clone()))
    }

    /// Validates and writes a record. Returns false on validation failure.
    pub(crate) fn save(&mut self, record: &mut Record) -> StorageResult<bool> {
        if !record.validate() {
            return Ok(false);
        }

        let key = match self.schema.key_from(record.fields())? {
            Some(key) => key,
            None if self.schema.assigns_keys() => {
                let key = RecordKey::Int(self.next_key);
                let field = self.schema.key_fields[0].clone();
                record.fields_mut().insert(field, key.to_value());
                key
            }
            None => {
                return Err(StorageError::invalid_key(
                    &self.schema.name,
                    "key fields are empty and the schema does not assign keys",
                ))
            }
        };

        if record.is_new() && self.rows.contains_key(&key) {
            record.push_error(format!("{} \"{key}\" has already been taken", self.key_label()));
            return Ok(false);
        }

        if let Some(n) = key.as_int() {
            if n >= self.next_key {
                self.next_key = n + 1;
            }
        }
        self.rows.insert(key, record.fields().clone());
        record.mark_saved();
        Ok(true)
    }

    pub(crate) fn delete(&mut self, record: &Record) -> bool {
        match record.primary_key() {
            Some(key) => self.rows.remove(&key).is_some(),
            None => false,
        }
    }

    pub(crate) fn delete_all(&mut self, filter: &KeyFilter) -> usize {
        let before = self.rows.len();
        self.rows.retain(|key, _| !filter.matches(key));
        before - self.rows.len()
    }

    pub(crate) fn scan(&self) -> Vec<Record> {
        self.rows
            .values()
            .map(|row| Record::loaded(Arc::clone(&self.schema), row.clone()))
            .collect()
    }

    pub(crate) fn batch_after(&self, after: Option<&RecordKey>, limit: usize) -> Vec<Record> {
        let lower = match after {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        self.rows
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, row)| Record::loaded(Arc::clone(&self.schema), row.clone()))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }

    pub(crate) fn reset_sequence(&mut self) {
        self.next_key = self.max_int_key() + 1;
    }

    fn key_label(&self) -> String {
        self.schema.key_fields.join(", ")
    }

    fn max_int_key(&self) -> i64 {
        self.rows
            .keys()
            .filter_map(RecordKey::as_int)
            .max()
            .unwrap_or(0)
    }
}
