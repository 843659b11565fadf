//! Slave-to-master field mapping.
//!
//! A field map says, for every slave field the engine writes, where the
//! value comes from on the master: a master field of the same or a
//! different name, or a function of the whole master record.
//!
//! Maps are accepted in several shapes ([`FieldMapSpec`]) and normalized
//! once, at configuration time, into a [`FieldMap`].

use crate::error::{SyncError, SyncResult};
use recsync_storage::{BoxError, Record, RecordSchema, StorageError, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A function computing a slave value from a master record.
pub type DeriveFn = Arc<dyn Fn(&Record) -> Result<Value, BoxError> + Send + Sync>;

/// Where a slave field's value comes from.
#[derive(Clone)]
pub enum FieldSource {
    /// Copy the named master field.
    Field(String),
    /// Compute the value from the master record.
    Derived(DeriveFn),
}

impl FieldSource {
    /// Copies the named master field.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Computes the value with an infallible function.
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        Self::Derived(Arc::new(move |master| Ok(f(master))))
    }

    /// Computes the value with a function that may fail.
    ///
    /// Failures surface from the sync as [`SyncError::Callback`].
    pub fn try_derived<F, E>(f: F) -> Self
    where
        F: Fn(&Record) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::Derived(Arc::new(move |master| f(master).map_err(Into::into)))
    }

    /// Returns the master field name for direct copies.
    pub fn master_field(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(name.as_str()),
            Self::Derived(_) => None,
        }
    }

    /// Returns true if the value is computed.
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::Derived(_))
    }

    fn resolve(&self, master: &Record) -> SyncResult<Value> {
        match self {
            Self::Field(name) => {
                if !master.schema().has_field(name) {
                    return Err(StorageError::unknown_field(&master.schema().name, name).into());
                }
                Ok(master.get(name).cloned().unwrap_or(Value::Null))
            }
            Self::Derived(f) => f(master).map_err(SyncError::Callback),
        }
    }
}

impl fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Derived(_) => f.write_str("Derived(<fn>)"),
        }
    }
}

impl From<&str> for FieldSource {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for FieldSource {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

/// A field map as supplied by the user, before normalization.
#[derive(Debug, Clone)]
pub enum FieldMapSpec {
    /// Field names shared by master and slave.
    Shared(Vec<String>),
    /// `(slave field, master field)` pairs.
    Renamed(Vec<(String, String)>),
    /// `(slave field, source)` pairs, derived sources allowed.
    Mapped(Vec<(String, FieldSource)>),
}

impl FieldMapSpec {
    /// A list of field names present on both sides.
    pub fn shared<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Shared(names.into_iter().map(Into::into).collect())
    }

    /// A list of `(slave field, master field)` pairs.
    pub fn renamed<I, S, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, M)>,
        S: Into<String>,
        M: Into<String>,
    {
        Self::Renamed(
            pairs
                .into_iter()
                .map(|(slave, master)| (slave.into(), master.into()))
                .collect(),
        )
    }

    /// An empty mapped spec, to be filled with [`FieldMapSpec::map`].
    pub fn mapped() -> Self {
        Self::Mapped(Vec::new())
    }

    /// Adds a slave field and its source.
    ///
    /// Shared and renamed specs are widened to a mapped spec first.
    #[must_use]
    pub fn map(self, slave: impl Into<String>, source: impl Into<FieldSource>) -> Self {
        let mut entries = self.into_entries();
        entries.push((slave.into(), source.into()));
        Self::Mapped(entries)
    }

    /// Adds a slave field computed from the master record.
    #[must_use]
    pub fn derive<F>(self, slave: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.map(slave, FieldSource::derived(f))
    }

    /// Parses a field map from JSON.
    ///
    /// An array of strings is a shared list; an object whose values are
    /// strings is a rename map. Anything else is rejected, since derived
    /// fields cannot be expressed in JSON.
    pub fn from_json(value: &Value) -> SyncResult<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name.clone()),
                    other => Err(SyncError::configuration(format!(
                        "field map list entries must be field names, found {other}"
                    ))),
                })
                .collect::<SyncResult<Vec<_>>>()
                .map(Self::Shared),
            Value::Object(map) => map
                .iter()
                .map(|(slave, master)| match master {
                    Value::String(master) => Ok((slave.clone(), master.clone())),
                    other => Err(SyncError::configuration(format!(
                        "field map value for '{slave}' must be a master field name, found {other}"
                    ))),
                })
                .collect::<SyncResult<Vec<_>>>()
                .map(Self::Renamed),
            other => Err(SyncError::configuration(format!(
                "field map must be a list or an object, found {other}"
            ))),
        }
    }

    fn into_entries(self) -> Vec<(String, FieldSource)> {
        match self {
            Self::Shared(names) => names
                .into_iter()
                .map(|name| (name.clone(), FieldSource::Field(name)))
                .collect(),
            Self::Renamed(pairs) => pairs
                .into_iter()
                .map(|(slave, master)| (slave, FieldSource::Field(master)))
                .collect(),
            Self::Mapped(entries) => entries,
        }
    }
}

/// A normalized field map: slave field name to [`FieldSource`].
///
/// Entries keep the order they were declared in, which is the order
/// values are written to the slave.
#[derive(Debug, Clone)]
pub struct FieldMap {
    entries: Vec<(String, FieldSource)>,
}

impl FieldMap {
    /// Normalizes a spec.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the map is empty, or names an
    /// empty or duplicate slave field, or an empty master field.
    pub fn normalize(spec: FieldMapSpec) -> SyncResult<Self> {
        let entries = spec.into_entries();
        if entries.is_empty() {
            return Err(SyncError::configuration("field map is empty"));
        }

        let mut seen = BTreeSet::new();
        for (slave, source) in &entries {
            if slave.is_empty() {
                return Err(SyncError::configuration("field map has an empty slave field name"));
            }
            if !seen.insert(slave.as_str()) {
                return Err(SyncError::configuration(format!(
                    "slave field '{slave}' is mapped more than once"
                )));
            }
            if source.master_field() == Some("") {
                return Err(SyncError::configuration(format!(
                    "slave field '{slave}' maps to an empty master field name"
                )));
            }
        }

        Ok(Self { entries })
    }

    /// Returns the number of mapped slave fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the source of a slave field.
    pub fn get(&self, slave_field: &str) -> Option<&FieldSource> {
        self.entries
            .iter()
            .find(|(slave, _)| slave == slave_field)
            .map(|(_, source)| source)
    }

    /// Iterates over `(slave field, source)` entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSource)> {
        self.entries.iter().map(|(slave, source)| (slave.as_str(), source))
    }

    /// Iterates over the mapped slave field names.
    pub fn slave_fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(slave, _)| slave.as_str())
    }

    /// Checks that every slave field exists in the slave schema.
    pub fn check_slave(&self, schema: &RecordSchema) -> SyncResult<()> {
        for slave in self.slave_fields() {
            if !schema.has_field(slave) {
                return Err(SyncError::configuration(format!(
                    "slave schema '{}' has no field '{slave}'",
                    schema.name
                )));
            }
        }
        Ok(())
    }

    /// Checks that every copied master field exists in the master schema.
    pub fn check_master(&self, schema: &RecordSchema) -> SyncResult<()> {
        for (slave, source) in self.iter() {
            if let Some(master) = source.master_field() {
                if !schema.has_field(master) {
                    return Err(SyncError::configuration(format!(
                        "slave field '{slave}' maps to '{master}', which master schema '{}' does not have",
                        schema.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Computes the slave values for a master record.
    ///
    /// Master fields the record has never been given resolve to `null`.
    ///
    /// # Errors
    ///
    /// Fails if a derived source fails, or a copied field is not part of
    /// the master's schema.
    pub fn resolve(&self, master: &Record) -> SyncResult<BTreeMap<String, Value>> {
        self.entries
            .iter()
            .map(|(slave, source)| source.resolve(master).map(|value| (slave.clone(), value)))
            .collect()
    }

    /// Resolves values from `master` and writes them onto `slave`.
    ///
    /// Returns true if any slave field changed.
    pub fn apply(&self, master: &Record, slave: &mut Record) -> SyncResult<bool> {
        let mut changed = false;
        for (field, value) in &self.entries {
            let value = value.resolve(master)?;
            if slave.get(field) != Some(&value) {
                slave.set(field, value)?;
                changed = true;
            }
        }
        Ok(changed)
    }
}
