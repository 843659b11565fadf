//! Sync settings loaded from JSON.
//!
//! Settings carry the parts of a [`crate::SyncConfig`] that can be written
//! down: the field map (shared list or rename object), trigger tags, the
//! slave scenario and batch size. Stores and hooks are always supplied in
//! code.
//!
//! ```json
//! {
//!   "field_map": {"id": "id", "title": "name", "foo": "foo"},
//!   "save_triggers": ["default", "import"],
//!   "batch_size": 200
//! }
//! ```

use crate::error::SyncResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Serializable subset of a sync configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Field map as a list of shared names or a slave-to-master object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_map: Option<Value>,
    /// Tags that trigger a save sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_triggers: Option<Vec<String>>,
    /// Tags that trigger a delete sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_triggers: Option<Vec<String>>,
    /// Scenario applied to slave records before save and delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slave_scenario: Option<String>,
    /// Default batch size for reconciliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    /// Whether unhooked failures are logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_failures: Option<bool>,
}

impl SyncSettings {
    /// Parses settings from a JSON string.
    pub fn from_json_str(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
