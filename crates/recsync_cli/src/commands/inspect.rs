//! Inspect command implementation.

use recsync_storage::{FileStore, RecordStore};
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Schema name.
    pub schema: String,
    /// Key fields.
    pub key_fields: Vec<String>,
    /// Declared fields.
    pub fields: Vec<String>,
    /// Whether the store assigns keys.
    pub auto_increment: bool,
    /// Number of records.
    pub record_count: usize,
    /// Record keys (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

/// Collects schema and record information for a store.
pub fn execute(path: &Path, show_keys: bool) -> Result<InspectResult, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }

    let store = FileStore::open(path)?;
    let schema = store.schema();
    let keys = if show_keys {
        Some(
            store
                .iterate_all()?
                .iter()
                .filter_map(|record| record.primary_key())
                .map(|key| key.to_string())
                .collect(),
        )
    } else {
        None
    };

    Ok(InspectResult {
        path: path.display().to_string(),
        schema: schema.name.clone(),
        key_fields: schema.key_fields.clone(),
        fields: schema.fields.clone(),
        auto_increment: schema.auto_increment,
        record_count: store.count()?,
        keys,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, show_keys: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = execute(path, show_keys)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!();
    println!("Schema:");
    println!("  Name:           {}", result.schema);
    println!("  Key fields:     {}", result.key_fields.join(", "));
    println!("  Fields:         {}", result.fields.join(", "));
    println!("  Auto increment: {}", result.auto_increment);
    println!();
    println!("Records: {}", result.record_count);

    if let Some(ref keys) = result.keys {
        for key in keys {
            println!("  {}", key);
        }
    }
}
