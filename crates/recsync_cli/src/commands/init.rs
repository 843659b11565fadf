//! Init command implementation.

use recsync_storage::{FileStore, RecordSchema, RecordStore};
use std::fs;
use std::path::Path;

/// Creates an empty store at `store` using the schema in `schema_path`.
pub fn execute(
    store: &Path,
    schema_path: &Path,
    force: bool,
) -> Result<FileStore, Box<dyn std::error::Error>> {
    if store.exists() && !force {
        return Err(format!("Store already exists at {:?} (use --force to replace it)", store).into());
    }
    let schema: RecordSchema = serde_json::from_str(&fs::read_to_string(schema_path)?)?;
    if schema.key_fields.is_empty() {
        return Err(format!("Schema '{}' has no key fields", schema.name).into());
    }
    Ok(FileStore::create(store, schema)?)
}

/// Runs the init command.
pub fn run(store: &Path, schema_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let created = execute(store, schema_path, force)?;
    println!(
        "Created store '{}' at {:?}",
        created.schema().name,
        created.path()
    );
    Ok(())
}
