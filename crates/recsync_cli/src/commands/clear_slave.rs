//! Clear-slave command implementation.

use recsync_core::BatchReconciler;
use recsync_storage::FileStore;
use std::path::Path;

/// Wipes the store at `path`. Returns the number of records removed.
pub fn execute(path: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let store = FileStore::open(path)?;
    Ok(BatchReconciler::clear_slave(&store)?)
}

/// Runs the clear-slave command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let removed = execute(path)?;
    println!("Removed {} records from {:?}", removed, path);
    Ok(())
}
