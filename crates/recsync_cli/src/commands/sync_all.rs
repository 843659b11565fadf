//! Sync-all command implementation.

use recsync_core::{ReconcileReport, SyncConfig, SyncEngine, SyncSettings};
use recsync_storage::{FileStore, RecordStore};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Files taking part in a reconcile run.
pub struct Stores<'a> {
    /// Master store file.
    pub master: &'a Path,
    /// Slave store file.
    pub slave: &'a Path,
    /// Settings file.
    pub settings: &'a Path,
}

/// Reconciles the slave store with the master store.
pub fn execute(
    stores: &Stores<'_>,
    clear: bool,
    batch_size: Option<usize>,
) -> Result<ReconcileReport, Box<dyn std::error::Error>> {
    debug!(master = ?stores.master, slave = ?stores.slave, "opening stores");
    let settings = SyncSettings::load(stores.settings)?;
    let master: Arc<dyn RecordStore> = Arc::new(FileStore::open(stores.master)?);
    let slave: Arc<dyn RecordStore> = Arc::new(FileStore::open(stores.slave)?);

    let config = SyncConfig::builder()
        .with_slave(slave)
        .with_settings(&settings)?
        .build()?;
    let engine = SyncEngine::new(master, config)?;
    let batch_size = batch_size.unwrap_or(engine.config().default_batch_size());
    Ok(engine.sync_all(clear, batch_size)?)
}

/// Runs the sync-all command.
pub fn run(
    stores: &Stores<'_>,
    clear: bool,
    batch_size: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = execute(stores, clear, batch_size)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(stores, &report);
        }
    }

    Ok(())
}

fn print_text_output(stores: &Stores<'_>, report: &ReconcileReport) {
    println!("Synced {:?} -> {:?}", stores.master, stores.slave);
    println!();
    if report.cleared > 0 {
        println!("  Cleared:          {}", report.cleared);
    }
    println!("  Masters observed: {}", report.observed);
    println!("  Created:          {}", report.created);
    println!("  Updated:          {}", report.updated);
    println!("  Unchanged:        {}", report.unchanged);
    println!("  Failed:           {}", report.failed);
    println!("  Orphans deleted:  {}", report.orphans_deleted);
}
