//! Benchmark utilities.

#![warn(missing_docs)]

use recsync_core::{FieldMapSpec, SyncConfig, SyncEngine};
use recsync_storage::{InMemoryStore, Record, RecordStore, Value};
use recsync_testkit::{fill_master, memory_master, memory_slave};
use serde_json::json;
use std::sync::Arc;

/// Field map used by every benchmark: three copies, one rename, one derived field.
pub fn bench_field_map() -> FieldMapSpec {
    FieldMapSpec::renamed([("id", "id"), ("title", "name"), ("foo", "foo"), ("bar", "bar")])
        .derive("baz", |master: &Record| {
            let baz = master.get("baz").and_then(Value::as_i64).unwrap_or(0);
            json!(baz * 2)
        })
}

/// A master store holding `count` records.
pub fn populated_master(count: usize) -> Arc<InMemoryStore> {
    let master = Arc::new(memory_master());
    fill_master(master.as_ref(), count);
    master
}

/// An engine from `master` into a fresh in-memory slave.
pub fn engine_for(master: Arc<InMemoryStore>) -> (SyncEngine, Arc<InMemoryStore>) {
    let slave = Arc::new(memory_slave());
    let config = SyncConfig::builder()
        .with_slave(slave.clone())
        .with_field_map(bench_field_map())
        .build()
        .expect("valid bench config");
    let master: Arc<dyn RecordStore> = master;
    let engine = SyncEngine::new(master, config).expect("valid bench engine");
    (engine, slave)
}
