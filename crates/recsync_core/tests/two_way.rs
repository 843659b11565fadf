//! Engines attached to observed stores, including two stores bound to
//! each other.

use recsync_core::{FieldMapSpec, SyncConfig, SyncEngine, SyncError, TriggerSet};
use recsync_storage::{ObservedStore, RecordKey, RecordStore, StorageError};
use recsync_testkit::prelude::*;
use serde_json::json;
use std::sync::Arc;

struct Pair {
    master_counts: Arc<CountingStore>,
    slave_counts: Arc<CountingStore>,
    master: Arc<ObservedStore>,
    slave: Arc<ObservedStore>,
}

fn pair() -> Pair {
    let master_counts = Arc::new(CountingStore::new(Arc::new(memory_master())));
    let slave_counts = Arc::new(CountingStore::new(Arc::new(memory_slave())));
    Pair {
        master: Arc::new(ObservedStore::new(master_counts.clone())),
        slave: Arc::new(ObservedStore::new(slave_counts.clone())),
        master_counts,
        slave_counts,
    }
}

fn forward(p: &Pair) -> Arc<SyncEngine> {
    let config = SyncConfig::builder()
        .with_slave(p.slave.clone())
        .with_field_map(
            FieldMapSpec::renamed([("id", "id"), ("title", "name"), ("foo", "foo")])
                .map("baz", "baz"),
        )
        .build()
        .unwrap();
    let engine = Arc::new(SyncEngine::new(p.master.clone(), config).unwrap());
    engine.attach(&p.master);
    engine
}

fn backward(p: &Pair) -> Arc<SyncEngine> {
    let config = SyncConfig::builder()
        .with_slave(p.master.clone())
        .with_field_map(FieldMapSpec::renamed([
            ("id", "id"),
            ("name", "title"),
            ("foo", "foo"),
            ("baz", "baz"),
        ]))
        .build()
        .unwrap();
    let engine = Arc::new(SyncEngine::new(p.slave.clone(), config).unwrap());
    engine.attach(&p.slave);
    engine
}

#[test]
fn one_master_save_writes_one_slave_and_no_echo() {
    let p = pair();
    let _forward = forward(&p);
    let _backward = backward(&p);

    insert_master(p.master.as_ref(), "lala", "bar", 10);

    let master = p.master_counts.counts();
    let slave = p.slave_counts.counts();
    assert_eq!(master.writes, 1);
    assert_eq!(slave.writes, 1);
    assert_eq!(slave.finds, 0);

    let mirrored = p.slave.find_by_key(&RecordKey::Int(1)).unwrap().unwrap();
    assert_eq!(mirrored.get("title"), Some(&json!("lala")));
}

#[test]
fn updates_flow_both_ways_without_loops() {
    let p = pair();
    let _forward = forward(&p);
    let _backward = backward(&p);
    let mut master = insert_master(p.master.as_ref(), "lala", "bar", 10);

    master.set("name", "UpdatedName").unwrap();
    assert!(p.master.save(&mut master).unwrap());
    let slave = p.slave.find_by_key(&RecordKey::Int(1)).unwrap().unwrap();
    assert_eq!(slave.get("title"), Some(&json!("UpdatedName")));

    let mut slave = slave;
    slave.set("title", "FromSlave").unwrap();
    p.master_counts.reset();
    p.slave_counts.reset();
    assert!(p.slave.save(&mut slave).unwrap());

    assert_eq!(p.slave_counts.counts().writes, 1);
    assert_eq!(p.master_counts.counts().writes, 1);
    let master = p.master.find_by_key(&RecordKey::Int(1)).unwrap().unwrap();
    assert_eq!(master.get("name"), Some(&json!("FromSlave")));
}

#[test]
fn master_delete_removes_slave_once() {
    let p = pair();
    let _forward = forward(&p);
    let _backward = backward(&p);
    let master = insert_master(p.master.as_ref(), "lala", "bar", 10);

    p.slave_counts.reset();
    assert!(p.master.delete(&master).unwrap());
    assert_eq!(p.slave.count().unwrap(), 0);
    assert_eq!(p.slave_counts.counts().deletes, 1);
    assert_eq!(p.master_counts.counts().deletes, 1);
}

#[test]
fn disabled_triggers_leave_only_manual_sync() {
    let p = pair();
    let config = SyncConfig::builder()
        .with_slave(p.slave.clone())
        .with_field_map(FieldMapSpec::renamed([
            ("id", "id"),
            ("title", "name"),
            ("foo", "foo"),
            ("baz", "baz"),
        ]))
        .with_save_triggers(TriggerSet::none())
        .with_delete_triggers(TriggerSet::none())
        .build()
        .unwrap();
    let engine = Arc::new(SyncEngine::new(p.master.clone(), config).unwrap());
    engine.attach(&p.master);

    fill_master(p.master.as_ref(), 3);
    assert_eq!(p.slave.count().unwrap(), 0);

    engine.sync_all_default().unwrap();
    assert_eq!(p.slave.count().unwrap(), 3);
}

#[test]
fn hook_error_reaches_the_master_writer() {
    let p = pair();
    let config = SyncConfig::builder()
        .with_slave(p.slave.clone())
        .with_field_map(FieldMapSpec::renamed([("id", "id"), ("title", "name")]))
        .on_save_failure(|_| Err("fail save".into()))
        .build()
        .unwrap();
    let engine = Arc::new(SyncEngine::new(p.master.clone(), config).unwrap());
    engine.attach(&p.master);

    let mut record = p.master.new_record();
    record.set("name", "lala").unwrap();
    record.set("foo", "bar").unwrap();
    let err = p.master.save(&mut record).unwrap_err();

    assert!(matches!(err, StorageError::Observer(_)));
    let err = SyncError::from(err);
    assert_eq!(err.callback_source().unwrap().to_string(), "fail save");
    assert_eq!(p.slave.count().unwrap(), 0);
}
