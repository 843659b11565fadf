//! Contract tests run against every built-in store.

use proptest::prelude::*;
use recsync_storage::{
    Batches, FileStore, InMemoryStore, KeyFilter, Record, RecordKey, RecordSchema, RecordStore,
    StorageResult,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use tempfile::TempDir;

fn schema() -> RecordSchema {
    RecordSchema::new("items", &["id"], &["name", "qty"])
        .with_auto_increment()
        .with_required(&["name"])
}

fn exercise(store: &dyn RecordStore) {
    assert_eq!(store.count().unwrap(), 0);

    let mut keys = Vec::new();
    for i in 0..5 {
        let mut record = store.new_record();
        record.set("name", format!("item{i}")).unwrap();
        record.set("qty", i).unwrap();
        assert!(store.save(&mut record).unwrap());
        keys.push(record.primary_key().unwrap());
    }
    assert_eq!(store.count().unwrap(), 5);

    let mut invalid = store.new_record();
    assert!(!store.save(&mut invalid).unwrap());
    assert_eq!(store.count().unwrap(), 5);

    let mut third = store.find_by_key(&keys[2]).unwrap().unwrap();
    third.set("qty", 100).unwrap();
    assert!(store.save(&mut third).unwrap());
    let reread = store.find_by_key(&keys[2]).unwrap().unwrap();
    assert_eq!(reread.get("qty"), Some(&json!(100)));

    assert!(store.delete(&reread).unwrap());
    assert!(!store.delete(&reread).unwrap());
    assert!(store.find_by_key(&keys[2]).unwrap().is_none());

    let keep: BTreeSet<RecordKey> = [keys[0].clone()].into();
    assert_eq!(store.delete_all(&KeyFilter::NotIn(keep)).unwrap(), 3);
    let remaining: Vec<RecordKey> = store
        .iterate_all()
        .unwrap()
        .iter()
        .filter_map(Record::primary_key)
        .collect();
    assert_eq!(remaining, vec![keys[0].clone()]);
}

#[test]
fn memory_store_contract() {
    exercise(&InMemoryStore::new(schema()));
}

#[test]
fn file_store_contract() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::create(&dir.path().join("items.json"), schema()).unwrap();
    exercise(&store);
}

#[test]
fn text_and_composite_keys() {
    let store = InMemoryStore::new(RecordSchema::new("pairs", &["a", "b"], &["v"]));
    let mut record = store.new_record();
    record.set("a", "left").unwrap();
    record.set("b", 2).unwrap();
    record.set("v", true).unwrap();
    assert!(store.save(&mut record).unwrap());

    let key = RecordKey::Composite(vec!["left".into(), RecordKey::Int(2)]);
    assert!(store.find_by_key(&key).unwrap().is_some());

    // no auto-increment: a record without key fields cannot be saved
    let mut keyless = store.new_record();
    keyless.set("v", false).unwrap();
    assert!(store.save(&mut keyless).is_err());
}

proptest! {
    #[test]
    fn batches_concatenate_to_full_scan(count in 0usize..40, batch_size in 1usize..10) {
        let store = InMemoryStore::new(schema());
        for i in 0..count {
            let mut record = store.new_record();
            record.set("name", format!("n{i}")).unwrap();
            prop_assert!(store.save(&mut record).unwrap());
        }

        let batched: Vec<Record> = Batches::new(&store, NonZeroUsize::new(batch_size).unwrap())
            .collect::<StorageResult<Vec<_>>>()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        prop_assert_eq!(batched, store.iterate_all().unwrap());
    }
}
