use pdata_core::{Collectable, Entity, Record, Snapshot, Value, WithChangesOnly, attr};
use pdata_engine::{Criteria, EngineError, Insert, Request, Update};
use pdata_harness::TestStore;
use pdata_harness::fixtures::{draft, ts};

// ============================================================================
// Round trip (4 tests)
// ============================================================================

#[test]
fn insert_then_load() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::new()?;
    let id = store.insert(draft("hello", ts(2021, 3, 4, 5, 6, 7)))?;

    let record = store.load(&id)?.ok_or("record not found")?;
    let snap = record.collected(Snapshot::new())?;
    assert_eq!(snap.get("id"), Some(&Value::from(id.as_str())));
    assert_eq!(snap.get("memo"), Some(&Value::from("hello")));
    assert_eq!(snap.get("created"), Some(&Value::Timestamp(ts(2021, 3, 4, 5, 6, 7))));
    assert_eq!(snap.get("updated"), Some(&Value::Null));
    assert!(record.attrs().flag(attr::PERSISTED));
    assert!(!record.attrs().flag(attr::DIRTY));
    Ok(())
}

#[test]
fn load_then_sync_updates_changes() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::new()?;
    let id = store.insert(draft("before", ts(2021, 1, 1, 0, 0, 0)))?;
    let record = store.load(&id)?.ok_or("record not found")?;

    let tracked = WithChangesOnly::new(record)
        .with_memo("after")
        .with_updated(Some(ts(2021, 1, 2, 0, 0, 0)));
    let done = store.sync(tracked)?;
    assert_eq!(done.attrs().value(attr::TYPE), Some(&Value::from("update")));
    assert_eq!(done.attrs().value(attr::AFFECTED_ROWS), Some(&Value::Integer(1)));

    let reloaded = store.load(&id)?.ok_or("record not found")?;
    let snap = reloaded.collected(Snapshot::new())?;
    assert_eq!(snap.get("memo"), Some(&Value::from("after")));
    assert_eq!(snap.get("updated"), Some(&Value::Timestamp(ts(2021, 1, 2, 0, 0, 0))));
    Ok(())
}

#[test]
fn criteria_matches_null_updated() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::new()?;
    let created = ts(2021, 1, 1, 0, 0, 0);
    store.insert(draft("open", created))?;
    let closed = store.insert(draft("closed", created))?;
    let record = store.load(&closed)?.ok_or("record not found")?;
    Update::new(WithChangesOnly::new(record).with_updated(Some(ts(2021, 2, 1, 0, 0, 0))))
        .executed(&store.db)?;

    let filter = Record::new().with_created(created).with_updated(None);
    let found = Criteria::new(filter).executed(&store.db)?.records()?;
    assert_eq!(found.len(), 1);
    let snap = found[0].collected(Snapshot::new())?;
    assert_eq!(snap.get("memo"), Some(&Value::from("open")));
    Ok(())
}

#[test]
fn reinserting_a_loaded_record_is_prohibited() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::on_disk()?;
    let id = store.insert(draft("once", ts(2021, 1, 1, 0, 0, 0)))?;
    let record = store.load(&id)?.ok_or("record not found")?;

    let err = Insert::new(record).executed(&store.db).unwrap_err();
    assert!(matches!(err, EngineError::OperationProhibited(_)));
    assert_eq!(store.load("999")?, None);
    Ok(())
}

// ============================================================================
// Store constraints (2 tests)
// ============================================================================

#[test]
fn store_rejects_updated_before_created() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::new()?;
    let id = store.insert(draft("x", ts(2021, 1, 2, 0, 0, 0)))?;

    // Without `created` in the diff the inventory cannot compare; the table can.
    let record = store.load(&id)?.ok_or("record not found")?;
    let tracked = WithChangesOnly::new(record).with_updated(Some(ts(2021, 1, 1, 0, 0, 0)));
    let err = store.sync(tracked).unwrap_err();
    assert_eq!(err.kind(), "sqlite");
    Ok(())
}

#[test]
fn sqlite_rejects_locked_criteria() -> Result<(), Box<dyn std::error::Error>> {
    let store = TestStore::new()?;
    let id = store.insert(draft("x", ts(2021, 1, 1, 0, 0, 0)))?;
    let err = Criteria::locked(Record::new().with_id(&id)?)
        .executed(&store.db)
        .unwrap_err();
    assert_eq!(err.kind(), "sqlite");
    Ok(())
}
