use pdata_core::{CoreError, Entity, Record, Value, attr};
use pdata_engine::{Criteria, EngineError, Insert, Request, SyncRequest};
use pdata_storage::{SqliteDatabase, StorageError};
use tempfile::TempDir;

/// A SQLite-backed store with the request plumbing spelled out once.
pub struct TestStore {
    pub db: SqliteDatabase,
    _dir: Option<TempDir>,
}

impl TestStore {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            db: SqliteDatabase::open_in_memory()?,
            _dir: None,
        })
    }

    /// A store backed by a file in a fresh temporary directory.
    pub fn on_disk() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pdata.db");
        let path = path.to_str().ok_or("non-utf8 temp path")?;
        Ok(Self {
            db: SqliteDatabase::open(path)?,
            _dir: Some(dir),
        })
    }

    /// Inserts `record` and returns the store-assigned id.
    pub fn insert(&self, record: Record) -> Result<String, EngineError> {
        let done = Insert::new(record).executed(&self.db)?;
        match done.attrs().value(attr::INSERTED_ID) {
            Some(Value::Text(id)) => Ok(id.clone()),
            other => Err(CoreError::InternalConsistency(format!("insert reported id {other:?}")).into()),
        }
    }

    pub fn load(&self, id: &str) -> Result<Option<Record>, EngineError> {
        let criteria = Criteria::new(Record::new().with_id(id)?).executed(&self.db)?;
        Ok(criteria.records()?.into_iter().next())
    }

    pub fn sync<E: Entity>(&self, entity: E) -> Result<SyncRequest<E>, EngineError> {
        SyncRequest::new(entity).executed(&self.db)
    }
}
