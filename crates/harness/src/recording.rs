use std::cell::{Cell, RefCell};

use pdata_core::Value;
use pdata_storage::{Bindings, Database, PreparedStatement, Row, StatementResult, StorageError};

/// In-memory stand-in for a connection. Records every executed statement
/// and answers selects with canned rows.
pub struct RecordingDatabase {
    log: RefCell<Vec<StatementResult>>,
    prepared: Cell<usize>,
    last_id: Value,
    affected: usize,
    rows: Vec<Row>,
}

impl Default for RecordingDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self {
            log: RefCell::new(Vec::new()),
            prepared: Cell::new(0),
            last_id: Value::from("1"),
            affected: 1,
            rows: Vec::new(),
        }
    }

    pub fn with_last_id(mut self, id: impl Into<Value>) -> Self {
        self.last_id = id.into();
        self
    }

    pub fn with_affected(mut self, affected: usize) -> Self {
        self.affected = affected;
        self
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn executed(&self) -> Vec<StatementResult> {
        self.log.borrow().clone()
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared.get()
    }

    /// True when nothing has touched the database.
    pub fn untouched(&self) -> bool {
        self.prepared.get() == 0 && self.log.borrow().is_empty()
    }
}

impl Database for RecordingDatabase {
    type Statement<'a> = RecordedStatement<'a>;

    fn prepared(&self, sql: &str) -> Result<RecordedStatement<'_>, StorageError> {
        self.prepared.set(self.prepared.get() + 1);
        Ok(RecordedStatement {
            db: self,
            sql: sql.to_string(),
            bindings: Bindings::new(),
        })
    }

    fn last_inserted_id(&self) -> Result<Value, StorageError> {
        Ok(self.last_id.clone())
    }
}

pub struct RecordedStatement<'a> {
    db: &'a RecordingDatabase,
    sql: String,
    bindings: Bindings,
}

impl PreparedStatement for RecordedStatement<'_> {
    fn with_values(mut self, values: Bindings) -> Result<Self, StorageError> {
        for (name, value) in values.iter() {
            self.bindings = self.bindings.with(name, value.clone());
        }
        Ok(self)
    }

    fn executed(self) -> Result<StatementResult, StorageError> {
        let select = self.sql.starts_with("SELECT");
        let result = StatementResult {
            sql: self.sql,
            bindings: self.bindings,
            affected: if select { 0 } else { self.db.affected },
            rows: if select { self.db.rows.clone() } else { Vec::new() },
        };
        self.db.log.borrow_mut().push(result.clone());
        Ok(result)
    }
}
