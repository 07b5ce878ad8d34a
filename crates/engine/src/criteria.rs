use indexmap::IndexMap;
use pdata_core::record::field;
use pdata_core::{
    Collectable, Collector, CoreError, Entity, EntityFactory, Record, Registry, Value, attr,
    timestamp,
};
use pdata_storage::{Bindings, Database, Row, StatementResult};
use tracing::trace;

use crate::error::EngineError;
use crate::request::{Request, collect_outcome, placeholder, run};
use crate::table::Table;

/// At least one of these must be set to a non-null value.
const REQUIRED_ANY: [&str; 3] = [field::ID, field::MEMO, field::CREATED];

/// Selects rows matching the fields of an entity. Null fields match `IS NULL`.
#[derive(Debug, Clone)]
pub struct Criteria<E = Record> {
    entity: E,
    locked: bool,
    table: Table,
    attrs: Registry,
    collecting: IndexMap<String, Value>,
    filters: Option<IndexMap<String, Value>>,
    statement: Option<StatementResult>,
}

impl<E: Entity> Criteria<E> {
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            locked: false,
            table: Table::default(),
            attrs: Registry::new(),
            collecting: IndexMap::new(),
            filters: None,
            statement: None,
        }
    }

    /// Appends `FOR UPDATE` to the select. SQLite has no row locking and
    /// rejects the clause, so `SqliteDatabase` fails to prepare these.
    pub fn locked(entity: E) -> Self {
        Self {
            locked: true,
            ..Self::new(entity)
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = table;
        self
    }

    pub fn statement(&self) -> Option<&StatementResult> {
        self.statement.as_ref()
    }

    pub fn rows(&self) -> &[Row] {
        self.statement.as_ref().map_or(&[], |s| s.rows.as_slice())
    }

    /// Fetched rows as persisted records.
    pub fn records(&self) -> Result<Vec<Record>, CoreError> {
        self.rows()
            .iter()
            .map(|row| EntityFactory::new().from_pairs(row.clone().into_pairs()))
            .collect()
    }

    fn validate(filters: &IndexMap<String, Value>) -> Result<(), EngineError> {
        let usable = REQUIRED_ANY
            .iter()
            .any(|key| filters.get(*key).is_some_and(|v| !v.is_null()));
        if !usable {
            return Err(EngineError::InvalidCriteria(format!(
                "one of {} must be set",
                REQUIRED_ANY.join(", ")
            )));
        }
        Ok(())
    }

    fn sql_statement(&self, filters: &IndexMap<String, Value>) -> (String, Bindings) {
        let mut conditions = Vec::new();
        let mut bindings = Bindings::new();
        for key in field::ALL {
            match filters.get(key) {
                None => {}
                Some(Value::Null) => conditions.push(format!("{key} IS NULL")),
                Some(value) => {
                    conditions.push(format!("{key}={}", placeholder(key)));
                    bindings = bindings.with(&placeholder(key), bound(value));
                }
            }
        }
        let mut sql = format!("SELECT * FROM {} WHERE {}", self.table, conditions.join(" AND "));
        if self.locked {
            sql.push_str(" FOR UPDATE");
        }
        (sql, bindings)
    }
}

fn bound(value: &Value) -> Value {
    match value {
        Value::Timestamp(dt) => Value::Text(timestamp::to_storage(dt)),
        other => other.clone(),
    }
}

impl<E: Entity> Collector for Criteria<E> {
    type Output = Criteria<E>;
    type Error = EngineError;

    fn with(self, key: &str, value: Value) -> Result<Self, EngineError> {
        if self.filters.is_some() {
            return Err(CoreError::SealedMutation(key.to_string()).into());
        }
        if !field::ALL.contains(&key) {
            trace!(key, "criteria ignores non-column key");
            return Ok(self);
        }
        let mut obj = self;
        obj.collecting.insert(key.to_string(), value);
        Ok(obj)
    }

    fn finished(self) -> Result<Self, EngineError> {
        if self.filters.is_some() {
            return Ok(self);
        }
        if self.collecting.is_empty() {
            return Err(EngineError::EmptyCriteria);
        }
        let mut obj = self;
        obj.filters = Some(std::mem::take(&mut obj.collecting));
        Ok(obj)
    }
}

impl<E: Entity> Request for Criteria<E> {
    fn attrs(&self) -> &Registry {
        &self.attrs
    }

    fn with_attr(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut obj = self.clone();
        obj.attrs = self.attrs.with(key, value);
        obj
    }

    fn executed<D: Database>(&self, db: &D) -> Result<Self, EngineError> {
        let Some(filters) = &self.filters else {
            return self.entity.collected(self.clone())?.executed(db);
        };
        Self::validate(filters)?;
        let (sql, bindings) = self.sql_statement(filters);
        let mut obj = self.with_attr(attr::TYPE, "criteria");
        obj.statement = Some(run(db, &sql, bindings)?);
        Ok(obj.with_attr(attr::PROCESSED, true))
    }
}

impl<E: Entity> Collectable for Criteria<E> {
    fn collected<C: Collector>(&self, collector: C) -> Result<C::Output, C::Error> {
        collect_outcome(self.statement.as_ref(), &self.attrs, collector)
    }
}
