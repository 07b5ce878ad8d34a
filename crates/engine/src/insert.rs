use pdata_core::{
    Collectable, Collector, CoreError, Entity, Inventory, Positions, Record, Registry, Value, attr,
};
use pdata_storage::{Bindings, Database, StatementResult};
use tracing::warn;

use crate::entity_inventory::{self, persisted};
use crate::error::EngineError;
use crate::request::{FromEntity, Request, collect_outcome, columns, placeholder, run};
use crate::table::Table;

/// Inserts a not yet persisted entity. Absent and null fields are left to the
/// store, including `id`.
#[derive(Debug, Clone)]
pub struct Insert<E = Record> {
    entity: E,
    attrs: Registry,
    inventory: Inventory,
    table: Table,
    statement: Option<StatementResult>,
}

impl<E: Entity> Insert<E> {
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            attrs: Registry::new(),
            inventory: entity_inventory::inventory(),
            table: Table::default(),
            statement: None,
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = table;
        self
    }

    pub fn statement(&self) -> Option<&StatementResult> {
        self.statement.as_ref()
    }

    /// Statement text and bind values; `None` when there is nothing to insert.
    fn sql_statement(&self, p: &Positions) -> Option<(String, Bindings)> {
        let present: Vec<(&str, &Value)> = columns(p).filter(|(_, v)| !v.is_null()).collect();
        if present.is_empty() {
            return None;
        }
        let names: Vec<&str> = present.iter().map(|(k, _)| *k).collect();
        let holders: Vec<String> = names.iter().map(|k| placeholder(k)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            names.join(","),
            holders.join(",")
        );
        let bindings = present
            .into_iter()
            .fold(Bindings::new(), |b, (k, v)| b.with(&placeholder(k), v.clone()));
        Some((sql, bindings))
    }
}

impl<E: Entity> FromEntity<E> for Insert<E> {
    fn from_entity(entity: E) -> Self {
        Self::new(entity)
    }
}

impl<E: Entity> Request for Insert<E> {
    fn attrs(&self) -> &Registry {
        &self.attrs
    }

    fn with_attr(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut obj = self.clone();
        obj.attrs = self.attrs.with(key, value);
        obj
    }

    fn executed<D: Database>(&self, db: &D) -> Result<Self, EngineError> {
        if !self.inventory.is_finished() {
            let mut obj = self.clone();
            obj.inventory = self
                .entity
                .collected(self.inventory.clone())
                .map_err(CoreError::into_domain)?;
            return obj.executed(db);
        }
        let mut obj = self.with_attr(attr::TYPE, "insert");
        let p = self.inventory.positions();
        let Some((sql, bindings)) = self.sql_statement(p) else {
            return Ok(obj.with_attr(attr::PROCESSED, false));
        };
        if persisted(p) {
            warn!(table = %self.table, "insert rejected for a persisted entity");
            return Err(EngineError::OperationProhibited(
                "`insert` operation is prohibited for a persisted entity".into(),
            ));
        }
        obj.statement = Some(run(db, &sql, bindings)?);
        let inserted = db.last_inserted_id()?;
        Ok(obj
            .with_attr(attr::PROCESSED, true)
            .with_attr(attr::INSERTED_ID, inserted))
    }
}

impl<E: Entity> Collectable for Insert<E> {
    fn collected<C: Collector>(&self, collector: C) -> Result<C::Output, C::Error> {
        collect_outcome(self.statement.as_ref(), &self.attrs, collector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sql_of(record: Record) -> Option<(String, Bindings)> {
        let insert = Insert::new(record.clone());
        let inv = record.collected(entity_inventory::inventory()).unwrap();
        insert.sql_statement(inv.positions())
    }

    #[test]
    fn omits_absent_id() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let (sql, bindings) = sql_of(Record::new().with_memo("x").with_created(created)).unwrap();
        assert_eq!(sql, "INSERT INTO foo (memo,created) VALUES (:memo,:created)");
        assert_eq!(bindings.get(":memo"), Some(&Value::from("x")));
        assert_eq!(bindings.get(":created"), Some(&Value::from("2020-01-01 00:00:00")));
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn includes_explicit_id_and_skips_null_updated() {
        let record = Record::new()
            .with_id("9")
            .unwrap()
            .with_memo("m")
            .with_updated(None);
        let (sql, _) = sql_of(record).unwrap();
        assert_eq!(sql, "INSERT INTO foo (id,memo) VALUES (:id,:memo)");
    }

    #[test]
    fn nothing_to_insert() {
        assert!(sql_of(Record::new()).is_none());
    }

    #[test]
    fn custom_table() {
        let record = Record::new().with_memo("x");
        let insert = Insert::new(record.clone()).with_table(Table::new("bar").unwrap());
        let inv = record.collected(entity_inventory::inventory()).unwrap();
        let (sql, _) = insert.sql_statement(inv.positions()).unwrap();
        assert_eq!(sql, "INSERT INTO bar (memo) VALUES (:memo)");
    }
}
