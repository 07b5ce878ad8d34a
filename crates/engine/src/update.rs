use pdata_core::record::field;
use pdata_core::{
    Collectable, Collector, CoreError, Entity, Inventory, Positions, Record, Registry, Value, attr,
};
use pdata_storage::{Bindings, Database, StatementResult};
use tracing::warn;

use crate::entity_inventory::{self, persisted};
use crate::error::EngineError;
use crate::request::{FromEntity, Request, collect_outcome, columns, placeholder, run};
use crate::table::Table;

/// Updates a persisted entity by `id`, setting every collected data field.
/// Feed it a `WithChangesOnly` to restrict the statement to what changed.
#[derive(Debug, Clone)]
pub struct Update<E = Record> {
    entity: E,
    attrs: Registry,
    inventory: Inventory,
    table: Table,
    statement: Option<StatementResult>,
}

impl<E: Entity> Update<E> {
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

    /// Statement text and bind values; `None` when no field is to be set.
    fn sql_statement(&self, p: &Positions) -> Result<Option<(String, Bindings)>, CoreError> {
        let id = p.fetch(field::ID).orig()?;
        if id.is_null() {
            return Err(CoreError::MissingField(field::ID.into()));
        }
        let sets: Vec<(&str, &Value)> = columns(p).filter(|(k, _)| *k != field::ID).collect();
        if sets.is_empty() {
            return Ok(None);
        }
        let assignments: Vec<String> = sets
            .iter()
            .map(|(k, _)| format!("{k}={}", placeholder(k)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id=:id",
            self.table,
            assignments.join(",")
        );
        let bindings = sets
            .into_iter()
            .fold(Bindings::new(), |b, (k, v)| b.with(&placeholder(k), v.clone()))
            .with(":id", id);
        Ok(Some((sql, bindings)))
    }
}

impl<E: Entity> FromEntity<E> for Update<E> {
    fn from_entity(entity: E) -> Self {
        Self::new(entity)
    }
}

impl<E: Entity> Request for Update<E> {
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
        let mut obj = self.with_attr(attr::TYPE, "update");
        let p = self.inventory.positions();
        let Some((sql, bindings)) = self.sql_statement(p)? else {
            return Ok(obj.with_attr(attr::PROCESSED, false));
        };
        if !persisted(p) {
            warn!(table = %self.table, "update rejected for an entity that is not persisted");
            return Err(EngineError::OperationProhibited(
                "`update` operation is prohibited for an entity that is not persisted".into(),
            ));
        }
        let result = run(db, &sql, bindings)?;
        let affected = i64::try_from(result.affected).unwrap_or(i64::MAX);
        obj.statement = Some(result);
        Ok(obj
            .with_attr(attr::PROCESSED, true)
            .with_attr(attr::AFFECTED_ROWS, affected))
    }
}

impl<E: Entity> Collectable for Update<E> {
    fn collected<C: Collector>(&self, collector: C) -> Result<C::Output, C::Error> {
        collect_outcome(self.statement.as_ref(), &self.attrs, collector)
    }
}
