use pdata_core::record::field;
use pdata_core::{Collectable, Collector, Positions, Registry, Value};
use pdata_storage::{Bindings, Database, PreparedStatement, StatementResult};
use tracing::debug;

use crate::error::EngineError;

pub const STATEMENT: &str = "statement";

/// A persistence operation. Every transition returns a new request; the
/// outcome is reported through `attrs` and the collected `statement`.
pub trait Request: Collectable + Clone {
    fn attrs(&self) -> &Registry;

    fn with_attr(&self, key: &str, value: impl Into<Value>) -> Self;

    fn executed<D: Database>(&self, db: &D) -> Result<Self, EngineError>;
}

/// Builds the default request for an entity; used by dispatchers.
pub trait FromEntity<E> {
    fn from_entity(entity: E) -> Self;
}

pub(crate) fn run<D: Database>(
    db: &D,
    sql: &str,
    bindings: Bindings,
) -> Result<StatementResult, EngineError> {
    debug!(sql, binds = bindings.len(), "executing request");
    Ok(db.prepared(sql)?.with_values(bindings)?.executed()?)
}

/// Emits the executed statement text (null before execution) and the attrs.
pub(crate) fn collect_outcome<C: Collector>(
    statement: Option<&StatementResult>,
    attrs: &Registry,
    collector: C,
) -> Result<C::Output, C::Error> {
    let sql = statement.map(|s| Value::from(s.sql.as_str()));
    collector
        .with(STATEMENT, Value::from(sql))?
        .with(field::ATTRS, Value::from(attrs.clone()))?
        .finished()
}

/// Bind value for a resolved position.
pub(crate) fn placeholder(key: &str) -> String {
    format!(":{key}")
}

/// Data fields present in `positions`, in column order.
pub(crate) fn columns(positions: &Positions) -> impl Iterator<Item = (&'static str, &Value)> {
    field::ALL
        .into_iter()
        .filter_map(move |key| positions.get(key).map(|v| (key, v)))
}
