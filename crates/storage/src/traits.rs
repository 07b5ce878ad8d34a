use pdata_core::Value;

use crate::error::StorageError;

/// Named bind values, kept in insertion order. Names carry the leading colon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    items: Vec<(String, Value)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the value bound to `name`.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.items.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.items.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.items.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// One fetched row, columns in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.columns
    }
}

/// Outcome of an executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementResult {
    pub sql: String,
    pub bindings: Bindings,
    pub affected: usize,
    pub rows: Vec<Row>,
}

/// Connection-level contract consumed by persistence requests.
pub trait Database {
    type Statement<'a>: PreparedStatement
    where
        Self: 'a;

    /// Prepares `sql`; placeholders are `:name` and are bound by name.
    fn prepared(&self, sql: &str) -> Result<Self::Statement<'_>, StorageError>;

    /// Identifier assigned by the store to the most recent insert.
    fn last_inserted_id(&self) -> Result<Value, StorageError>;
}

pub trait PreparedStatement: Sized {
    fn with_values(self, values: Bindings) -> Result<Self, StorageError>;

    fn executed(self) -> Result<StatementResult, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_replace_by_name() {
        let b = Bindings::new().with(":memo", "a").with(":id", "1").with(":memo", "b");
        assert_eq!(b.len(), 2);
        assert_eq!(b.get(":memo"), Some(&Value::from("b")));
        let names: Vec<&str> = b.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec![":memo", ":id"]);
    }

    #[test]
    fn row_lookup() {
        let row = Row::new(vec![("id".into(), Value::Integer(1)), ("memo".into(), Value::Null)]);
        assert_eq!(row.get("id"), Some(&Value::Integer(1)));
        assert_eq!(row.get("nope"), None);
        assert_eq!(row.into_pairs().len(), 2);
    }
}
