use rusqlite::Connection;
use rusqlite::types::{Value as SqlValue, ValueRef};
use tracing::debug;

use pdata_core::{Value, timestamp};

use crate::error::StorageError;
use crate::traits::{Bindings, Database, PreparedStatement, Row, StatementResult};

/// Convert a bound value into its SQLite representation.
fn to_sql(name: &str, value: &Value) -> Result<SqlValue, StorageError> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::Timestamp(dt) => SqlValue::Text(timestamp::to_storage(dt)),
        Value::Registry(_) => {
            return Err(StorageError::Unbindable {
                name: name.to_string(),
                kind: value.type_name(),
            });
        }
    })
}

fn from_sql(column: &str, value: ValueRef<'_>) -> Result<Value, StorageError> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(
            String::from_utf8(bytes.to_vec())
                .map_err(|e| StorageError::Serialization(format!("{column}: {e}")))?,
        ),
        ValueRef::Blob(_) => {
            return Err(StorageError::Serialization(format!(
                "{column}: blob columns are not supported"
            )));
        }
    })
}

pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl Database for SqliteDatabase {
    type Statement<'a> = SqliteStatement<'a>;

    fn prepared(&self, sql: &str) -> Result<SqliteStatement<'_>, StorageError> {
        debug!(sql, "preparing statement");
        Ok(SqliteStatement {
            stmt: self.conn.prepare(sql)?,
            sql: sql.to_string(),
            bindings: Bindings::new(),
        })
    }

    fn last_inserted_id(&self) -> Result<Value, StorageError> {
        Ok(Value::Text(self.conn.last_insert_rowid().to_string()))
    }
}

pub struct SqliteStatement<'conn> {
    stmt: rusqlite::Statement<'conn>,
    sql: String,
    bindings: Bindings,
}

impl SqliteStatement<'_> {
    fn bind_all(&mut self) -> Result<(), StorageError> {
        for (name, value) in self.bindings.iter() {
            let index = self
                .stmt
                .parameter_index(name)?
                .ok_or_else(|| StorageError::UnknownParameter(name.to_string()))?;
            self.stmt.raw_bind_parameter(index, to_sql(name, value)?)?;
        }
        Ok(())
    }
}

impl PreparedStatement for SqliteStatement<'_> {
    fn with_values(mut self, values: Bindings) -> Result<Self, StorageError> {
        for (name, value) in values.iter() {
            self.bindings = self.bindings.with(name, value.clone());
        }
        Ok(self)
    }

    fn executed(mut self) -> Result<StatementResult, StorageError> {
        self.bind_all()?;
        let mut rows = Vec::new();
        let affected = if self.stmt.column_count() > 0 {
            let names: Vec<String> = self
                .stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();
            let mut cursor = self.stmt.raw_query();
            while let Some(row) = cursor.next()? {
                let mut columns = Vec::with_capacity(names.len());
                for (i, name) in names.iter().enumerate() {
                    columns.push((name.clone(), from_sql(name, row.get_ref(i)?)?));
                }
                rows.push(Row::new(columns));
            }
            0
        } else {
            self.stmt.raw_execute()?
        };
        debug!(sql = %self.sql, affected, rows = rows.len(), "statement executed");
        Ok(StatementResult {
            sql: self.sql,
            bindings: self.bindings,
            affected,
            rows,
        })
    }
}
