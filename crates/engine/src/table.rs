use std::fmt;

use pdata_storage::schema::DEFAULT_TABLE;

use crate::error::EngineError;

/// A table name safe to splice into statement text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Table(String);

impl Table {
    pub fn new(name: &str) -> Result<Self, EngineError> {
        let mut chars = name.chars();
        let head_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(EngineError::InvalidTable(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Table {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_string())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
