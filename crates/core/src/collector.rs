use indexmap::IndexMap;

use crate::error::CoreError;
use crate::value::Value;

/// Accepts key/value pairs one at a time, then seals into a terminal value.
///
/// Implementations are immutable: `with` consumes the collector and hands back
/// the next one. Anything that exposes its state does so by feeding a
/// collector rather than through getters, so the same record can be rendered
/// into a validated inventory, into bind values, or into a change set.
pub trait Collector: Sized {
    type Output;
    type Error: From<CoreError>;

    fn with(self, key: &str, value: Value) -> Result<Self, Self::Error>;

    fn finished(self) -> Result<Self::Output, Self::Error>;
}

/// Something that can feed its state into a [`Collector`].
pub trait Collectable {
    fn collected<C: Collector>(&self, collector: C) -> Result<C::Output, C::Error>;
}

/// Captures every pair into an insertion-ordered map.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: IndexMap<String, Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for Snapshot {
    type Output = IndexMap<String, Value>;
    type Error = CoreError;

    fn with(mut self, key: &str, value: Value) -> Result<Self, CoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(self)
    }

    fn finished(self) -> Result<Self::Output, CoreError> {
        Ok(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_insertion_order() {
        let out = Snapshot::new()
            .with("b", Value::Integer(2))
            .and_then(|s| s.with("a", Value::Integer(1)))
            .and_then(Collector::finished)
            .unwrap();
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
