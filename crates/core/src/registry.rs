use std::collections::BTreeMap;

use crate::value::Value;

/// Recognized attribute keys.
pub mod attr {
    pub const PERSISTED: &str = "persisted";
    pub const DIRTY: &str = "dirty";
    pub const ORIGINAL_HASH_CODE: &str = "originalHashCode";
    pub const TYPE: &str = "type";
    pub const PROCESSED: &str = "processed";
    pub const INSERTED_ID: &str = "insertedId";
    pub const AFFECTED_ROWS: &str = "affectedRows";
}

/// Immutable key/value metadata. Every `with` returns a new registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<String, Value>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(key.to_string(), value.into());
        Self { entries }
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn value_or(&self, key: &str, default: Value) -> Value {
        self.entries.get(key).cloned().unwrap_or(default)
    }

    /// Boolean attribute; absent or non-boolean reads as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.value(key)
            .and_then(Value::as_boolean)
            .unwrap_or(false)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_leaves_original_untouched() {
        let base = Registry::new().with(attr::PERSISTED, true);
        let next = base.with(attr::DIRTY, true);

        assert!(!base.contains(attr::DIRTY));
        assert!(next.flag(attr::DIRTY));
        assert!(next.flag(attr::PERSISTED));
    }

    #[test]
    fn missing_key_yields_default() {
        let r = Registry::new();
        assert_eq!(r.value(attr::TYPE), None);
        assert_eq!(r.value_or(attr::TYPE, Value::from("none")), Value::from("none"));
        assert!(!r.flag(attr::PERSISTED));
    }

    #[test]
    fn non_boolean_flag_reads_false() {
        let r = Registry::new().with(attr::PERSISTED, "yes");
        assert!(!r.flag(attr::PERSISTED));
    }

    #[test]
    fn overwrite_replaces_value() {
        let r = Registry::new().with(attr::TYPE, "insert").with(attr::TYPE, "update");
        assert_eq!(r.value(attr::TYPE), Some(&Value::from("update")));
        assert_eq!(r.len(), 1);
    }
}
