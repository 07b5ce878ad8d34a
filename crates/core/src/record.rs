use chrono::{DateTime, Utc};

use crate::collector::{Collectable, Collector};
use crate::error::CoreError;
use crate::ids::LineageId;
use crate::registry::{Registry, attr};
use crate::value::Value;

pub mod field {
    pub const ID: &str = "id";
    pub const MEMO: &str = "memo";
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
    pub const ATTRS: &str = "attrs";

    /// Data columns in collection order.
    pub const ALL: [&str; 4] = [ID, MEMO, CREATED, UPDATED];
}

/// Functional setters shared by records and their decorators.
pub trait Entity: Collectable + Clone {
    fn with_id(&self, id: &str) -> Result<Self, CoreError>;

    fn with_memo(&self, memo: &str) -> Self;

    fn with_created(&self, created: DateTime<Utc>) -> Self;

    fn with_updated(&self, updated: Option<DateTime<Utc>>) -> Self;

    fn with_attr(&self, key: &str, value: impl Into<Value>) -> Self;

    fn attrs(&self) -> &Registry;
}

/// Immutable record. Fields are only observable through [`Collectable`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    id: Option<String>,
    memo: Option<String>,
    created: Option<DateTime<Utc>>,
    // Outer `None` means never set; `Some(None)` is an explicit null.
    updated: Option<Option<DateTime<Utc>>>,
    attrs: Registry,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    fn touched(&self) -> Self {
        self.with_attr(attr::DIRTY, true)
    }
}

impl Entity for Record {
    fn with_id(&self, id: &str) -> Result<Self, CoreError> {
        if let Some(current) = self.id.as_deref() {
            if current == id {
                return Ok(self.clone());
            }
            if !current.is_empty() && self.attrs.flag(attr::PERSISTED) {
                return Err(CoreError::ConstraintViolation(format!(
                    "changing the primary key of a persisted record ({current} -> {id})"
                )));
            }
        }
        let mut obj = self.touched();
        obj.id = Some(id.to_string());
        Ok(obj)
    }

    fn with_memo(&self, memo: &str) -> Self {
        if self.memo.as_deref() == Some(memo) {
            return self.clone();
        }
        let mut obj = self.touched();
        obj.memo = Some(memo.to_string());
        obj
    }

    fn with_created(&self, created: DateTime<Utc>) -> Self {
        if self.created == Some(created) {
            return self.clone();
        }
        let mut obj = self.touched();
        obj.created = Some(created);
        obj
    }

    fn with_updated(&self, updated: Option<DateTime<Utc>>) -> Self {
        if self.updated == Some(updated) {
            return self.clone();
        }
        let mut obj = self.touched();
        obj.updated = Some(updated);
        obj
    }

    fn with_attr(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut attrs = self.attrs.clone();
        if !attrs.contains(attr::ORIGINAL_HASH_CODE) {
            attrs = attrs.with(attr::ORIGINAL_HASH_CODE, LineageId::new().to_string());
        }
        Self {
            attrs: attrs.with(key, value),
            ..self.clone()
        }
    }

    fn attrs(&self) -> &Registry {
        &self.attrs
    }
}

impl Collectable for Record {
    fn collected<C: Collector>(&self, collector: C) -> Result<C::Output, C::Error> {
        let mut collector = collector;
        if let Some(id) = &self.id {
            collector = collector.with(field::ID, Value::from(id.as_str()))?;
        }
        if let Some(memo) = &self.memo {
            collector = collector.with(field::MEMO, Value::from(memo.as_str()))?;
        }
        if let Some(created) = self.created {
            collector = collector.with(field::CREATED, Value::from(created))?;
        }
        if let Some(updated) = self.updated {
            collector = collector.with(field::UPDATED, Value::from(updated))?;
        }
        collector
            .with(field::ATTRS, Value::from(self.attrs.clone()))?
            .finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Snapshot;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn keys(record: &Record) -> Vec<String> {
        record.collected(Snapshot::new()).unwrap().keys().cloned().collect()
    }

    #[test]
    fn setter_marks_dirty() {
        let r = Record::new().with_memo("a");
        assert!(r.attrs().flag(attr::DIRTY));
    }

    #[test]
    fn same_value_is_noop() {
        let r = Record::new().with_memo("a").with_attr(attr::DIRTY, false);
        let same = r.with_memo("a");
        assert_eq!(same, r);
        assert!(!same.attrs().flag(attr::DIRTY));
    }

    #[test]
    fn first_attr_stamps_lineage_once() {
        let r = Record::new().with_attr("x", 1);
        let token = r.attrs().value(attr::ORIGINAL_HASH_CODE).cloned();
        assert!(token.is_some());
        let r2 = r.with_attr("y", 2).with_memo("m");
        assert_eq!(r2.attrs().value(attr::ORIGINAL_HASH_CODE).cloned(), token);
    }

    #[test]
    fn persisted_id_is_locked() {
        let r = Record::new()
            .with_id("A")
            .unwrap()
            .with_attr(attr::PERSISTED, true)
            .with_attr(attr::DIRTY, false);
        let err = r.with_id("B").unwrap_err();
        assert_eq!(err.kind(), "constraint_violation");
        let same = r.with_id("A").unwrap();
        assert_eq!(same, r);
    }

    #[test]
    fn id_may_change_before_persisting() {
        let r = Record::new().with_id("A").unwrap().with_id("B").unwrap();
        let snap = r.collected(Snapshot::new()).unwrap();
        assert_eq!(snap.get(field::ID), Some(&Value::from("B")));
    }

    #[test]
    fn collects_only_set_fields_then_attrs() {
        assert_eq!(keys(&Record::new()), vec!["attrs"]);
        let r = Record::new().with_created(t0()).with_memo("x");
        assert_eq!(keys(&r), vec!["memo", "created", "attrs"]);
    }

    #[test]
    fn explicit_null_updated_is_collected() {
        let r = Record::new().with_updated(None);
        let snap = r.collected(Snapshot::new()).unwrap();
        assert_eq!(snap.get(field::UPDATED), Some(&Value::Null));
        assert!(r.attrs().flag(attr::DIRTY));
    }

    #[test]
    fn setters_do_not_mutate_source() {
        let r = Record::new().with_memo("a");
        let _ = r.with_memo("b");
        let snap = r.collected(Snapshot::new()).unwrap();
        assert_eq!(snap.get(field::MEMO), Some(&Value::from("a")));
    }
}
