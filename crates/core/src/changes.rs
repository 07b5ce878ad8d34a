use chrono::{DateTime, Utc};

use crate::collector::{Collectable, Collector, Snapshot};
use crate::error::CoreError;
use crate::record::{Entity, Record, field};
use crate::registry::Registry;
use crate::value::Value;

/// Tracks changes against the snapshot it was created from and collects only
/// those, plus `id` and `attrs` which are always emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct WithChangesOnly<E = Record> {
    orig: E,
    current: E,
}

impl<E: Entity> WithChangesOnly<E> {
    pub fn new(entity: E) -> Self {
        Self {
            orig: entity.clone(),
            current: entity,
        }
    }

    pub fn original(&self) -> &E {
        &self.orig
    }

    pub fn current(&self) -> &E {
        &self.current
    }

    fn replaced(&self, current: E) -> Self {
        Self {
            orig: self.orig.clone(),
            current,
        }
    }
}

impl<E: Entity> Entity for WithChangesOnly<E> {
    fn with_id(&self, id: &str) -> Result<Self, CoreError> {
        Ok(self.replaced(self.current.with_id(id)?))
    }

    fn with_memo(&self, memo: &str) -> Self {
        self.replaced(self.current.with_memo(memo))
    }

    fn with_created(&self, created: DateTime<Utc>) -> Self {
        self.replaced(self.current.with_created(created))
    }

    fn with_updated(&self, updated: Option<DateTime<Utc>>) -> Self {
        self.replaced(self.current.with_updated(updated))
    }

    fn with_attr(&self, key: &str, value: impl Into<Value>) -> Self {
        self.replaced(self.current.with_attr(key, value))
    }

    fn attrs(&self) -> &Registry {
        self.current.attrs()
    }
}

impl<E: Entity> Collectable for WithChangesOnly<E> {
    fn collected<C: Collector>(&self, collector: C) -> Result<C::Output, C::Error> {
        let orig = self.orig.collected(Snapshot::new())?;
        let current = self.current.collected(Snapshot::new())?;
        if !orig.contains_key(field::ATTRS) || !current.contains_key(field::ATTRS) {
            return Err(CoreError::InternalConsistency(
                "collected entity carries no attrs".into(),
            )
            .into());
        }
        let mut collector = collector;
        for (key, value) in current {
            let always = key == field::ID || key == field::ATTRS;
            if always || orig.get(&key) != Some(&value) {
                collector = collector.with(&key, value)?;
            }
        }
        collector.finished()
    }
}
