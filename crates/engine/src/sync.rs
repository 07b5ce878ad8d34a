use std::sync::OnceLock;

use pdata_core::{Collectable, Collector, Entity, Record, Registry, Value, attr};
use pdata_storage::Database;
use tracing::trace;

use crate::error::EngineError;
use crate::insert::Insert;
use crate::request::{FromEntity, Request};
use crate::update::Update;

/// The request a [`SyncRequest`] dispatches to.
#[derive(Debug, Clone)]
pub enum Resolution<I, U> {
    Insert(I),
    Update(U),
}

impl<I: Request, U: Request> Resolution<I, U> {
    fn attrs(&self) -> &Registry {
        match self {
            Self::Insert(i) => i.attrs(),
            Self::Update(u) => u.attrs(),
        }
    }
}

/// Syncs an entity with the store: inserts it unless it is already
/// persisted, in which case it is updated. Resolution happens once per
/// instance and is carried over to every request derived from it.
#[derive(Debug, Clone)]
pub struct SyncRequest<E = Record, I = Insert<E>, U = Update<E>> {
    entity: E,
    insert: Option<I>,
    update: Option<U>,
    resolved: OnceLock<Resolution<I, U>>,
}

impl<E, I, U> SyncRequest<E, I, U>
where
    E: Entity,
    I: Request + FromEntity<E>,
    U: Request + FromEntity<E>,
{
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            insert: None,
            update: None,
            resolved: OnceLock::new(),
        }
    }

    /// Dispatches to the given requests instead of building defaults.
    pub fn with_delegates(entity: E, insert: I, update: U) -> Self {
        Self {
            entity,
            insert: Some(insert),
            update: Some(update),
            resolved: OnceLock::new(),
        }
    }

    pub fn resolved(&self) -> &Resolution<I, U> {
        self.resolved.get_or_init(|| {
            let persisted = self.entity.attrs().flag(attr::PERSISTED);
            trace!(persisted, "resolving sync request");
            if persisted {
                Resolution::Update(
                    self.update
                        .clone()
                        .unwrap_or_else(|| U::from_entity(self.entity.clone())),
                )
            } else {
                Resolution::Insert(
                    self.insert
                        .clone()
                        .unwrap_or_else(|| I::from_entity(self.entity.clone())),
                )
            }
        })
    }

    fn replaced(&self, resolution: Resolution<I, U>) -> Self {
        Self {
            entity: self.entity.clone(),
            insert: self.insert.clone(),
            update: self.update.clone(),
            resolved: OnceLock::from(resolution),
        }
    }
}

impl<E, I, U> Request for SyncRequest<E, I, U>
where
    E: Entity,
    I: Request + FromEntity<E>,
    U: Request + FromEntity<E>,
{
    fn attrs(&self) -> &Registry {
        self.resolved().attrs()
    }

    fn with_attr(&self, key: &str, value: impl Into<Value>) -> Self {
        let resolution = match self.resolved() {
            Resolution::Insert(i) => Resolution::Insert(i.with_attr(key, value)),
            Resolution::Update(u) => Resolution::Update(u.with_attr(key, value)),
        };
        self.replaced(resolution)
    }

    fn executed<D: Database>(&self, db: &D) -> Result<Self, EngineError> {
        let resolution = match self.resolved() {
            Resolution::Insert(i) => Resolution::Insert(i.executed(db)?),
            Resolution::Update(u) => Resolution::Update(u.executed(db)?),
        };
        Ok(self.replaced(resolution))
    }
}

impl<E, I, U> Collectable for SyncRequest<E, I, U>
where
    E: Entity,
    I: Request + FromEntity<E>,
    U: Request + FromEntity<E>,
{
    fn collected<C: Collector>(&self, collector: C) -> Result<C::Output, C::Error> {
        match self.resolved() {
            Resolution::Insert(i) => i.collected(collector),
            Resolution::Update(u) => u.collected(collector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entity_resolves_to_insert() {
        let sync: SyncRequest = SyncRequest::new(Record::new().with_memo("x"));
        assert!(matches!(sync.resolved(), Resolution::Insert(_)));
    }

    #[test]
    fn persisted_entity_resolves_to_update() {
        let record = Record::new().with_attr(attr::PERSISTED, true);
        let sync: SyncRequest = SyncRequest::new(record);
        assert!(matches!(sync.resolved(), Resolution::Update(_)));
    }

    #[test]
    fn resolution_is_memoized() {
        let sync: SyncRequest = SyncRequest::new(Record::new());
        let first: *const _ = sync.resolved();
        let second: *const _ = sync.resolved();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn resolution_is_shared_across_threads() {
        let sync: SyncRequest = SyncRequest::new(Record::new().with_memo("x"));
        let here = sync.resolved() as *const _ as usize;
        std::thread::scope(|s| {
            s.spawn(|| {
                let there = sync.resolved() as *const _ as usize;
                assert_eq!(here, there);
            });
        });
    }

    #[test]
    fn attrs_come_from_delegate() {
        let sync: SyncRequest = SyncRequest::new(Record::new());
        let sync = sync.with_attr("trace", "abc");
        assert_eq!(sync.attrs().value("trace"), Some(&Value::from("abc")));
        match sync.resolved() {
            Resolution::Insert(i) => assert_eq!(i.attrs().value("trace"), Some(&Value::from("abc"))),
            Resolution::Update(_) => panic!("expected insert"),
        }
    }
}
