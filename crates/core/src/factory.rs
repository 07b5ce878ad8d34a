use chrono::{DateTime, Utc};

use crate::asset::Asset;
use crate::collector::Collector;
use crate::error::CoreError;
use crate::inventory::{FieldRule, Inventory, Layout, Positions};
use crate::record::{Entity, Record, field};
use crate::registry::attr;
use crate::timestamp;
use crate::value::Value;

/// Builds a persisted entity from raw key/value input, e.g. a fetched row.
#[derive(Debug, Clone)]
pub struct EntityFactory<E = Record> {
    inventory: Inventory,
    entity: E,
}

impl Default for EntityFactory<Record> {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityFactory<Record> {
    pub fn new() -> Self {
        Self::with_entity(Record::new())
    }
}

impl<E: Entity> EntityFactory<E> {
    /// Uses `entity` as the seed the collected fields are applied to.
    pub fn with_entity(entity: E) -> Self {
        Self {
            inventory: Inventory::with_layout(layout()),
            entity,
        }
    }

    /// Feeds every pair and finishes.
    pub fn from_pairs<I, K>(self, pairs: I) -> Result<E, CoreError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut obj = self;
        for (key, value) in pairs {
            obj = Collector::with(obj, key.as_ref(), value)?;
        }
        Collector::finished(obj)
    }

    fn built(&self) -> Result<E, CoreError> {
        let inventory = self.inventory.clone().finished()?;
        let p = inventory.positions();
        let entity = self
            .entity
            .with_id(&p.fetch(field::ID).orig_with(text)?)?
            .with_memo(&p.fetch(field::MEMO).orig_with(text)?)
            .with_created(p.fetch(field::CREATED).orig_with(stamp)?)
            .with_updated(p.fetch(field::UPDATED).orig_with(optional_stamp)?)
            .with_attr(attr::PERSISTED, true)
            .with_attr(attr::DIRTY, false);
        Ok(entity)
    }
}

impl<E: Entity> Collector for EntityFactory<E> {
    type Output = E;
    type Error = CoreError;

    fn with(self, key: &str, value: Value) -> Result<Self, CoreError> {
        Ok(Self {
            inventory: self.inventory.with(key, value)?,
            entity: self.entity,
        })
    }

    fn finished(self) -> Result<E, CoreError> {
        self.built().map_err(CoreError::into_domain)
    }
}

fn layout() -> Layout {
    let non_empty_text = Asset::All(vec![Asset::IsString, Asset::IsNotEmpty]);
    Layout::new()
        .rule(
            FieldRule::new(field::ID)
                .with_asset(Asset::Any(vec![non_empty_text.clone(), Asset::IsInteger]))
                .with_processor(|v, _| match v {
                    Value::Integer(n) => Ok(Value::Text(n.to_string())),
                    other => Ok(other),
                }),
        )
        .rule(FieldRule::new(field::MEMO).with_asset(non_empty_text.clone()))
        .rule(
            FieldRule::new(field::CREATED)
                .with_asset(non_empty_text)
                .with_processor(|v, _| parsed(field::CREATED, &v)),
        )
        .rule(
            FieldRule::new(field::UPDATED)
                .with_default(Value::Null)
                .with_asset_if_defined(Asset::IsString)
                .with_processor(updated),
        )
}

fn parsed(key: &str, raw: &Value) -> Result<Value, CoreError> {
    let raw = raw.as_text().unwrap_or_default();
    timestamp::from_storage(raw)
        .map(Value::Timestamp)
        .map_err(|e| CoreError::validation(key, "timestamp_format", format!("{raw:?}: {e}")))
}

fn updated(raw: Value, resolved: &Positions) -> Result<Value, CoreError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let updated = parsed(field::UPDATED, &raw)?;
    let created = resolved.fetch(field::CREATED).orig_with(stamp)?;
    if updated.as_timestamp().is_some_and(|u| u < created) {
        return Err(CoreError::validation(
            field::UPDATED,
            "not_before_created",
            "`updated` precedes `created`",
        ));
    }
    Ok(updated)
}

fn text(v: Value) -> Result<String, CoreError> {
    match v {
        Value::Text(s) => Ok(s),
        other => Err(CoreError::InternalConsistency(format!(
            "expected text, resolved {}",
            other.type_name()
        ))),
    }
}

fn stamp(v: Value) -> Result<DateTime<Utc>, CoreError> {
    v.as_timestamp().ok_or_else(|| {
        CoreError::InternalConsistency(format!("expected timestamp, resolved {}", v.type_name()))
    })
}

fn optional_stamp(v: Value) -> Result<Option<DateTime<Utc>>, CoreError> {
    if v.is_null() {
        return Ok(None);
    }
    stamp(v).map(Some)
}
