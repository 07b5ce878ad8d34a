//! Layout a record is collected into before it becomes statement text and
//! bind values. Absent fields stay absent; explicit nulls are kept.

use pdata_core::record::field;
use pdata_core::{Asset, CoreError, FieldRule, Inventory, Layout, Positions, Registry, Value, attr, timestamp};

pub const MEMO_MAX_CHARS: usize = 255;

pub fn inventory() -> Inventory {
    Inventory::with_layout(layout())
}

pub fn layout() -> Layout {
    Layout::new()
        .rule(
            FieldRule::new(field::ID)
                .optional()
                .with_asset_if_defined(Asset::Any(vec![Asset::IsString, Asset::IsInteger])),
        )
        .rule(
            FieldRule::new(field::MEMO)
                .optional()
                .with_asset_if_defined(Asset::IsString)
                .with_processor(|v, _| Ok(truncated(v))),
        )
        .rule(
            FieldRule::new(field::CREATED)
                .optional()
                .with_asset_if_defined(Asset::IsTimestamp)
                .with_processor(|v, _| Ok(stored(v))),
        )
        .rule(
            FieldRule::new(field::UPDATED)
                .optional()
                .with_asset_if_defined(Asset::IsTimestamp)
                .with_processor(updated),
        )
        .rule(
            FieldRule::new(field::ATTRS)
                .with_default(Registry::new())
                .with_asset(Asset::IsRegistry),
        )
}

/// `attrs.persisted` of the collected record.
pub fn persisted(positions: &Positions) -> bool {
    positions
        .get(field::ATTRS)
        .and_then(Value::as_registry)
        .is_some_and(|attrs| attrs.flag(attr::PERSISTED))
}

fn truncated(v: Value) -> Value {
    match v {
        Value::Text(s) if s.chars().count() > MEMO_MAX_CHARS => {
            Value::Text(s.chars().take(MEMO_MAX_CHARS).collect())
        }
        other => other,
    }
}

fn stored(v: Value) -> Value {
    match v {
        Value::Timestamp(dt) => Value::Text(timestamp::to_storage(&dt)),
        other => other,
    }
}

fn updated(v: Value, resolved: &Positions) -> Result<Value, CoreError> {
    let Some(dt) = v.as_timestamp() else {
        return Ok(v);
    };
    let created = resolved
        .get(field::CREATED)
        .and_then(Value::as_text)
        .and_then(|raw| timestamp::from_storage(raw).ok());
    if created.is_some_and(|created| dt < created) {
        return Err(CoreError::validation(
            field::UPDATED,
            "not_before_created",
            "`updated` precedes `created`",
        ));
    }
    Ok(stored(v))
}
