use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::asset::Asset;
use crate::collector::Collector;
use crate::error::CoreError;
use crate::value::Value;

/// Transform applied to a position's raw value (`Null` when absent). Receives the
/// positions resolved so far, so a field declared after its dependencies can
/// enforce cross-field constraints.
pub type Processor = Arc<dyn Fn(Value, &Positions) -> Result<Value, CoreError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
enum State {
    Unknown,
    Bound(Value),
    Resolved(Value),
}

/// A single field on its way from raw input to a typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    key: String,
    state: State,
}

impl Position {
    fn unknown(key: &str) -> Self {
        Self { key: key.to_string(), state: State::Unknown }
    }

    fn bound(key: &str, value: Value) -> Self {
        Self { key: key.to_string(), state: State::Bound(value) }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.state {
            State::Unknown => None,
            State::Bound(v) | State::Resolved(v) => Some(v),
        }
    }

    /// True once a value (possibly null) has been bound.
    pub fn is_known(&self) -> bool {
        !matches!(self.state, State::Unknown)
    }

    pub fn is_defined(&self) -> bool {
        self.value().is_some_and(|v| !v.is_null())
    }

    pub fn with_asset(self, asset: &Asset) -> Result<Self, CoreError> {
        match self.value() {
            None => Err(CoreError::MissingField(self.key)),
            Some(v) => {
                asset.check(&self.key, v)?;
                Ok(self)
            }
        }
    }

    /// Like [`with_asset`](Self::with_asset) but absent and null values pass untouched.
    pub fn with_asset_if_defined(self, asset: &Asset) -> Result<Self, CoreError> {
        if !self.is_defined() {
            return Ok(self);
        }
        self.with_asset(asset)
    }

    pub fn with_processor<F>(self, transform: F) -> Result<Self, CoreError>
    where
        F: FnOnce(Value) -> Result<Value, CoreError>,
    {
        let raw = self.value().cloned().unwrap_or(Value::Null);
        let resolved = transform(raw)?;
        Ok(Self { key: self.key, state: State::Resolved(resolved) })
    }

    pub fn orig(&self) -> Result<Value, CoreError> {
        self.value()
            .cloned()
            .ok_or_else(|| CoreError::MissingField(self.key.clone()))
    }

    /// Extracts the value through `transform`, e.g. into a typed Rust value.
    pub fn orig_with<T, F>(&self, transform: F) -> Result<T, CoreError>
    where
        F: FnOnce(Value) -> Result<T, CoreError>,
    {
        transform(self.orig()?)
    }
}

/// Ordered field-name → value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Positions {
    entries: IndexMap<String, Value>,
}

impl Positions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch(&self, key: &str) -> Position {
        match self.entries.get(key) {
            Some(v) => Position::bound(key, v.clone()),
            None => Position::unknown(key),
        }
    }

    pub fn fetch_or(&self, key: &str, default: Value) -> Position {
        Position::bound(key, self.entries.get(key).cloned().unwrap_or(default))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
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

    fn insert(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }
}

/// Declared validation chain for one field: fetch, check, transform, extract.
#[derive(Clone)]
pub struct FieldRule {
    key: String,
    default: Option<Value>,
    asset: Option<Asset>,
    if_defined: bool,
    optional: bool,
    processor: Option<Processor>,
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("asset", &self.asset)
            .field("if_defined", &self.if_defined)
            .field("optional", &self.optional)
            .field("processor", &self.processor.is_some())
            .finish()
    }
}

impl FieldRule {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            default: None,
            asset: None,
            if_defined: false,
            optional: false,
            processor: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.asset = Some(asset);
        self.if_defined = false;
        self
    }

    pub fn with_asset_if_defined(mut self, asset: Asset) -> Self {
        self.asset = Some(asset);
        self.if_defined = true;
        self
    }

    /// An absent key is left out of the resolved positions instead of failing.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_processor<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value, &Positions) -> Result<Value, CoreError> + Send + Sync + 'static,
    {
        self.processor = Some(Arc::new(transform));
        self
    }

    fn resolve(&self, raw: &Positions, resolved: &Positions) -> Result<Option<Value>, CoreError> {
        let position = match &self.default {
            Some(default) => raw.fetch_or(&self.key, default.clone()),
            None => raw.fetch(&self.key),
        };
        if self.optional && !position.is_known() {
            return Ok(None);
        }
        let position = match &self.asset {
            Some(asset) if self.if_defined => position.with_asset_if_defined(asset)?,
            Some(asset) => position.with_asset(asset)?,
            None => position,
        };
        let position = match &self.processor {
            Some(processor) => position.with_processor(|v| processor(v, resolved))?,
            None => position,
        };
        position.orig().map(Some)
    }
}

/// Ordered list of field rules; resolution follows declaration order.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    rules: Vec<FieldRule>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    fn resolve(&self, raw: &Positions) -> Result<Positions, CoreError> {
        let mut resolved = Positions::new();
        for rule in &self.rules {
            if let Some(value) = rule.resolve(raw, &resolved)? {
                resolved.insert(rule.key(), value);
            }
        }
        Ok(resolved)
    }
}

/// Two-phase accumulator: open for `with`, then sealed and resolved.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    raw: Positions,
    layout: Option<Arc<Layout>>,
    sealed: bool,
    resolved: Option<Positions>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: Layout) -> Self {
        Self {
            layout: Some(Arc::new(layout)),
            ..Self::default()
        }
    }

    pub fn with(self, key: &str, value: impl Into<Value>) -> Result<Self, CoreError> {
        if self.sealed {
            return Err(CoreError::SealedMutation(key.to_string()));
        }
        let mut obj = self;
        obj.raw.insert(key, value.into());
        Ok(obj)
    }

    pub fn sealed(&self) -> Self {
        let mut obj = self.clone();
        obj.sealed = true;
        obj
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn is_finished(&self) -> bool {
        self.resolved.is_some()
    }

    /// Seals if needed and resolves every declared field. Idempotent.
    pub fn finished(self) -> Result<Self, CoreError> {
        if self.resolved.is_some() {
            return Ok(self);
        }
        let resolved = match &self.layout {
            Some(layout) => layout.resolve(&self.raw)?,
            None => self.raw.clone(),
        };
        trace!(raw = self.raw.len(), resolved = resolved.len(), "inventory finished");
        let mut obj = self;
        obj.sealed = true;
        obj.resolved = Some(resolved);
        Ok(obj)
    }

    /// Resolved positions once finished, raw ones before.
    pub fn positions(&self) -> &Positions {
        self.resolved.as_ref().unwrap_or(&self.raw)
    }
}

impl Collector for Inventory {
    type Output = Inventory;
    type Error = CoreError;

    fn with(self, key: &str, value: Value) -> Result<Self, CoreError> {
        Inventory::with(self, key, value)
    }

    fn finished(self) -> Result<Inventory, CoreError> {
        Inventory::finished(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        Layout::new()
            .rule(FieldRule::new("low").with_asset(Asset::IsInteger))
            .rule(
                FieldRule::new("high")
                    .with_asset_if_defined(Asset::IsInteger)
                    .with_processor(|v, resolved| {
                        let low = resolved.fetch("low").orig()?;
                        let below = matches!(
                            (v.as_integer(), low.as_integer()),
                            (Some(h), Some(l)) if h < l
                        );
                        if below {
                            return Err(CoreError::validation("high", "not_below_low", "high is below low"));
                        }
                        Ok(v)
                    }),
            )
    }

    #[test]
    fn with_after_seal_is_rejected() {
        let inv = Inventory::new().with("a", 1).unwrap().sealed();
        let err = inv.clone().with("b", 2).unwrap_err();
        assert!(matches!(err, CoreError::SealedMutation(ref k) if k == "b"));
    }

    #[test]
    fn with_overwrites_prior_value() {
        let inv = Inventory::new().with("a", 1).unwrap().with("a", 2).unwrap();
        assert_eq!(inv.positions().get("a"), Some(&Value::Integer(2)));
        assert_eq!(inv.positions().len(), 1);
    }

    #[test]
    fn finished_is_idempotent() {
        let inv = Inventory::with_layout(layout())
            .with("low", 1)
            .unwrap()
            .with("high", 5)
            .unwrap();
        let once = inv.finished().unwrap();
        let twice = once.clone().finished().unwrap();
        assert!(once.is_sealed());
        assert_eq!(once.positions(), twice.positions());
    }

    #[test]
    fn finished_seals_implicitly() {
        let inv = Inventory::new().with("a", 1).unwrap().finished().unwrap();
        assert!(inv.is_sealed());
        assert!(inv.with("b", 1).is_err());
    }

    #[test]
    fn missing_field_without_default() {
        let err = Inventory::with_layout(layout()).finished().unwrap_err();
        assert!(matches!(err, CoreError::MissingField(ref k) if k == "low"));
    }

    #[test]
    fn default_fills_absent_field() {
        let layout = Layout::new().rule(FieldRule::new("n").with_default(7).with_asset(Asset::IsInteger));
        let inv = Inventory::with_layout(layout).finished().unwrap();
        assert_eq!(inv.positions().get("n"), Some(&Value::Integer(7)));
    }

    #[test]
    fn cross_field_processor_sees_resolved_siblings() {
        let err = Inventory::with_layout(layout())
            .with("low", 10)
            .unwrap()
            .with("high", 3)
            .unwrap()
            .finished()
            .unwrap_err();
        assert_eq!(err.kind(), "validation_failure");
    }

    #[test]
    fn inherent_methods_win_over_collector() {
        // Both `Collector` and the inherent methods are in scope here.
        let inv = Inventory::new().with("a", 1).unwrap();
        let sealed = Collector::with(inv.clone(), "b", Value::from(2)).unwrap().sealed();
        assert_eq!(sealed.positions().len(), 2);
        let done = Collector::finished(inv).unwrap();
        assert!(done.is_finished());
        assert_eq!(done.clone().finished().unwrap().positions(), done.positions());
    }

    #[test]
    fn if_defined_skips_null() {
        let inv = Inventory::with_layout(layout())
            .with("low", 1)
            .unwrap()
            .with("high", Value::Null)
            .unwrap()
            .finished()
            .unwrap();
        assert_eq!(inv.positions().get("high"), Some(&Value::Null));
    }

    #[test]
    fn optional_rule_omits_absent_key() {
        let layout = Layout::new()
            .rule(FieldRule::new("id").optional().with_asset_if_defined(Asset::IsString))
            .rule(FieldRule::new("memo").optional());
        let inv = Inventory::with_layout(layout)
            .with("memo", Value::Null)
            .unwrap()
            .finished()
            .unwrap();
        assert!(!inv.positions().contains("id"));
        assert_eq!(inv.positions().get("memo"), Some(&Value::Null));
    }

    #[test]
    fn resolution_follows_declaration_order() {
        let layout = Layout::new()
            .rule(FieldRule::new("z"))
            .rule(FieldRule::new("a"));
        let inv = Inventory::with_layout(layout)
            .with("a", 1)
            .unwrap()
            .with("z", 2)
            .unwrap()
            .finished()
            .unwrap();
        let keys: Vec<&str> = inv.positions().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn position_chain() {
        let positions = Inventory::new().with("memo", "  hi ").unwrap().finished().unwrap();
        let memo = positions
            .positions()
            .fetch("memo")
            .with_asset(&Asset::IsString)
            .and_then(|p| {
                p.with_processor(|v| Ok(Value::from(v.as_text().unwrap_or_default().trim())))
            })
            .and_then(|p| p.orig())
            .unwrap();
        assert_eq!(memo, Value::from("hi"));

        let unknown = positions.positions().fetch("nope");
        assert!(!unknown.is_known());
        assert!(matches!(unknown.orig(), Err(CoreError::MissingField(_))));
        assert!(unknown.clone().with_asset_if_defined(&Asset::IsString).is_ok());
        assert_eq!(
            unknown.with_processor(|v| Ok(Value::from(v.is_null()))).unwrap().orig().unwrap(),
            Value::Boolean(true)
        );
    }
}
