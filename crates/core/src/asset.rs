use crate::error::CoreError;
use crate::value::Value;

/// Pass/fail predicate applied to a bound position value.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    IsString,
    IsNotEmpty,
    IsInteger,
    IsTimestamp,
    IsRegistry,
    /// Every inner predicate must hold.
    All(Vec<Asset>),
    /// At least one inner predicate must hold.
    Any(Vec<Asset>),
}

impl Asset {
    pub fn name(&self) -> String {
        match self {
            Self::IsString => "is_string".into(),
            Self::IsNotEmpty => "is_not_empty".into(),
            Self::IsInteger => "is_integer".into(),
            Self::IsTimestamp => "is_timestamp".into(),
            Self::IsRegistry => "is_registry".into(),
            Self::All(inner) => joined("all", inner),
            Self::Any(inner) => joined("any", inner),
        }
    }

    pub fn holds(&self, value: &Value) -> bool {
        match self {
            Self::IsString => matches!(value, Value::Text(_)),
            Self::IsNotEmpty => match value {
                Value::Null => false,
                Value::Text(s) => !s.is_empty(),
                Value::Registry(r) => !r.is_empty(),
                _ => true,
            },
            Self::IsInteger => matches!(value, Value::Integer(_)),
            Self::IsTimestamp => matches!(value, Value::Timestamp(_)),
            Self::IsRegistry => matches!(value, Value::Registry(_)),
            Self::All(inner) => inner.iter().all(|a| a.holds(value)),
            Self::Any(inner) => inner.iter().any(|a| a.holds(value)),
        }
    }

    /// Checks `value` on behalf of `field`, producing a `ValidationFailure` on mismatch.
    pub fn check(&self, field: &str, value: &Value) -> Result<(), CoreError> {
        if self.holds(value) {
            return Ok(());
        }
        Err(CoreError::validation(
            field,
            &self.name(),
            format!("unexpected {} value", value.type_name()),
        ))
    }
}

fn joined(op: &str, inner: &[Asset]) -> String {
    let names: Vec<String> = inner.iter().map(Asset::name).collect();
    format!("{op}({})", names.join(","))
}
