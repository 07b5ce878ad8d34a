use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("sealed: cannot set `{0}` after the collection has been sealed")]
    SealedMutation(String),

    #[error("missing field: `{0}` has no value and no default")]
    MissingField(String),

    #[error("validation failed for `{field}` ({predicate}): {message}")]
    ValidationFailure {
        field: String,
        predicate: String,
        message: String,
    },

    #[error("invalid data")]
    DomainInvalid(#[source] Box<CoreError>),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("internal consistency: {0}")]
    InternalConsistency(String),
}

impl CoreError {
    pub fn validation(field: &str, predicate: &str, message: impl Into<String>) -> Self {
        Self::ValidationFailure {
            field: field.to_string(),
            predicate: predicate.to_string(),
            message: message.into(),
        }
    }

    /// Stable tag identifying the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SealedMutation(_) => "sealed_mutation",
            Self::MissingField(_) => "missing_field",
            Self::ValidationFailure { .. } => "validation_failure",
            Self::DomainInvalid(_) => "domain_invalid",
            Self::ConstraintViolation(_) => "constraint_violation",
            Self::InternalConsistency(_) => "internal_consistency",
        }
    }

    /// Wraps field-level failures into `DomainInvalid`; everything else passes through.
    pub fn into_domain(self) -> Self {
        match self {
            Self::ValidationFailure { .. } | Self::MissingField(_) => {
                Self::DomainInvalid(Box::new(self))
            }
            other => other,
        }
    }
}
