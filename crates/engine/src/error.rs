use pdata_core::CoreError;
use pdata_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("operation prohibited: {0}")]
    OperationProhibited(String),

    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("criteria has no fields collected")]
    EmptyCriteria,

    #[error("invalid table name: {0:?}")]
    InvalidTable(String),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.kind(),
            Self::Core(e) => e.kind(),
            Self::OperationProhibited(_) => "operation_prohibited",
            Self::InvalidCriteria(_) => "invalid_criteria",
            Self::EmptyCriteria => "empty_criteria",
            Self::InvalidTable(_) => "invalid_table",
        }
    }
}
