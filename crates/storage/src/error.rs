use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("statement has no parameter named {0}")]
    UnknownParameter(String),

    #[error("cannot bind {kind} value to {name}")]
    Unbindable { name: String, kind: &'static str },
}

impl StorageError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Serialization(_) => "serialization",
            Self::UnknownParameter(_) => "unknown_parameter",
            Self::Unbindable { .. } => "unbindable",
        }
    }
}
